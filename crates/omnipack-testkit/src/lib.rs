//! # Omnipack Testkit
//!
//! Testing utilities for Omnipack.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known slot lists with their canonical encoding
//! - **Generators**: Proptest strategies for item stacks and edit sequences
//! - **Fixtures**: Engine- and server-level setups with in-memory replicas
//!
//! The engine-level properties (clamp law, first-observation suppression,
//! last-write-wins, idempotence, convergence) live in the generators' tests.
//!
//! ## Golden Vectors
//!
//! ```rust
//! use omnipack_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed, _, hash) in verify_all_vectors() {
//!     assert!(passed, "{}", name);
//!     println!("{}: {}", name, hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use omnipack_testkit::{apply_step, step, EngineFixture};
//!
//! proptest! {
//!     #[test]
//!     fn converges(steps in prop::collection::vec(step(3, 41), 0..40)) {
//!         let mut fixture = EngineFixture::new(41, 3);
//!         for s in &steps {
//!             apply_step(&mut fixture, s);
//!         }
//!         fixture.tick();
//!         prop_assert!(fixture.converged());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use omnipack_testkit::fixtures::{stone, EngineFixture};
//!
//! let mut fixture = EngineFixture::new(41, 2);
//! fixture.edit(0, 3, stone(10));
//! fixture.tick();
//! assert_eq!(fixture.roster[1].get(3), Some(&stone(10)));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    participant, participants, stack, stone, test_config, test_limits, EngineFixture,
    PlaceApplier, ServerFixture, TestServer, ITEMS, SERVER_ID, SLOT_COUNT,
};
pub use generators::{apply_step, item_stack, slot_contents, slot_value, step, Step};
pub use vectors::{all_vectors, verify_all_vectors, vectors_json, GoldenVector};
