//! # ccpack testkit
//!
//! Testing utilities for ccpack.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known packages with their expected SHA-256 digest records
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helpers for building raw package bytes and a ready provider
//!
//! ## Golden Vectors
//!
//! ```rust
//! use ccpack_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! for vector in all_vectors() {
//!     println!("{}: {}", vector.name, vector.code_hash);
//! }
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ccpack::{ChaincodePackage, SignedCdsPackage};
//! use ccpack_testkit::generators::{signed_from_params, SignedParams};
//!
//! proptest! {
//!     #[test]
//!     fn signed_packages_validate(params: SignedParams) {
//!         let mut pkg = SignedCdsPackage::default();
//!         let cd = pkg.init_from_buffer(&signed_from_params(&params)).unwrap();
//!         prop_assert!(pkg.validate_cc(&cd).is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use ccpack_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let raw = fixture.make_signed("mycc", "1.0", b"code", b"policy");
//! let cd = fixture.provider.install(&raw).unwrap();
//! assert_eq!(cd.name, "mycc");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{cds_bytes, signed_bytes, TestFixture};
pub use generators::{cds_from_params, signed_from_params, CdsParams, SignedParams};
pub use vectors::{all_vectors, compute_vector, verify_all_vectors, GoldenVector};
