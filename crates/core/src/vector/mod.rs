//! Vector operations for similarity search
//!
//! Scalar implementations of the distance and normalization primitives the
//! index and embedders rely on. Catalogs are small (hundreds to low
//! thousands of items), so exact scalar math is the whole story here: no
//! approximation, no quantization.
//!
//! # Usage
//!
//! ```
//! use platelens_core::vector::{l2_distance, normalize};
//!
//! let mut embedding = vec![3.0, 4.0];
//! normalize(&mut embedding);
//!
//! let query = vec![0.6, 0.8];
//! let distance = l2_distance(&embedding, &query).unwrap();
//! assert!(distance < 1e-6);
//! ```

pub mod ops;

pub use ops::{approx_equal, dot_product, l2_distance, magnitude, normalize};
