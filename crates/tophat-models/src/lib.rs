//! Model construction and encoding for the Tophat inference tile.
//!
//! The tile consumes a fixed 36-byte model image; this crate is the
//! producer side of that contract. It provides:
//!
//! - [`DecisionTree`] — a validated flat-arena tree (7 internal nodes,
//!   8 leaves, depth 3) with encode/decode to the wire image and a
//!   reference `predict` that matches the tile bit for bit.
//! - [`TreeBuilder`] — incremental construction with completeness and
//!   bit-width validation, so a malformed image cannot be produced.
//! - [`zoo`] — the box-office demo tree and the canonical fixture set
//!   used for conformance testing.
//!
//! # Example
//!
//! ```
//! use tophat_models::zoo;
//!
//! # fn main() -> tophat_models::Result<()> {
//! let tree = zoo::box_office_tree()?;
//! let image = tree.encode();
//! assert_eq!(image.as_bytes().len(), 36);
//! assert_eq!(tree.predict(&[4, 6, 10, 12, 15, 20, 10, 18]), 8);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod error;
mod tree;
pub mod zoo;

pub use error::{ModelError, Result};
pub use tree::{DecisionTree, TreeBuilder};

/// Commonly used types.
pub mod prelude {
    pub use crate::zoo::{box_office_tree, ExampleCase, EXAMPLES};
    pub use crate::{DecisionTree, ModelError, Result, TreeBuilder};
}
