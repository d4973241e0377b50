//! Error types for model construction and encoding

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building, encoding, or decoding tree models
#[derive(Debug, Error)]
pub enum ModelError {
    /// Internal node index outside 0–6
    #[error("Internal node index {index} out of range 0-6")]
    NodeIndex {
        /// Offending index
        index: usize,
    },

    /// Leaf index outside 0–7
    #[error("Leaf index {index} out of range 0-7")]
    LeafIndex {
        /// Offending index
        index: usize,
    },

    /// The same internal node was defined twice
    #[error("Internal node {index} defined twice")]
    DuplicateNode {
        /// Offending index
        index: usize,
    },

    /// The same leaf was defined twice
    #[error("Leaf {index} defined twice")]
    DuplicateLeaf {
        /// Offending index
        index: usize,
    },

    /// An internal node was never defined
    #[error("Internal node {index} missing")]
    MissingNode {
        /// Missing index
        index: usize,
    },

    /// A leaf was never defined
    #[error("Leaf {index} missing")]
    MissingLeaf {
        /// Missing index
        index: usize,
    },

    /// Feature index exceeds the tile's 3-bit field
    #[error("Node {node}: feature index {feature} exceeds 7")]
    FeatureRange {
        /// Node holding the bad field
        node: usize,
        /// Offending feature index
        feature: usize,
    },

    /// Child index exceeds the 15-slot arena
    #[error("Node {node}: child index {child} exceeds 14")]
    ChildRange {
        /// Node holding the bad field
        node: usize,
        /// Offending child index
        child: u8,
    },

    /// Raw data is not exactly one image long
    #[error("Model image must be {expected} bytes, got {actual}")]
    ImageSize {
        /// Required size
        expected: usize,
        /// Supplied size
        actual: usize,
    },

    /// I/O error reading or writing a model file
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl ModelError {
    /// Create an image size error
    pub const fn image_size(actual: usize) -> Self {
        Self::ImageSize {
            expected: tophat_chip::image::MODEL_IMAGE_BYTES,
            actual,
        }
    }
}
