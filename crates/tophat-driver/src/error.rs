//! Error types for tile driver operations

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, TophatError>;

/// Errors that can occur while driving the tile
#[derive(Debug, Error)]
pub enum TophatError {
    /// A status condition did not appear within the polling budget
    #[error("Timeout waiting for {waiting_for} after {cycles} cycles")]
    Timeout {
        /// Condition that was being polled
        waiting_for: &'static str,
        /// Cycle budget that was exhausted
        cycles: u32,
    },

    /// RUN was rejected because the tile lacked a model or a full feature vector
    #[error("Run rejected: missing prerequisites (model_loaded={model_loaded})")]
    MissingPrerequisites {
        /// Whether the tile reported a loaded model at rejection time
        model_loaded: bool,
    },

    /// Model data is not exactly one image long
    #[error("Model image must be {expected} bytes, got {actual}")]
    ImageSize {
        /// Required image size
        expected: usize,
        /// Size that was supplied
        actual: usize,
    },

    /// Feature data is not exactly one vector long
    #[error("Feature vector must be {expected} bytes, got {actual}")]
    FeatureCount {
        /// Required vector length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },
}

impl TophatError {
    /// Create a timeout error
    pub const fn timeout(waiting_for: &'static str, cycles: u32) -> Self {
        Self::Timeout {
            waiting_for,
            cycles,
        }
    }

    /// Create an image size error
    pub const fn image_size(actual: usize) -> Self {
        Self::ImageSize {
            expected: tophat_chip::image::MODEL_IMAGE_BYTES,
            actual,
        }
    }

    /// Create a feature count error
    pub const fn feature_count(actual: usize) -> Self {
        Self::FeatureCount {
            expected: tophat_chip::features::FEATURE_COUNT,
            actual,
        }
    }
}
