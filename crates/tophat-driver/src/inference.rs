//! Prediction execution on a loaded tile.
//!
//! [`Predictor`] validates the feature vector, drives the load-features /
//! RUN sequence over the link, and returns a [`Prediction`] with cycle
//! metrics. Expectations are derived from the tile's fixed shape rather
//! than hardcoded at call sites.

use tracing::{debug, info};

use tophat_chip::features::FEATURE_COUNT;

use crate::engine::TilePort;
use crate::error::{Result, TophatError};
use crate::link::Link;

/// Prediction configuration, derived from the tile's fixed shape.
#[derive(Debug, Clone, Copy)]
pub struct PredictConfig {
    /// Feature bytes per vector.
    pub feature_count: usize,
}

impl PredictConfig {
    /// Configuration for the fixed-function tile.
    #[must_use]
    pub const fn tile() -> Self {
        Self {
            feature_count: FEATURE_COUNT,
        }
    }
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self::tile()
    }
}

/// One completed prediction with its cycle cost.
#[derive(Debug, Clone, Copy)]
pub struct Prediction {
    /// The tile's result byte.
    pub value: u8,
    /// Cycles spent streaming the feature vector.
    pub feature_cycles: u64,
    /// Cycles from RUN issue to `pred_valid`.
    pub run_cycles: u64,
}

impl Prediction {
    /// Total cycles for the prediction sequence.
    #[must_use]
    pub const fn total_cycles(&self) -> u64 {
        self.feature_cycles + self.run_cycles
    }
}

/// Executes predictions over a link.
#[derive(Debug, Default)]
pub struct Predictor {
    config: PredictConfig,
}

impl Predictor {
    /// Create a predictor with explicit configuration.
    #[must_use]
    pub const fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    /// Load `features` and run one evaluation.
    ///
    /// The model must already be loaded; rerunning with the same vector is
    /// deterministic and does not require reloading anything.
    ///
    /// # Errors
    ///
    /// - [`TophatError::FeatureCount`] if `features` is not one full vector.
    /// - [`TophatError::MissingPrerequisites`] if the tile rejects RUN.
    /// - [`TophatError::Timeout`] if a status poll exhausts its budget.
    pub fn predict<P: TilePort>(&self, features: &[u8], link: &mut Link<P>) -> Result<Prediction> {
        if features.len() != self.config.feature_count {
            return Err(TophatError::feature_count(features.len()));
        }
        let vector: [u8; FEATURE_COUNT] = features
            .try_into()
            .map_err(|_| TophatError::feature_count(features.len()))?;

        let start = link.cycles();
        link.load_features(&vector)?;
        let loaded = link.cycles();
        debug!(cycles = loaded - start, "features streamed");

        let value = link.run()?;
        let prediction = Prediction {
            value,
            feature_cycles: loaded - start,
            run_cycles: link.cycles() - loaded,
        };

        info!(
            value = prediction.value,
            cycles = prediction.total_cycles(),
            "prediction complete"
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn short_vector_is_rejected_before_any_transfer() {
        let mut link = Link::new(Engine::new());
        let err = Predictor::default().predict(&[1, 2, 3], &mut link).unwrap_err();
        match err {
            TophatError::FeatureCount { expected, actual } => {
                assert_eq!(expected, FEATURE_COUNT);
                assert_eq!(actual, 3);
            }
            other => panic!("expected FeatureCount, got {other:?}"),
        }
        assert_eq!(link.cycles(), 0, "validation must precede any clocking");
    }

    #[test]
    fn predict_without_model_surfaces_tile_error() {
        let mut link = Link::new(Engine::new());
        let err = Predictor::default().predict(&[0; 8], &mut link).unwrap_err();
        assert!(matches!(err, TophatError::MissingPrerequisites { .. }));
    }
}
