//! Model loading operations.
//!
//! [`ModelProgram`] is the host-side container for a model image;
//! [`ModelLoader`] streams it over the link one MODEL byte per two-cycle
//! transfer and reports [`LoadMetrics`].

use bytes::Bytes;
use tracing::{debug, info};

use tophat_chip::image::{ModelImage, MODEL_IMAGE_BYTES};

use crate::engine::TilePort;
use crate::error::{Result, TophatError};
use crate::link::{Link, DEFAULT_TIMEOUT_CYCLES};

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Polling budget per awaited condition, in cycles.
    pub timeout_cycles: u32,
    /// Confirm the byte count against the image size after streaming.
    pub verify: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            timeout_cycles: DEFAULT_TIMEOUT_CYCLES,
            verify: true,
        }
    }
}

/// Host-side model image ready for loading.
///
/// Wraps the raw bytes in [`Bytes`] so large fixture sets can share one
/// buffer, and carries an additive checksum for logging and verification.
#[derive(Debug, Clone)]
pub struct ModelProgram {
    data: Bytes,
    checksum: u32,
}

impl ModelProgram {
    /// Create a program from raw image bytes.
    ///
    /// # Errors
    ///
    /// [`TophatError::ImageSize`] unless the data is exactly one image long.
    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() != MODEL_IMAGE_BYTES {
            return Err(TophatError::image_size(data.len()));
        }

        let checksum = data
            .iter()
            .fold(0u32, |acc, &byte| acc.wrapping_add(u32::from(byte)));

        debug!(bytes = data.len(), checksum, "program ready");

        Ok(Self { data, checksum })
    }

    /// Create a program from a validated image.
    #[must_use]
    pub fn from_image(image: &ModelImage) -> Self {
        Self::new(Bytes::copy_from_slice(image.as_bytes()))
            .unwrap_or_else(|_| unreachable!("a ModelImage is always image-sized"))
    }

    /// The image view of the program data.
    #[must_use]
    pub fn image(&self) -> ModelImage {
        ModelImage::from_slice(&self.data)
            .unwrap_or_else(|| unreachable!("length validated at construction"))
    }

    /// Raw bytes in wire order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Additive checksum of the image bytes.
    #[must_use]
    pub const fn checksum(&self) -> u32 {
        self.checksum
    }
}

/// Metrics for one load operation.
#[derive(Debug, Clone, Copy)]
pub struct LoadMetrics {
    /// Model bytes streamed.
    pub bytes_transferred: usize,
    /// Clock cycles consumed, ready polls included.
    pub cycles: u64,
}

/// Streams model programs to the tile.
#[derive(Debug, Default)]
pub struct ModelLoader {
    config: LoadConfig,
}

impl ModelLoader {
    /// Create a loader with explicit configuration.
    #[must_use]
    pub const fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Stream `program` over `link` and wait for `model_loaded`.
    ///
    /// # Errors
    ///
    /// - [`TophatError::Timeout`] if a ready poll or the `model_loaded`
    ///   poll exhausts its budget.
    pub fn load<P: TilePort>(
        &self,
        program: &ModelProgram,
        link: &mut Link<P>,
    ) -> Result<LoadMetrics> {
        let start_cycles = link.cycles();
        debug!(
            bytes = program.as_bytes().len(),
            checksum = program.checksum(),
            "loading program"
        );

        let image = program.image();
        link.load_model(&image)?;

        let metrics = LoadMetrics {
            bytes_transferred: program.as_bytes().len(),
            cycles: link.cycles() - start_cycles,
        };

        if self.config.verify && metrics.bytes_transferred != MODEL_IMAGE_BYTES {
            return Err(TophatError::image_size(metrics.bytes_transferred));
        }

        info!(
            bytes = metrics.bytes_transferred,
            cycles = metrics.cycles,
            "model loaded"
        );
        Ok(metrics)
    }
}
