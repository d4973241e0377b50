//! Host-side stack for the Tophat decision-tree inference tile.
//!
//! The tile loads a fixed-shape decision tree (7 internal nodes, 8 leaves,
//! depth 3) as a 36-byte image, accepts an 8-byte feature vector, and emits
//! a one-byte prediction — all over a byte-serial command interface with a
//! strobe/ready handshake. This crate provides the full host stack plus a
//! cycle-accurate simulation of the silicon itself:
//!
//! ```text
//! Predictor / ModelLoader     high-level sequences with metrics
//!         │
//!       Link<P>               two-cycle byte transfers, ready polling
//!         │
//!     TilePort                one posedge per call
//!         │
//!      Engine                 in-process simulation of the tile
//! ```
//!
//! # Quick start
//!
//! ```
//! use tophat_driver::{Engine, Link, ModelLoader, ModelProgram, Predictor};
//!
//! # fn main() -> tophat_driver::Result<()> {
//! let image = [0u8; 36]; // a real host reads this from a model file
//! let program = ModelProgram::new(image.to_vec())?;
//!
//! let mut link = Link::new(Engine::new());
//! link.clear()?;
//! ModelLoader::default().load(&program, &mut link)?;
//!
//! let prediction = Predictor::default().predict(&[4, 6, 10, 12, 15, 20, 10, 18], &mut link)?;
//! println!("predicted {} in {} cycles", prediction.value, prediction.total_cycles());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod engine;
mod error;
mod inference;
mod link;
mod loading;

pub use engine::{ClearMode, Engine, EngineConfig, FeatureOverflow, PortSample, TilePort};
pub use error::{Result, TophatError};
pub use inference::{PredictConfig, Prediction, Predictor};
pub use link::{Link, DEFAULT_TIMEOUT_CYCLES};
pub use loading::{LoadConfig, LoadMetrics, ModelLoader, ModelProgram};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        ClearMode, Engine, EngineConfig, FeatureOverflow, Link, LoadConfig, ModelLoader,
        ModelProgram, PredictConfig, Prediction, Predictor, Result, TilePort, TophatError,
    };
}
