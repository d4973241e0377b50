//! Host-side link discipline for the tile's byte-serial interface.
//!
//! Every transfer is a two-cycle exchange: assert payload + selector +
//! strobe for one cycle, deassert for one. The host must see `ready=1`
//! before each byte; completion bits are polled with a bounded cycle budget
//! and exhaustion surfaces as [`TophatError::Timeout`].
//!
//! [`Link`] is generic over [`TilePort`] so the same sequences drive the
//! in-process engine or any future physical transport.

use tracing::{debug, trace};

use tophat_chip::cmd;
use tophat_chip::features::FEATURE_COUNT;
use tophat_chip::image::{ModelImage, MODEL_IMAGE_BYTES};
use tophat_chip::status::Status;

use crate::engine::{PortSample, TilePort};
use crate::error::{Result, TophatError};

/// Default polling budget per awaited condition, in cycles.
pub const DEFAULT_TIMEOUT_CYCLES: u32 = 50;

/// Cycle-level host link over a tile port.
#[derive(Debug)]
pub struct Link<P: TilePort> {
    port: P,
    timeout_cycles: u32,
    cycles: u64,
}

impl<P: TilePort> Link<P> {
    /// Wrap a tile port with the default polling budget.
    pub fn new(port: P) -> Self {
        Self {
            port,
            timeout_cycles: DEFAULT_TIMEOUT_CYCLES,
            cycles: 0,
        }
    }

    /// Override the per-condition polling budget.
    #[must_use]
    pub fn with_timeout_cycles(mut self, timeout_cycles: u32) -> Self {
        self.timeout_cycles = timeout_cycles;
        self
    }

    /// Clock edges driven so far.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Borrow the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Release the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }

    fn tick(&mut self, payload: u8, control: u8) -> PortSample {
        self.cycles += 1;
        self.port.posedge(payload, control)
    }

    /// Drive one idle cycle and return the sampled outputs.
    pub fn idle_cycle(&mut self) -> PortSample {
        self.tick(0, 0)
    }

    /// Sample the status register (costs one idle cycle).
    pub fn status(&mut self) -> Status {
        self.idle_cycle().status()
    }

    /// Poll until `predicate` holds, spending at most the configured budget.
    ///
    /// # Errors
    ///
    /// [`TophatError::Timeout`] naming `waiting_for` when the budget runs out.
    pub fn wait_until(
        &mut self,
        waiting_for: &'static str,
        predicate: impl Fn(Status) -> bool,
    ) -> Result<PortSample> {
        for _ in 0..self.timeout_cycles {
            let sample = self.idle_cycle();
            if predicate(sample.status()) {
                return Ok(sample);
            }
        }
        Err(TophatError::timeout(waiting_for, self.timeout_cycles))
    }

    /// Poll for `ready=1`.
    ///
    /// # Errors
    ///
    /// Returns [`TophatError::Timeout`] if the tile never reports ready.
    pub fn wait_ready(&mut self, waiting_for: &'static str) -> Result<()> {
        self.wait_until(waiting_for, |status| status.ready).map(drop)
    }

    /// One complete byte transfer: poll ready, assert, deassert.
    ///
    /// # Errors
    ///
    /// Returns [`TophatError::Timeout`] if the tile never reports ready.
    pub fn send_command(&mut self, selector: u8, payload: u8) -> Result<()> {
        self.wait_ready("ready before command byte")?;
        trace!(selector, payload, "command byte");
        self.tick(payload, cmd::assert_byte(selector));
        self.tick(0, 0);
        Ok(())
    }

    /// Issue CLEAR.
    ///
    /// # Errors
    ///
    /// Returns [`TophatError::Timeout`] if the tile never reports ready.
    pub fn clear(&mut self) -> Result<()> {
        self.send_command(cmd::selector::CTRL, cmd::ctrl::CLEAR)
    }

    /// Stream a full model image, then wait for `model_loaded`.
    ///
    /// # Errors
    ///
    /// Returns [`TophatError::Timeout`] if a ready poll or the final
    /// `model_loaded` poll exhausts its budget.
    pub fn load_model(&mut self, image: &ModelImage) -> Result<()> {
        debug!(bytes = MODEL_IMAGE_BYTES, "loading model image");
        for &byte in image.as_bytes() {
            self.send_command(cmd::selector::MODEL, byte)?;
        }
        self.wait_until("model_loaded status", |status| status.model_loaded)
            .map(drop)
    }

    /// Stream one complete feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`TophatError::Timeout`] if a ready poll exhausts its budget.
    pub fn load_features(&mut self, vector: &[u8; FEATURE_COUNT]) -> Result<()> {
        for &byte in vector {
            self.send_command(cmd::selector::FEATURE, byte)?;
        }
        Ok(())
    }

    /// Issue RUN and poll to completion.
    ///
    /// # Errors
    ///
    /// - [`TophatError::MissingPrerequisites`] if the tile raises its error
    ///   bit instead of evaluating.
    /// - [`TophatError::Timeout`] if neither completion bit appears.
    pub fn run(&mut self) -> Result<u8> {
        self.send_command(cmd::selector::CTRL, cmd::ctrl::RUN)?;
        for _ in 0..self.timeout_cycles {
            let sample = self.idle_cycle();
            let status = sample.status();
            if status.error_or_missing_features {
                return Err(TophatError::MissingPrerequisites {
                    model_loaded: status.model_loaded,
                });
            }
            if status.pred_valid {
                return Ok(sample.result);
            }
        }
        Err(TophatError::timeout("pred_valid status", self.timeout_cycles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn status_poll_costs_cycles() {
        let mut link = Link::new(Engine::new());
        assert_eq!(link.cycles(), 0);
        let status = link.status();
        assert!(status.ready);
        assert_eq!(link.cycles(), 1);
    }

    #[test]
    fn run_on_idle_tile_reports_missing_prerequisites() {
        let mut link = Link::new(Engine::new());
        match link.run() {
            Err(TophatError::MissingPrerequisites { model_loaded }) => assert!(!model_loaded),
            other => panic!("expected MissingPrerequisites, got {other:?}"),
        }
    }

    #[test]
    fn wait_until_times_out_with_label() {
        let mut link = Link::new(Engine::new()).with_timeout_cycles(3);
        let err = link.wait_until("pred_valid status", |s| s.pred_valid).unwrap_err();
        match err {
            TophatError::Timeout {
                waiting_for,
                cycles,
            } => {
                assert_eq!(waiting_for, "pred_valid status");
                assert_eq!(cycles, 3);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }
}
