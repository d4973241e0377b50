//! Cycle-accurate simulation of the tile's command protocol and evaluator.
//!
//! The engine is a synchronous state machine: [`Engine::posedge`] advances
//! exactly one clock and returns the registered outputs (result byte and
//! status bits) as they would appear after that edge. All buffers and flags
//! live in the struct; there is no global state.
//!
//! Protocol summary:
//!
//! - A command byte is sampled on the posedge where the strobe rises while
//!   the engine is ready. Bytes arriving while busy are dropped silently.
//! - MODEL bytes fill the 36-byte image buffer; the 36th sets `model_loaded`.
//!   Further MODEL bytes are absorbed without effect.
//! - FEATURE bytes fill the 8-slot vector; overflow behavior is a
//!   configuration point ([`FeatureOverflow`]).
//! - CTRL 0x01 (RUN) starts the tree walk, one comparison per cycle, with
//!   `busy=1`/`ready=0` until the leaf byte is latched. RUN without a loaded
//!   model and a complete vector raises the sticky error bit instead.
//! - CTRL 0x02 (CLEAR) rearms feature and prediction state; whether it also
//!   drops the model is a configuration point ([`ClearMode`]).

use tophat_chip::cmd;
use tophat_chip::features::FEATURE_COUNT;
use tophat_chip::image::{
    NodeRecord, LEAF_BASE, LEAF_REGION_OFFSET, MODEL_IMAGE_BYTES, NODE_RECORD_BYTES, TREE_DEPTH,
};
use tophat_chip::status::Status;

/// What CLEAR does to the model buffer.
///
/// Observed host behavior admits both readings: hosts that reload the model
/// each cycle want [`ClearMode::Full`]; hosts that reuse a loaded model across
/// many predictions want [`ClearMode::FeaturesOnly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearMode {
    /// CLEAR also zeroes the model buffer and `model_loaded`.
    #[default]
    Full,
    /// CLEAR leaves the model buffer and `model_loaded` intact.
    FeaturesOnly,
}

/// What happens to FEATURE bytes sent beyond the 8th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureOverflow {
    /// The 3-bit write pointer wraps; a 9th byte overwrites slot 0.
    #[default]
    Wrap,
    /// The pointer saturates; excess bytes are dropped until RUN completion
    /// or CLEAR rearms the buffer.
    Reject,
}

/// Engine configuration points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// CLEAR scope.
    pub clear_mode: ClearMode,
    /// Feature buffer overflow policy.
    pub feature_overflow: FeatureOverflow,
}

/// Registered outputs after one clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSample {
    /// Result byte; meaningful only while `pred_valid` is set.
    pub result: u8,
    /// Raw status byte (engine bits \[7:3\], host bits driven 0).
    pub status_raw: u8,
}

impl PortSample {
    /// Decoded status view.
    #[must_use]
    pub const fn status(&self) -> Status {
        Status::from_raw(self.status_raw)
    }
}

/// One clock edge of the tile's wire interface.
///
/// The seam between the host link and a tile implementation — the in-process
/// [`Engine`] here, or a physical transport elsewhere.
pub trait TilePort {
    /// Advance one clock with the given payload and control lines asserted,
    /// returning the registered outputs after the edge.
    fn posedge(&mut self, payload: u8, control: u8) -> PortSample;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Idle,
    At { node: u8, depth: u8 },
}

/// The tile's engine: buffers, flags, and the protocol state machine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,

    model: [u8; MODEL_IMAGE_BYTES],
    model_offset: usize,
    model_loaded: bool,

    features: [u8; FEATURE_COUNT],
    feature_ptr: usize,
    features_valid: bool,

    pred_valid: bool,
    error: bool,
    result: u8,

    walk: Walk,
    prev_strobe: bool,
}

impl Engine {
    /// Post-reset engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Post-reset engine with explicit configuration points.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            model: [0; MODEL_IMAGE_BYTES],
            model_offset: 0,
            model_loaded: false,
            features: [0; FEATURE_COUNT],
            feature_ptr: 0,
            features_valid: false,
            pred_valid: false,
            error: false,
            result: 0,
            walk: Walk::Idle,
            prev_strobe: false,
        }
    }

    /// Hard reset: the universal initializer. Configuration survives.
    pub fn reset(&mut self) {
        *self = Self::with_config(self.config);
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> EngineConfig {
        self.config
    }

    /// Current status without advancing the clock.
    #[must_use]
    pub const fn status(&self) -> Status {
        Status {
            ready: matches!(self.walk, Walk::Idle),
            busy: !matches!(self.walk, Walk::Idle),
            pred_valid: self.pred_valid,
            model_loaded: self.model_loaded,
            error_or_missing_features: self.error,
        }
    }

    fn sample(&self) -> PortSample {
        PortSample {
            result: self.result,
            status_raw: self.status().to_raw(),
        }
    }

    fn node_record(&self, index: u8) -> NodeRecord {
        let base = index as usize * NODE_RECORD_BYTES;
        NodeRecord::decode([
            self.model[base],
            self.model[base + 1],
            self.model[base + 2],
            self.model[base + 3],
        ])
    }

    /// One comparison of the in-flight walk.
    fn step_walk(&mut self, node: u8, depth: u8) {
        let next = self.node_record(node).select(&self.features);
        let depth = depth + 1;

        if next >= LEAF_BASE {
            self.finish_walk(self.model[LEAF_REGION_OFFSET + (next - LEAF_BASE) as usize]);
        } else if depth as usize >= TREE_DEPTH {
            // A well-formed image reaches a leaf in exactly TREE_DEPTH steps;
            // a malformed one must not stall the engine. Read the leaf slot
            // the cursor's low bits address and complete.
            self.finish_walk(self.model[LEAF_REGION_OFFSET + (next & 0x07) as usize]);
        } else {
            self.walk = Walk::At { node: next, depth };
        }
    }

    fn finish_walk(&mut self, leaf: u8) {
        self.result = leaf;
        self.pred_valid = true;
        self.walk = Walk::Idle;
    }

    fn accept(&mut self, selector: u8, payload: u8) {
        match selector {
            cmd::selector::MODEL => self.accept_model(payload),
            cmd::selector::FEATURE => self.accept_feature(payload),
            cmd::selector::CTRL => match payload {
                cmd::ctrl::RUN => self.begin_run(),
                cmd::ctrl::CLEAR => self.clear(),
                _ => {}
            },
            // Selector 0b11 is reserved; the byte is dropped.
            _ => {}
        }
    }

    fn accept_model(&mut self, payload: u8) {
        if self.model_offset < MODEL_IMAGE_BYTES {
            self.model[self.model_offset] = payload;
            self.model_offset += 1;
            if self.model_offset == MODEL_IMAGE_BYTES {
                self.model_loaded = true;
            }
        }
        // Bytes past the 36th are absorbed without effect.
    }

    fn accept_feature(&mut self, payload: u8) {
        match self.config.feature_overflow {
            FeatureOverflow::Wrap => {
                self.features[self.feature_ptr] = payload;
                self.feature_ptr = (self.feature_ptr + 1) % FEATURE_COUNT;
                if self.feature_ptr == 0 {
                    self.features_valid = true;
                }
            }
            FeatureOverflow::Reject => {
                if self.feature_ptr < FEATURE_COUNT {
                    self.features[self.feature_ptr] = payload;
                    self.feature_ptr += 1;
                    if self.feature_ptr == FEATURE_COUNT {
                        self.features_valid = true;
                    }
                }
            }
        }
    }

    fn begin_run(&mut self) {
        if self.model_loaded && self.features_valid {
            self.pred_valid = false;
            self.error = false;
            // Rearm the feature pointer so the next vector starts at slot 0;
            // the buffered vector stays valid for repeated RUNs.
            self.feature_ptr = 0;
            self.walk = Walk::At { node: 0, depth: 0 };
        } else {
            self.error = true;
            // pred_valid is left as-is: stale or unset.
        }
    }

    fn clear(&mut self) {
        self.feature_ptr = 0;
        self.features_valid = false;
        self.pred_valid = false;
        self.error = false;
        self.result = 0;
        if self.config.clear_mode == ClearMode::Full {
            self.model = [0; MODEL_IMAGE_BYTES];
            self.model_offset = 0;
            self.model_loaded = false;
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl TilePort for Engine {
    fn posedge(&mut self, payload: u8, control: u8) -> PortSample {
        let strobe = cmd::strobe_of(control);
        let rising = strobe && !self.prev_strobe;
        self.prev_strobe = strobe;

        if let Walk::At { node, depth } = self.walk {
            // Busy: the walk advances and any command byte is dropped.
            self.step_walk(node, depth);
        } else if rising {
            self.accept(cmd::selector_of(control), payload);
        }

        self.sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tophat_chip::image::ModelImage;

    fn strobed(engine: &mut Engine, selector: u8, payload: u8) -> PortSample {
        let sample = engine.posedge(payload, cmd::assert_byte(selector));
        engine.posedge(0, 0);
        sample
    }

    fn flat_image(leaf: u8) -> [u8; MODEL_IMAGE_BYTES] {
        // Every internal node routes left to the next index; leaves all equal.
        let mut bytes = [0u8; MODEL_IMAGE_BYTES];
        for i in 0..7 {
            let record = NodeRecord {
                feature_index: 0,
                threshold: 255,
                left_child: u8::try_from(2 * i + 1).unwrap(),
                right_child: u8::try_from(2 * i + 2).unwrap(),
            };
            bytes[i * 4..i * 4 + 4].copy_from_slice(&record.encode());
        }
        for slot in bytes[LEAF_REGION_OFFSET..].iter_mut() {
            *slot = leaf;
        }
        bytes
    }

    fn load_model(engine: &mut Engine, image: &[u8; MODEL_IMAGE_BYTES]) {
        for &byte in image {
            strobed(engine, cmd::selector::MODEL, byte);
        }
    }

    fn load_features(engine: &mut Engine, vector: &[u8; FEATURE_COUNT]) {
        for &byte in vector {
            strobed(engine, cmd::selector::FEATURE, byte);
        }
    }

    fn run_until_valid(engine: &mut Engine) -> PortSample {
        strobed(engine, cmd::selector::CTRL, cmd::ctrl::RUN);
        for _ in 0..16 {
            let sample = engine.posedge(0, 0);
            if sample.status().pred_valid {
                return sample;
            }
        }
        panic!("walk did not complete");
    }

    #[test]
    fn reset_state_is_idle_ready() {
        let engine = Engine::new();
        let status = engine.status();
        assert!(status.ready);
        assert!(!status.busy);
        assert!(!status.pred_valid);
        assert!(!status.model_loaded);
        assert!(!status.error_or_missing_features);
    }

    #[test]
    fn model_loaded_latches_on_36th_byte() {
        let mut engine = Engine::new();
        let image = flat_image(7);
        for (i, &byte) in image.iter().enumerate() {
            assert!(!engine.status().model_loaded, "premature latch at byte {i}");
            strobed(&mut engine, cmd::selector::MODEL, byte);
        }
        assert!(engine.status().model_loaded);
    }

    #[test]
    fn extra_model_bytes_are_absorbed() {
        let mut engine = Engine::new();
        load_model(&mut engine, &flat_image(42));
        strobed(&mut engine, cmd::selector::MODEL, 0xAA);
        load_features(&mut engine, &[0; 8]);
        assert_eq!(run_until_valid(&mut engine).result, 42);
    }

    #[test]
    fn held_strobe_is_sampled_once() {
        let mut engine = Engine::new();
        let control = cmd::assert_byte(cmd::selector::MODEL);
        // Hold the strobe for three cycles: one byte accepted, not three.
        engine.posedge(0x11, control);
        engine.posedge(0x11, control);
        engine.posedge(0x11, control);
        engine.posedge(0, 0);
        for _ in 0..(MODEL_IMAGE_BYTES - 1) {
            strobed(&mut engine, cmd::selector::MODEL, 0);
        }
        assert!(engine.status().model_loaded, "exactly 35 more bytes should complete the image");
    }

    #[test]
    fn run_without_model_raises_error_only() {
        let mut engine = Engine::new();
        load_features(&mut engine, &[1; 8]);
        let sample = strobed(&mut engine, cmd::selector::CTRL, cmd::ctrl::RUN);
        let status = sample.status();
        assert!(status.error_or_missing_features);
        assert!(!status.pred_valid);
        assert!(status.ready, "rejected RUN must not go busy");
    }

    #[test]
    fn run_with_partial_features_raises_error() {
        let mut engine = Engine::new();
        load_model(&mut engine, &flat_image(9));
        for byte in 0..5u8 {
            strobed(&mut engine, cmd::selector::FEATURE, byte);
        }
        let sample = strobed(&mut engine, cmd::selector::CTRL, cmd::ctrl::RUN);
        assert!(sample.status().error_or_missing_features);
        assert!(!sample.status().pred_valid);
    }

    #[test]
    fn successful_run_clears_sticky_error() {
        let mut engine = Engine::new();
        strobed(&mut engine, cmd::selector::CTRL, cmd::ctrl::RUN);
        assert!(engine.status().error_or_missing_features);

        load_model(&mut engine, &flat_image(3));
        load_features(&mut engine, &[0; 8]);
        let sample = run_until_valid(&mut engine);
        assert!(!sample.status().error_or_missing_features);
        assert_eq!(sample.result, 3);
    }

    #[test]
    fn busy_cycles_are_observable_and_commands_drop() {
        let mut engine = Engine::new();
        load_model(&mut engine, &flat_image(5));
        load_features(&mut engine, &[0; 8]);

        let accepted = strobed(&mut engine, cmd::selector::CTRL, cmd::ctrl::RUN);
        assert!(accepted.status().busy);
        assert!(!accepted.status().ready);

        // A CLEAR issued while busy must be dropped.
        let during = engine.posedge(cmd::ctrl::CLEAR, cmd::assert_byte(cmd::selector::CTRL));
        let mut sample = during;
        while !sample.status().pred_valid {
            sample = engine.posedge(0, 0);
        }
        assert_eq!(sample.result, 5, "dropped CLEAR must not disturb the walk");
        assert!(sample.status().pred_valid);
    }

    #[test]
    fn feature_wrap_policy_rolls_over() {
        let mut engine = Engine::with_config(EngineConfig {
            feature_overflow: FeatureOverflow::Wrap,
            ..EngineConfig::default()
        });
        let mut image = flat_image(0);
        // Route on feature 0: threshold 10, low leaf 1, high leaf 2.
        image[0..4].copy_from_slice(
            &NodeRecord { feature_index: 0, threshold: 10, left_child: 7, right_child: 8 }.encode(),
        );
        image[LEAF_REGION_OFFSET] = 1;
        image[LEAF_REGION_OFFSET + 1] = 2;
        load_model(&mut engine, &image);

        // 8 low bytes then one overflow byte that wraps onto slot 0.
        load_features(&mut engine, &[0; 8]);
        strobed(&mut engine, cmd::selector::FEATURE, 200);
        assert_eq!(run_until_valid(&mut engine).result, 2, "wrapped byte lands in slot 0");
    }

    #[test]
    fn feature_reject_policy_drops_overflow() {
        let mut engine = Engine::with_config(EngineConfig {
            feature_overflow: FeatureOverflow::Reject,
            ..EngineConfig::default()
        });
        let mut image = flat_image(0);
        image[0..4].copy_from_slice(
            &NodeRecord { feature_index: 0, threshold: 10, left_child: 7, right_child: 8 }.encode(),
        );
        image[LEAF_REGION_OFFSET] = 1;
        image[LEAF_REGION_OFFSET + 1] = 2;
        load_model(&mut engine, &image);

        load_features(&mut engine, &[0; 8]);
        strobed(&mut engine, cmd::selector::FEATURE, 200);
        assert_eq!(run_until_valid(&mut engine).result, 1, "overflow byte must be dropped");
    }

    #[test]
    fn clear_full_drops_model() {
        let mut engine = Engine::with_config(EngineConfig {
            clear_mode: ClearMode::Full,
            ..EngineConfig::default()
        });
        load_model(&mut engine, &flat_image(1));
        strobed(&mut engine, cmd::selector::CTRL, cmd::ctrl::CLEAR);
        assert!(!engine.status().model_loaded);

        let sample = strobed(&mut engine, cmd::selector::CTRL, cmd::ctrl::RUN);
        assert!(sample.status().error_or_missing_features);
    }

    #[test]
    fn clear_features_only_keeps_model() {
        let mut engine = Engine::with_config(EngineConfig {
            clear_mode: ClearMode::FeaturesOnly,
            ..EngineConfig::default()
        });
        load_model(&mut engine, &flat_image(11));
        load_features(&mut engine, &[0; 8]);
        assert_eq!(run_until_valid(&mut engine).result, 11);

        strobed(&mut engine, cmd::selector::CTRL, cmd::ctrl::CLEAR);
        assert!(engine.status().model_loaded);
        assert!(!engine.status().pred_valid);

        load_features(&mut engine, &[0; 8]);
        assert_eq!(run_until_valid(&mut engine).result, 11);
    }

    #[test]
    fn engine_walk_matches_reference_evaluate() {
        let mut engine = Engine::new();
        let mut bytes = flat_image(0);
        // An asymmetric tree exercising all three levels.
        let nodes = [
            NodeRecord { feature_index: 2, threshold: 24, left_child: 1, right_child: 2 },
            NodeRecord { feature_index: 0, threshold: 8, left_child: 3, right_child: 4 },
            NodeRecord { feature_index: 7, threshold: 35, left_child: 5, right_child: 6 },
            NodeRecord { feature_index: 4, threshold: 20, left_child: 7, right_child: 8 },
            NodeRecord { feature_index: 1, threshold: 20, left_child: 9, right_child: 10 },
            NodeRecord { feature_index: 6, threshold: 40, left_child: 11, right_child: 12 },
            NodeRecord { feature_index: 3, threshold: 28, left_child: 13, right_child: 14 },
        ];
        for (i, node) in nodes.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&node.encode());
        }
        for (i, slot) in bytes[LEAF_REGION_OFFSET..].iter_mut().enumerate() {
            *slot = u8::try_from(i).unwrap() * 17 + 1;
        }
        let image = ModelImage::new(bytes);

        load_model(&mut engine, &bytes);
        for vector in [[0u8; 8], [255; 8], [4, 6, 10, 12, 15, 20, 10, 18], [24, 30, 55, 40, 30, 25, 55, 50]] {
            load_features(&mut engine, &vector);
            let got = run_until_valid(&mut engine).result;
            assert_eq!(got, image.evaluate(&vector));
        }
    }
}
