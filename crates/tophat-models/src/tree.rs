//! Arena decision trees and their 36-byte wire encoding.
//!
//! A [`DecisionTree`] is the producer-side view of a tile model: a flat
//! 15-slot arena (indices 0–6 internal, 7–14 leaves) with every field
//! validated against the wire format's bit widths at construction, so a
//! malformed image cannot be produced. The tile itself never validates —
//! that contract lives here.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use tophat_chip::features::FEATURE_COUNT;
use tophat_chip::image::{
    ModelImage, NodeRecord, INTERNAL_NODES, LEAF_BASE, LEAF_COUNT, LEAF_REGION_OFFSET,
    MODEL_IMAGE_BYTES, NODE_RECORD_BYTES, TREE_DEPTH,
};

use crate::error::{ModelError, Result};

/// Highest addressable node index in the 15-slot arena.
const MAX_NODE_INDEX: u8 = (INTERNAL_NODES + LEAF_COUNT - 1) as u8;

/// A validated fixed-shape decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionTree {
    nodes: [NodeRecord; INTERNAL_NODES],
    leaves: [u8; LEAF_COUNT],
}

impl DecisionTree {
    /// Build from complete node and leaf arrays, validating field ranges.
    ///
    /// # Errors
    ///
    /// [`ModelError::FeatureRange`] or [`ModelError::ChildRange`] on any
    /// field that does not fit its wire encoding.
    pub fn from_parts(nodes: [NodeRecord; INTERNAL_NODES], leaves: [u8; LEAF_COUNT]) -> Result<Self> {
        for (index, node) in nodes.iter().enumerate() {
            if usize::from(node.feature_index) >= FEATURE_COUNT {
                return Err(ModelError::FeatureRange {
                    node: index,
                    feature: node.feature_index as usize,
                });
            }
            for child in [node.left_child, node.right_child] {
                if child > MAX_NODE_INDEX {
                    return Err(ModelError::ChildRange { node: index, child });
                }
            }
        }
        Ok(Self { nodes, leaves })
    }

    /// Encode to the 36-byte wire image.
    #[must_use]
    pub fn encode(&self) -> ModelImage {
        let mut bytes = [0u8; MODEL_IMAGE_BYTES];
        for (index, node) in self.nodes.iter().enumerate() {
            let base = index * NODE_RECORD_BYTES;
            bytes[base..base + NODE_RECORD_BYTES].copy_from_slice(&node.encode());
        }
        bytes[LEAF_REGION_OFFSET..].copy_from_slice(&self.leaves);
        ModelImage::new(bytes)
    }

    /// Decode a wire image back into a validated tree.
    ///
    /// # Errors
    ///
    /// [`ModelError::ChildRange`] if a child field addresses the unused
    /// 16th arena slot.
    pub fn decode(image: &ModelImage) -> Result<Self> {
        let mut nodes = [NodeRecord {
            feature_index: 0,
            threshold: 0,
            left_child: 0,
            right_child: 0,
        }; INTERNAL_NODES];
        for (index, node) in nodes.iter_mut().enumerate() {
            *node = image.node(index);
        }

        let mut leaves = [0u8; LEAF_COUNT];
        leaves.copy_from_slice(&image.as_bytes()[LEAF_REGION_OFFSET..]);

        Self::from_parts(nodes, leaves)
    }

    /// Internal-node record at `index` (0–6).
    ///
    /// # Errors
    ///
    /// [`ModelError::NodeIndex`] when out of range.
    pub fn node(&self, index: usize) -> Result<NodeRecord> {
        self.nodes
            .get(index)
            .copied()
            .ok_or(ModelError::NodeIndex { index })
    }

    /// Leaf value at leaf slot `index` (0–7).
    ///
    /// # Errors
    ///
    /// [`ModelError::LeafIndex`] when out of range.
    pub fn leaf(&self, index: usize) -> Result<u8> {
        self.leaves
            .get(index)
            .copied()
            .ok_or(ModelError::LeafIndex { index })
    }

    /// Reference prediction: walk the arena from node 0.
    ///
    /// Matches the tile bit for bit — the leaf byte is returned as-is, with
    /// no rounding or averaging at prediction time. The walk is bounded the
    /// same way the tile bounds it, so even a degenerate tree terminates.
    #[must_use]
    pub fn predict(&self, features: &[u8; FEATURE_COUNT]) -> u8 {
        let mut cursor = 0u8;
        for _ in 0..TREE_DEPTH {
            cursor = self.nodes[cursor as usize].select(features);
            if cursor >= LEAF_BASE {
                return self.leaves[(cursor - LEAF_BASE) as usize];
            }
        }
        self.leaves[(cursor & 0x07) as usize]
    }

    /// Write the wire image to a file.
    ///
    /// # Errors
    ///
    /// [`ModelError::Io`] on any filesystem failure.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.encode().as_bytes())?;
        info!("Wrote model image to {}", path.display());
        Ok(())
    }

    /// Read and validate a wire image from a file.
    ///
    /// # Errors
    ///
    /// [`ModelError::Io`] on filesystem failure, [`ModelError::ImageSize`]
    /// on a wrong-sized file, or a range error from [`Self::decode`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading model image from {}", path.display());
        let data = fs::read(path)?;
        let image = ModelImage::from_slice(&data).ok_or_else(|| ModelError::image_size(data.len()))?;
        Self::decode(&image)
    }
}

/// Incremental builder for [`DecisionTree`], validated at [`TreeBuilder::build`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<(usize, NodeRecord)>,
    leaves: Vec<(usize, u8)>,
}

impl TreeBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define internal node `index` splitting on `feature` at `threshold`,
    /// routing to `left` (feature ≤ threshold) or `right`.
    #[must_use]
    pub fn node(mut self, index: usize, feature: usize, threshold: u8, left: u8, right: u8) -> Self {
        self.nodes.push((
            index,
            NodeRecord {
                feature_index: u8::try_from(feature).unwrap_or(u8::MAX),
                threshold,
                left_child: left,
                right_child: right,
            },
        ));
        self
    }

    /// Define leaf slot `index` (0–7) with its prediction byte.
    #[must_use]
    pub fn leaf(mut self, index: usize, value: u8) -> Self {
        self.leaves.push((index, value));
        self
    }

    /// Validate completeness and field ranges, producing the tree.
    ///
    /// # Errors
    ///
    /// Index, duplicate, missing, or range errors as [`ModelError`].
    pub fn build(self) -> Result<DecisionTree> {
        let mut nodes: [Option<NodeRecord>; INTERNAL_NODES] = [None; INTERNAL_NODES];
        for (index, record) in self.nodes {
            if index >= INTERNAL_NODES {
                return Err(ModelError::NodeIndex { index });
            }
            if nodes[index].replace(record).is_some() {
                return Err(ModelError::DuplicateNode { index });
            }
        }

        let mut leaves: [Option<u8>; LEAF_COUNT] = [None; LEAF_COUNT];
        for (index, value) in self.leaves {
            if index >= LEAF_COUNT {
                return Err(ModelError::LeafIndex { index });
            }
            if leaves[index].replace(value).is_some() {
                return Err(ModelError::DuplicateLeaf { index });
            }
        }

        let mut node_array = [NodeRecord {
            feature_index: 0,
            threshold: 0,
            left_child: 0,
            right_child: 0,
        }; INTERNAL_NODES];
        for (index, slot) in nodes.iter().enumerate() {
            node_array[index] = slot.ok_or(ModelError::MissingNode { index })?;
        }

        let mut leaf_array = [0u8; LEAF_COUNT];
        for (index, slot) in leaves.iter().enumerate() {
            leaf_array[index] = slot.ok_or(ModelError::MissingLeaf { index })?;
        }

        DecisionTree::from_parts(node_array, leaf_array)
    }
}
