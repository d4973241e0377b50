//! Demo model and canonical fixture set.
//!
//! The reference workload for the tile is an opening-weekend box-office
//! predictor: eight coarse movie features in, revenue in $M out. The tree
//! below is the model every conformance fixture was generated against.
//!
//! | Node | Split | Left | Right |
//! |------|-------|------|-------|
//! | 0 | `franchise_strength <= 24` | 1 | 2 |
//! | 1 | `budget_10m <= 8` | 3 | 4 |
//! | 2 | `screen_count_100 <= 35` | 5 | 6 |
//! | 3 | `critic_buzz <= 20` | L0 | L1 |
//! | 4 | `marketing_5m <= 20` | L2 | L3 |
//! | 5 | `release_timing <= 40` | L4 | L5 |
//! | 6 | `star_power <= 28` | L6 | L7 |

use tophat_chip::features::{index, FEATURE_COUNT};

use crate::error::Result;
use crate::tree::{DecisionTree, TreeBuilder};

/// Leaf predictions L0–L7 of the box-office demo tree ($M).
pub const BOX_OFFICE_LEAVES: [u8; 8] = [8, 18, 25, 45, 55, 85, 95, 140];

/// Build the box-office demo tree.
///
/// # Errors
///
/// Never fails in practice; the `Result` is the builder's contract.
pub fn box_office_tree() -> Result<DecisionTree> {
    let mut builder = TreeBuilder::new()
        .node(0, index::FRANCHISE_STRENGTH, 24, 1, 2)
        .node(1, index::BUDGET_10M, 8, 3, 4)
        .node(2, index::SCREEN_COUNT_100, 35, 5, 6)
        .node(3, index::CRITIC_BUZZ, 20, 7, 8)
        .node(4, index::MARKETING_5M, 20, 9, 10)
        .node(5, index::RELEASE_TIMING, 40, 11, 12)
        .node(6, index::STAR_POWER, 28, 13, 14);
    for (slot, &value) in BOX_OFFICE_LEAVES.iter().enumerate() {
        builder = builder.leaf(slot, value);
    }
    builder.build()
}

/// One canonical end-to-end case: named feature vector plus the byte the
/// tile must produce for it.
#[derive(Debug, Clone, Copy)]
pub struct ExampleCase {
    /// Human-readable case name.
    pub name: &'static str,
    /// Feature vector in wire order.
    pub features: [u8; FEATURE_COUNT],
    /// Expected prediction byte.
    pub expected: u8,
}

/// The canonical fixture set for the box-office tree.
///
/// Feature order: `budget_10m, marketing_5m, franchise_strength, star_power,
/// critic_buzz, family_friendliness, release_timing, screen_count_100`.
pub const EXAMPLES: [ExampleCase; 8] = [
    ExampleCase {
        name: "Indie Mystery",
        features: [4, 6, 10, 12, 15, 20, 10, 18],
        expected: 8,
    },
    ExampleCase {
        name: "Festival Darling",
        features: [4, 6, 10, 12, 30, 20, 10, 18],
        expected: 18,
    },
    ExampleCase {
        name: "Mid-Budget Original",
        features: [12, 10, 10, 18, 18, 30, 22, 20],
        expected: 25,
    },
    ExampleCase {
        name: "Wide Release Original",
        features: [12, 28, 10, 22, 18, 30, 22, 20],
        expected: 45,
    },
    ExampleCase {
        name: "Modest Sequel (Off-Peak)",
        features: [18, 18, 40, 22, 18, 25, 30, 30],
        expected: 55,
    },
    ExampleCase {
        name: "Summer Sequel",
        features: [18, 22, 40, 22, 18, 25, 50, 30],
        expected: 85,
    },
    ExampleCase {
        name: "Big Franchise (Modest Stars)",
        features: [20, 26, 40, 20, 20, 25, 50, 45],
        expected: 95,
    },
    ExampleCase {
        name: "Mega Franchise Event",
        features: [24, 30, 55, 40, 30, 25, 55, 50],
        expected: 140,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_tree_builds() {
        assert!(box_office_tree().is_ok());
    }

    #[test]
    fn demo_tree_predicts_every_fixture() {
        let tree = box_office_tree().unwrap();
        for case in &EXAMPLES {
            assert_eq!(
                tree.predict(&case.features),
                case.expected,
                "{} predicted wrong",
                case.name
            );
        }
    }

    #[test]
    fn demo_image_bytes_are_stable() {
        // The exact wire image: 7 node records then 8 leaf bytes.
        let expected: [u8; 36] = [
            0x02, 24, 0x01, 0x02, // node 0: franchise_strength <= 24
            0x00, 8, 0x03, 0x04, // node 1: budget_10m <= 8
            0x07, 35, 0x05, 0x06, // node 2: screen_count_100 <= 35
            0x04, 20, 0x07, 0x08, // node 3: critic_buzz <= 20
            0x01, 20, 0x09, 0x0A, // node 4: marketing_5m <= 20
            0x06, 40, 0x0B, 0x0C, // node 5: release_timing <= 40
            0x03, 28, 0x0D, 0x0E, // node 6: star_power <= 28
            8, 18, 25, 45, 55, 85, 95, 140, // leaves L0-L7
        ];
        let image = box_office_tree().unwrap().encode();
        assert_eq!(image.as_bytes(), &expected);
    }

    #[test]
    fn fixtures_cover_every_leaf() {
        let mut hit = [false; 8];
        for case in &EXAMPLES {
            let slot = BOX_OFFICE_LEAVES
                .iter()
                .position(|&v| v == case.expected)
                .expect("expected value must be a leaf");
            hit[slot] = true;
        }
        assert!(hit.iter().all(|&h| h), "each leaf should be reachable by a fixture");
    }
}
