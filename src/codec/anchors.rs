//! Anchor completion classification.

use serde::{Deserialize, Serialize};

use crate::domain::ChainpointProof;

/// An anchoring stage a proof can reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorType {
    /// Calendar
    Cal,
    /// Ethereum
    Eth,
    /// Bitcoin
    Btc,
}

impl AnchorType {
    const ALL: [AnchorType; 3] = [AnchorType::Cal, AnchorType::Eth, AnchorType::Btc];

    /// Label of the branch that proves this stage.
    pub fn branch_label(&self) -> &'static str {
        match self {
            AnchorType::Cal => "cal_anchor_branch",
            AnchorType::Eth => "eth_anchor_branch",
            AnchorType::Btc => "btc_anchor_branch",
        }
    }
}

/// Stages present anywhere in the proof's branch tree, in `cal, eth, btc` order.
pub fn parse_anchors_complete(proof: &ChainpointProof) -> Vec<AnchorType> {
    let labels = proof.branch_labels();
    AnchorType::ALL
        .into_iter()
        .filter(|anchor| labels.contains(&anchor.branch_label()))
        .collect()
}
