//! Proof objects as exchanged with shard hosts and clients.
//!
//! Only the fields the gateway writes are typed; everything else a shard
//! host puts on a proof or branch is carried through in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Chainpoint style proof: a hash plus a tree of operation branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainpointProof {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub proof_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_id_node: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_submitted_node_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_id_core: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_submitted_core_at: Option<String>,

    #[serde(default)]
    pub branches: Vec<ProofBranch>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChainpointProof {
    /// The branch whose ops are prefixed with a node's partial proof path.
    pub fn first_branch_mut(&mut self) -> Option<&mut ProofBranch> {
        self.branches.first_mut()
    }

    /// Depth-first walk over every branch label in the tree.
    pub fn branch_labels(&self) -> Vec<&str> {
        let mut labels = Vec::new();
        for branch in &self.branches {
            branch.collect_labels(&mut labels);
        }
        labels
    }
}

/// A labelled list of operations, optionally with nested branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofBranch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub ops: Vec<ProofOp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<ProofBranch>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProofBranch {
    fn collect_labels<'a>(&'a self, labels: &mut Vec<&'a str>) {
        if let Some(label) = &self.label {
            labels.push(label);
        }
        for branch in self.branches.iter().flatten() {
            branch.collect_labels(labels);
        }
    }
}

/// One step of a proof path.
///
/// Keys beside the one that selects the variant land in `extra`, so an op
/// is written back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofOp {
    /// Prepend a value
    Left {
        l: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Append a value
    Right {
        r: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Apply a hash function, e.g. `sha-256`
    Hash {
        op: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Anchor attestation
    Anchors {
        anchors: Vec<Anchor>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Anything this gateway does not interpret
    Other(Value),
}

impl ProofOp {
    pub fn left(value: impl Into<String>) -> Self {
        ProofOp::Left {
            l: value.into(),
            extra: Map::new(),
        }
    }

    pub fn right(value: impl Into<String>) -> Self {
        ProofOp::Right {
            r: value.into(),
            extra: Map::new(),
        }
    }

    pub fn hash(function: impl Into<String>) -> Self {
        ProofOp::Hash {
            op: function.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(rename = "type")]
    pub anchor_type: String,

    pub anchor_id: String,

    /// `uris`, `expected_value` and anything else an anchor carries
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Node-local aggregation data for one core proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRecord {
    pub hash_id_core: String,

    #[serde(default)]
    pub proof_data: Vec<PartialProofEntry>,
}

impl AggregationRecord {
    /// Entry for a node id, if this record covers it.
    pub fn entry_for(&self, hash_id_node: &crate::domain::HashIdNode) -> Option<&PartialProofEntry> {
        self.proof_data
            .iter()
            .find(|entry| hash_id_node.matches(&entry.hash_id))
    }
}

/// The node-specific prefix of a proof path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialProofEntry {
    pub hash_id: String,

    pub hash: String,

    #[serde(default)]
    pub partial_proof_path: Vec<ProofOp>,
}
