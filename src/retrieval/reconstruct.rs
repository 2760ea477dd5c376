//! Full proof reconstruction from a shared skeleton and a node's partial path.

use crate::domain::{AggregationRecord, ChainpointProof, HashIdCore, HashIdNode};

/// Splice the node's partial proof path in front of the skeleton's first branch.
///
/// Works on a copy; the skeleton stays untouched so it can serve every node
/// id that maps to the same core id. Returns `None` when the skeleton has no
/// branches, the record belongs to another core id, or no entry matches.
pub fn build_full_proof(
    hash_id_node: &HashIdNode,
    hash_id_core: &HashIdCore,
    skeleton: &ChainpointProof,
    record: &AggregationRecord,
) -> Option<ChainpointProof> {
    if skeleton.branches.is_empty() || record.hash_id_core != hash_id_core.as_str() {
        return None;
    }
    let entry = record.entry_for(hash_id_node)?;

    let mut proof = skeleton.clone();
    proof.hash_id_node = Some(hash_id_node.to_string());
    proof.hash_submitted_node_at = hash_id_node.submitted_at_iso8601();
    proof.hash = Some(entry.hash.clone());

    let branch = proof.first_branch_mut()?;
    let original = std::mem::take(&mut branch.ops);
    branch.ops = entry
        .partial_proof_path
        .iter()
        .cloned()
        .chain(original)
        .collect();

    Some(proof)
}
