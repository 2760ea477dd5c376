//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

use proptest::prelude::*;
use serde_json::json;
use uuid::{NoContext, Timestamp, Uuid};

use proof_gateway::codec::{ChainpointBinaryCodec, ProofCodec};
use proof_gateway::domain::{
    AggregationRecord, ChainpointProof, CoreLocation, HashIdCore, HashIdNode, ProofOp, ShardHost,
};
use proof_gateway::retrieval::{build_full_proof, normalize_header_ids, plan_batches};

// ============================================================================
// Custom Strategies
// ============================================================================

/// Version 1 node id with a random timestamp and node field
fn arb_node_id() -> impl Strategy<Value = HashIdNode> {
    (1_000_000_000u64..2_000_000_000, any::<[u8; 6]>()).prop_map(|(secs, node)| {
        let ts = Timestamp::from_unix(NoContext, secs, 0);
        HashIdNode::from_uuid(Uuid::new_v1(ts, &node)).unwrap()
    })
}

/// Distinct core locations spread over a handful of hosts
fn arb_locations() -> impl Strategy<Value = Vec<CoreLocation>> {
    prop::collection::vec(0usize..4, 0..600).prop_map(|hosts| {
        hosts
            .into_iter()
            .enumerate()
            .map(|(i, host)| {
                CoreLocation::new(
                    HashIdCore::new(format!("core-{i}")),
                    ShardHost::new(format!("h{host}")),
                )
            })
            .collect()
    })
}

fn arb_op() -> impl Strategy<Value = ProofOp> {
    prop_oneof![
        "[0-9a-f]{8,64}".prop_map(ProofOp::left),
        "[0-9a-f]{8,64}".prop_map(ProofOp::right),
        Just(ProofOp::hash("sha-256")),
    ]
}

fn skeleton(ops: &[ProofOp]) -> ChainpointProof {
    serde_json::from_value(json!({
        "@context": "https://w3id.org/chainpoint/v3",
        "type": "Chainpoint",
        "hash_id_core": "b1",
        "branches": [{"label": "cal_anchor_branch", "ops": ops}]
    }))
    .unwrap()
}

fn record(node: &HashIdNode, hash: &str, path: &[ProofOp]) -> AggregationRecord {
    serde_json::from_value(json!({
        "hash_id_core": "b1",
        "proof_data": [{
            "hash_id": node.to_string(),
            "hash": hash,
            "partial_proof_path": path
        }]
    }))
    .unwrap()
}

// ============================================================================
// Batch planning
// ============================================================================

proptest! {
    #[test]
    fn prop_batches_cover_every_location_once(
        locations in arb_locations(),
        batch_size in 1usize..300,
    ) {
        let batches = plan_batches(&locations, batch_size);

        let total: usize = batches.iter().map(|b| b.hash_id_cores.len()).sum();
        prop_assert_eq!(total, locations.len());

        for batch in &batches {
            prop_assert!(!batch.hash_id_cores.is_empty());
            prop_assert!(batch.hash_id_cores.len() <= batch_size);
        }
    }

    #[test]
    fn prop_batches_keep_per_host_order(
        locations in arb_locations(),
        batch_size in 1usize..300,
    ) {
        let batches = plan_batches(&locations, batch_size);

        let mut hosts: Vec<&ShardHost> = Vec::new();
        for location in &locations {
            if !hosts.contains(&&location.shard_host) {
                hosts.push(&location.shard_host);
            }
        }

        for host in hosts {
            let expected: Vec<&HashIdCore> = locations
                .iter()
                .filter(|l| &l.shard_host == host)
                .map(|l| &l.hash_id_core)
                .collect();
            let host_batches: Vec<_> = batches.iter().filter(|b| &b.shard_host == host).collect();
            let planned: Vec<&HashIdCore> = host_batches
                .iter()
                .flat_map(|b| b.hash_id_cores.iter())
                .collect();
            prop_assert_eq!(planned, expected);

            // only the last batch of a host may be short
            for batch in host_batches.iter().rev().skip(1) {
                prop_assert_eq!(batch.hash_id_cores.len(), batch_size);
            }
        }
    }
}

// ============================================================================
// Proof reconstruction
// ============================================================================

proptest! {
    #[test]
    fn prop_full_proof_is_partial_path_then_skeleton(
        node in arb_node_id(),
        hash in "[0-9a-f]{64}",
        partial in prop::collection::vec(arb_op(), 0..8),
        ops in prop::collection::vec(arb_op(), 1..8),
    ) {
        let skeleton = skeleton(&ops);
        let record = record(&node, &hash, &partial);

        let proof = build_full_proof(&node, &HashIdCore::new("b1"), &skeleton, &record).unwrap();

        let expected: Vec<ProofOp> = partial.iter().chain(ops.iter()).cloned().collect();
        prop_assert_eq!(&proof.branches[0].ops, &expected);
        prop_assert_eq!(proof.hash.as_deref(), Some(hash.as_str()));
        prop_assert_eq!(proof.hash_id_node, Some(node.to_string()));
        prop_assert_eq!(proof.hash_submitted_node_at, node.submitted_at_iso8601());
        prop_assert_eq!(proof.hash_id_core, skeleton.hash_id_core);
    }

    #[test]
    fn prop_reconstruction_does_not_leak_between_nodes(
        first in arb_node_id(),
        second in arb_node_id(),
        ops in prop::collection::vec(arb_op(), 1..8),
        partial in prop::collection::vec(arb_op(), 1..8),
    ) {
        prop_assume!(first != second);
        let skeleton = skeleton(&ops);
        let core = HashIdCore::new("b1");

        let a = build_full_proof(&first, &core, &skeleton, &record(&first, "aa", &partial)).unwrap();
        let b = build_full_proof(&second, &core, &skeleton, &record(&second, "bb", &[])).unwrap();

        prop_assert_eq!(a.branches[0].ops.len(), partial.len() + ops.len());
        prop_assert_eq!(&b.branches[0].ops, &ops);
        prop_assert_eq!(&skeleton.branches[0].ops, &ops);
    }

    #[test]
    fn prop_reconstruction_is_idempotent(
        node in arb_node_id(),
        partial in prop::collection::vec(arb_op(), 0..8),
        ops in prop::collection::vec(arb_op(), 1..8),
    ) {
        let codec = ChainpointBinaryCodec::new();
        let skeleton = skeleton(&ops);
        let record = record(&node, "cafe", &partial);
        let core = HashIdCore::new("b1");

        let first = build_full_proof(&node, &core, &skeleton, &record).unwrap();
        let second = build_full_proof(&node, &core, &skeleton, &record).unwrap();

        prop_assert_eq!(
            codec.encode_base64(&first).unwrap(),
            codec.encode_base64(&second).unwrap()
        );
        prop_assert_eq!(skeleton.branches[0].ops.len(), ops.len());
    }

    #[test]
    fn prop_binary_codec_preserves_full_proofs(
        node in arb_node_id(),
        partial in prop::collection::vec(arb_op(), 0..8),
        ops in prop::collection::vec(arb_op(), 1..8),
    ) {
        let codec = ChainpointBinaryCodec::new();
        let proof = build_full_proof(
            &node,
            &HashIdCore::new("b1"),
            &skeleton(&ops),
            &record(&node, "cafe", &partial),
        )
        .unwrap();

        let encoded = codec.encode_base64(&proof).unwrap();
        prop_assert_eq!(codec.decode_base64(&encoded).unwrap(), proof);
    }
}

// ============================================================================
// Request normalization
// ============================================================================

proptest! {
    #[test]
    fn prop_header_ids_keep_order_and_count(
        ids in prop::collection::vec(arb_node_id(), 1..20),
        pad in " {0,3}",
    ) {
        let header = ids
            .iter()
            .map(|id| format!("{pad}{id}{pad}"))
            .collect::<Vec<_>>()
            .join(",");

        let parsed = normalize_header_ids(Some(&header), 250).unwrap();
        prop_assert_eq!(parsed, ids);
    }

    #[test]
    fn prop_header_rejects_past_limit(
        ids in prop::collection::vec(arb_node_id(), 2..20),
    ) {
        let header = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        let limit = ids.len() - 1;

        let err = normalize_header_ids(Some(&header), limit).unwrap_err();
        prop_assert_eq!(
            err.to_string(),
            format!("invalid request, too many hash ids ({limit} max)")
        );
    }
}
