//! Property-based test generators using proptest.

use proptest::prelude::*;
use waitdie_core::ResourceId;

/// Strategy for a pair of (requester, holder) timestamps, ties included.
pub fn timestamp_pair_strategy() -> impl Strategy<Value = (u64, u64)> {
    prop_oneof![
        (1u64..10_000, 1u64..10_000),
        (1u64..10_000).prop_map(|t| (t, t)),
    ]
}

/// Strategy for `n` distinct timestamps in arbitrary order.
pub fn distinct_timestamps_strategy(n: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::hash_set(1u64..1_000_000, n)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// Strategy for a short list of distinct resource names.
pub fn resource_names_strategy() -> impl Strategy<Value = Vec<ResourceId>> {
    prop::collection::hash_set("[A-Z]{1,3}", 1..5).prop_map(|set| {
        let mut names: Vec<_> = set.into_iter().map(ResourceId::from).collect();
        names.sort();
        names
    })
}

/// A single-threaded lock operation for model-based tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOp {
    /// Transaction at index `txn` acquires resource at index `resource`.
    Acquire {
        /// Transaction index.
        txn: usize,
        /// Resource index.
        resource: usize,
    },
    /// Transaction at index `txn` releases resource at index `resource`.
    Release {
        /// Transaction index.
        txn: usize,
        /// Resource index.
        resource: usize,
    },
    /// Transaction at index `txn` unwinds and restarts if it is aborted.
    Recover {
        /// Transaction index.
        txn: usize,
    },
}

/// Strategy for sequences of lock operations over `txns` transactions and
/// `resources` resources.
pub fn lock_ops_strategy(
    txns: usize,
    resources: usize,
    len: usize,
) -> impl Strategy<Value = Vec<LockOp>> {
    let op = prop_oneof![
        4 => (0..txns, 0..resources).prop_map(|(txn, resource)| LockOp::Acquire { txn, resource }),
        3 => (0..txns, 0..resources).prop_map(|(txn, resource)| LockOp::Release { txn, resource }),
        1 => (0..txns).prop_map(|txn| LockOp::Recover { txn }),
    ];
    prop::collection::vec(op, 1..len)
}
