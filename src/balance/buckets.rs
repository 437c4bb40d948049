//! Stable partitioning of work items into buckets

use crate::balance::balancer::Balance;
use crate::balance::routing::Routable;
use crate::core::error::{BalanceError, BucketError};
use std::fmt::Debug;

/// Split `items` into exactly `buckets` buckets using `balancer`.
///
/// Every item lands in exactly one bucket and keeps its relative order.
/// Assignments are computed for the whole input before any item moves, so a
/// failing item leaves no partial output behind.
pub fn partition<T>(
    items: Vec<T>,
    buckets: usize,
    balancer: &dyn Balance,
) -> Result<Vec<Vec<T>>, BucketError>
where
    T: Routable + Debug,
{
    if buckets == 0 {
        return Err(BucketError {
            index: 0,
            item: String::from("<none>"),
            source: BalanceError::NoBuckets,
        });
    }

    let mut assignments = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let bucket = balancer
            .assign(item, buckets)
            .map_err(|source| BucketError {
                index,
                item: format!("{:?}", item),
                source,
            })?;
        assignments.push(bucket);
    }

    let mut out: Vec<Vec<T>> = (0..buckets).map(|_| Vec::new()).collect();
    for (item, bucket) in items.into_iter().zip(assignments) {
        out[bucket].push(item);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::Balancer;
    use proptest::prelude::*;

    fn hosts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("host_{:06}", i)).collect()
    }

    #[test]
    fn ten_hosts_over_three_workers() {
        let out = partition(hosts(10), 3, &Balancer::KeyId).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], ["host_000000", "host_000003", "host_000006", "host_000009"]);
        assert_eq!(out[1], ["host_000001", "host_000004", "host_000007"]);
        assert_eq!(out[2], ["host_000002", "host_000005", "host_000008"]);
    }

    #[test]
    fn empty_buckets_are_kept() {
        let out = partition(hosts(2), 5, &Balancer::KeyId).unwrap();
        assert_eq!(out.len(), 5);
        assert!(out[2..].iter().all(Vec::is_empty));
    }

    #[test]
    fn malformed_key_discards_everything() {
        let mut items = hosts(4);
        items.insert(2, "host_xyz".to_string());
        let err = partition(items, 2, &Balancer::KeyId).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(err.item.contains("host_xyz"));
        assert!(matches!(err.source, BalanceError::InvalidKey { .. }));
    }

    #[test]
    fn zero_buckets_is_rejected() {
        let err = partition(hosts(3), 0, &Balancer::Random).unwrap_err();
        assert_eq!(err.source, BalanceError::NoBuckets);
    }

    proptest! {
        #[test]
        fn partition_is_an_order_preserving_permutation(
            ids in prop::collection::vec(0u32..500, 0..200),
            buckets in 1usize..16,
        ) {
            let items: Vec<String> = ids.iter().map(|i| format!("host_{}", i)).collect();
            let out = partition(items.clone(), buckets, &Balancer::KeyHash).unwrap();
            prop_assert_eq!(out.len(), buckets);

            let mut flat: Vec<String> = out.iter().flatten().cloned().collect();
            let mut sorted = items.clone();
            flat.sort();
            sorted.sort();
            prop_assert_eq!(flat, sorted);

            // Each bucket is a subsequence of the input.
            for bucket in &out {
                let mut cursor = items.iter();
                for item in bucket {
                    prop_assert!(cursor.any(|x| x == item));
                }
            }
        }
    }
}
