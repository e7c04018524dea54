//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the capacity bound, statistics accuracy and key
//! determinism over arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheProvider, LocalStore};
use crate::config::CacheConfig;
use crate::keys;

// == Test Configuration ==
const TEST_DEFAULT_TTL: u64 = 300;

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_:]{1,16}".prop_map(|s| s)
}

/// Generates payloads
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of sets, L1 never holds more than its capacity and the
    // byte estimate matches the resident entries.
    #[test]
    fn prop_capacity_enforcement(
        max_keys in 0usize..20,
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let store = LocalStore::new(max_keys);
        let ttl = Duration::from_secs(TEST_DEFAULT_TTL);
        let mut resident: HashMap<String, String> = HashMap::new();

        for (key, value) in entries {
            if let Some(evicted) = store.set(&key, Arc::from(value.as_str()), ttl) {
                resident.remove(&evicted);
            }
            if max_keys > 0 {
                resident.insert(key, value);
            }
            prop_assert!(store.len() <= max_keys, "L1 size {} exceeds max {}", store.len(), max_keys);
        }

        let expected_bytes: usize = resident.iter().map(|(k, v)| k.len() + v.len()).sum();
        prop_assert_eq!(store.footprint(), (resident.len(), expected_bytes));
    }

    // For any sequence of operations, hits + misses equals requests and the
    // hit rate is hits / requests * 100.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let provider = CacheProvider::new(CacheConfig::local_only(8, TEST_DEFAULT_TTL), None);
        let mut expected_hits: u64 = 0;
        let mut expected_requests: u64 = 0;

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        provider.set(&key, &value, None).await.unwrap();
                    }
                    CacheOp::Get { key } => {
                        expected_requests += 1;
                        if provider.get::<String>(&key).await.is_some() {
                            expected_hits += 1;
                        }
                    }
                    CacheOp::Delete { key } => provider.delete(&key).await,
                }
            }
        });

        let stats = provider.stats();
        prop_assert_eq!(stats.total_requests, expected_requests);
        prop_assert_eq!(stats.total_hits, expected_hits);
        prop_assert_eq!(stats.total_hits + stats.total_misses, stats.total_requests);
        prop_assert!(stats.key_count <= 8);
        if expected_requests > 0 {
            let expected_rate = expected_hits as f64 / expected_requests as f64 * 100.0;
            prop_assert!((stats.hit_rate - expected_rate).abs() < 1e-9);
        }
    }

    // Member order never changes the generated key.
    #[test]
    fn prop_key_ignores_member_order(
        pairs in prop::collection::hash_map(valid_key_strategy(), any::<i64>(), 0..12)
    ) {
        let forward: HashMap<String, i64> = pairs.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let mut items: Vec<_> = pairs.into_iter().collect();
        items.reverse();
        let reversed: HashMap<String, i64> = items.into_iter().collect();

        prop_assert_eq!(keys::search(&forward).unwrap(), keys::search(&reversed).unwrap());
    }

    // Different filter sets map to different keys.
    #[test]
    fn prop_distinct_filters_distinct_keys(
        filters in prop::collection::hash_set(
            prop::collection::btree_map(valid_key_strategy(), valid_value_strategy(), 1..4),
            1..10
        )
    ) {
        let generated: HashSet<String> = filters.iter().map(|f| keys::search(f).unwrap()).collect();
        prop_assert_eq!(generated.len(), filters.len());
    }
}
