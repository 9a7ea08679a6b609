//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine against a plain `Vec` reference model.

use proptest::prelude::*;
use std::sync::Arc;

use crate::cache::{
    derive_key, CacheEngine, CacheEntry, CacheOptions, ContentKind, DiscardStrategy, Fifo, Lifo,
};

// == Test Configuration ==
const TEST_MAX_AGE_MS: u64 = 60_000;

// == Strategies ==
/// Generates request paths from a small pool so that keys collide often
fn path_strategy() -> impl Strategy<Value = String> {
    "/[a-h]{1,2}".prop_map(|s| s)
}

/// Generates optional auth tokens
fn auth_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[xy]")
}

/// Generates payloads
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put {
        path: String,
        auth: Option<String>,
        value: String,
    },
    Get {
        path: String,
        auth: Option<String>,
    },
    Remove {
        path: String,
        auth: Option<String>,
    },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (path_strategy(), auth_strategy(), value_strategy())
            .prop_map(|(path, auth, value)| CacheOp::Put { path, auth, value }),
        2 => (path_strategy(), auth_strategy()).prop_map(|(path, auth)| CacheOp::Get { path, auth }),
        1 => (path_strategy(), auth_strategy()).prop_map(|(path, auth)| CacheOp::Remove { path, auth }),
    ]
}

type Identity = (String, Option<String>);

/// Applies `ops` to both a fresh engine and a reference model and checks that
/// every lookup and the final contents agree.
fn check_against_model(
    strategy: Arc<dyn DiscardStrategy>,
    max_size: usize,
    ops: Vec<CacheOp>,
) -> Result<(), TestCaseError> {
    tokio_test::block_on(async move {
        let engine = CacheEngine::new(
            CacheOptions::new()
                .with_max_size(max_size)
                .with_max_age(TEST_MAX_AGE_MS)
                .with_shared_strategy(strategy.clone()),
        )
        .unwrap();

        // Oldest first, mirroring the engine's insertion order.
        let mut model: Vec<(Identity, String)> = Vec::new();

        for op in ops {
            match op {
                CacheOp::Put { path, auth, value } => {
                    engine.put(&path, auth.as_deref(), &value).await.unwrap();

                    let id = (path, auth);
                    if !model.iter().any(|(k, _)| *k == id) {
                        if model.len() == max_size {
                            let victim = strategy_position(&*strategy, model.len());
                            model.remove(victim);
                        }
                        model.push((id, value));
                    }
                }
                CacheOp::Get { path, auth } => {
                    let got = engine.get(&path, auth.as_deref()).await.unwrap();
                    let id = (path, auth);
                    let expected = model.iter().find(|(k, _)| *k == id).map(|(_, v)| v.clone());
                    prop_assert_eq!(got, expected);
                }
                CacheOp::Remove { path, auth } => {
                    engine.remove(&path, auth.as_deref()).await.unwrap();
                    let id = (path, auth);
                    model.retain(|(k, _)| *k != id);
                }
            }

            let size = engine.size().await;
            prop_assert!(size <= max_size, "size {} exceeds max {}", size, max_size);
            prop_assert_eq!(size, model.len());
        }

        Ok(())
    })
}

/// Position the strategy picks among `len` entries.
///
/// Both built-in strategies only look at the length, so a placeholder list of
/// the right size is enough to ask them.
fn strategy_position(strategy: &dyn DiscardStrategy, len: usize) -> usize {
    let placeholders: Vec<CacheEntry> = (0..len as u64)
        .map(|i| CacheEntry::new(derive_key(&i.to_string(), None), i, ContentKind::Json))
        .collect();
    strategy.choose(&placeholders)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // For any operation sequence, a FIFO engine behaves like the reference model.
    #[test]
    fn prop_fifo_matches_model(
        max_size in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        check_against_model(Arc::new(Fifo), max_size, ops)?;
    }

    // For any operation sequence, a LIFO engine behaves like the reference model.
    #[test]
    fn prop_lifo_matches_model(
        max_size in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        check_against_model(Arc::new(Lifo), max_size, ops)?;
    }

    // Storing a payload and reading it back before expiry returns it unchanged.
    #[test]
    fn prop_roundtrip_storage(
        path in "/[a-z0-9/]{0,32}",
        auth in auth_strategy(),
        value in value_strategy()
    ) {
        tokio_test::block_on(async {
            let engine = CacheEngine::new(CacheOptions::new()).unwrap();
            engine.put(&path, auth.as_deref(), &value).await.unwrap();
            let got = engine.get(&path, auth.as_deref()).await.unwrap();
            prop_assert_eq!(got.as_deref(), Some(value.as_str()));
            Ok::<(), TestCaseError>(())
        })?;
    }

    // Clearing always leaves an empty cache where every earlier key misses.
    #[test]
    fn prop_clear_empties_cache(
        entries in prop::collection::vec((path_strategy(), value_strategy()), 1..30)
    ) {
        tokio_test::block_on(async {
            let engine = CacheEngine::new(CacheOptions::new().with_max_size(8)).unwrap();
            for (path, value) in &entries {
                engine.put(path, None, value).await.unwrap();
            }

            engine.clear().await;

            prop_assert_eq!(engine.size().await, 0);
            for (path, _) in &entries {
                prop_assert!(engine.get(path, None).await.unwrap().is_none());
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
