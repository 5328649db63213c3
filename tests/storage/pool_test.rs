//! Pool creation and verification

use status_list_server::traits::PoolSettings;
use status_list_server::StorageError;

use crate::common::*;

const SETTINGS: PoolSettings = PoolSettings { bits: 1, size: 16 };

#[tokio::test]
async fn test_first_creation_wins() {
    for (name, store) in backends() {
        let stored = store.create_or_verify_pool("p", SETTINGS).await.unwrap();
        assert_eq!(stored, SETTINGS, "{name}");

        let other = PoolSettings { bits: 2, size: 64 };
        let stored = store.create_or_verify_pool("p", other).await.unwrap();
        assert_eq!(stored, SETTINGS, "{name}: stored settings must not change");
        assert_eq!(store.pool_settings("p").await.unwrap(), SETTINGS, "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_agrees() {
    for (name, store) in backends() {
        let mut tasks = Vec::new();
        for i in 0..8u32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let settings = PoolSettings {
                    bits: if i % 2 == 0 { 1 } else { 2 },
                    size: 16 * (i + 1),
                };
                store.create_or_verify_pool("shared", settings).await.unwrap()
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }
        let first = results[0];
        assert!(
            results.iter().all(|r| *r == first),
            "{name}: initializers saw different pools: {results:?}"
        );
        assert_eq!(store.pool_settings("shared").await.unwrap(), first, "{name}");
    }
}

#[tokio::test]
async fn test_unknown_pool() {
    for (name, store) in backends() {
        assert!(
            matches!(
                store.pool_settings("missing").await,
                Err(StorageError::PoolNotFound(_))
            ),
            "{name}"
        );
        assert!(
            matches!(
                store.create_list("missing", None).await,
                Err(StorageError::PoolNotFound(_))
            ),
            "{name}"
        );
    }
}
