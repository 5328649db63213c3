//! Status writes and version counters

use std::collections::HashSet;

use status_list_server::statuslist::{StatusBits, StatusList};
use status_list_server::traits::PoolSettings;
use status_list_server::StorageError;

use crate::common::*;

#[tokio::test]
async fn test_update_sets_packed_value() {
    for (name, store) in backends() {
        store
            .create_or_verify_pool("p", PoolSettings { bits: 2, size: 16 })
            .await
            .unwrap();
        let uri = store.create_list("p", None).await.unwrap().uri;

        assert_eq!(store.update_status(&uri, 5, 3).await.unwrap(), 2, "{name}");
        assert_eq!(store.update_status(&uri, 0, 1).await.unwrap(), 3, "{name}");

        let list = StatusList::from_bytes(StatusBits::Two, store.list_data(&uri).await.unwrap());
        assert_eq!(list.get(5), Some(3), "{name}");
        assert_eq!(list.get(0), Some(1), "{name}");
        assert_eq!(list.get(1), Some(0), "{name}");
        // Index 5 lives in the high bits of byte 1
        assert_eq!(list.as_bytes()[1], 0b0000_1100, "{name}");
    }
}

#[tokio::test]
async fn test_invalid_writes_leave_version() {
    for (name, store) in backends() {
        store
            .create_or_verify_pool("p", PoolSettings { bits: 1, size: 16 })
            .await
            .unwrap();
        let uri = store.create_list("p", None).await.unwrap().uri;

        assert!(
            matches!(
                store.update_status(&uri, 16, 1).await,
                Err(StorageError::IndexOutOfBounds { index: 16, size: 16, .. })
            ),
            "{name}"
        );
        assert!(
            matches!(
                store.update_status(&uri, 0, 2).await,
                Err(StorageError::ValueOutOfRange { value: 2, bits: 1, .. })
            ),
            "{name}"
        );
        assert_eq!(store.list_config(&uri, false).await.unwrap().version, 1, "{name}");
    }
}

#[tokio::test]
async fn test_unknown_list() {
    for (name, store) in backends() {
        let uri = format!("{PUBLIC_URL}/{}", uuid::Uuid::new_v4());
        assert!(
            matches!(
                store.update_status(&uri, 0, 1).await,
                Err(StorageError::ListNotFound(_))
            ),
            "{name}"
        );
        assert!(store.list_data(&uri).await.is_err(), "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_bump_version_once_each() {
    for (name, store) in backends() {
        store
            .create_or_verify_pool("p", PoolSettings { bits: 1, size: 32 })
            .await
            .unwrap();
        let uri = store.create_list("p", None).await.unwrap().uri;

        let mut tasks = Vec::new();
        for index in 0..20i64 {
            let store = Arc::clone(&store);
            let uri = uri.clone();
            tasks.push(tokio::spawn(async move {
                store.update_status(&uri, index, 1).await.unwrap()
            }));
        }

        let mut versions = HashSet::new();
        for task in tasks {
            versions.insert(task.await.unwrap());
        }
        assert_eq!(versions, (2..=21).collect::<HashSet<u64>>(), "{name}");
        assert_eq!(store.list_config(&uri, false).await.unwrap().version, 21, "{name}");

        let list = StatusList::from_bytes(StatusBits::One, store.list_data(&uri).await.unwrap());
        assert!((0..20).all(|i| list.get(i) == Some(1)), "{name}: lost update");
        assert!((20..32).all(|i| list.get(i) == Some(0)), "{name}");
    }
}
