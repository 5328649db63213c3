//! Index allocation: create, take, free

use std::collections::HashSet;

use status_list_server::traits::{list_id_from_uri, PoolSettings, Storage};

use crate::common::*;

async fn with_pool(store: &Arc<dyn Storage>, size: u32) {
    store
        .create_or_verify_pool("p", PoolSettings { bits: 1, size })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_created_list_is_addressable() {
    for (name, store) in backends() {
        with_pool(&store, 16).await;
        let created = store.create_list("p", None).await.unwrap();

        assert!(created.uri.starts_with(&format!("{PUBLIC_URL}/")), "{name}");
        assert!(created.taken.is_empty(), "{name}");

        let list = store.list_config(&created.uri, false).await.unwrap();
        assert_eq!(list.list_id, list_id_from_uri(&created.uri).unwrap(), "{name}");
        assert_eq!(list.pool_id, "p", "{name}");
        assert_eq!(list.version, 1, "{name}");
        assert_eq!(store.list_data(&created.uri).await.unwrap(), vec![0u8; 2], "{name}");
        assert!(store.is_full(&created.uri).await.unwrap(), "{name}");
        assert_eq!(store.all_list_uris("p").await.unwrap(), vec![created.uri.clone()]);
        assert_eq!(store.current_lists("p").await.unwrap(), vec![created.uri]);
    }
}

#[tokio::test]
async fn test_taken_on_creation_never_free() {
    for (name, store) in backends() {
        with_pool(&store, 16).await;
        let created = store.create_list("p", Some(5)).await.unwrap();
        assert_eq!(created.taken.len(), 5, "{name}");
        assert_eq!(store.free_count(&created.uri).await.unwrap(), 11, "{name}");

        let rest = store.take(&created.uri, 16).await.unwrap();
        assert_eq!(rest.len(), 11, "{name}");

        let mut all: Vec<u32> = created.taken.iter().chain(&rest).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..16).collect::<Vec<_>>(), "{name}");
        assert!(store.is_empty(&created.uri).await.unwrap(), "{name}");
    }
}

#[tokio::test]
async fn test_take_everything_on_creation() {
    for (name, store) in backends() {
        with_pool(&store, 16).await;
        let created = store.create_list("p", Some(100)).await.unwrap();

        assert_eq!(created.taken.len(), 16, "{name}");
        assert_eq!(store.free_count(&created.uri).await.unwrap(), 0, "{name}");
        assert!(
            store.current_lists("p").await.unwrap().is_empty(),
            "{name}: a list without free indices is not current"
        );
    }
}

#[tokio::test]
async fn test_exhausted_list_leaves_current_and_returns_on_free() {
    for (name, store) in backends() {
        with_pool(&store, 16).await;
        let uri = store.create_list("p", None).await.unwrap().uri;

        let taken = store.take(&uri, 16).await.unwrap();
        assert_eq!(taken.len(), 16, "{name}");
        assert!(store.take(&uri, 1).await.unwrap().is_empty(), "{name}");
        assert!(store.current_lists("p").await.unwrap().is_empty(), "{name}");

        store.free_indices(&uri, &taken[..3]).await.unwrap();
        assert_eq!(store.free_count(&uri).await.unwrap(), 3, "{name}");
        assert_eq!(store.current_lists("p").await.unwrap(), vec![uri.clone()], "{name}");

        let again: HashSet<u32> = store.take(&uri, 16).await.unwrap().into_iter().collect();
        assert_eq!(again, taken[..3].iter().copied().collect(), "{name}");
    }
}

#[tokio::test]
async fn test_free_order_is_shuffled() {
    for (name, store) in backends() {
        with_pool(&store, 256).await;
        let uri = store.create_list("p", None).await.unwrap().uri;

        let taken = store.take(&uri, 256).await.unwrap();
        // 1/256! chance of a false failure
        assert_ne!(taken, (0..256).collect::<Vec<_>>(), "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_take_never_duplicates() {
    for (name, store) in backends() {
        with_pool(&store, 512).await;
        let uri = store.create_list("p", None).await.unwrap().uri;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let uri = uri.clone();
            tasks.push(tokio::spawn(async move {
                let mut mine = Vec::new();
                loop {
                    let batch = store.take(&uri, 7).await.unwrap();
                    if batch.is_empty() {
                        return mine;
                    }
                    mine.extend(batch);
                }
            }));
        }

        let mut all = Vec::new();
        for task in tasks {
            all.extend(task.await.unwrap());
        }
        assert_eq!(all.len(), 512, "{name}");
        let unique: HashSet<u32> = all.iter().copied().collect();
        assert_eq!(unique.len(), 512, "{name}: an index was handed out twice");
    }
}
