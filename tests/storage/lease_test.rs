//! Precreation leases

use std::time::Duration;

use crate::common::*;

#[tokio::test]
async fn test_lease_is_exclusive_per_pool() {
    for (name, store) in backends() {
        let ttl = Duration::from_secs(30);

        let lease = store.obtain_precreation_lock("a", ttl).await.unwrap();
        assert!(lease.is_some(), "{name}");
        assert!(store.obtain_precreation_lock("a", ttl).await.unwrap().is_none(), "{name}");
        assert!(store.obtain_precreation_lock("b", ttl).await.unwrap().is_some(), "{name}");

        drop(lease);
        assert!(
            store.obtain_precreation_lock("a", ttl).await.unwrap().is_some(),
            "{name}: dropping the lease releases it"
        );
    }
}

#[tokio::test]
async fn test_lease_expires() {
    for (name, store) in backends() {
        let held = store
            .obtain_precreation_lock("a", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(held.is_some(), "{name}");

        tokio::time::sleep(Duration::from_millis(120)).await;
        let taken_over = store
            .obtain_precreation_lock("a", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(taken_over.is_some(), "{name}: an expired lease can be taken over");

        // Releasing the stale lease must not free the new holder
        drop(held);
        assert!(
            store
                .obtain_precreation_lock("a", Duration::from_secs(30))
                .await
                .unwrap()
                .is_none(),
            "{name}"
        );
        drop(taken_over);
    }
}
