/// Registry tests
///
/// Tests for the handle table: resolution failures, instance independence,
/// and concurrent producers and waiters sharing one registry.
/// Run with: cargo test --test registry_tests
use eventset::{EsError, EventSetRegistry, OpOrigin, TaskBackend, WAIT_FOREVER};
use std::sync::Arc;

fn origin(api: &str) -> OpOrigin {
    OpOrigin::capture(api, "()")
}

#[tokio::test]
async fn test_every_entry_point_rejects_stale_handles() {
    let backend = Arc::new(TaskBackend::new());
    let registry = EventSetRegistry::new();
    let es = registry.create().unwrap();
    registry.close(es).await.unwrap();

    assert!(matches!(
        registry
            .insert(es, 1, backend.clone(), origin("op"), vec![])
            .await,
        Err(EsError::InvalidHandle)
    ));
    assert!(matches!(
        registry.count_active(es).await,
        Err(EsError::InvalidHandle)
    ));
    assert!(matches!(
        registry.next_sequence(es).await,
        Err(EsError::InvalidHandle)
    ));
    assert!(matches!(
        registry.wait(es, WAIT_FOREVER).await,
        Err(EsError::InvalidHandle)
    ));
    assert!(matches!(
        registry.error_flag(es).await,
        Err(EsError::InvalidHandle)
    ));
    assert!(matches!(
        registry.error_count(es).await,
        Err(EsError::InvalidHandle)
    ));
    assert!(matches!(
        registry.drain_errors(es, 1).await,
        Err(EsError::InvalidHandle)
    ));
    assert!(matches!(
        registry.stats(es).await,
        Err(EsError::InvalidHandle)
    ));
}

#[tokio::test]
async fn test_event_sets_are_independent() {
    let backend = Arc::new(TaskBackend::new());
    let registry = EventSetRegistry::new();
    let left = registry.create().unwrap();
    let right = registry.create().unwrap();

    let token = backend
        .submit(async { Err(anyhow::anyhow!("left-only failure")) })
        .unwrap();
    registry
        .insert(left, token, backend.clone(), origin("left_op"), vec![])
        .await
        .unwrap();

    registry.wait(left, WAIT_FOREVER).await.unwrap();

    // Counters and error state never bleed between sets
    assert!(registry.error_flag(left).await.unwrap());
    assert!(!registry.error_flag(right).await.unwrap());
    assert_eq!(registry.next_sequence(left).await.unwrap(), 1);
    assert_eq!(registry.next_sequence(right).await.unwrap(), 0);

    registry.drain_errors(left, 1).await.unwrap();
    registry.close(left).await.unwrap();
    registry.close(right).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_producers_share_one_set() {
    let backend = Arc::new(TaskBackend::new());
    let registry = Arc::new(EventSetRegistry::new());
    let es = registry.create().unwrap();

    let num_tasks = 8;
    let inserts_per_task = 25;

    let mut handles = vec![];
    for _ in 0..num_tasks {
        let registry = Arc::clone(&registry);
        let backend = Arc::clone(&backend);

        handles.push(tokio::spawn(async move {
            for _ in 0..inserts_per_task {
                let token = backend.submit(async { Ok(()) }).unwrap();
                registry
                    .insert(es, token, backend.clone(), origin("bulk_op"), vec![])
                    .await
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // Dense sequence numbers despite interleaved producers
    assert_eq!(
        registry.next_sequence(es).await.unwrap(),
        (num_tasks * inserts_per_task) as u64
    );

    let outcome = registry.wait(es, WAIT_FOREVER).await.unwrap();
    assert_eq!(outcome.num_in_progress, 0);
    assert!(!outcome.op_failed);
    assert_eq!(backend.live_requests().unwrap(), 0);

    registry.close(es).await.unwrap();
}

#[tokio::test]
async fn test_waiter_and_producer_interleave() {
    let backend = Arc::new(TaskBackend::new());
    let registry = Arc::new(EventSetRegistry::new());
    let es = registry.create().unwrap();

    let producer = {
        let registry = Arc::clone(&registry);
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            for _ in 0..20 {
                let token = backend.submit(async { Ok(()) }).unwrap();
                registry
                    .insert(es, token, backend.clone(), origin("streamed_op"), vec![])
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    producer.await.unwrap();

    // Wait until the set is fully drained; inserts and waits went through
    // the same mutex, so the bookkeeping cannot have torn
    while registry.count_active(es).await.unwrap() > 0 {
        registry.wait(es, WAIT_FOREVER).await.unwrap();
    }

    registry.close(es).await.unwrap();
}
