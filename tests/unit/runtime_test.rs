//! Tests for tokio spawner utilities

use payout_scheduler::core::Spawn;
use payout_scheduler::runtime::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(Box::pin(async move {
        tx.send(123).unwrap();
    }));

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_tokio_spawner_from_foreign_thread() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();
    let spawner = TokioSpawner::new(runtime.handle().clone());

    let (tx, rx) = std::sync::mpsc::channel();
    spawner.spawn(Box::pin(async move {
        tx.send("ran").unwrap();
    }));
    assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap(), "ran");
}
