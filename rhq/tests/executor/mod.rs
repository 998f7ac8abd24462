use futures::{future::join_all, poll, task::Poll};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::Semaphore;

use rhq::{executor::QueueExecutor, Cfg, LocalError, RetryError, SendError};

async fn failing_send() -> Result<(), SendError> {
    panic!("unit of work failed")
}

async fn failing_cancel() -> Result<u32, LocalError> {
    panic!("cancellation failed")
}

fn executor() -> Arc<QueueExecutor> {
    Arc::new(QueueExecutor::new(&Cfg { queue_length: 64, ..Default::default() }))
}

#[tokio::test]
async fn submission_order() {
    crate::init();
    let executor = executor();
    let gate = Arc::new(Semaphore::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    // Hold the lane until every unit of work has been queued.
    let blocker_gate = gate.clone();
    let mut blocker = Box::pin(executor.execute(move || async move {
        blocker_gate.acquire().await.unwrap().forget();
        Ok(())
    }));
    assert!(poll!(blocker.as_mut()).is_pending());

    let mut units = Vec::new();
    for i in 0..20usize {
        let order = order.clone();
        let mut unit = Box::pin(executor.execute(move || async move {
            tokio::task::yield_now().await;
            order.lock().unwrap().push(i);
            Ok(i)
        }));
        assert!(poll!(unit.as_mut()).is_pending());
        units.push(unit);
    }

    gate.add_permits(1);
    blocker.await.unwrap();
    let results: Vec<usize> = join_all(units).await.into_iter().map(Result::unwrap).collect();

    let expected: Vec<usize> = (0..20).collect();
    assert_eq!(results, expected);
    assert_eq!(*order.lock().unwrap(), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submitters_never_overlap() {
    crate::init();
    let executor = executor();
    let busy = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let done = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let executor = executor.clone();
        let busy = busy.clone();
        let overlapped = overlapped.clone();
        let done = done.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                let busy = busy.clone();
                let overlapped = overlapped.clone();
                let done = done.clone();
                executor
                    .execute(move || async move {
                        if busy.swap(true, Ordering::SeqCst) {
                            overlapped.store(true, Ordering::SeqCst);
                        }
                        tokio::task::yield_now().await;
                        done.fetch_add(1, Ordering::SeqCst);
                        busy.store(false, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
                    .unwrap();
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(done.load(Ordering::SeqCst), 200);
}

#[tokio::test]
async fn errors_propagate() {
    crate::init();
    let executor = executor();

    let res = executor.execute(|| async { Err::<(), _>(SendError::Retry(RetryError)) }).await;
    assert_eq!(res, Err(SendError::Retry(RetryError)));

    let res = executor.execute(|| async { Err::<(), _>(SendError::Local(LocalError::Timeout)) }).await;
    assert_eq!(res, Err(SendError::Local(LocalError::Timeout)));
}

#[tokio::test]
async fn panic_is_resumed_on_caller() {
    crate::init();
    let executor = executor();

    let panicking = executor.clone();
    let res = tokio::spawn(async move { panicking.execute(failing_send).await }).await;
    assert!(res.unwrap_err().is_panic());

    // The lane survives the panic.
    assert_eq!(executor.execute(|| async { Ok(7) }).await, Ok(7));
}

#[tokio::test]
async fn no_throw_discards_failures() {
    crate::init();
    let executor = executor();

    assert_eq!(executor.execute_no_throw(|| async { Ok::<_, LocalError>(5) }).await, Some(5));
    assert_eq!(executor.execute_no_throw(|| async { Err::<u32, _>("boom") }).await, None);
    assert_eq!(executor.execute_no_throw(failing_cancel).await, None);

    assert_eq!(executor.execute(|| async { Ok(1) }).await, Ok(1));
}

#[tokio::test]
async fn nested_execution_runs_inline() {
    crate::init();
    let executor = executor();

    let inner = executor.clone();
    let res = tokio::time::timeout(
        Duration::from_secs(5),
        executor.execute(move || async move {
            let nested = inner.execute(|| async { Ok(20) }).await;
            nested.map(|n| n + 1)
        }),
    )
    .await
    .expect("nested execution deadlocked");

    assert_eq!(res, Ok(21));
}

#[tokio::test]
async fn dropped_submission_waiting_for_capacity_is_withdrawn() {
    crate::init();
    let executor = QueueExecutor::new(&Cfg { queue_length: 1, ..Default::default() });
    let started = Arc::new(Semaphore::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let ran = Arc::new(AtomicUsize::new(0));

    let (blocker_started, blocker_gate) = (started.clone(), gate.clone());
    let mut blocker = Box::pin(executor.execute(move || async move {
        blocker_started.add_permits(1);
        blocker_gate.acquire().await.unwrap().forget();
        Ok(())
    }));
    assert!(poll!(blocker.as_mut()).is_pending());
    started.acquire().await.unwrap().forget();

    // Takes the only free slot of the queue.
    let accepted_ran = ran.clone();
    let mut accepted = Box::pin(executor.execute(move || async move {
        accepted_ran.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));
    assert!(poll!(accepted.as_mut()).is_pending());

    // Waits for capacity.
    let waiting_ran = ran.clone();
    let mut waiting = Box::pin(executor.execute(move || async move {
        waiting_ran.fetch_add(10, Ordering::SeqCst);
        Ok(())
    }));
    assert!(poll!(waiting.as_mut()).is_pending());

    drop(accepted);
    drop(waiting);

    gate.add_permits(1);
    blocker.await.unwrap();
    executor.execute(|| async { Ok(()) }).await.unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_shutdowns_wait_for_accepted_work() {
    crate::init();
    let executor = executor();
    let gate = Arc::new(Semaphore::new(0));
    let ran = Arc::new(AtomicUsize::new(0));

    let (unit_gate, unit_ran) = (gate.clone(), ran.clone());
    let mut unit = Box::pin(executor.execute(move || async move {
        unit_gate.acquire().await.unwrap().forget();
        unit_ran.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));
    assert!(poll!(unit.as_mut()).is_pending());

    let mut first = Box::pin(executor.shutdown());
    let mut second = Box::pin(executor.shutdown());
    assert!(poll!(first.as_mut()).is_pending());
    assert!(poll!(second.as_mut()).is_pending());
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(poll!(second.as_mut()).is_pending());
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    gate.add_permits(1);
    unit.await.unwrap();
    second.await;
    first.await;
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_drains_accepted_work() {
    crate::init();
    let executor = executor();
    let gate = Arc::new(Semaphore::new(0));
    let ran = Arc::new(AtomicUsize::new(0));

    let blocker_gate = gate.clone();
    let mut blocker = Box::pin(executor.execute(move || async move {
        blocker_gate.acquire().await.unwrap().forget();
        Ok(())
    }));
    assert!(poll!(blocker.as_mut()).is_pending());

    let mut accepted = Vec::new();
    for _ in 0..3 {
        let ran = ran.clone();
        let mut unit = Box::pin(executor.execute(move || async move {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        assert!(poll!(unit.as_mut()).is_pending());
        accepted.push(unit);
    }

    let mut shutdown = Box::pin(executor.shutdown());
    assert!(poll!(shutdown.as_mut()).is_pending());
    assert!(executor.is_shut_down());

    let rejected = executor.execute(|| async { Ok(()) }).await;
    assert_eq!(rejected, Err(SendError::Local(LocalError::CommunicatorDestroyed)));
    assert_eq!(executor.execute_no_throw(|| async { Ok::<_, LocalError>(()) }).await, None);

    gate.add_permits(1);
    blocker.await.unwrap();
    for unit in join_all(accepted).await {
        unit.unwrap();
    }
    shutdown.await;

    assert_eq!(ran.load(Ordering::SeqCst), 3);
    assert!(matches!(poll!(Box::pin(executor.shutdown())), Poll::Ready(())));
}
