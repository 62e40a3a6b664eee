//! Work multiplexer integration tests
//!
//! Exercises completion ordering, error policies, mid-flight enqueue,
//! and the cancellation sweep with instrumented tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{sleep, Duration};

use tandem::core::TandemError;
use tandem::work::{ErrorPolicy, WorkSet};

/// Sets its flag when dropped; used to observe task cancellation
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Wait until a flag is set, yielding to let aborts run their course
async fn wait_for_flag(flag: &Arc<AtomicBool>) {
    for _ in 0..100 {
        if flag.load(Ordering::SeqCst) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("flag was never set");
}

#[tokio::test(start_paused = true)]
async fn test_completions_arrive_in_completion_order() {
    let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
    work.spawn("slow", async {
        sleep(Duration::from_millis(30)).await;
        Ok(30)
    });
    work.spawn("fast", async {
        sleep(Duration::from_millis(10)).await;
        Ok(10)
    });
    work.spawn("middle", async {
        sleep(Duration::from_millis(20)).await;
        Ok(20)
    });

    let mut yielded = Vec::new();
    while let Some(completed) = work.join_next().await {
        yielded.push(completed.unwrap());
    }

    assert_eq!(yielded, vec![("fast", 10), ("middle", 20), ("slow", 30)]);
}

#[tokio::test(start_paused = true)]
async fn test_each_tag_yielded_exactly_once() {
    let mut work: WorkSet<usize, usize> = WorkSet::new(ErrorPolicy::Strict);
    for i in 0..8 {
        work.spawn(i, async move {
            sleep(Duration::from_millis(i as u64 + 1)).await;
            Ok(i)
        });
    }

    let mut seen = Vec::new();
    while let Some(completed) = work.join_next().await {
        let (tag, _) = completed.unwrap();
        seen.push(tag);
    }

    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_strict_failure_yields_earlier_successes_then_cancels() {
    let cancelled = Arc::new(AtomicBool::new(false));

    let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
    work.spawn("early", async {
        sleep(Duration::from_millis(5)).await;
        Ok(1)
    });
    work.spawn("failing", async {
        sleep(Duration::from_millis(10)).await;
        Err(TandemError::service(500, "boom"))
    });
    let flag = Arc::clone(&cancelled);
    work.spawn("victim", async move {
        let _guard = DropFlag(flag);
        std::future::pending::<()>().await;
        Ok(0)
    });

    // The early success arrives before the failure is observed
    let (tag, value) = work.join_next().await.unwrap().unwrap();
    assert_eq!((tag, value), ("early", 1));

    let err = work.join_next().await.unwrap().unwrap_err();
    assert!(matches!(err, TandemError::Service { status: 500, .. }));

    // Everything still pending received the cancellation signal
    wait_for_flag(&cancelled).await;
}

#[tokio::test(start_paused = true)]
async fn test_lenient_policy_drops_failures_silently() {
    let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Lenient);
    work.spawn("failing", async {
        sleep(Duration::from_millis(5)).await;
        Err(TandemError::service(500, "boom"))
    });
    work.spawn("a", async {
        sleep(Duration::from_millis(10)).await;
        Ok(1)
    });
    work.spawn("b", async {
        sleep(Duration::from_millis(20)).await;
        Ok(2)
    });

    let mut yielded = Vec::new();
    while let Some(completed) = work.join_next().await {
        yielded.push(completed.unwrap());
    }

    // The failing tag is never yielded and no error escapes
    assert_eq!(yielded, vec![("a", 1), ("b", 2)]);
}

#[tokio::test]
async fn test_enqueue_during_iteration_joins_wait_set() {
    let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
    work.spawn("first", async { Ok(1) });

    let mut yielded = Vec::new();
    while let Some(completed) = work.join_next().await {
        let (tag, value) = completed.unwrap();
        if tag == "first" {
            // Mid-iteration mutation: the new handle becomes part of
            // the wait set on the next round
            work.spawn("follow-up", async { Ok(2) });
        }
        yielded.push((tag, value));
    }

    assert_eq!(yielded, vec![("first", 1), ("follow-up", 2)]);
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_outstanding_work() {
    let cancelled = Arc::new(AtomicBool::new(false));

    let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
    let flag = Arc::clone(&cancelled);
    work.spawn("pending", async move {
        let _guard = DropFlag(flag);
        std::future::pending::<()>().await;
        Ok(0)
    });

    drop(work);
    wait_for_flag(&cancelled).await;
}

#[tokio::test(start_paused = true)]
async fn test_exempt_work_survives_teardown() {
    let finished = Arc::new(AtomicBool::new(false));
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
    let flag = Arc::clone(&finished);
    work.spawn_exempt("background", async move {
        let _ = release_rx.await;
        flag.store(true, Ordering::SeqCst);
        Ok(1)
    });
    work.spawn("failing", async { Err(TandemError::service(500, "boom")) });

    let err = work.join_next().await.unwrap().unwrap_err();
    assert!(matches!(err, TandemError::Service { .. }));
    drop(work);

    // The exempt operation was not aborted and can still finish
    release_tx.send(()).expect("exempt task receiver dropped");
    wait_for_flag(&finished).await;
}
