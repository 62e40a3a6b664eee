//! Completion-order fan-in over tagged asynchronous work
//!
//! A [`WorkSet`] owns a dynamically changing set of in-flight operations,
//! each registered under an application tag, and yields `(tag, output)`
//! pairs in the order the operations actually complete. New work may be
//! added between waits; whatever is still outstanding when the set is
//! torn down gets aborted unless it was registered as exempt.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::{AbortHandle, JoinError};
use tracing::debug;

use crate::core::{Result, TandemError};

/// How the work set reacts to a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// The first failure aborts everything still pending and propagates
    #[default]
    Strict,
    /// Failures are dropped; their tags are never yielded
    Lenient,
}

/// Identifies one registered operation for the lifetime of the set
type WorkId = u64;

type Completion<T, O> = (WorkId, T, std::result::Result<Result<O>, JoinError>);

/// A mutable set of tagged, cancellable operations awaited as one stream.
///
/// The consumer drives it with [`join_next`](WorkSet::join_next) and may
/// call [`spawn`](WorkSet::spawn) between waits; additions become part of
/// the wait set on the next call. The set has no knowledge of what tags
/// mean.
pub struct WorkSet<T, O> {
    /// Wait set; each entry resolves once its task completes
    pending: FuturesUnordered<BoxFuture<'static, Completion<T, O>>>,
    /// Abort handles for everything cancellable still in flight
    aborts: HashMap<WorkId, AbortHandle>,
    next_id: WorkId,
    policy: ErrorPolicy,
    /// Dropped with the set; exempt tasks use it to detect teardown
    live: Arc<()>,
}

impl<T, O> WorkSet<T, O>
where
    T: Send + 'static,
    O: Send + 'static,
{
    /// Create an empty work set with the given error policy
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            pending: FuturesUnordered::new(),
            aborts: HashMap::new(),
            next_id: 0,
            policy,
            live: Arc::new(()),
        }
    }

    /// Register an operation under a tag.
    ///
    /// The set takes ownership: the operation is aborted if it is still
    /// pending when the set is dropped or a strict failure occurs.
    pub fn spawn<F>(&mut self, tag: T, fut: F)
    where
        F: Future<Output = Result<O>> + Send + 'static,
    {
        let id = self.allocate_id();
        let handle = tokio::spawn(fut);
        self.aborts.insert(id, handle.abort_handle());
        self.pending
            .push(Box::pin(async move { (id, tag, handle.await) }));
    }

    /// Register an operation that survives teardown.
    ///
    /// Exempt operations are never aborted by the set. While the set is
    /// alive their results flow through the normal policy path; a failure
    /// produced after the set is gone is drained into a log line so it is
    /// never lost silently.
    pub fn spawn_exempt<F>(&mut self, tag: T, fut: F)
    where
        F: Future<Output = Result<O>> + Send + 'static,
    {
        let id = self.allocate_id();
        let live: Weak<()> = Arc::downgrade(&self.live);
        let handle = tokio::spawn(async move {
            let out = fut.await;
            if let Err(err) = &out {
                if live.upgrade().is_none() {
                    debug!(error = %err, "exempt work failed after the set was torn down");
                }
            }
            out
        });
        self.pending
            .push(Box::pin(async move { (id, tag, handle.await) }));
    }

    /// Wait until any outstanding operation completes.
    ///
    /// Returns `None` once nothing is pending. Under strict policy the
    /// first failure aborts all other cancellable operations and is
    /// returned; under lenient policy failed operations are skipped.
    pub async fn join_next(&mut self) -> Option<Result<(T, O)>> {
        loop {
            let (id, tag, joined) = self.pending.next().await?;
            self.aborts.remove(&id);
            match joined {
                Ok(Ok(output)) => return Some(Ok((tag, output))),
                Ok(Err(err)) => {
                    if let Some(fatal) = self.handle_failure(err) {
                        return Some(Err(fatal));
                    }
                }
                Err(join_err) if join_err.is_cancelled() => {
                    // Aborted by an earlier sweep; nothing to report
                }
                Err(join_err) => {
                    let err = TandemError::work(format!("work task panicked: {}", join_err));
                    if let Some(fatal) = self.handle_failure(err) {
                        return Some(Err(fatal));
                    }
                }
            }
        }
    }

    /// Number of operations still outstanding
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is outstanding
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Abort every cancellable operation still in flight
    pub fn abort_outstanding(&mut self) {
        for (_, handle) in self.aborts.drain() {
            handle.abort();
        }
    }

    fn allocate_id(&mut self) -> WorkId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn handle_failure(&mut self, err: TandemError) -> Option<TandemError> {
        match self.policy {
            ErrorPolicy::Strict => {
                self.abort_outstanding();
                Some(err)
            }
            ErrorPolicy::Lenient => {
                debug!(error = %err, "dropping failed work under lenient policy");
                None
            }
        }
    }
}

impl<T, O> Drop for WorkSet<T, O> {
    fn drop(&mut self) {
        for (_, handle) in self.aborts.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_empty_set_yields_nothing() {
        let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
        assert!(work.is_empty());
        assert!(work.join_next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_completion() {
        let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
        work.spawn("one", async {
            sleep(Duration::from_millis(5)).await;
            Ok(1)
        });

        let (tag, value) = work.join_next().await.unwrap().unwrap();
        assert_eq!((tag, value), ("one", 1));
        assert!(work.join_next().await.is_none());
    }

    #[tokio::test]
    async fn test_add_between_waits() {
        let mut work: WorkSet<&str, u32> = WorkSet::new(ErrorPolicy::Strict);
        work.spawn("first", async { Ok(1) });

        let (tag, _) = work.join_next().await.unwrap().unwrap();
        assert_eq!(tag, "first");

        work.spawn("second", async { Ok(2) });
        let (tag, value) = work.join_next().await.unwrap().unwrap();
        assert_eq!((tag, value), ("second", 2));
    }
}
