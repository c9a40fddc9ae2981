use crate::common::result::CrepoResult;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// How a per-project step is spread over the project set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutMode {
    /// One item at a time, in input order
    Sequential,
    /// Every item is spawned before any is joined; at most `max_parallel`
    /// run at once
    Parallel { max_parallel: usize },
}

impl FanOutMode {
    pub fn new(parallel: bool, max_parallel: usize) -> Self {
        if parallel {
            Self::Parallel {
                max_parallel: max_parallel.max(1),
            }
        } else {
            Self::Sequential
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::Parallel { .. })
    }
}

/// Apply `task` to every item and return the results in input order.
///
/// A task that panics surfaces as an internal error once every other task has
/// been joined.
pub async fn fan_out<I, T, F, Fut>(items: Vec<I>, mode: FanOutMode, task: F) -> CrepoResult<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    match mode {
        FanOutMode::Sequential => {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(task(item).await);
            }
            Ok(results)
        }
        FanOutMode::Parallel { max_parallel } => {
            let semaphore = Arc::new(Semaphore::new(max_parallel));
            let task = Arc::new(task);

            let handles: Vec<_> = items
                .into_iter()
                .map(|item| {
                    let semaphore = semaphore.clone();
                    let task = task.clone();
                    tokio::spawn(async move {
                        // The semaphore is never closed, so a permit always arrives.
                        let _permit = semaphore.acquire_owned().await.ok();
                        task(item).await
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(handles.len());
            for joined in join_all(handles).await {
                results.push(joined?);
            }
            Ok(results)
        }
    }
}
