use std::future::Future;

use tokio::sync::OnceCell;

/// A process-wide handle that is built on first use.
///
/// Concurrent first callers wait on a single initialization. A failed attempt leaves the handle
/// empty, so the next caller runs `init` again.
#[derive(Debug)]
pub struct LazyHandle<T> {
    cell: OnceCell<T>,
}

impl<T> Default for LazyHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyHandle<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> anyhow::Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let res = self.cell.get_or_try_init(init).await;
        if let Err(err) = &res {
            tracing::warn!(error = %err, "initialization failed; will retry on next use");
        }
        res
    }
}
