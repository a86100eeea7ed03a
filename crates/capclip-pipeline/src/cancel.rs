//! Request-scoped cancellation.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{PipelineError, PipelineResult};

/// Read side of a run's cancel flag.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail with `Cancelled` once the flag is set.
    pub fn check(&self) -> PipelineResult<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Receiver to hand to subprocess runners.
    pub fn receiver(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Run `fut` unless the flag flips first; the future is dropped on cancel.
    pub async fn guard<F, T>(&self, fut: F) -> PipelineResult<T>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        self.check()?;
        let mut rx = self.rx.clone();
        tokio::select! {
            result = fut => result,
            _ = async move {
                if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                    std::future::pending::<()>().await;
                }
            } => Err(PipelineError::Cancelled),
        }
    }
}
