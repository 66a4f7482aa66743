//! Bounded offload of blocking work
//!
//! Decoding, preprocessing and recognition are synchronous and CPU-bound.
//! They run on tokio's blocking threads, at most `size` at a time, so request
//! handling threads stay free.

use crate::error::OcrError;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl BlockingPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` on a blocking thread once a slot is free and await its result.
    ///
    /// Dropping the returned future before the job starts gives the slot back.
    /// A job that has started always runs to completion and holds its slot
    /// until then.
    pub async fn submit<F, T>(&self, job: F) -> Result<T, OcrError>
    where
        F: FnOnce() -> Result<T, OcrError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| OcrError::Internal(format!("Worker pool closed: {}", e)))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| OcrError::Internal(format!("OCR task panicked: {}", e)))?
    }
}
