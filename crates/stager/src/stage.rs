//! Batch staging: validate shape, slice, persist.

use std::sync::Arc;

use bytes::Bytes;
use reelcap_common::error::{ReelcapError, ReelcapResult};
use reelcap_frame_model::BatchHeader;
use reelcap_session_store::SessionStore;
use tokio::task::JoinSet;

/// Per-frame writes within one batch that may be in flight at once. The
/// writes are independent once indices are known; the cap bounds open file
/// handles and blocking-pool pressure.
const DEFAULT_WRITE_CONCURRENCY: usize = 4;

/// Persists validated batches into the session store.
pub struct Stager {
    store: Arc<SessionStore>,
    write_concurrency: usize,
}

impl Stager {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
        }
    }

    pub fn with_write_concurrency(mut self, write_concurrency: usize) -> Self {
        self.write_concurrency = write_concurrency.max(1);
        self
    }

    /// Stage one batch. Returns the number of frames persisted.
    ///
    /// The payload is validated against the header before anything is
    /// written; a malformed batch stages no frames. A `frame_count` of zero
    /// is a no-op success. Duplicate delivery overwrites frame-by-frame —
    /// batches are idempotent per frame index.
    pub async fn stage_batch(&self, header: &BatchHeader, payload: Bytes) -> ReelcapResult<u32> {
        header.validate_payload(payload.len())?;

        if header.frame_count == 0 {
            tracing::debug!(
                session = %header.session_id,
                batch_number = header.batch_number,
                "Empty batch, nothing to stage"
            );
            return Ok(0);
        }

        self.store.ensure_session(&header.session_id)?;

        let mut writes: JoinSet<ReelcapResult<()>> = JoinSet::new();
        for (index, range) in header.frame_ranges() {
            while writes.len() >= self.write_concurrency {
                join_one(&mut writes).await?;
            }
            let store = Arc::clone(&self.store);
            let session = header.session_id.clone();
            let frame = payload.slice(range);
            writes.spawn_blocking(move || store.write_frame(&session, index, &frame));
        }
        while !writes.is_empty() {
            join_one(&mut writes).await?;
        }

        tracing::info!(
            session = %header.session_id,
            batch_number = header.batch_number,
            start_frame = header.start_frame,
            frames = header.frame_count,
            "Batch staged"
        );
        Ok(header.frame_count)
    }
}

async fn join_one(writes: &mut JoinSet<ReelcapResult<()>>) -> ReelcapResult<()> {
    match writes.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(e)) => Err(ReelcapError::storage(format!("Frame write task failed: {e}"))),
        None => Ok(()),
    }
}
