//! Batched, resumable construction of the full-text index.

use crate::archive::Archive;
use crate::cleaner::clean;
use crate::config::BuildOptions;
use crate::persist::{IndexBuildState, IndexPaths, IndexStore, PendingBatch};
use crate::tokenizer::tokenize;
use crate::{EngineError, Result};
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildProgress {
    /// Articles committed so far, earlier runs included.
    pub processed: u64,
    pub total: u64,
    /// Ordinal this run started from.
    pub resumed_from: u64,
    /// Time spent in this run.
    pub elapsed: Duration,
}

impl BuildProgress {
    /// Remaining time extrapolated from this run's rate.
    pub fn eta(&self) -> Option<Duration> {
        let done = self.processed.saturating_sub(self.resumed_from);
        if done == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.processed);
        Some(self.elapsed.mul_f64(remaining as f64 / done as f64))
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

pub type SinkError = Box<dyn Error + Send + Sync>;

/// Receives a report after every committed batch. Errors and panics raised
/// here are logged and otherwise ignored.
pub trait ProgressSink {
    fn on_batch(&mut self, progress: &BuildProgress) -> std::result::Result<(), SinkError>;
}

impl<F> ProgressSink for F
where
    F: FnMut(&BuildProgress) -> std::result::Result<(), SinkError>,
{
    fn on_batch(&mut self, progress: &BuildProgress) -> std::result::Result<(), SinkError> {
        self(progress)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_batch(&mut self, _progress: &BuildProgress) -> std::result::Result<(), SinkError> {
        Ok(())
    }
}

/// Cooperative cancellation, honoured between batches.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct IndexBuilder {
    store: IndexStore,
    options: BuildOptions,
    cancel: CancelFlag,
}

impl IndexBuilder {
    /// Open the index at `paths` for building. With `resume` an existing
    /// index is continued (and must share the requested tokenizer policy);
    /// otherwise it is wiped.
    pub fn open(paths: &IndexPaths, options: BuildOptions) -> Result<Self> {
        options.validate()?;
        let store = if options.resume {
            match IndexStore::open(paths)? {
                Some(store) if store.tokenizer() != options.tokenizer => {
                    return Err(EngineError::constraint(format!(
                        "index was built with tokenizer {:?}, requested {:?}; rebuild with replace",
                        store.tokenizer(),
                        options.tokenizer
                    )));
                }
                Some(store) => store,
                None => IndexStore::create(paths, options.tokenizer)?,
            }
        } else {
            IndexStore::create(paths, options.tokenizer)?
        };
        Ok(Self { store, options, cancel: CancelFlag::new() })
    }

    /// Shared handle for readers that search while the build runs.
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Index every article not yet committed. Returns the last committed
    /// state, which is short of complete when the build was cancelled.
    pub fn build<A, S>(&self, archive: &A, sink: &mut S) -> Result<IndexBuildState>
    where
        A: Archive + ?Sized,
        S: ProgressSink + ?Sized,
    {
        let total = archive.article_count();
        let batch_size = self.options.batch_size;
        let mut state = match self.store.load_state()? {
            Some(prev) if prev.total_articles != total => {
                return Err(EngineError::IndexCorrupt(format!(
                    "index was started on an archive of {} articles, this one has {total}",
                    prev.total_articles
                )));
            }
            Some(prev) => IndexBuildState { batch_size, ..prev },
            None => IndexBuildState::fresh(total, batch_size),
        };
        let tokenizer = self.store.tokenizer();
        let resumed_from = state.next_ordinal();
        tracing::info!(resumed_from, total, batch_size, "index build starting");

        let started = Instant::now();
        let mut titles = archive.titles().skip(resumed_from as usize);
        let mut ordinal = resumed_from;
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = state.processed(), total, "index build cancelled");
                break;
            }
            let mut batch = PendingBatch::default();
            while batch.len() < batch_size {
                let Some(article) = titles.next() else { break };
                let article = article?;
                let body = archive.read_body(&article)?;
                let text = clean(&String::from_utf8_lossy(&body));
                batch.add_document(ordinal, article, tokenize(&text, &tokenizer));
                ordinal += 1;
            }
            if batch.is_empty() {
                break;
            }
            state.last_processed_ordinal = Some(ordinal - 1);
            self.store.commit_batch(&batch, &state)?;
            tracing::debug!(articles = batch.len(), last = ordinal - 1, "batch committed");

            let progress = BuildProgress { processed: state.processed(), total, resumed_from, elapsed: started.elapsed() };
            report(sink, &progress);
        }

        if state.is_complete() {
            tracing::info!(total, elapsed_s = started.elapsed().as_secs_f64(), "index build complete");
        }
        Ok(state)
    }
}

fn report<S: ProgressSink + ?Sized>(sink: &mut S, progress: &BuildProgress) {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.on_batch(progress))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "progress sink failed; continuing"),
        Err(_) => tracing::warn!("progress sink panicked; continuing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_extrapolates_this_run() {
        let p = BuildProgress { processed: 300, total: 500, resumed_from: 100, elapsed: Duration::from_secs(10) };
        assert_eq!(p.eta(), Some(Duration::from_secs(10)));
        assert_eq!(p.percent(), 60.0);
        let fresh = BuildProgress { processed: 100, total: 500, resumed_from: 100, elapsed: Duration::ZERO };
        assert_eq!(fresh.eta(), None);
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
    }
}
