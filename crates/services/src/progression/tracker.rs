use std::sync::Arc;

use dogdog_core::model::{Checkpoint, CheckpointId, CheckpointTable, PathId, PathProgress, QuestionId};
use dogdog_core::Clock;
use storage::record::{ProgressRecord, decode_progress, encode_progress, progress_key};
use storage::repository::{PersistenceStore, StorageError};
use tracing::{debug, info, warn};

use crate::error::ProgressionError;
use crate::events::{EventBus, ListenerKey};

/// Change notifications emitted by [`ProgressionTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    PathSelected { path_id: PathId },
    AnswerRecorded { path_id: PathId, questions_answered: u32 },
    CheckpointCompleted { path_id: PathId, checkpoint: CheckpointId },
    PathCompleted { path_id: PathId },
    ProgressReset { path_id: PathId, to: Option<CheckpointId> },
    IntegrityRepaired { path_id: PathId, issues: usize },
}

/// Tracks checkpoint progress for the selected path and persists it after
/// every change.
///
/// Storage failures never escape: they are logged and the in-memory progress
/// stays authoritative for the rest of the session. Use [`Self::flush`] to
/// observe save errors explicitly.
pub struct ProgressionTracker {
    table: Arc<CheckpointTable>,
    store: Arc<dyn PersistenceStore>,
    clock: Clock,
    active: Option<PathProgress>,
    events: EventBus<ProgressEvent>,
}

impl ProgressionTracker {
    #[must_use]
    pub fn new(table: Arc<CheckpointTable>, store: Arc<dyn PersistenceStore>, clock: Clock) -> Self {
        Self {
            table,
            store,
            clock,
            active: None,
            events: EventBus::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &CheckpointTable {
        &self.table
    }

    #[must_use]
    pub fn active_path(&self) -> Option<&PathId> {
        self.active.as_ref().map(PathProgress::path_id)
    }

    #[must_use]
    pub fn progress(&self) -> Option<&PathProgress> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn last_completed_checkpoint(&self) -> Option<&Checkpoint> {
        self.active
            .as_ref()
            .and_then(PathProgress::last_completed_checkpoint)
            .and_then(|id| self.table.get(id))
    }

    #[must_use]
    pub fn next_checkpoint(&self) -> Option<&Checkpoint> {
        match &self.active {
            Some(progress) => progress.next_checkpoint(&self.table),
            None => self.table.first(),
        }
    }

    /// `0.0` when no path is selected.
    #[must_use]
    pub fn progress_to_next_checkpoint(&self) -> f32 {
        self.active
            .as_ref()
            .map_or(0.0, |p| p.progress_to_next_checkpoint(&self.table))
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |p| p.completed_checkpoints().len())
    }

    #[must_use]
    pub fn is_path_completed(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|p| p.is_path_completed(&self.table))
    }

    pub fn subscribe(&mut self, listener: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> ListenerKey {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.events.unsubscribe(key)
    }

    /// Load (or start) progress for `path_id` and make it the active path.
    ///
    /// Unreadable or corrupted stored progress is replaced by fresh progress.
    pub async fn select_path(&mut self, path_id: PathId) {
        let progress = self.load_or_initial(&path_id).await;
        info!(
            path = %path_id,
            answered = progress.questions_answered(),
            completed = progress.completed_checkpoints().len(),
            "path selected"
        );
        self.active = Some(progress);
        self.events.emit(&ProgressEvent::PathSelected {
            path_id: path_id.clone(),
        });

        if !self.validate_integrity().await {
            debug!(path = %path_id, "stored progress repaired on load");
        }
    }

    /// Count an answered question for the active path.
    ///
    /// Returns the checkpoint completed by this answer, if any. At most one
    /// checkpoint completes per call.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::NoActivePath` if no path is selected.
    pub async fn record_answer(
        &mut self,
        is_correct: bool,
        score_delta: u32,
        question_id: QuestionId,
    ) -> Result<Option<Checkpoint>, ProgressionError> {
        let now = self.clock.now();
        let progress = self.active.as_mut().ok_or(ProgressionError::NoActivePath)?;
        let reached = progress.record_answer(&self.table, is_correct, score_delta, question_id, now);
        let path_id = progress.path_id().clone();
        let answered = progress.questions_answered();
        let completed_path = progress.is_path_completed(&self.table);

        self.persist().await;

        self.events.emit(&ProgressEvent::AnswerRecorded {
            path_id: path_id.clone(),
            questions_answered: answered,
        });

        let Some(id) = reached else {
            return Ok(None);
        };
        let checkpoint = self.table.get(id).cloned();
        info!(path = %path_id, checkpoint = %id, answered, "checkpoint completed");
        self.events.emit(&ProgressEvent::CheckpointCompleted {
            path_id: path_id.clone(),
            checkpoint: id,
        });
        if completed_path {
            info!(path = %path_id, "path completed");
            self.events.emit(&ProgressEvent::PathCompleted { path_id });
        }
        Ok(checkpoint)
    }

    /// Roll the active path back to `checkpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::NoActivePath` if no path is selected.
    pub async fn reset_to_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), ProgressionError> {
        let progress = self.active.as_mut().ok_or(ProgressionError::NoActivePath)?;
        progress.reset_to_checkpoint(&self.table, checkpoint);
        let path_id = progress.path_id().clone();
        info!(path = %path_id, checkpoint = %checkpoint.id(), "progress reset to checkpoint");

        self.persist().await;
        self.events.emit(&ProgressEvent::ProgressReset {
            path_id,
            to: Some(checkpoint.id()),
        });
        Ok(())
    }

    /// Zero the active path while keeping it selected.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::NoActivePath` if no path is selected.
    pub async fn reset_path(&mut self) -> Result<(), ProgressionError> {
        let progress = self.active.as_mut().ok_or(ProgressionError::NoActivePath)?;
        progress.reset();
        let path_id = progress.path_id().clone();
        info!(path = %path_id, "path progress reset");

        self.persist().await;
        self.events.emit(&ProgressEvent::ProgressReset { path_id, to: None });
        Ok(())
    }

    /// Check the active progress and repair it if needed.
    ///
    /// Returns `true` if the progress was already valid (or no path is
    /// selected), `false` if issues were found and fixed.
    pub async fn validate_integrity(&mut self) -> bool {
        let Some(progress) = self.active.as_mut() else {
            return true;
        };
        let issues = progress.repair_integrity(&self.table);
        if issues.is_empty() {
            return true;
        }

        let path_id = progress.path_id().clone();
        warn!(path = %path_id, ?issues, "progress integrity violation repaired");
        self.persist().await;
        self.events.emit(&ProgressEvent::IntegrityRepaired {
            path_id,
            issues: issues.len(),
        });
        false
    }

    /// Save the active progress now and report the outcome.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let Some(progress) = self.active.as_ref() else {
            return Ok(());
        };
        let record = ProgressRecord::from_progress(progress);
        let bytes =
            encode_progress(&record).map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.store.save(&progress_key(progress.path_id()), &bytes).await
    }

    async fn persist(&self) {
        if let Err(err) = self.flush().await {
            warn!(error = %err, "failed to persist progress; keeping in-memory state");
        }
    }

    async fn load_or_initial(&self, path_id: &PathId) -> PathProgress {
        let key = progress_key(path_id);
        let bytes = match self.store.load(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return PathProgress::initial(path_id.clone()),
            Err(err) => {
                warn!(path = %path_id, error = %err, "failed to load progress; starting fresh");
                return PathProgress::initial(path_id.clone());
            }
        };

        let decoded = decode_progress(&bytes).and_then(ProgressRecord::into_progress);
        match decoded {
            Ok(progress) if progress.path_id() == path_id => progress,
            Ok(progress) => {
                warn!(
                    path = %path_id,
                    stored = %progress.path_id(),
                    "stored progress belongs to another path; starting fresh"
                );
                PathProgress::initial(path_id.clone())
            }
            Err(err) => {
                warn!(path = %path_id, error = %err, "corrupted progress data; resetting to defaults");
                PathProgress::initial(path_id.clone())
            }
        }
    }
}
