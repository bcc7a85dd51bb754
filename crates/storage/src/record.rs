use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use dogdog_core::model::{CheckpointId, PathId, PathProgress, QuestionId};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Upgrades the `data` object of one schema version to the next.
pub type Migration = fn(Value) -> Result<Value, RecordError>;

/// `(from_version, upgrade)` pairs, applied in order.
pub const MIGRATIONS: &[(u32, Migration)] = &[(1, upgrade_v1_to_v2)];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordError {
    #[error("malformed progress record: {0}")]
    Malformed(String),
    #[error("unsupported schema version {found} (current is {current})")]
    UnsupportedVersion { found: u32, current: u32 },
    #[error("no migration from schema version {0}")]
    Migration(u32),
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Malformed(err.to_string())
    }
}

/// On-disk shape: `{ "schema_version": N, "data": { ... } }`. Older versions
/// are upgraded step by step through [`MIGRATIONS`]; unknown versions are
/// rejected.
#[derive(Serialize, Deserialize)]
struct Envelope {
    schema_version: u32,
    data: Value,
}

/// Storage key for a path's progress.
#[must_use]
pub fn progress_key(path_id: &PathId) -> String {
    format!("path_progress:{path_id}")
}

/// Persisted shape of `PathProgress`.
///
/// Counters are signed so that a hand-edited or corrupted negative value can
/// be clamped to zero instead of failing the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub path_id: String,
    pub questions_answered: i64,
    pub correct_answers: i64,
    pub completed_checkpoints: Vec<u32>,
    pub last_completed_checkpoint: Option<u32>,
    #[serde(default)]
    pub used_question_ids: Vec<String>,
    #[serde(default)]
    pub total_score: i64,
    #[serde(default)]
    pub last_played_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    #[must_use]
    pub fn from_progress(progress: &PathProgress) -> Self {
        Self {
            path_id: progress.path_id().to_string(),
            questions_answered: i64::from(progress.questions_answered()),
            correct_answers: i64::from(progress.correct_answers()),
            completed_checkpoints: progress
                .completed_checkpoints()
                .iter()
                .map(CheckpointId::value)
                .collect(),
            last_completed_checkpoint: progress.last_completed_checkpoint().map(|id| id.value()),
            used_question_ids: progress
                .used_question_ids()
                .iter()
                .map(ToString::to_string)
                .collect(),
            total_score: i64::try_from(progress.total_score()).unwrap_or(i64::MAX),
            last_played_at: progress.last_played_at(),
        }
    }

    /// Convert the record back into domain progress.
    ///
    /// Negative counters are clamped to zero and blank question ids are
    /// dropped. The result is not integrity-checked; callers run
    /// `PathProgress::repair_integrity` next.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Malformed` if the path id is blank.
    pub fn into_progress(self) -> Result<PathProgress, RecordError> {
        let path_id =
            PathId::new(self.path_id).map_err(|e| RecordError::Malformed(e.to_string()))?;

        let questions_answered = clamp_counter(self.questions_answered, "questions_answered");
        let correct_answers = clamp_counter(self.correct_answers, "correct_answers");
        let total_score = u64::try_from(self.total_score).unwrap_or_else(|_| {
            tracing::warn!(value = self.total_score, "negative total_score clamped to 0");
            0
        });

        let completed: BTreeSet<CheckpointId> = self
            .completed_checkpoints
            .into_iter()
            .map(CheckpointId::new)
            .collect();
        let used: BTreeSet<QuestionId> = self
            .used_question_ids
            .into_iter()
            .filter_map(|raw| QuestionId::new(raw).ok())
            .collect();

        Ok(PathProgress::from_persisted(
            path_id,
            questions_answered,
            correct_answers,
            completed,
            self.last_completed_checkpoint.map(CheckpointId::new),
            used,
            total_score,
            self.last_played_at,
        ))
    }
}

fn clamp_counter(value: i64, field: &'static str) -> u32 {
    if value < 0 {
        tracing::warn!(field, value, "negative counter clamped to 0");
        return 0;
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Serialize a record at the current schema version.
///
/// # Errors
///
/// Returns `RecordError::Malformed` if serialization fails.
pub fn encode_progress(record: &ProgressRecord) -> Result<Vec<u8>, RecordError> {
    let envelope = Envelope {
        schema_version: CURRENT_SCHEMA_VERSION,
        data: serde_json::to_value(record)?,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Parse stored bytes, upgrading older schema versions.
///
/// # Errors
///
/// - `Malformed` if the bytes are not a valid envelope or record
/// - `UnsupportedVersion` for version 0 or versions newer than this build
/// - `Migration` if an intermediate upgrade step is missing
pub fn decode_progress(bytes: &[u8]) -> Result<ProgressRecord, RecordError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    let found = envelope.schema_version;
    if found == 0 || found > CURRENT_SCHEMA_VERSION {
        return Err(RecordError::UnsupportedVersion {
            found,
            current: CURRENT_SCHEMA_VERSION,
        });
    }

    let mut version = found;
    let mut data = envelope.data;
    while version < CURRENT_SCHEMA_VERSION {
        let (_, upgrade) = MIGRATIONS
            .iter()
            .find(|(from, _)| *from == version)
            .ok_or(RecordError::Migration(version))?;
        data = upgrade(data)?;
        version += 1;
    }

    Ok(serde_json::from_value(data)?)
}

/// Version 1 named the last checkpoint `last_checkpoint` and tracked neither
/// used questions nor score.
fn upgrade_v1_to_v2(data: Value) -> Result<Value, RecordError> {
    let Value::Object(mut fields) = data else {
        return Err(RecordError::Malformed("version 1 data is not an object".into()));
    };
    let last = fields.remove("last_checkpoint").unwrap_or(Value::Null);
    fields.insert("last_completed_checkpoint".into(), last);
    fields
        .entry("used_question_ids")
        .or_insert_with(|| Value::Array(Vec::new()));
    fields.entry("total_score").or_insert_with(|| Value::from(0));
    fields.entry("last_played_at").or_insert(Value::Null);
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogdog_core::model::CheckpointTable;
    use dogdog_core::time::fixed_now;

    fn played_progress() -> PathProgress {
        let table = CheckpointTable::standard();
        let mut progress = PathProgress::initial(PathId::new("breeds").unwrap());
        for i in 0..12 {
            progress.record_answer(
                &table,
                i % 4 != 0,
                10,
                QuestionId::new(format!("q{i}")).unwrap(),
                fixed_now(),
            );
        }
        progress
    }

    #[test]
    fn encodes_with_current_version() {
        let bytes = encode_progress(&ProgressRecord::from_progress(&played_progress())).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["schema_version"], Value::from(CURRENT_SCHEMA_VERSION));
        assert_eq!(value["data"]["questions_answered"], Value::from(12));
    }

    #[test]
    fn decoded_record_rebuilds_progress() {
        let progress = played_progress();
        let bytes = encode_progress(&ProgressRecord::from_progress(&progress)).unwrap();
        let rebuilt = decode_progress(&bytes).unwrap().into_progress().unwrap();
        assert_eq!(rebuilt, progress);
    }

    #[test]
    fn upgrades_version_one_records() {
        let v1 = br#"{
            "schema_version": 1,
            "data": {
                "path_id": "breeds",
                "questions_answered": 14,
                "correct_answers": 11,
                "completed_checkpoints": [1],
                "last_checkpoint": 1
            }
        }"#;
        let record = decode_progress(v1).unwrap();
        assert_eq!(record.last_completed_checkpoint, Some(1));
        assert!(record.used_question_ids.is_empty());
        assert_eq!(record.total_score, 0);
        assert!(record.last_played_at.is_none());
    }

    #[test]
    fn rejects_future_and_zero_versions() {
        for version in [0, CURRENT_SCHEMA_VERSION + 1] {
            let bytes = format!(r#"{{"schema_version": {version}, "data": {{}}}}"#);
            assert!(matches!(
                decode_progress(bytes.as_bytes()),
                Err(RecordError::UnsupportedVersion { found, .. }) if found == version
            ));
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode_progress(b"{not json"),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(
            decode_progress(br#"{"schema_version": 2, "data": {"path_id": 3}}"#),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn negative_counters_are_clamped() {
        let record = ProgressRecord {
            path_id: "breeds".into(),
            questions_answered: -4,
            correct_answers: -1,
            completed_checkpoints: vec![],
            last_completed_checkpoint: None,
            used_question_ids: vec!["  ".into(), "q1".into()],
            total_score: -50,
            last_played_at: None,
        };
        let progress = record.into_progress().unwrap();
        assert_eq!(progress.questions_answered(), 0);
        assert_eq!(progress.correct_answers(), 0);
        assert_eq!(progress.total_score(), 0);
        assert_eq!(progress.used_question_ids().len(), 1);
    }

    #[test]
    fn key_is_namespaced_by_path() {
        assert_eq!(
            progress_key(&PathId::new("breeds").unwrap()),
            "path_progress:breeds"
        );
    }
}
