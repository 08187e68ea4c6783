//! TOML-backed consultation store.

use crate::paths::MedicheckPaths;
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use medicheck_core::consultation::{ConsultationRecord, ConsultationSink};
use medicheck_core::error::{MedicheckError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each completed consultation as its own TOML file.
///
/// ```text
/// consultations/
/// ├── <session-id-1>.toml
/// └── <session-id-2>.toml
/// ```
pub struct TomlConsultationRepository {
    base_dir: PathBuf,
}

impl TomlConsultationRepository {
    /// Creates a repository rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Creates a repository in the platform data directory.
    pub fn default_location() -> Result<Self> {
        Self::new(MedicheckPaths::consultations_dir()?)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_for(&self, session_id: &str) -> Result<AtomicTomlFile<ConsultationRecord>> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.starts_with('.')
        {
            return Err(MedicheckError::internal(format!(
                "Invalid consultation session id: {:?}",
                session_id
            )));
        }
        Ok(AtomicTomlFile::new(
            self.base_dir.join(format!("{}.toml", session_id)),
        ))
    }

    pub fn find_by_id(&self, session_id: &str) -> Result<Option<ConsultationRecord>> {
        self.file_for(session_id)?.load()
    }

    /// Returns every stored consultation, most recent first.
    ///
    /// Unreadable files are logged and skipped.
    pub fn list_all(&self) -> Result<Vec<ConsultationRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match AtomicTomlFile::<ConsultationRecord>::new(path.clone()).load() {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("[ConsultationRepository] Skipping {:?}: {}", path, e);
                }
            }
        }
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(records)
    }
}

#[async_trait]
impl ConsultationSink for TomlConsultationRepository {
    async fn save(&self, record: &ConsultationRecord) -> Result<()> {
        self.file_for(&record.session_id)?.save(record)?;
        tracing::info!(
            "[ConsultationRepository] Saved consultation {} ({} results, urgency {})",
            record.session_id,
            record.diagnosis_results.len(),
            record.urgency_level
        );
        Ok(())
    }
}
