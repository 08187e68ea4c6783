use super::model::ConsultationRecord;
use crate::diagnosis::DiseaseMatch;
use crate::error::Result;
use async_trait::async_trait;

/// Durable storage for completed consultations.
///
/// Invoked at most once per completed session.
#[async_trait]
pub trait ConsultationSink: Send + Sync {
    async fn save(&self, record: &ConsultationRecord) -> Result<()>;
}

/// Receives the terminal "results are ready" event, exactly once per session.
pub trait NavigationSink: Send + Sync {
    fn on_complete(&self, session_id: &str, results: &[DiseaseMatch]);
}
