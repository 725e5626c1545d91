use async_trait::async_trait;
use uuid::Uuid;

use crate::session::models::Response;
use crate::session::report::FinalReport;

/// Receives engine notifications for durability. Failures are logged by the
/// engine and never block the session.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn on_response_recorded(
        &self,
        interview_id: Uuid,
        response: &Response,
    ) -> anyhow::Result<()>;

    async fn on_session_finalized(&self, report: &FinalReport) -> anyhow::Result<()>;
}
