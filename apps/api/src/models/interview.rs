use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::session::report::FinalReport;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewReportRow {
    pub interview_id: Uuid,
    pub candidate_name: Option<String>,
    pub position: String,
    pub status: String,
    pub overall_score: f64,
    pub recommendation: String,
    pub report: Json<FinalReport>,
    pub created_at: DateTime<Utc>,
}
