use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::InterviewReportRow;
use crate::session::models::Response;
use crate::session::observer::SessionObserver;
use crate::session::report::FinalReport;

/// PostgreSQL persistence for recorded responses and final reports.
#[derive(Clone)]
pub struct PgInterviewStore {
    db: PgPool,
}

impl PgInterviewStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Archived report for an interview that is no longer live.
    pub async fn fetch_report(&self, interview_id: Uuid) -> Result<Option<FinalReport>, AppError> {
        let row: Option<InterviewReportRow> =
            sqlx::query_as("SELECT * FROM interview_reports WHERE interview_id = $1")
                .bind(interview_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(|r| r.report.0))
    }
}

#[async_trait]
impl SessionObserver for PgInterviewStore {
    async fn on_response_recorded(
        &self,
        interview_id: Uuid,
        response: &Response,
    ) -> anyhow::Result<()> {
        // The engine records each index once; the unique key backs that up across restarts.
        sqlx::query(
            r#"
            INSERT INTO interview_responses
                (interview_id, question_index, question_id, response_text,
                 time_used_seconds, score, feedback, auto_submitted, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (interview_id, question_index) DO NOTHING
            "#,
        )
        .bind(interview_id)
        .bind(response.question_index as i32)
        .bind(&response.question_id)
        .bind(&response.text)
        .bind(response.time_used_seconds as i32)
        .bind(i16::from(response.score))
        .bind(&response.feedback)
        .bind(response.auto_submitted)
        .bind(response.submitted_at)
        .execute(&self.db)
        .await
        .with_context(|| format!("persisting response {} of {interview_id}", response.question_index))?;
        Ok(())
    }

    async fn on_session_finalized(&self, report: &FinalReport) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO interview_reports
                (interview_id, candidate_name, position, status,
                 overall_score, recommendation, report)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (interview_id) DO UPDATE
                SET status = EXCLUDED.status,
                    overall_score = EXCLUDED.overall_score,
                    recommendation = EXCLUDED.recommendation,
                    report = EXCLUDED.report
            "#,
        )
        .bind(report.interview_id)
        .bind(&report.candidate_name)
        .bind(&report.position)
        .bind(report.status.as_str())
        .bind(report.overall_score)
        .bind(report.recommendation.as_str())
        .bind(Json(report))
        .execute(&self.db)
        .await
        .with_context(|| format!("persisting report for {}", report.interview_id))?;

        info!(interview_id = %report.interview_id, "final report archived");
        Ok(())
    }
}
