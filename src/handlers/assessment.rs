// src/handlers/assessment.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError, handlers::attempt::fetch_assessment,
    models::assessment::CreateAssessmentRequest,
};

/// Public summary of an assessment (title, duration, question count).
pub async fn get_assessment(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = fetch_assessment(&pool, id).await?;
    Ok(Json(assessment.summary()))
}

/// Creates a new assessment.
/// Admin only.
pub async fn create_assessment(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.check_answer_keys().map_err(AppError::BadRequest)?;

    let result = sqlx::query(
        r#"
        INSERT INTO assessments (title, duration_seconds, questions, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&payload.title)
    .bind(payload.duration_seconds)
    .bind(SqlJson(&payload.questions))
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create assessment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let id = result.last_insert_rowid();
    tracing::info!(
        assessment_id = id,
        questions = payload.questions.len(),
        "Assessment created"
    );

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}
