// src/handlers/attempt.rs

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool, types::Json as SqlJson};

use crate::{
    config::Config,
    error::AppError,
    models::{
        assessment::Assessment,
        attempt::{
            AnswerEntry, AttemptRecord, AttemptResult, AttemptStatus, StartAttemptResponse,
            SubmitAttemptRequest,
        },
        question::{OptionLabel, QuestionRecord},
        violation::{ReportViolationRequest, ViolationReport},
    },
    utils::jwt::Claims,
};

const ATTEMPT_COLUMNS: &str = "id, user_id, assessment_id, started_at, duration_seconds, \
     violation_count, auto_submitted, status, score, correct_count, answers, submitted_at";

/// Outcome of grading a set of answers.
#[derive(Debug, PartialEq, Eq)]
struct Grade {
    score: i64,
    correct_count: i64,
}

/// Awards a question's points when the selected label equals the answer key.
/// Unanswered questions (empty selection) score nothing.
fn grade(questions: &[QuestionRecord], answers: &[AnswerEntry]) -> Grade {
    let mut score = 0;
    let mut correct_count = 0;

    for entry in answers {
        let Some(question) = questions.get(entry.question_index) else {
            continue;
        };
        if OptionLabel::parse(&entry.selected_answer) == Some(question.correct_answer) {
            score += question.points;
            correct_count += 1;
        }
    }

    Grade {
        score,
        correct_count,
    }
}

/// Rejects out-of-range indices, duplicate indices and labels that do not
/// name one of the question's options.
fn check_answers(questions: &[QuestionRecord], answers: &[AnswerEntry]) -> Result<(), AppError> {
    let mut seen = HashSet::new();

    for entry in answers {
        let question = questions.get(entry.question_index).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Question index {} is out of range",
                entry.question_index
            ))
        })?;

        if !seen.insert(entry.question_index) {
            return Err(AppError::BadRequest(format!(
                "Question index {} answered more than once",
                entry.question_index
            )));
        }

        if entry.selected_answer.is_empty() {
            continue;
        }

        match OptionLabel::parse(&entry.selected_answer) {
            Some(label) if label.index() < question.options.len() => {}
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Invalid answer '{}' for question {}",
                    entry.selected_answer, entry.question_index
                )));
            }
        }
    }

    Ok(())
}

pub(crate) async fn fetch_assessment(
    pool: &SqlitePool,
    assessment_id: i64,
) -> Result<Assessment, AppError> {
    sqlx::query_as::<_, Assessment>(
        "SELECT id, title, duration_seconds, questions, created_at FROM assessments WHERE id = ?",
    )
    .bind(assessment_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch assessment {}: {:?}", assessment_id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))
}

async fn fetch_attempt(
    conn: &mut SqliteConnection,
    user_id: i64,
    assessment_id: i64,
) -> Result<Option<AttemptRecord>, AppError> {
    let sql = format!(
        "SELECT {} FROM attempts WHERE user_id = ? AND assessment_id = ?",
        ATTEMPT_COLUMNS
    );

    sqlx::query_as::<_, AttemptRecord>(&sql)
        .bind(user_id)
        .bind(assessment_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch attempt: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })
}

async fn fetch_active_attempt(
    conn: &mut SqliteConnection,
    user_id: i64,
    assessment_id: i64,
) -> Result<AttemptRecord, AppError> {
    let attempt = fetch_attempt(conn, user_id, assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No attempt in progress".to_string()))?;

    if attempt.is_finished() {
        return Err(AppError::Conflict("Attempt already submitted".to_string()));
    }

    Ok(attempt)
}

fn build_result(
    attempt: &AttemptRecord,
    assessment: &Assessment,
    grace_seconds: i64,
) -> Result<AttemptResult, AppError> {
    let (Some(score), Some(correct_count), Some(submitted_at)) =
        (attempt.score, attempt.correct_count, attempt.submitted_at)
    else {
        return Err(AppError::NotFound(
            "Attempt has not been submitted".to_string(),
        ));
    };

    Ok(AttemptResult {
        attempt_id: attempt.id.clone(),
        score,
        total_points: assessment.total_points(),
        correct_count,
        total_questions: assessment.questions.len(),
        violation_count: attempt.violation_count,
        submitted_due_to_violations: attempt.status() == Some(AttemptStatus::AutoSubmitted),
        late: submitted_at > attempt.deadline() + chrono::Duration::seconds(grace_seconds),
        submitted_at,
        answers: attempt.submitted_answers(),
    })
}

/// Starts (or resumes) the caller's attempt at an assessment.
///
/// * A user gets exactly one attempt per assessment.
/// * An attempt still in progress is returned unchanged, so a reload keeps
///   its first start time.
/// * A finished attempt yields 409 Conflict.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let assessment = fetch_assessment(&pool, assessment_id).await?;

    let mut conn = pool.acquire().await?;

    // Concurrent starts collapse onto the same row through the unique key.
    sqlx::query(
        r#"
        INSERT INTO attempts (id, user_id, assessment_id, started_at, duration_seconds)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, assessment_id) DO NOTHING
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(assessment_id)
    .bind(Utc::now())
    .bind(assessment.duration_seconds)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let attempt = fetch_attempt(&mut *conn, user_id, assessment_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Attempt vanished after insert".to_string()))?;

    if attempt.is_finished() {
        return Err(AppError::Conflict(
            "Assessment already attempted".to_string(),
        ));
    }

    tracing::info!(
        attempt_id = %attempt.id,
        user_id,
        assessment_id,
        "Attempt started"
    );

    Ok(Json(StartAttemptResponse {
        attempt: attempt.to_wire(),
        assessment: assessment.to_public(),
    }))
}

/// Records an integrity violation against the caller's active attempt.
///
/// The backend owns the count. Once it reaches the configured threshold the
/// attempt is flagged and every response from then on says `autoSubmitted`.
pub async fn report_violation(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Json(req): Json<ReportViolationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    // The write lock is taken by this first statement, so concurrent reports
    // queue behind it and every one of them is counted.
    let bumped = sqlx::query_as::<_, (String, i64, bool)>(
        r#"
        UPDATE attempts
        SET violation_count = violation_count + 1,
            auto_submitted = (auto_submitted OR violation_count + 1 >= ?)
        WHERE user_id = ? AND assessment_id = ? AND status = 'in_progress'
        RETURNING id, violation_count, auto_submitted
        "#,
    )
    .bind(config.violation_threshold)
    .bind(user_id)
    .bind(assessment_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((attempt_id, violation_count, auto_submitted)) = bumped else {
        return Err(match fetch_attempt(&mut *tx, user_id, assessment_id).await? {
            None => AppError::NotFound("No attempt in progress".to_string()),
            Some(_) => AppError::Conflict("Attempt already submitted".to_string()),
        });
    };

    sqlx::query("INSERT INTO violations (attempt_id, category, reported_at) VALUES (?, ?, ?)")
        .bind(&attempt_id)
        .bind(req.category.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::warn!(
        attempt_id = %attempt_id,
        category = %req.category,
        violation_count,
        auto_submitted,
        "Integrity violation recorded"
    );

    Ok(Json(ViolationReport {
        violation_count,
        auto_submitted,
    }))
}

/// Grades and closes the caller's active attempt.
///
/// Every answer must reference an existing question at most once; an empty
/// selection means unanswered. Late submissions are accepted and flagged.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let assessment = fetch_assessment(&pool, assessment_id).await?;

    check_answers(&assessment.questions, &req.answers)?;

    let mut conn = pool.acquire().await?;
    let attempt = fetch_active_attempt(&mut *conn, user_id, assessment_id).await?;

    let Grade {
        score,
        correct_count,
    } = grade(&assessment.questions, &req.answers);

    let status = if attempt.auto_submitted {
        AttemptStatus::AutoSubmitted
    } else {
        AttemptStatus::Submitted
    };

    // Guarded on status so two racing submits cannot both close the attempt.
    let updated = sqlx::query(
        r#"
        UPDATE attempts
        SET status = ?, score = ?, correct_count = ?, answers = ?, submitted_at = ?
        WHERE id = ? AND status = 'in_progress'
        "#,
    )
    .bind(status.as_str())
    .bind(score)
    .bind(correct_count)
    .bind(SqlJson(&req.answers))
    .bind(Utc::now())
    .bind(&attempt.id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if updated.rows_affected() == 0 {
        return Err(AppError::Conflict("Attempt already submitted".to_string()));
    }

    let stored = fetch_attempt(&mut *conn, user_id, assessment_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Attempt vanished after submit".to_string()))?;
    let result = build_result(&stored, &assessment, config.submit_grace_seconds)?;

    tracing::info!(
        attempt_id = %stored.id,
        score = result.score,
        late = result.late,
        status = status.as_str(),
        "Attempt submitted"
    );

    Ok(Json(result))
}

/// Returns the graded result of the caller's finished attempt.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let assessment = fetch_assessment(&pool, assessment_id).await?;

    let mut conn = pool.acquire().await?;
    let attempt = fetch_attempt(&mut *conn, user_id, assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No attempt found".to_string()))?;

    Ok(Json(build_result(
        &attempt,
        &assessment,
        config.submit_grace_seconds,
    )?))
}
