// src/session/reporter.rs

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    models::violation::{ViolationCategory, ViolationReport},
    session::api::{AttemptApi, with_timeout},
};

/// Forwards violations to the backend and mirrors the count it returns.
///
/// Reporting fails open: a request that does not go through is logged and
/// otherwise ignored, the exam carries on.
pub struct ViolationReporter {
    api: Arc<dyn AttemptApi>,
    assessment_id: i64,
    request_timeout: Duration,
    violation_count: i64,
    last_reported_at: Option<DateTime<Utc>>,
}

/// A report that has been issued but not yet sent. Owns everything it needs,
/// so it can run on a task of its own.
pub struct PendingReport {
    api: Arc<dyn AttemptApi>,
    assessment_id: i64,
    category: ViolationCategory,
    request_timeout: Duration,
}

impl PendingReport {
    pub fn category(&self) -> ViolationCategory {
        self.category
    }

    /// The backend's answer, or `None` when the request failed or timed out.
    pub async fn send(self) -> Option<ViolationReport> {
        let request = self.api.report_violation(self.assessment_id, self.category);
        match with_timeout(self.request_timeout, request).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(category = %self.category, error = %e, "Dropping violation report");
                None
            }
        }
    }
}

impl ViolationReporter {
    pub fn new(api: Arc<dyn AttemptApi>, assessment_id: i64, request_timeout: Duration) -> Self {
        Self {
            api,
            assessment_id,
            request_timeout,
            violation_count: 0,
            last_reported_at: None,
        }
    }

    /// Seeds the cached count, e.g. from a resumed attempt.
    pub fn observe_count(&mut self, count: i64) {
        self.violation_count = self.violation_count.max(count);
    }

    pub fn violation_count(&self) -> i64 {
        self.violation_count
    }

    /// When the most recent report was issued.
    pub fn last_reported_at(&self) -> Option<DateTime<Utc>> {
        self.last_reported_at
    }

    /// Issues a report at `now`. Nothing goes over the wire until the
    /// returned report is sent.
    pub fn begin(&mut self, category: ViolationCategory, now: DateTime<Utc>) -> PendingReport {
        self.last_reported_at = Some(now);
        PendingReport {
            api: self.api.clone(),
            assessment_id: self.assessment_id,
            category,
            request_timeout: self.request_timeout,
        }
    }

    /// Folds a backend answer into the cached count. Answers may arrive out
    /// of order; the count still only grows.
    pub fn record(&mut self, category: ViolationCategory, report: ViolationReport) -> ViolationReport {
        self.observe_count(report.violation_count);
        tracing::info!(
            %category,
            violation_count = self.violation_count,
            auto_submitted = report.auto_submitted,
            "Violation reported"
        );
        ViolationReport {
            violation_count: self.violation_count,
            auto_submitted: report.auto_submitted,
        }
    }

    /// Issues, sends and records one report.
    pub async fn report(
        &mut self,
        category: ViolationCategory,
        now: DateTime<Utc>,
    ) -> Option<ViolationReport> {
        let report = self.begin(category, now).send().await?;
        Some(self.record(category, report))
    }
}
