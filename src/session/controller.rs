// src/session/controller.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    models::{
        attempt::{Attempt, AttemptResult},
        question::{OptionLabel, Question},
        violation::{ViolationCategory, ViolationReport},
    },
    session::{
        SessionHost, SessionSettings,
        answers::AnswerSheet,
        api::{AttemptApi, with_timeout},
        host::{Clock, Destination, FullscreenControl, Navigator, Notifier},
        monitor::{AntiCheatMonitor, IntegrityEvent},
        reporter::{PendingReport, ViolationReporter},
        timer::{Countdown, Tick, TimerReading},
    },
};

/// Why a submission was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitReason {
    Manual,
    TimerExpired,
    /// The backend crossed the violation threshold.
    Violations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    SubmittedNormally,
    SubmittedDueToViolations,
}

impl From<SubmitReason> for Outcome {
    fn from(reason: SubmitReason) -> Self {
        match reason {
            SubmitReason::Manual | SubmitReason::TimerExpired => Outcome::SubmittedNormally,
            SubmitReason::Violations => Outcome::SubmittedDueToViolations,
        }
    }
}

/// The single source of truth for where a session is.
///
/// Submission guards and the confirmation step live here rather than in
/// separate flags, so no inconsistent combination can exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    InProgress { confirming: bool },
    /// Guard is up: monitor and timer are being torn down or the submit
    /// request is in flight.
    Submitting { reason: SubmitReason },
    /// Submit request failed. Answering is closed, submitting again is allowed.
    SubmitFailed { reason: SubmitReason },
    Terminal(Outcome),
    /// Start failed or the view went away before submission.
    Closed,
}

impl SessionState {
    /// No further events can change the session.
    pub fn is_finished(self) -> bool {
        matches!(self, SessionState::Terminal(_) | SessionState::Closed)
    }

    pub fn is_in_progress(self) -> bool {
        matches!(self, SessionState::InProgress { .. })
    }
}

/// Shown to the user before a manual submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitConfirmation {
    pub answered: usize,
    pub total: usize,
    pub marked: usize,
}

/// Administers one timed, proctored attempt.
pub struct SessionController {
    assessment_id: i64,
    settings: SessionSettings,
    state: SessionState,

    api: Arc<dyn AttemptApi>,
    fullscreen: Arc<dyn FullscreenControl>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,

    monitor: AntiCheatMonitor,
    reporter: ViolationReporter,
    timer: Option<Countdown>,

    attempt: Option<Attempt>,
    questions: Vec<Question>,
    answers: AnswerSheet,
    result: Option<AttemptResult>,

    guard_set_at: Option<DateTime<Utc>>,
    fullscreen_retry_pending: bool,
}

impl SessionController {
    pub fn new(assessment_id: i64, host: SessionHost, settings: SessionSettings) -> Self {
        Self {
            assessment_id,
            state: SessionState::Loading,
            reporter: ViolationReporter::new(
                host.api.clone(),
                assessment_id,
                settings.request_timeout,
            ),
            settings,
            api: host.api,
            fullscreen: host.fullscreen,
            navigator: host.navigator,
            notifier: host.notifier,
            clock: host.clock,
            monitor: AntiCheatMonitor::new(host.observer),
            timer: None,
            attempt: None,
            questions: Vec::new(),
            answers: AnswerSheet::default(),
            result: None,
            guard_set_at: None,
            fullscreen_retry_pending: false,
        }
    }

    pub fn assessment_id(&self) -> i64 {
        self.assessment_id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    pub fn violation_count(&self) -> i64 {
        self.reporter.violation_count()
    }

    pub fn is_confirming(&self) -> bool {
        self.state == SessionState::InProgress { confirming: true }
    }

    /// Submit button is usable: not while a request is in flight.
    pub fn can_submit(&self) -> bool {
        matches!(
            self.state,
            SessionState::InProgress { .. } | SessionState::SubmitFailed { .. }
        )
    }

    pub fn timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(Countdown::is_running)
    }

    pub fn timer_reading(&self) -> Option<TimerReading> {
        self.timer.as_ref().map(|t| t.reading(self.clock.now()))
    }

    /// When the submission guard went up, if it did.
    pub fn guard_set_at(&self) -> Option<DateTime<Utc>> {
        self.guard_set_at
    }

    pub fn last_violation_reported_at(&self) -> Option<DateTime<Utc>> {
        self.reporter.last_reported_at()
    }

    /// Begins the attempt. One shot: a failure closes the session.
    pub async fn start(&mut self) {
        if self.state != SessionState::Loading {
            return;
        }

        let request = self.api.start_attempt(self.assessment_id);
        let started = match with_timeout(self.settings.request_timeout, request).await {
            Ok(started) => started,
            Err(e) => {
                tracing::error!(assessment_id = self.assessment_id, error = %e, "Failed to start attempt");
                self.notifier
                    .alert(&format!("Could not start the assessment: {}", e));
                self.monitor.remove();
                self.state = SessionState::Closed;
                self.navigator.navigate(Destination::Away);
                return;
            }
        };

        let attempt = started.attempt;
        self.questions = started.assessment.questions;
        self.answers = AnswerSheet::new(&self.questions);
        self.reporter.observe_count(attempt.violation_count);

        // A reload after the backend demanded submission: hand in, never resume.
        if attempt.auto_submitted {
            tracing::warn!(
                assessment_id = self.assessment_id,
                attempt_id = %attempt.id,
                violation_count = attempt.violation_count,
                "Attempt already over the violation threshold, submitting"
            );
            self.attempt = Some(attempt);
            self.submit(SubmitReason::Violations).await;
            return;
        }

        self.timer = Some(Countdown::new(
            attempt.started_at,
            attempt.duration_seconds,
            self.settings.low_time_threshold,
        ));

        if let Err(e) = self.monitor.install() {
            tracing::warn!(error = %e, "Integrity observer could not be installed");
        }
        if let Err(e) = self.fullscreen.request().await {
            tracing::warn!(error = %e, "Fullscreen request refused");
        }

        tracing::info!(
            assessment_id = self.assessment_id,
            attempt_id = %attempt.id,
            questions = self.questions.len(),
            duration_seconds = attempt.duration_seconds,
            "Attempt in progress"
        );

        self.attempt = Some(attempt);
        self.state = SessionState::InProgress { confirming: false };
    }

    pub fn set_answer(&mut self, index: usize, label: OptionLabel) -> bool {
        self.state.is_in_progress() && self.answers.set_answer(index, label)
    }

    pub fn clear_answer(&mut self, index: usize) -> bool {
        self.state.is_in_progress() && self.answers.clear_answer(index)
    }

    pub fn toggle_marked_for_review(&mut self, index: usize) -> bool {
        self.state.is_in_progress() && self.answers.toggle_marked(index)
    }

    /// Pure navigation; clamps to the question range.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.answers.go_to(index)
    }

    pub fn next_question(&mut self) -> usize {
        self.answers.next()
    }

    pub fn previous_question(&mut self) -> usize {
        self.answers.previous()
    }

    /// Opens the confirmation step. Does not touch answers.
    pub fn request_manual_submit(&mut self) -> Option<SubmitConfirmation> {
        if !self.state.is_in_progress() {
            return None;
        }
        self.state = SessionState::InProgress { confirming: true };
        Some(self.confirmation())
    }

    pub fn confirmation(&self) -> SubmitConfirmation {
        SubmitConfirmation {
            answered: self.answers.answered_count(),
            total: self.answers.total(),
            marked: self.answers.marked_count(),
        }
    }

    pub fn cancel_submit(&mut self) {
        if self.is_confirming() {
            self.state = SessionState::InProgress { confirming: false };
        }
    }

    /// Submits after confirmation, or retries a failed submission.
    /// Anything else, including a second call while one is in flight, is a no-op.
    pub async fn confirm_submit(&mut self) {
        match self.state {
            SessionState::InProgress { confirming: true } => self.submit(SubmitReason::Manual).await,
            SessionState::SubmitFailed { reason } => self.submit(reason).await,
            state => tracing::debug!(?state, "Ignoring submit confirmation"),
        }
    }

    /// Time is up: submit without asking. Dismisses an open confirmation.
    pub async fn on_timer_expired(&mut self) {
        if self.state.is_in_progress() {
            tracing::info!(assessment_id = self.assessment_id, "Time is up, submitting");
            self.submit(SubmitReason::TimerExpired).await;
        }
    }

    /// The backend demanded submission after too many violations.
    pub async fn on_auto_submit_signal(&mut self) {
        if self.state.is_in_progress() {
            tracing::warn!(
                assessment_id = self.assessment_id,
                violation_count = self.violation_count(),
                "Violation threshold reached, submitting"
            );
            self.submit(SubmitReason::Violations).await;
        }
    }

    /// Re-reads the clock; fires expiry at most once.
    pub async fn on_tick(&mut self) -> Option<TimerReading> {
        if !self.state.is_in_progress() {
            return None;
        }
        let now = self.clock.now();
        match self.timer.as_mut().map(|t| t.tick(now)) {
            Some(Tick::Running(reading)) => Some(reading),
            Some(Tick::Expired) => {
                self.on_timer_expired().await;
                None
            }
            Some(Tick::Stopped) | None => None,
        }
    }

    /// Classifies `event` and, when it is a violation, issues the report for
    /// the caller to send. Nothing is issued once submission has begun.
    pub fn dispatch_integrity_event(&mut self, event: IntegrityEvent) -> Option<PendingReport> {
        if !self.state.is_in_progress() {
            return None;
        }
        let category = self.monitor.classify(event)?;
        Some(self.reporter.begin(category, self.clock.now()))
    }

    /// Applies the backend's answer to a report sent earlier. `None` means
    /// the report was dropped.
    pub async fn on_violation_reported(
        &mut self,
        category: ViolationCategory,
        report: Option<ViolationReport>,
    ) {
        let report = report.map(|r| self.reporter.record(category, r));
        if !self.state.is_in_progress() {
            return;
        }

        if report.is_some_and(|r| r.auto_submitted) {
            self.on_auto_submit_signal().await;
            return;
        }

        if category == ViolationCategory::FullscreenExit {
            self.fullscreen_retry_pending = true;
        }
    }

    /// Dispatches, sends and applies one report in place.
    pub async fn on_integrity_event(&mut self, event: IntegrityEvent) {
        let Some(pending) = self.dispatch_integrity_event(event) else {
            return;
        };
        let category = pending.category();
        let report = pending.send().await;
        self.on_violation_reported(category, report).await;
    }

    /// Returns true once after a fullscreen exit was reported.
    pub fn take_fullscreen_retry(&mut self) -> bool {
        std::mem::take(&mut self.fullscreen_retry_pending)
    }

    /// Best-effort attempt to bring the user back into fullscreen.
    pub async fn on_fullscreen_retry(&mut self) {
        if !self.state.is_in_progress() || self.fullscreen.is_active() {
            return;
        }
        if let Err(e) = self.fullscreen.request().await {
            tracing::debug!(error = %e, "Fullscreen re-request refused");
        }
    }

    /// The view is going away. Releases listeners and the timer, never submits.
    pub fn teardown(&mut self) {
        self.monitor.remove();
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
        if !self.state.is_finished() {
            tracing::info!(state = ?self.state, "Session torn down without submission");
            self.state = SessionState::Closed;
        }
    }

    async fn submit(&mut self, reason: SubmitReason) {
        // Guard first: nothing below may be reported as a violation.
        self.state = SessionState::Submitting { reason };
        if self.guard_set_at.is_none() {
            self.guard_set_at = Some(self.clock.now());
        }
        self.monitor.pause();
        self.monitor.remove();
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
        self.fullscreen_retry_pending = false;

        if self.fullscreen.is_active() {
            if let Err(e) = self.fullscreen.exit().await {
                tracing::warn!(error = %e, "Could not leave fullscreen before submitting");
            }
        }

        let entries = self.answers.to_entries();
        let request = self.api.submit_attempt(self.assessment_id, entries);
        match with_timeout(self.settings.request_timeout, request).await {
            Ok(result) => {
                let outcome = Outcome::from(reason);
                tracing::info!(
                    assessment_id = self.assessment_id,
                    ?outcome,
                    score = result.score,
                    "Attempt submitted"
                );
                self.result = Some(result);
                self.state = SessionState::Terminal(outcome);
                self.navigator.navigate(match outcome {
                    Outcome::SubmittedNormally => Destination::Submitted {
                        assessment_id: self.assessment_id,
                    },
                    Outcome::SubmittedDueToViolations => Destination::Results {
                        assessment_id: self.assessment_id,
                    },
                });
            }
            Err(e) => {
                tracing::error!(assessment_id = self.assessment_id, error = %e, "Submission failed");
                self.state = SessionState::SubmitFailed { reason };
                self.notifier
                    .alert(&format!("Submitting the assessment failed: {}. Please try again.", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::AnswerEntry;
    use crate::session::testing::{Harness, t0};
    use chrono::Duration;

    fn entry(index: usize, answer: &str) -> AnswerEntry {
        AnswerEntry {
            question_index: index,
            selected_answer: answer.to_string(),
        }
    }

    async fn started(harness: &Harness) -> SessionController {
        let mut controller = harness.controller();
        controller.start().await;
        assert_eq!(controller.state(), SessionState::InProgress { confirming: false });
        controller
    }

    #[tokio::test]
    async fn test_start_installs_monitor_and_timer() {
        let harness = Harness::new(|api| api);
        let controller = started(&harness).await;

        assert_eq!(controller.questions().len(), 5);
        assert_eq!(controller.answers().answered_count(), 0);
        assert!(controller.timer_running());
        assert_eq!(controller.timer_reading().unwrap().remaining_seconds, 600);
        assert_eq!(
            harness.journal.entries(),
            vec!["api.start", "observer.install", "fullscreen.request"]
        );
    }

    #[tokio::test]
    async fn test_start_failure_alerts_and_leaves() {
        let harness = Harness::new(|api| api.failing_start());
        let mut controller = harness.controller();
        controller.start().await;

        assert_eq!(controller.state(), SessionState::Closed);
        assert_eq!(harness.notifier.alerts().len(), 1);
        assert_eq!(harness.navigator.destinations(), vec![Destination::Away]);
        assert_eq!(harness.journal.count("observer.install"), 0);
        assert_eq!(harness.journal.count("api.start"), 1);
    }

    #[tokio::test]
    async fn test_manual_submit_scenario() {
        let harness = Harness::new(|api| api);
        let mut controller = started(&harness).await;

        controller.set_answer(0, OptionLabel::A);
        controller.set_answer(1, OptionLabel::B);
        controller.set_answer(2, OptionLabel::C);
        controller.toggle_marked_for_review(3);

        let confirmation = controller.request_manual_submit().unwrap();
        assert_eq!(confirmation.answered, 3);
        assert_eq!(confirmation.total, 5);
        assert_eq!(confirmation.marked, 1);

        controller.confirm_submit().await;

        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));
        assert_eq!(
            harness.api.submissions(),
            vec![vec![
                entry(0, "A"),
                entry(1, "B"),
                entry(2, "C"),
                entry(3, ""),
                entry(4, "")
            ]]
        );
        assert_eq!(
            harness.navigator.destinations(),
            vec![Destination::Submitted { assessment_id: 42 }]
        );
    }

    #[tokio::test]
    async fn test_confirm_requires_request() {
        let harness = Harness::new(|api| api);
        let mut controller = started(&harness).await;

        controller.confirm_submit().await;
        assert!(controller.state().is_in_progress());

        controller.request_manual_submit();
        controller.cancel_submit();
        controller.confirm_submit().await;
        assert!(controller.state().is_in_progress());
        assert_eq!(harness.journal.count("api.submit"), 0);
    }

    #[tokio::test]
    async fn test_second_confirm_is_noop() {
        let harness = Harness::new(|api| api);
        let mut controller = started(&harness).await;

        controller.request_manual_submit();
        controller.confirm_submit().await;
        controller.confirm_submit().await;
        assert!(controller.request_manual_submit().is_none());

        assert_eq!(harness.journal.count("api.submit"), 1);
    }

    #[tokio::test]
    async fn test_three_tab_switches_force_submit() {
        let harness = Harness::new(|api| api.auto_submit_at(3));
        let mut controller = started(&harness).await;
        controller.set_answer(0, OptionLabel::D);

        for _ in 0..3 {
            controller.on_integrity_event(IntegrityEvent::VisibilityHidden).await;
        }

        assert_eq!(
            controller.state(),
            SessionState::Terminal(Outcome::SubmittedDueToViolations)
        );
        assert_eq!(controller.violation_count(), 3);
        assert_eq!(harness.journal.count("api.violation:tab_switch"), 3);
        assert_eq!(harness.api.submissions()[0][0], entry(0, "D"));
        assert_eq!(
            harness.navigator.destinations(),
            vec![Destination::Results { assessment_id: 42 }]
        );

        // Nothing can be changed afterwards.
        assert!(!controller.set_answer(1, OptionLabel::A));
        assert!(!controller.toggle_marked_for_review(1));
        assert!(!controller.answers().is_marked(1));
        controller.on_integrity_event(IntegrityEvent::VisibilityHidden).await;
        assert_eq!(harness.journal.count("api.violation:tab_switch"), 3);
    }

    #[tokio::test]
    async fn test_timer_expiry_submits_exactly_once() {
        let harness = Harness::new(|api| api.with_duration(60));
        let mut controller = started(&harness).await;

        harness.clock.advance(Duration::seconds(59));
        assert_eq!(controller.on_tick().await.unwrap().remaining_seconds, 1);

        harness.clock.advance(Duration::seconds(1));
        controller.on_tick().await;
        controller.on_tick().await;
        controller.on_timer_expired().await;
        controller.on_timer_expired().await;

        assert_eq!(harness.journal.count("api.submit"), 1);
        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));
        assert!(!controller.timer_running());
    }

    #[tokio::test]
    async fn test_timer_expiry_while_confirming() {
        let harness = Harness::new(|api| api.with_duration(30));
        let mut controller = started(&harness).await;

        controller.request_manual_submit();
        assert!(controller.is_confirming());

        harness.clock.advance(Duration::seconds(31));
        controller.on_tick().await;

        assert!(!controller.is_confirming());
        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));
        assert_eq!(harness.journal.count("api.submit"), 1);
    }

    #[tokio::test]
    async fn test_teardown_order_before_submit() {
        let harness = Harness::new(|api| api);
        let mut controller = started(&harness).await;

        controller.request_manual_submit();
        controller.confirm_submit().await;

        let pause = harness.journal.position("observer.pause").unwrap();
        let remove = harness.journal.position("observer.remove").unwrap();
        let exit = harness.journal.position("fullscreen.exit").unwrap();
        let submit = harness.journal.position("api.submit").unwrap();
        assert!(pause < remove && remove < exit && exit < submit);
    }

    #[tokio::test]
    async fn test_no_violation_after_guard() {
        let harness = Harness::new(|api| api.auto_submit_at(2));
        let mut controller = started(&harness).await;

        harness.clock.advance(Duration::seconds(5));
        controller.on_integrity_event(IntegrityEvent::WindowBlur).await;
        harness.clock.advance(Duration::seconds(5));
        controller.on_integrity_event(IntegrityEvent::Copy).await;
        harness.clock.advance(Duration::seconds(5));
        // Fullscreen exit caused by the submission's own teardown.
        controller.on_integrity_event(IntegrityEvent::FullscreenExited).await;

        let guard = controller.guard_set_at().unwrap();
        assert!(controller.last_violation_reported_at().unwrap() <= guard);
        assert_eq!(harness.journal.count("api.violation:fullscreen_exit"), 0);
    }

    #[tokio::test]
    async fn test_failed_violation_report_keeps_exam_running() {
        let harness = Harness::new(|api| api.failing_violations());
        let mut controller = started(&harness).await;

        controller.on_integrity_event(IntegrityEvent::ContextMenu).await;

        assert!(controller.state().is_in_progress());
        assert!(harness.notifier.alerts().is_empty());
        assert_eq!(controller.violation_count(), 0);
    }

    #[tokio::test]
    async fn test_violation_count_is_monotonic() {
        let harness = Harness::new(|api| api.with_violation_counts(&[1, 3, 2, 4]));
        let mut controller = started(&harness).await;

        let mut counts = Vec::new();
        for _ in 0..4 {
            controller.on_integrity_event(IntegrityEvent::WindowBlur).await;
            counts.push(controller.violation_count());
        }
        assert_eq!(counts, vec![1, 3, 3, 4]);
    }

    #[tokio::test]
    async fn test_submit_failure_allows_retry_only() {
        let harness = Harness::new(|api| api.failing_submits(1));
        let mut controller = started(&harness).await;
        controller.set_answer(0, OptionLabel::B);

        controller.request_manual_submit();
        controller.confirm_submit().await;

        assert_eq!(
            controller.state(),
            SessionState::SubmitFailed {
                reason: SubmitReason::Manual
            }
        );
        assert_eq!(harness.notifier.alerts().len(), 1);
        assert!(controller.can_submit());
        assert!(!controller.timer_running());
        assert!(!controller.set_answer(1, OptionLabel::A));

        // Timer and monitor stay down.
        harness.clock.advance(Duration::seconds(601));
        controller.on_tick().await;
        controller.on_integrity_event(IntegrityEvent::VisibilityHidden).await;
        assert_eq!(harness.journal.count("api.submit"), 1);
        assert_eq!(harness.journal.count("api.violation:tab_switch"), 0);

        controller.confirm_submit().await;
        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));
        assert_eq!(harness.api.submissions(), vec![controller.answers().to_entries()]);
        assert_eq!(harness.journal.count("observer.remove"), 1);
    }

    #[tokio::test]
    async fn test_fullscreen_exit_failure_does_not_block_submit() {
        let harness = Harness::with_fullscreen(|api| api, |f| f.failing_exit());
        let mut controller = started(&harness).await;

        controller.on_timer_expired().await;

        assert_eq!(harness.journal.count("fullscreen.exit"), 1);
        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));
    }

    #[tokio::test]
    async fn test_fullscreen_exit_schedules_one_retry() {
        let harness = Harness::new(|api| api);
        let mut controller = started(&harness).await;

        harness.fullscreen.drop_out();
        controller.on_integrity_event(IntegrityEvent::FullscreenExited).await;
        assert!(controller.take_fullscreen_retry());
        assert!(!controller.take_fullscreen_retry());

        controller.on_fullscreen_retry().await;
        assert_eq!(harness.journal.count("fullscreen.request"), 2);
        assert!(harness.fullscreen.is_active());
    }

    #[tokio::test]
    async fn test_teardown_never_submits() {
        let harness = Harness::new(|api| api);
        let mut controller = started(&harness).await;

        controller.teardown();
        controller.teardown();

        assert_eq!(controller.state(), SessionState::Closed);
        assert_eq!(harness.journal.count("observer.remove"), 1);
        assert_eq!(harness.journal.count("api.submit"), 0);
        assert!(!controller.timer_running());
    }

    #[tokio::test]
    async fn test_navigation_clamps_and_keeps_answers() {
        let harness = Harness::new(|api| api);
        let mut controller = started(&harness).await;

        controller.set_answer(4, OptionLabel::C);
        assert_eq!(controller.go_to(99), 4);
        assert_eq!(controller.go_to(2), 2);
        assert_eq!(controller.answers().answer(4), Some(OptionLabel::C));
    }

    #[tokio::test]
    async fn test_flagged_attempt_is_submitted_on_start() {
        let harness = Harness::new(|api| api.resuming_flagged());
        let mut controller = harness.controller();
        controller.start().await;

        assert_eq!(
            controller.state(),
            SessionState::Terminal(Outcome::SubmittedDueToViolations)
        );
        assert_eq!(controller.violation_count(), 3);
        assert!(!controller.timer_running());
        assert!(!controller.set_answer(0, OptionLabel::A));
        assert!(!controller.toggle_marked_for_review(0));
        assert_eq!(harness.journal.entries(), vec!["api.start", "api.submit"]);
        assert_eq!(
            harness.navigator.destinations(),
            vec![Destination::Results { assessment_id: 42 }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_submit_fails_after_timeout() {
        let harness = Harness::new(|api| api.stalling_submits(1));
        let mut controller = started(&harness).await;

        controller.request_manual_submit();
        controller.confirm_submit().await;

        assert_eq!(
            controller.state(),
            SessionState::SubmitFailed {
                reason: SubmitReason::Manual
            }
        );
        assert_eq!(harness.notifier.alerts().len(), 1);
        assert!(controller.can_submit());

        controller.confirm_submit().await;
        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));
        assert_eq!(harness.journal.count("api.submit"), 2);
    }

    #[tokio::test]
    async fn test_report_answered_after_guard_only_updates_count() {
        let harness = Harness::new(|api| api.auto_submit_at(1));
        let mut controller = started(&harness).await;

        let pending = controller
            .dispatch_integrity_event(IntegrityEvent::WindowBlur)
            .unwrap();
        controller.on_timer_expired().await;
        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));

        // The answer demands submission, but one already went through.
        let category = pending.category();
        let report = pending.send().await;
        controller.on_violation_reported(category, report).await;

        assert_eq!(controller.violation_count(), 1);
        assert_eq!(controller.state(), SessionState::Terminal(Outcome::SubmittedNormally));
        assert_eq!(harness.journal.count("api.submit"), 1);
        assert!(controller.dispatch_integrity_event(IntegrityEvent::WindowBlur).is_none());
    }

    #[tokio::test]
    async fn test_remaining_time_follows_clock_from_start() {
        let harness = Harness::new(|api| api);
        let controller = started(&harness).await;

        // Nothing ticked, yet the reading reflects elapsed wall time.
        harness.clock.advance(Duration::seconds(400));
        let reading = controller.timer_reading().unwrap();
        assert_eq!(reading.remaining_seconds, 200);
        assert!(reading.running_out);
        assert_eq!(controller.attempt().unwrap().started_at, t0());
    }
}
