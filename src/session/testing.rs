// src/session/testing.rs
//
// In-process fakes for the session collaborators. Every fake writes what it
// was asked to do into a shared journal so tests can assert on ordering.

use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    error::SessionError,
    models::{
        assessment::PublicAssessment,
        attempt::{AnswerEntry, Attempt, AttemptResult, StartAttemptResponse},
        question::Question,
        violation::{ViolationCategory, ViolationReport},
    },
    session::{
        SessionHost, SessionSettings,
        api::AttemptApi,
        controller::SessionController,
        host::{Clock, Destination, FullscreenControl, Navigator, Notifier},
        monitor::IntegrityObserver,
    },
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    /// Position of the first matching entry.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

pub struct FakeApi {
    journal: Journal,
    questions: usize,
    duration_seconds: i64,
    start_fails: bool,
    scripted_counts: Mutex<VecDeque<i64>>,
    auto_submit_at: Option<i64>,
    violations_fail: bool,
    violation_delay: Option<std::time::Duration>,
    flagged_on_start: bool,
    submit_failures: AtomicU32,
    submit_stalls: AtomicU32,
    violation_calls: AtomicI64,
    submissions: Mutex<Vec<Vec<AnswerEntry>>>,
}

impl FakeApi {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            questions: 5,
            duration_seconds: 600,
            start_fails: false,
            scripted_counts: Mutex::new(VecDeque::new()),
            auto_submit_at: None,
            violations_fail: false,
            violation_delay: None,
            flagged_on_start: false,
            submit_failures: AtomicU32::new(0),
            submit_stalls: AtomicU32::new(0),
            violation_calls: AtomicI64::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_questions(mut self, questions: usize) -> Self {
        self.questions = questions;
        self
    }

    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.start_fails = true;
        self
    }

    /// Counts returned by successive violation reports.
    pub fn with_violation_counts(self, counts: &[i64]) -> Self {
        self.scripted_counts.lock().unwrap().extend(counts.iter().copied());
        self
    }

    pub fn auto_submit_at(mut self, count: i64) -> Self {
        self.auto_submit_at = Some(count);
        self
    }

    pub fn failing_violations(mut self) -> Self {
        self.violations_fail = true;
        self
    }

    /// Every violation report takes `delay` (tokio time) to answer.
    pub fn slow_violations(mut self, delay: std::time::Duration) -> Self {
        self.violation_delay = Some(delay);
        self
    }

    /// Start hands back an attempt already over the violation threshold.
    pub fn resuming_flagged(mut self) -> Self {
        self.flagged_on_start = true;
        self
    }

    /// The first `n` submit calls hang for an hour before answering.
    pub fn stalling_submits(self, n: u32) -> Self {
        self.submit_stalls.store(n, Ordering::SeqCst);
        self
    }

    /// The first `n` submit calls fail.
    pub fn failing_submits(self, n: u32) -> Self {
        self.submit_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn submissions(&self) -> Vec<Vec<AnswerEntry>> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttemptApi for FakeApi {
    async fn start_attempt(&self, assessment_id: i64) -> Result<StartAttemptResponse, SessionError> {
        self.journal.push("api.start");
        if self.start_fails {
            return Err(SessionError::Status {
                status: 409,
                message: "Assessment already attempted".to_string(),
            });
        }

        let questions = (0..self.questions)
            .map(|index| Question {
                index,
                text: format!("Question {}", index),
                options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
                points: 1,
            })
            .collect();

        Ok(StartAttemptResponse {
            attempt: Attempt {
                id: "attempt-1".to_string(),
                started_at: t0(),
                duration_seconds: self.duration_seconds,
                violation_count: if self.flagged_on_start { 3 } else { 0 },
                auto_submitted: self.flagged_on_start,
            },
            assessment: PublicAssessment {
                id: assessment_id,
                title: "Sample".to_string(),
                duration_seconds: self.duration_seconds,
                questions,
            },
        })
    }

    async fn report_violation(
        &self,
        _assessment_id: i64,
        category: ViolationCategory,
    ) -> Result<ViolationReport, SessionError> {
        self.journal.push(format!("api.violation:{}", category));
        if let Some(delay) = self.violation_delay {
            tokio::time::sleep(delay).await;
        }
        if self.violations_fail {
            return Err(SessionError::Network("connection reset".to_string()));
        }

        let call = self.violation_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let violation_count = self.scripted_counts.lock().unwrap().pop_front().unwrap_or(call);
        Ok(ViolationReport {
            violation_count,
            auto_submitted: self.auto_submit_at.is_some_and(|at| violation_count >= at),
        })
    }

    async fn submit_attempt(
        &self,
        _assessment_id: i64,
        answers: Vec<AnswerEntry>,
    ) -> Result<AttemptResult, SessionError> {
        self.journal.push("api.submit");
        let stalls = self.submit_stalls.load(Ordering::SeqCst);
        if stalls > 0 {
            self.submit_stalls.store(stalls - 1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
        let remaining = self.submit_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.submit_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SessionError::Network("timed out".to_string()));
        }

        let answered = answers.iter().filter(|a| !a.selected_answer.is_empty()).count();
        self.submissions.lock().unwrap().push(answers.clone());
        Ok(AttemptResult {
            attempt_id: "attempt-1".to_string(),
            score: answered as i64,
            total_points: self.questions as i64,
            correct_count: answered as i64,
            total_questions: self.questions,
            violation_count: self.violation_calls.load(Ordering::SeqCst),
            submitted_due_to_violations: false,
            late: false,
            submitted_at: t0(),
            answers,
        })
    }
}

pub struct RecordingObserver {
    journal: Journal,
}

impl RecordingObserver {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl IntegrityObserver for RecordingObserver {
    fn install(&mut self) -> Result<(), String> {
        self.journal.push("observer.install");
        Ok(())
    }

    fn pause(&mut self) {
        self.journal.push("observer.pause");
    }

    fn remove(&mut self) {
        self.journal.push("observer.remove");
    }
}

pub struct FakeFullscreen {
    journal: Journal,
    active: AtomicBool,
    exit_fails: bool,
}

impl FakeFullscreen {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            active: AtomicBool::new(false),
            exit_fails: false,
        }
    }

    pub fn failing_exit(mut self) -> Self {
        self.exit_fails = true;
        self
    }

    /// The user pressed Escape.
    pub fn drop_out(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl FullscreenControl for FakeFullscreen {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn request(&self) -> Result<(), String> {
        self.journal.push("fullscreen.request");
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn exit(&self) -> Result<(), String> {
        self.journal.push("fullscreen.exit");
        if self.exit_fails {
            return Err("not allowed".to_string());
        }
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator(Mutex<Vec<Destination>>);

impl RecordingNavigator {
    pub fn destinations(&self) -> Vec<Destination> {
        self.0.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.0.lock().unwrap().push(destination);
    }
}

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<String>>);

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// Clock moved by hand.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// One controller wired to fakes.
pub struct Harness {
    pub journal: Journal,
    pub api: Arc<FakeApi>,
    pub clock: Arc<ManualClock>,
    pub fullscreen: Arc<FakeFullscreen>,
    pub navigator: Arc<RecordingNavigator>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(configure: impl FnOnce(FakeApi) -> FakeApi) -> Self {
        Self::with_fullscreen(configure, |f| f)
    }

    pub fn with_fullscreen(
        configure: impl FnOnce(FakeApi) -> FakeApi,
        fullscreen: impl FnOnce(FakeFullscreen) -> FakeFullscreen,
    ) -> Self {
        let journal = Journal::default();
        Self {
            api: Arc::new(configure(FakeApi::new(&journal))),
            clock: Arc::new(ManualClock::starting_at(t0())),
            fullscreen: Arc::new(fullscreen(FakeFullscreen::new(&journal))),
            navigator: Arc::new(RecordingNavigator::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            journal,
        }
    }

    pub fn controller(&self) -> SessionController {
        let host = SessionHost {
            api: self.api.clone(),
            observer: Box::new(RecordingObserver::new(&self.journal)),
            fullscreen: self.fullscreen.clone(),
            navigator: self.navigator.clone(),
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
        };
        SessionController::new(42, host, SessionSettings::default())
    }
}
