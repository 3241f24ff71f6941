// src/session/driver.rs

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    models::{
        question::OptionLabel,
        violation::{ViolationCategory, ViolationReport},
    },
    session::{
        controller::{SessionController, SessionState, SubmitConfirmation},
        monitor::IntegrityEvent,
        timer::TimerReading,
    },
};

const EVENT_BUFFER: usize = 64;

/// Input to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Integrity(IntegrityEvent),
    SetAnswer { index: usize, label: OptionLabel },
    ClearAnswer(usize),
    ToggleMarked(usize),
    GoTo(usize),
    Next,
    Previous,
    RequestSubmit,
    CancelSubmit,
    ConfirmSubmit,
    /// The view is going away.
    Unmount,
}

/// Events the driver schedules for itself.
#[derive(Debug)]
enum Deferred {
    RetryFullscreen,
    /// A violation report came back (or was dropped).
    Reported {
        category: ViolationCategory,
        report: Option<ViolationReport>,
    },
}

/// Snapshot published after every handled event, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub state: SessionState,
    pub current: usize,
    pub answered: usize,
    pub total: usize,
    pub violation_count: i64,
    pub timer: Option<TimerReading>,
    /// Present while the confirmation step is open.
    pub confirmation: Option<SubmitConfirmation>,
    /// False while a submission is in flight.
    pub can_submit: bool,
}

impl SessionView {
    fn of(controller: &SessionController) -> Self {
        Self {
            state: controller.state(),
            current: controller.answers().current(),
            answered: controller.answers().answered_count(),
            total: controller.answers().total(),
            violation_count: controller.violation_count(),
            timer: controller.timer_reading().filter(|_| controller.timer_running()),
            confirmation: controller
                .is_confirming()
                .then(|| controller.confirmation()),
            can_submit: controller.can_submit(),
        }
    }
}

/// Handle to a session running on its own task.
pub struct SessionHandle {
    pub events: mpsc::Sender<SessionEvent>,
    pub view: watch::Receiver<SessionView>,
    pub task: JoinHandle<SessionController>,
}

impl SessionHandle {
    /// Unmounts (if still running) and waits for the controller back.
    pub async fn finish(self) -> Result<SessionController, tokio::task::JoinError> {
        let _ = self.events.send(SessionEvent::Unmount).await;
        self.task.await
    }
}

/// Starts the attempt and runs the session loop on a new task.
pub fn spawn(controller: SessionController) -> SessionHandle {
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (view_tx, view_rx) = watch::channel(SessionView::of(&controller));
    let task = tokio::spawn(run(controller, events_rx, view_tx));

    SessionHandle {
        events: events_tx,
        view: view_rx,
        task,
    }
}

/// Session loop: one event at a time, in arrival order.
///
/// Violation reports are sent from their own tasks and come back as deferred
/// events, so answering and the countdown carry on while one is outstanding.
/// Submissions are awaited inside the loop: an event arriving while one is in
/// flight is handled after it settles, against the new state.
pub async fn run(
    mut controller: SessionController,
    mut events: mpsc::Receiver<SessionEvent>,
    view: watch::Sender<SessionView>,
) -> SessionController {
    controller.start().await;
    view.send_replace(SessionView::of(&controller));

    let (deferred_tx, mut deferred_rx) = mpsc::unbounded_channel();
    let mut ticker = time::interval(controller.settings().tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !controller.state().is_finished() {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Unmount) | None => controller.teardown(),
                Some(event) => handle(&mut controller, event, &deferred_tx).await,
            },
            _ = ticker.tick(), if controller.timer_running() => {
                controller.on_tick().await;
            }
            Some(deferred) = deferred_rx.recv() => match deferred {
                Deferred::RetryFullscreen => controller.on_fullscreen_retry().await,
                Deferred::Reported { category, report } => {
                    controller.on_violation_reported(category, report).await;
                }
            },
        }

        if controller.take_fullscreen_retry() {
            let tx = deferred_tx.clone();
            let delay = controller.settings().fullscreen_retry_delay;
            tokio::spawn(async move {
                time::sleep(delay).await;
                let _ = tx.send(Deferred::RetryFullscreen);
            });
        }

        view.send_replace(SessionView::of(&controller));
    }

    controller
}

async fn handle(
    controller: &mut SessionController,
    event: SessionEvent,
    deferred: &mpsc::UnboundedSender<Deferred>,
) {
    match event {
        SessionEvent::Integrity(event) => {
            if let Some(pending) = controller.dispatch_integrity_event(event) {
                let tx = deferred.clone();
                tokio::spawn(async move {
                    let category = pending.category();
                    let report = pending.send().await;
                    let _ = tx.send(Deferred::Reported { category, report });
                });
            }
        }
        SessionEvent::SetAnswer { index, label } => {
            controller.set_answer(index, label);
        }
        SessionEvent::ClearAnswer(index) => {
            controller.clear_answer(index);
        }
        SessionEvent::ToggleMarked(index) => {
            controller.toggle_marked_for_review(index);
        }
        SessionEvent::GoTo(index) => {
            controller.go_to(index);
        }
        SessionEvent::Next => {
            controller.next_question();
        }
        SessionEvent::Previous => {
            controller.previous_question();
        }
        SessionEvent::RequestSubmit => {
            controller.request_manual_submit();
        }
        SessionEvent::CancelSubmit => controller.cancel_submit(),
        SessionEvent::ConfirmSubmit => controller.confirm_submit().await,
        SessionEvent::Unmount => controller.teardown(),
    }
}
