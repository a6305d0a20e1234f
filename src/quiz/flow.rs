//! The quiz session controller.
//!
//! [`Controller`] owns everything one chat sees: the setup form, at most one
//! pending generation request, the running [`Session`] and the last accepted
//! quiz (kept for retries). Exactly one [`View`] is current at any time and
//! the presentation layer redraws from it.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::quiz::client::{AcquireError, GenerateRequest};
use crate::quiz::fallback::load_fallback_quiz;
use crate::quiz::session::{Session, SubmitOutcome};
use crate::quiz::{Difficulty, Quiz, QuizError};

/// How long an error or info notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_millis(4500);
pub const COUNT_CHOICES: [u8; 3] = [5, 10, 15];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupForm {
    pub topic: String,
    pub difficulty: Difficulty,
    pub count: u8,
}

impl Default for SetupForm {
    fn default() -> Self {
        Self {
            topic: String::new(),
            difficulty: Difficulty::default(),
            count: COUNT_CHOICES[0],
        }
    }
}

/// The one generation request a controller may have in flight.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: u64,
    pub params: GenerateRequest,
    token: CancellationToken,
}

impl PendingRequest {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug, Clone, Default)]
pub enum View {
    #[default]
    Setup,
    Loading(PendingRequest),
    Active {
        session: Session,
        /// Number of unanswered questions while a submit waits for confirmation.
        confirming: Option<usize>,
    },
    Results(Session),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Setup => "setup",
            View::Loading(_) => "loading",
            View::Active { .. } => "quiz",
            View::Results(_) => "results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Info,
}

/// A transient message for the user, gone [`NOTICE_TTL`] after it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub raised_at: Instant,
}

impl Notice {
    pub fn expires_at(&self) -> Instant {
        self.raised_at + NOTICE_TTL
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("{action} is not available on the {view} screen")]
    Unavailable {
        action: &'static str,
        view: &'static str,
    },
    #[error("there is no previous quiz to retry")]
    NoPriorQuiz,
    #[error("option {index} does not exist for this question")]
    NoSuchOption { index: usize },
    #[error("nothing is waiting for confirmation")]
    NothingToConfirm,
    #[error(transparent)]
    InvalidQuiz(#[from] QuizError),
}

#[derive(Debug, Clone, Default)]
pub struct Controller {
    view: View,
    form: SetupForm,
    show_explanations: bool,
    last_quiz: Option<Arc<Quiz>>,
    notice: Option<Notice>,
    next_request_id: u64,
}

impl Controller {
    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn form(&self) -> &SetupForm {
        &self.form
    }

    pub fn show_explanations(&self) -> bool {
        self.show_explanations
    }

    pub fn has_prior_quiz(&self) -> bool {
        self.last_quiz.is_some()
    }

    fn unavailable(&self, action: &'static str) -> FlowError {
        FlowError::Unavailable {
            action,
            view: self.view.name(),
        }
    }

    fn ensure_setup(&self, action: &'static str) -> Result<(), FlowError> {
        if matches!(self.view, View::Setup) {
            return Ok(());
        }
        Err(self.unavailable(action))
    }

    /// Switches views. Leaving `Loading` cancels whatever was in flight.
    fn set_view(&mut self, view: View) {
        if let View::Loading(pending) = &self.view {
            pending.token.cancel();
        }
        debug!("View {} -> {}", self.view.name(), view.name());
        self.view = view;
    }

    // Setup form

    pub fn set_topic(&mut self, topic: &str) -> Result<(), FlowError> {
        self.ensure_setup("Changing the topic")?;
        self.form.topic = topic.trim().to_string();
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<(), FlowError> {
        self.ensure_setup("Changing the difficulty")?;
        self.form.difficulty = difficulty;
        Ok(())
    }

    pub fn set_count(&mut self, count: u8) -> Result<(), FlowError> {
        self.ensure_setup("Changing the question count")?;
        self.form.count = count;
        Ok(())
    }

    pub fn toggle_explanations(&mut self) {
        self.show_explanations = !self.show_explanations;
    }

    // Acquisition

    /// Moves to `Loading` and hands back the request the caller should run.
    ///
    /// When the form does not validate an error notice is raised instead and
    /// `None` is returned; nothing should be sent in that case.
    pub fn request_generated_quiz(&mut self) -> Result<Option<PendingRequest>, FlowError> {
        self.ensure_setup("Generating a quiz")?;

        let params = match GenerateRequest::new(&self.form.topic, self.form.difficulty, self.form.count) {
            Ok(params) => params,
            Err(e) => {
                self.raise(NoticeKind::Error, e.to_string());
                return Ok(None);
            }
        };

        self.next_request_id += 1;
        let pending = PendingRequest {
            id: self.next_request_id,
            params,
            token: CancellationToken::new(),
        };
        self.set_view(View::Loading(pending.clone()));
        Ok(Some(pending))
    }

    /// Signals the in-flight request. The view changes once the request
    /// reports back through [`Controller::complete_generation`]; cancelling a
    /// second time goes back to `Setup` without waiting for it.
    pub fn cancel_generation(&mut self) -> Result<(), FlowError> {
        let already_cancelled = match &self.view {
            View::Loading(pending) => pending.token.is_cancelled(),
            _ => return Err(self.unavailable("Cancelling")),
        };

        if already_cancelled {
            self.set_view(View::Setup);
            self.raise(NoticeKind::Info, AcquireError::Cancelled.to_string());
        } else if let View::Loading(pending) = &self.view {
            pending.token.cancel();
        }
        Ok(())
    }

    /// Applies the outcome of request `id`. Returns `false` when that request
    /// is no longer the pending one and the outcome was dropped.
    pub fn complete_generation(&mut self, id: u64, outcome: Result<Quiz, AcquireError>) -> bool {
        let cancelled = match &self.view {
            View::Loading(pending) if pending.id == id => pending.token.is_cancelled(),
            _ => {
                debug!("Dropping outcome of stale request {}", id);
                return false;
            }
        };

        if cancelled {
            self.set_view(View::Setup);
            self.raise(NoticeKind::Info, AcquireError::Cancelled.to_string());
            return true;
        }

        match outcome {
            Ok(quiz) => {
                if let Err(e) = self.start(quiz) {
                    self.set_view(View::Setup);
                    self.raise(NoticeKind::Error, e.to_string());
                }
            }
            Err(AcquireError::Cancelled) => {
                self.set_view(View::Setup);
                self.raise(NoticeKind::Info, AcquireError::Cancelled.to_string());
            }
            Err(e) => {
                self.set_view(View::Setup);
                self.raise(NoticeKind::Error, e.to_string());
            }
        }
        true
    }

    pub fn load_fallback_quiz(&mut self) -> Result<(), FlowError> {
        self.ensure_setup("Loading the demo quiz")?;
        self.start(load_fallback_quiz())
    }

    // Session

    pub fn start(&mut self, quiz: Quiz) -> Result<(), FlowError> {
        quiz.validate()?;
        self.start_shared(Arc::new(quiz));
        Ok(())
    }

    fn start_shared(&mut self, quiz: Arc<Quiz>) {
        self.last_quiz = Some(quiz.clone());
        self.set_view(View::Active {
            session: Session::new(quiz),
            confirming: None,
        });
    }

    fn active_session(&mut self, action: &'static str) -> Result<&mut Session, FlowError> {
        let view = self.view.name();
        match &mut self.view {
            View::Active {
                session,
                confirming,
            } => {
                *confirming = None;
                Ok(session)
            }
            _ => Err(FlowError::Unavailable { action, view }),
        }
    }

    pub fn select_answer(&mut self, option: usize) -> Result<(), FlowError> {
        let session = self.active_session("Answering")?;
        if session.select_answer(option) {
            Ok(())
        } else {
            Err(FlowError::NoSuchOption { index: option })
        }
    }

    pub fn go_to(&mut self, delta: isize) -> Result<(), FlowError> {
        self.active_session("Navigating")?.go_to(delta);
        Ok(())
    }

    pub fn restart(&mut self) -> Result<(), FlowError> {
        self.active_session("Restarting")?.restart();
        Ok(())
    }

    /// Finishes the attempt, or asks for confirmation first when questions
    /// are still unanswered.
    pub fn submit(&mut self) -> Result<SubmitOutcome, FlowError> {
        let outcome = self.active_session("Submitting")?.submit();
        match outcome {
            SubmitOutcome::Submitted => self.finish(),
            SubmitOutcome::NeedsConfirmation { unanswered } => {
                if let View::Active { confirming, .. } = &mut self.view {
                    *confirming = Some(unanswered);
                }
            }
        }
        Ok(outcome)
    }

    pub fn confirm_submit(&mut self) -> Result<(), FlowError> {
        match &self.view {
            View::Active {
                confirming: Some(_),
                ..
            } => {
                self.finish();
                Ok(())
            }
            View::Active { .. } => Err(FlowError::NothingToConfirm),
            _ => Err(self.unavailable("Confirming")),
        }
    }

    pub fn dismiss_confirmation(&mut self) -> Result<(), FlowError> {
        self.active_session("Going back")?;
        Ok(())
    }

    fn finish(&mut self) {
        if let View::Active { session, .. } = std::mem::take(&mut self.view) {
            let score = session.compute_score();
            debug!("Quiz finished with {}/{}", score.correct, score.total);
            self.view = View::Results(session);
        }
    }

    pub fn abandon(&mut self) -> Result<(), FlowError> {
        if !matches!(self.view, View::Active { .. }) {
            return Err(self.unavailable("Leaving the quiz"));
        }
        self.set_view(View::Setup);
        Ok(())
    }

    pub fn new_quiz(&mut self) -> Result<(), FlowError> {
        if !matches!(self.view, View::Results(_)) {
            return Err(self.unavailable("Starting over"));
        }
        self.set_view(View::Setup);
        Ok(())
    }

    pub fn retry_same_quiz(&mut self) -> Result<(), FlowError> {
        if matches!(self.view, View::Loading(_) | View::Active { .. }) {
            return Err(self.unavailable("Retrying"));
        }
        let quiz = self.last_quiz.clone().ok_or(FlowError::NoPriorQuiz)?;
        self.start_shared(quiz);
        Ok(())
    }

    // Notices

    pub fn raise(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            text: text.into(),
            raised_at: Instant::now(),
        });
    }

    /// The current notice, or `None` once it expired at `now`.
    pub fn notice_at(&self, now: Instant) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| !n.is_expired_at(now))
    }

    /// Hands the notice to the presentation layer, which removes it again at
    /// [`Notice::expires_at`]. An expired notice is dropped instead.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice
            .take()
            .filter(|n| !n.is_expired_at(Instant::now()))
    }
}
