use std::fmt;
use std::str::FromStr;

use crate::quiz::flow::{Controller, FlowError, PendingRequest};
use crate::quiz::Difficulty;

/// Everything a keyboard button can ask for. Encoded as callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Difficulty(Difficulty),
    Count(u8),
    Generate,
    Demo,
    Cancel,
    Select(usize),
    Move(isize),
    Submit,
    ConfirmSubmit,
    KeepAnswering,
    Restart,
    Abandon,
    ToggleExplanations,
    Retry,
    NewQuiz,
    Noop,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action {0:?}")]
pub struct UnknownAction(String);

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Difficulty(d) => write!(f, "difficulty:{}", d),
            Action::Count(c) => write!(f, "count:{}", c),
            Action::Generate => f.write_str("generate"),
            Action::Demo => f.write_str("demo"),
            Action::Cancel => f.write_str("cancel"),
            Action::Select(i) => write!(f, "option:{}", i),
            Action::Move(d) => write!(f, "move:{}", d),
            Action::Submit => f.write_str("submit"),
            Action::ConfirmSubmit => f.write_str("confirm"),
            Action::KeepAnswering => f.write_str("keep"),
            Action::Restart => f.write_str("restart"),
            Action::Abandon => f.write_str("abandon"),
            Action::ToggleExplanations => f.write_str("explain"),
            Action::Retry => f.write_str("retry"),
            Action::NewQuiz => f.write_str("new"),
            Action::Noop => f.write_str("noop"),
        }
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownAction(s.to_string());
        let action = match s.split_once(':') {
            Some(("difficulty", d)) => Action::Difficulty(d.parse().map_err(|_| unknown())?),
            Some(("count", c)) => Action::Count(c.parse().map_err(|_| unknown())?),
            Some(("option", i)) => Action::Select(i.parse().map_err(|_| unknown())?),
            Some(("move", d)) => Action::Move(d.parse().map_err(|_| unknown())?),
            Some(_) => return Err(unknown()),
            None => match s {
                "generate" => Action::Generate,
                "demo" => Action::Demo,
                "cancel" => Action::Cancel,
                "submit" => Action::Submit,
                "confirm" => Action::ConfirmSubmit,
                "keep" => Action::KeepAnswering,
                "restart" => Action::Restart,
                "abandon" => Action::Abandon,
                "explain" => Action::ToggleExplanations,
                "retry" => Action::Retry,
                "new" => Action::NewQuiz,
                "noop" => Action::Noop,
                _ => return Err(unknown()),
            },
        };
        Ok(action)
    }
}

/// Runs `action` against the controller. A returned request still has to be
/// sent by the caller.
pub fn apply(controller: &mut Controller, action: Action) -> Result<Option<PendingRequest>, FlowError> {
    match action {
        Action::Difficulty(difficulty) => controller.set_difficulty(difficulty)?,
        Action::Count(count) => controller.set_count(count)?,
        Action::Generate => return controller.request_generated_quiz(),
        Action::Demo => controller.load_fallback_quiz()?,
        Action::Cancel => controller.cancel_generation()?,
        Action::Select(option) => controller.select_answer(option)?,
        Action::Move(delta) => controller.go_to(delta)?,
        Action::Submit => {
            controller.submit()?;
        }
        Action::ConfirmSubmit => controller.confirm_submit()?,
        Action::KeepAnswering => controller.dismiss_confirmation()?,
        Action::Restart => controller.restart()?,
        Action::Abandon => controller.abandon()?,
        Action::ToggleExplanations => controller.toggle_explanations(),
        Action::Retry => controller.retry_same_quiz()?,
        Action::NewQuiz => controller.new_quiz()?,
        Action::Noop => {}
    }
    Ok(None)
}
