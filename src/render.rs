//! Turns the controller into one Telegram screen: HTML text plus an inline
//! keyboard whose buttons carry [`Action`]s.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html::escape;

use crate::action::Action;
use crate::quiz::flow::{Controller, PendingRequest, SetupForm, View, COUNT_CHOICES};
use crate::quiz::health::ServiceStatus;
use crate::quiz::session::Session;
use crate::quiz::Difficulty;

// Telegram rejects longer messages
const MAX_MESSAGE_CHARS: usize = 4096;
const TRUNCATED_REVIEW: &str = "\n… (review shortened to fit in one message)";

#[derive(Debug, Clone)]
pub struct Screen {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

fn button(text: impl Into<String>, action: Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_string())
}

fn inert(label: &str) -> InlineKeyboardButton {
    button(label, Action::Noop)
}

/// Escapes `text` for HTML, cutting it short with an ellipsis so the result
/// stays within `budget` characters.
fn escape_within(text: &str, budget: usize) -> String {
    let escaped = escape(text);
    if escaped.chars().count() <= budget {
        return escaped;
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let piece = escape(c.encode_utf8(&mut [0; 4]));
        let len = piece.chars().count();
        if used + len + 1 > budget {
            break;
        }
        out.push_str(&piece);
        used += len;
    }
    out.push('…');
    out
}

pub fn render(controller: &Controller, status: &ServiceStatus) -> Screen {
    match controller.view() {
        View::Setup => setup_screen(controller.form(), controller.has_prior_quiz(), status),
        View::Loading(pending) => loading_screen(pending),
        View::Active {
            session,
            confirming,
        } => question_screen(session, *confirming),
        View::Results(session) => results_screen(session, controller.show_explanations()),
    }
}

fn setup_screen(form: &SetupForm, has_prior_quiz: bool, status: &ServiceStatus) -> Screen {
    let topic = if form.topic.is_empty() {
        "<i>not set yet, send it as a message</i>".to_string()
    } else {
        format!("<b>{}</b>", escape(&form.topic))
    };
    let text = format!(
        "🧠 <b>Quiz player</b>\n{}\n\nTopic: {}\nDifficulty: {}\nQuestions: {}\n\nSend me a topic, pick the difficulty and the number of questions, then press <b>Generate quiz</b>.",
        escape(&status.label()),
        topic,
        form.difficulty,
        form.count
    );

    let mark = |selected: bool, label: String| {
        if selected {
            format!("• {} •", label)
        } else {
            label
        }
    };
    let difficulties = Difficulty::ALL
        .iter()
        .map(|d| button(mark(*d == form.difficulty, d.to_string()), Action::Difficulty(*d)))
        .collect::<Vec<_>>();
    let counts = COUNT_CHOICES
        .iter()
        .map(|c| button(mark(*c == form.count, c.to_string()), Action::Count(*c)))
        .collect::<Vec<_>>();

    let mut rows = vec![
        difficulties,
        counts,
        vec![button("✨ Generate quiz", Action::Generate)],
        vec![button("📦 Demo quiz (offline)", Action::Demo)],
    ];
    if has_prior_quiz {
        rows.push(vec![button("🔁 Retry last quiz", Action::Retry)]);
    }

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn loading_screen(pending: &PendingRequest) -> Screen {
    let params = &pending.params;
    if pending.token().is_cancelled() {
        return Screen {
            text: "⏹ Cancelling…".to_string(),
            keyboard: InlineKeyboardMarkup::new(vec![vec![button("↩ Back to setup", Action::Cancel)]]),
        };
    }
    Screen {
        text: format!(
            "⏳ Generating a {} quiz on <b>{}</b> with {} questions…",
            params.difficulty,
            escape(&params.topic),
            params.count
        ),
        keyboard: InlineKeyboardMarkup::new(vec![vec![button("✖ Cancel", Action::Cancel)]]),
    }
}

fn question_screen(session: &Session, confirming: Option<usize>) -> Screen {
    let quiz = session.quiz();
    let question = session.current_question();
    let header = format!(
        "<b>Question {} / {}</b> · {} · {}\n\n",
        session.current_index() + 1,
        quiz.len(),
        escape(&quiz.topic),
        quiz.difficulty
    );
    let footer = match confirming {
        Some(unanswered) => format!(
            "\n\n⚠️ You have {} unanswered question{}. Submit anyway?",
            unanswered,
            if unanswered == 1 { "" } else { "s" }
        ),
        None => String::new(),
    };
    let budget = MAX_MESSAGE_CHARS.saturating_sub(header.chars().count() + footer.chars().count());
    let text = format!("{}{}{}", header, escape_within(&question.prompt, budget), footer);

    if confirming.is_some() {
        let rows = vec![vec![
            button("✅ Submit anyway", Action::ConfirmSubmit),
            button("↩ Keep answering", Action::KeepAnswering),
        ]];
        return Screen {
            text,
            keyboard: InlineKeyboardMarkup::new(rows),
        };
    }

    let mut rows = question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let label = if session.selected() == Some(i) {
                format!("✅ {}", option)
            } else {
                option.clone()
            };
            vec![button(label, Action::Select(i))]
        })
        .collect::<Vec<_>>();

    let previous = if session.is_first() {
        inert("·")
    } else {
        button("◀ Previous", Action::Move(-1))
    };
    let next = if session.is_last() {
        inert("·")
    } else {
        button("Next ▶", Action::Move(1))
    };
    rows.push(vec![previous, next]);
    rows.push(vec![button("📨 Submit", Action::Submit)]);
    rows.push(vec![
        button("🔄 Restart", Action::Restart),
        button("🚪 Leave quiz", Action::Abandon),
    ]);

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn results_screen(session: &Session, show_explanations: bool) -> Screen {
    let score = session.compute_score();
    let mut text = format!(
        "🏁 <b>Score: {} / {} ({}%)</b>\n{}\n",
        score.correct,
        score.total,
        score.percent(),
        score.tier().message()
    );

    for (i, entry) in session.build_review(show_explanations).iter().enumerate() {
        let mut block = format!(
            "\n{}. {} {}\nYour answer: {}\nCorrect answer: {}\n",
            i + 1,
            if entry.correct { "✅" } else { "❌" },
            escape(&entry.prompt),
            escape(&entry.your_answer_text),
            escape(&entry.correct_answer_text)
        );
        if let Some(explanation) = &entry.explanation {
            block.push_str(&format!("<i>{}</i>\n", escape(explanation)));
        }
        if text.chars().count() + block.chars().count() + TRUNCATED_REVIEW.chars().count()
            > MAX_MESSAGE_CHARS
        {
            text.push_str(TRUNCATED_REVIEW);
            break;
        }
        text.push_str(&block);
    }

    let toggle = if show_explanations {
        "🙈 Hide explanations"
    } else {
        "💡 Show explanations"
    };
    let rows = vec![
        vec![button(toggle, Action::ToggleExplanations)],
        vec![
            button("🔁 Retry quiz", Action::Retry),
            button("🆕 New quiz", Action::NewQuiz),
        ],
    ];

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}
