use std::sync::Arc;

use crate::quiz::{Question, Quiz};

pub const NO_ANSWER: &str = "No answer";

/// One attempt at a quiz: where the user is and what they picked so far.
#[derive(Debug, Clone)]
pub struct Session {
    quiz: Arc<Quiz>,
    current_index: usize,
    answers: Vec<Option<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    NeedsConfirmation { unanswered: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Perfect,
    High,
    Mid,
    Encouragement,
}

impl Tier {
    pub fn message(&self) -> &'static str {
        match self {
            Tier::Perfect => "Perfect score! You nailed every question.",
            Tier::High => "Excellent work! Just a few slips.",
            Tier::Mid => "Good job! A bit more practice and you'll master it.",
            Tier::Encouragement => "Keep going! Review the answers below and try again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
    }

    /// `Perfect` needs every answer right; the rest go by rounded percent.
    pub fn tier(&self) -> Tier {
        if self.total > 0 && self.correct == self.total {
            return Tier::Perfect;
        }
        match self.percent() {
            p if p >= 80 => Tier::High,
            p if p >= 60 => Tier::Mid,
            _ => Tier::Encouragement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub prompt: String,
    pub correct: bool,
    pub your_answer_text: String,
    pub correct_answer_text: String,
    pub explanation: Option<String>,
}

impl Session {
    pub fn new(quiz: Arc<Quiz>) -> Self {
        let answers = vec![None; quiz.len()];
        Self {
            quiz,
            current_index: 0,
            answers,
        }
    }

    pub fn quiz(&self) -> &Arc<Quiz> {
        &self.quiz
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.current_index]
    }

    pub fn selected(&self) -> Option<usize> {
        self.answers[self.current_index]
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.quiz.len()
    }

    /// Records `option` for the current question. Returns `false` when the
    /// question has no such option.
    pub fn select_answer(&mut self, option: usize) -> bool {
        if option >= self.current_question().options.len() {
            return false;
        }
        self.answers[self.current_index] = Some(option);
        true
    }

    /// Moves by `delta`, stopping at the first and last question.
    pub fn go_to(&mut self, delta: isize) {
        let last = self.quiz.len().saturating_sub(1) as isize;
        let target = (self.current_index as isize).saturating_add(delta).clamp(0, last);
        self.current_index = target as usize;
    }

    pub fn unanswered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_none()).count()
    }

    pub fn submit(&self) -> SubmitOutcome {
        match self.unanswered() {
            0 => SubmitOutcome::Submitted,
            unanswered => SubmitOutcome::NeedsConfirmation { unanswered },
        }
    }

    pub fn restart(&mut self) {
        self.answers.iter_mut().for_each(|a| *a = None);
        self.current_index = 0;
    }

    pub fn compute_score(&self) -> Score {
        let correct = self
            .quiz
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| **a == Some(q.correct_option_index))
            .count();
        Score {
            correct,
            total: self.quiz.len(),
        }
    }

    pub fn build_review(&self, show_explanations: bool) -> Vec<ReviewEntry> {
        self.quiz
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(question, answer)| {
                let your_answer_text = answer
                    .and_then(|i| question.options.get(i))
                    .cloned()
                    .unwrap_or_else(|| NO_ANSWER.to_string());
                ReviewEntry {
                    prompt: question.prompt.clone(),
                    correct: *answer == Some(question.correct_option_index),
                    your_answer_text,
                    correct_answer_text: question.correct_option().to_string(),
                    explanation: show_explanations.then(|| question.explanation.clone()),
                }
            })
            .collect()
    }
}
