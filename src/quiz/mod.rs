pub mod client;
pub mod fallback;
pub mod flow;
pub mod health;
pub mod session;

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(QuizError::UnknownDifficulty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
    #[error("quiz has no questions")]
    NoQuestions,
    #[error("question {number} has an empty prompt")]
    EmptyPrompt { number: usize },
    #[error("question {number} has a blank option {option}")]
    EmptyOption { number: usize, option: usize },
    #[error("question {number} has {count} options (at least 2 required)")]
    TooFewOptions { number: usize, count: usize },
    #[error("question {number} marks option {index} as correct but has only {count} options")]
    AnswerOutOfRange {
        number: usize,
        index: usize,
        count: usize,
    },
}

/// A multiple-choice quiz as produced by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Quiz {
    pub topic: String,
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(topic: impl Into<String>, difficulty: Difficulty, questions: Vec<Question>) -> Self {
        Self {
            topic: topic.into(),
            difficulty,
            questions,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks the shape every session relies on: at least one question, at
    /// least two non-blank options per question, and a correct index inside
    /// the options.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        for (i, question) in self.questions.iter().enumerate() {
            let number = i + 1;
            if question.prompt.trim().is_empty() {
                return Err(QuizError::EmptyPrompt { number });
            }
            if question.options.len() < 2 {
                return Err(QuizError::TooFewOptions {
                    number,
                    count: question.options.len(),
                });
            }
            if let Some(blank) = question.options.iter().position(|o| o.trim().is_empty()) {
                return Err(QuizError::EmptyOption {
                    number,
                    option: blank + 1,
                });
            }
            if question.correct_option_index >= question.options.len() {
                return Err(QuizError::AnswerOutOfRange {
                    number,
                    index: question.correct_option_index,
                    count: question.options.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(rename = "answer_index")]
    pub correct_option_index: usize,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option_index: usize,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            correct_option_index,
            explanation: explanation.into(),
        }
    }

    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.correct_option_index)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], correct: usize) -> Question {
        Question::new(
            "Which one?",
            options.iter().map(|o| o.to_string()).collect(),
            correct,
            "Because.",
        )
    }

    #[test]
    fn parses_service_payload() {
        let body = serde_json::json!({
            "topic": "space exploration",
            "difficulty": "easy",
            "questions": [{
                "question": "Who walked on the Moon first?",
                "options": ["Armstrong", "Aldrin", "Gagarin", "Collins"],
                "answer_index": 0,
                "explanation": "Neil Armstrong stepped out first in 1969."
            }]
        });

        let quiz: Quiz = serde_json::from_value(body).unwrap();
        assert_eq!(quiz.difficulty, Difficulty::Easy);
        assert_eq!(quiz.questions[0].correct_option(), "Armstrong");
        assert!(quiz.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_answer() {
        let quiz = Quiz::new("t", Difficulty::Hard, vec![question(&["a", "b"], 2)]);
        assert_eq!(
            quiz.validate(),
            Err(QuizError::AnswerOutOfRange {
                number: 1,
                index: 2,
                count: 2
            })
        );
    }

    #[test]
    fn rejects_single_option_and_empty_quiz() {
        let quiz = Quiz::new("t", Difficulty::Easy, vec![question(&["only"], 0)]);
        assert!(matches!(
            quiz.validate(),
            Err(QuizError::TooFewOptions { number: 1, count: 1 })
        ));

        let empty = Quiz::new("t", Difficulty::Easy, Vec::new());
        assert_eq!(empty.validate(), Err(QuizError::NoQuestions));
    }

    #[test]
    fn rejects_blank_options() {
        let quiz = Quiz::new("t", Difficulty::Easy, vec![question(&["", "   "], 0)]);
        assert_eq!(
            quiz.validate(),
            Err(QuizError::EmptyOption { number: 1, option: 1 })
        );

        let quiz = Quiz::new(
            "t",
            Difficulty::Easy,
            vec![question(&["a", "b"], 0), question(&["a", "\t\n"], 1)],
        );
        assert_eq!(
            quiz.validate(),
            Err(QuizError::EmptyOption { number: 2, option: 2 })
        );
    }

    #[test]
    fn difficulty_round_trips_through_text() {
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.as_str().parse::<Difficulty>(), Ok(difficulty));
        }
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}
