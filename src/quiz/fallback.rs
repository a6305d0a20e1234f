use crate::quiz::{Difficulty, Question, Quiz};

// (prompt, options, correct index, explanation)
const FALLBACK_QUESTIONS: [(&str, [&str; 4], usize, &str); 5] = [
    (
        "Which planet is known as the Red Planet?",
        ["Venus", "Mars", "Jupiter", "Mercury"],
        1,
        "Iron oxide on its surface gives Mars its reddish colour.",
    ),
    (
        "What is the chemical symbol for water?",
        ["O2", "H2O", "CO2", "NaCl"],
        1,
        "A water molecule is two hydrogen atoms bonded to one oxygen atom.",
    ),
    (
        "How many continents are there on Earth?",
        ["Five", "Six", "Seven", "Eight"],
        2,
        "The common convention counts Africa, Antarctica, Asia, Australia, Europe, North America and South America.",
    ),
    (
        "Which gas do plants absorb from the air for photosynthesis?",
        ["Carbon dioxide", "Oxygen", "Nitrogen", "Helium"],
        0,
        "Plants take in carbon dioxide and release oxygen while making sugars from light.",
    ),
    (
        "What is the largest ocean on Earth?",
        ["Atlantic", "Pacific", "Indian", "Arctic"],
        1,
        "The Pacific covers roughly a third of the planet's surface.",
    ),
];

/// A fixed quiz that works without the generation service.
pub fn load_fallback_quiz() -> Quiz {
    let questions = FALLBACK_QUESTIONS
        .iter()
        .map(|(prompt, options, correct, explanation)| {
            Question::new(
                *prompt,
                options.iter().map(|o| o.to_string()).collect(),
                *correct,
                *explanation,
            )
        })
        .collect();

    Quiz::new("General knowledge (demo)", Difficulty::Easy, questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_quiz_is_valid_and_stable() {
        let quiz = load_fallback_quiz();
        assert!(quiz.validate().is_ok());
        assert_eq!(
            quiz.questions
                .iter()
                .map(|q| q.correct_option_index)
                .collect::<Vec<_>>(),
            vec![1, 1, 2, 0, 1]
        );
        assert_eq!(quiz, load_fallback_quiz());
    }
}
