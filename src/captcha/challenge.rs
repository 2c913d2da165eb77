//! Challenge templates.

use rand::Rng;
use serde::Serialize;

/// A generated question with its canonical answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Kind of challenge that produced this question.
    pub kind: ChallengeKind,
    /// Question shown to the visitor.
    pub question: String,
    /// Expected answer, before normalization.
    pub answer: String,
}

/// Kinds of human-verification challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    /// `a + b` with small operands.
    MathAdd,
    /// `a - b` with a positive result.
    MathSub,
    /// `a × b` from the small multiplication table.
    MathMult,
    /// Count the words in a short phrase.
    WordCount,
    /// Spell a word backwards.
    Reverse,
    /// Count occurrences of a letter in a word.
    LetterCount,
    /// First letters of a phrase.
    Acronym,
    /// Count repeated emoji.
    EmojiCount,
    /// Common-knowledge question.
    SimpleQa,
    /// Fill the gap in an arithmetic sequence.
    Sequence,
}

const WORD_POOL: &[&str] = &["apple", "code", "dev", "web", "app", "api", "css", "html", "js"];
const REVERSE_WORDS: &[&str] = &["hello", "world", "admin", "login", "code", "safe"];
const LETTER_WORDS: &[&str] = &[
    "developer",
    "javascript",
    "portfolio",
    "security",
    "programming",
];
const ACRONYMS: &[(&str, &str)] = &[
    ("Good Morning Developer", "gmd"),
    ("Web App Security", "was"),
    ("Full Stack Dev", "fsd"),
    ("Application Program Interface", "api"),
    ("Hyper Text Markup", "htm"),
];
const EMOJIS: &[&str] = &["🍎", "🚀", "💻", "⭐", "🔥"];
const TRIVIA: &[(&str, &str)] = &[
    ("What color is the sky on a clear day?", "blue"),
    ("What color are most leaves?", "green"),
    ("What is 2+2?", "4"),
    ("How many days in a week?", "7"),
    ("What comes after 9?", "10"),
];

impl ChallengeKind {
    /// Every kind, in a fixed order.
    pub const ALL: [ChallengeKind; 10] = [
        ChallengeKind::MathAdd,
        ChallengeKind::MathSub,
        ChallengeKind::MathMult,
        ChallengeKind::WordCount,
        ChallengeKind::Reverse,
        ChallengeKind::LetterCount,
        ChallengeKind::Acronym,
        ChallengeKind::EmojiCount,
        ChallengeKind::SimpleQa,
        ChallengeKind::Sequence,
    ];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::MathAdd => "math_add",
            ChallengeKind::MathSub => "math_sub",
            ChallengeKind::MathMult => "math_mult",
            ChallengeKind::WordCount => "word_count",
            ChallengeKind::Reverse => "reverse",
            ChallengeKind::LetterCount => "letter_count",
            ChallengeKind::Acronym => "acronym",
            ChallengeKind::EmojiCount => "emoji_count",
            ChallengeKind::SimpleQa => "simple_qa",
            ChallengeKind::Sequence => "sequence",
        }
    }

    /// Icon shown next to the question.
    pub fn icon(&self) -> &'static str {
        match self {
            ChallengeKind::MathAdd => "➕",
            ChallengeKind::MathSub => "➖",
            ChallengeKind::MathMult => "✖️",
            ChallengeKind::WordCount => "📝",
            ChallengeKind::Reverse => "🔄",
            ChallengeKind::LetterCount => "🔤",
            ChallengeKind::Acronym => "🅰️",
            ChallengeKind::EmojiCount => "🎯",
            ChallengeKind::SimpleQa => "❓",
            ChallengeKind::Sequence => "🔢",
        }
    }

    /// Short hint on the expected answer format.
    pub fn hint(&self) -> &'static str {
        match self {
            ChallengeKind::MathAdd
            | ChallengeKind::MathSub
            | ChallengeKind::MathMult
            | ChallengeKind::Sequence => "Enter a number",
            ChallengeKind::WordCount | ChallengeKind::LetterCount | ChallengeKind::EmojiCount => {
                "Enter a count"
            }
            ChallengeKind::Reverse => "Type the word backwards",
            ChallengeKind::Acronym => "Type the letters, no spaces",
            ChallengeKind::SimpleQa => "One word or number",
        }
    }

    /// Produce a question and answer from fresh random parameters.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Challenge {
        let (question, answer) = match self {
            ChallengeKind::MathAdd => {
                let a = rng.random_range(1..=20);
                let b = rng.random_range(1..=20);
                (format!("What is {a} + {b}?"), (a + b).to_string())
            }
            ChallengeKind::MathSub => {
                let a = rng.random_range(20..=49);
                let b = rng.random_range(1..=15);
                (format!("What is {a} - {b}?"), (a - b).to_string())
            }
            ChallengeKind::MathMult => {
                let a = rng.random_range(2..=11);
                let b = rng.random_range(2..=11);
                (format!("What is {a} × {b}?"), (a * b).to_string())
            }
            ChallengeKind::WordCount => {
                let count = rng.random_range(3..=6);
                let words: Vec<&str> = (0..count).map(|_| *pick(rng, WORD_POOL)).collect();
                (
                    format!("How many words: \"{}\"?", words.join(" ")),
                    count.to_string(),
                )
            }
            ChallengeKind::Reverse => {
                let word = *pick(rng, REVERSE_WORDS);
                (
                    format!("Reverse the word: \"{word}\""),
                    word.chars().rev().collect(),
                )
            }
            ChallengeKind::LetterCount => {
                let word = *pick(rng, LETTER_WORDS);
                let mut letters: Vec<char> = Vec::new();
                for c in word.chars() {
                    if !letters.contains(&c) {
                        letters.push(c);
                    }
                }
                let letter = *pick(rng, &letters);
                let count = word.chars().filter(|&c| c == letter).count();
                (
                    format!("How many \"{letter}\" in \"{word}\"?"),
                    count.to_string(),
                )
            }
            ChallengeKind::Acronym => {
                let (text, answer) = *pick(rng, ACRONYMS);
                (format!("First letters of \"{text}\"?"), answer.to_string())
            }
            ChallengeKind::EmojiCount => {
                let emoji = *pick(rng, EMOJIS);
                let count = rng.random_range(2..=6);
                (
                    format!("Count the emojis: {}", emoji.repeat(count)),
                    count.to_string(),
                )
            }
            ChallengeKind::SimpleQa => {
                let (question, answer) = *pick(rng, TRIVIA);
                (question.to_string(), answer.to_string())
            }
            ChallengeKind::Sequence => {
                let start = rng.random_range(1..=10);
                let step = rng.random_range(2..=4);
                (
                    format!(
                        "Complete: {start}, {}, ?, {}",
                        start + step,
                        start + step * 3
                    ),
                    (start + step * 2).to_string(),
                )
            }
        };

        Challenge {
            kind: *self,
            question,
            answer,
        }
    }
}

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}
