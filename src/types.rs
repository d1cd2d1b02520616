//! Core data types shared by the pipeline, the engines and the surfaces.

use serde::{Deserialize, Serialize};

/// A single question to answer against a passage.
///
/// The id is the caller's correlation key: results come back tagged with it
/// and the pipeline uses it to restore input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One shared passage with every question asked against it.
///
/// All questions travel to the engine in a single call so the backend can
/// batch the forward pass.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub passage: String,
    pub questions: Vec<Question>,
}

/// What an engine produces for one question: candidate answer texts ranked
/// best first. An empty list, or an empty string in first position, means
/// the engine found no answer in the passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPrediction {
    pub id: String,
    pub answers: Vec<String>,
}

/// Outcome of answering one question. Unanswerable questions are a valid
/// result, not an error, so they get their own case instead of an empty
/// string that callers could mistake for text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Span(String),
    NoAnswer,
}

impl Answer {
    pub fn is_no_answer(&self) -> bool {
        matches!(self, Answer::NoAnswer)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Answer::Span(text) => Some(text),
            Answer::NoAnswer => None,
        }
    }
}

/// A resolved answer, tagged with the id of the question it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub id: String,
    pub answer: Answer,
}

/// One fine-tuning example in SQuAD form. `answer_start` is the character
/// offset into `context` as the dataset records it; impossible questions
/// carry no gold span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: String,
    pub question: String,
    pub context: String,
    pub answer_text: String,
    pub answer_start: Option<usize>,
    pub is_impossible: bool,
}
