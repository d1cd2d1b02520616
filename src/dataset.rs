//! SQuAD 2.0 dataset files: topics wrapping paragraphs wrapping questions.
//!
//! Evaluation and training both consume the flattened paragraph list; a
//! paragraph is exactly one pipeline batch.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{Question, TrainingExample};

#[derive(Debug, Deserialize)]
struct SquadFile {
    data: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    paragraphs: Vec<Paragraph>,
}

/// One passage and the questions asked against it.
#[derive(Debug, Clone, Deserialize)]
pub struct Paragraph {
    pub context: String,
    pub qas: Vec<QaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QaEntry {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answers: Vec<GoldAnswer>,
    #[serde(default)]
    pub is_impossible: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoldAnswer {
    pub text: String,
    pub answer_start: usize,
}

/// Read a SQuAD-style JSON file and flatten its topics into paragraphs.
pub fn load(path: &Path) -> Result<Vec<Paragraph>> {
    let content = fs::read_to_string(path)?;
    let file: SquadFile = serde_json::from_str(&content)
        .map_err(|e| Error::dataset(format!("{}: {e}", path.display())))?;
    Ok(file.data.into_iter().flat_map(|t| t.paragraphs).collect())
}

impl Paragraph {
    /// The paragraph's questions as one pipeline batch.
    pub fn questions(&self) -> Vec<Question> {
        self.qas
            .iter()
            .map(|qa| Question::new(&qa.id, &qa.question))
            .collect()
    }

    /// Fine-tuning examples for this paragraph. Impossible questions carry
    /// no gold span.
    pub fn training_examples(&self) -> Vec<TrainingExample> {
        self.qas
            .iter()
            .map(|qa| {
                let gold = qa.answers.first();
                TrainingExample {
                    id: qa.id.clone(),
                    question: qa.question.clone(),
                    context: self.context.clone(),
                    answer_text: gold.map(|a| a.text.clone()).unwrap_or_default(),
                    answer_start: gold.map(|a| a.answer_start),
                    is_impossible: qa.is_impossible,
                }
            })
            .collect()
    }
}
