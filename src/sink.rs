//! Renderings of pipeline results for the three surfaces: console, the
//! predictions file the SQuAD scorer reads, and the web API.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::types::{Answer, AnswerResult, Question};

/// Print each question followed by its resolved answer.
pub fn print_results(questions: &[Question], results: &[AnswerResult]) {
    for (question, result) in questions.iter().zip(results) {
        println!("{}", question.text);
        match &result.answer {
            Answer::Span(text) => println!("  {}", text),
            Answer::NoAnswer => println!("  (no answer found)"),
        }
    }
}

/// Map question ids to answer texts the way the SQuAD scorer expects:
/// unanswerable questions become the empty string.
pub fn predictions_map(results: &[AnswerResult]) -> BTreeMap<String, String> {
    results
        .iter()
        .map(|result| {
            let text = result.answer.as_str().unwrap_or_default();
            (result.id.clone(), text.to_string())
        })
        .collect()
}

/// Write a predictions file, creating parent directories and replacing any
/// previous run's output.
pub fn write_predictions(path: &Path, results: &[AnswerResult]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&predictions_map(results))?;
    fs::write(path, content)?;
    Ok(())
}

/// Answer text for the web response. The no-answer sentinel becomes a
/// human-readable message rather than an empty string.
pub fn api_answer_text(answer: &Answer) -> String {
    answer.as_str().unwrap_or("No answer found").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, text: &str) -> AnswerResult {
        AnswerResult {
            id: id.to_string(),
            answer: Answer::Span(text.to_string()),
        }
    }

    fn no_answer(id: &str) -> AnswerResult {
        AnswerResult {
            id: id.to_string(),
            answer: Answer::NoAnswer,
        }
    }

    #[test]
    fn no_answer_becomes_empty_string_in_the_predictions_map() {
        let map = predictions_map(&[span("1", "Paris"), no_answer("0")]);
        assert_eq!(map.get("0"), Some(&String::new()));
        assert_eq!(map.get("1"), Some(&"Paris".to_string()));
    }

    #[test]
    fn predictions_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("roberta").join("predictions.json");

        write_predictions(&path, &[no_answer("0")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, serde_json::json!({"0": ""}));
    }

    #[test]
    fn predictions_file_overwrites_previous_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");

        write_predictions(&path, &[span("0", "old")]).unwrap();
        write_predictions(&path, &[span("0", "new")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, serde_json::json!({"0": "new"}));
    }

    #[test]
    fn api_text_replaces_the_sentinel_with_a_message() {
        assert_eq!(api_answer_text(&Answer::Span("Paris".to_string())), "Paris");
        assert_eq!(api_answer_text(&Answer::NoAnswer), "No answer found");
    }
}
