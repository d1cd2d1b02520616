//! The one extraction path every surface goes through.
//!
//! A batch is validated, sent to the engine in a single call, and the raw
//! ranked candidates are reduced to one [`Answer`] per question, returned
//! in the order the questions came in.

use std::collections::{HashMap, HashSet};

use crate::engine::QaEngine;
use crate::error::{Error, Result};
use crate::types::{Answer, AnswerResult, BatchRequest, Question, RawPrediction};

pub struct ExtractionPipeline {
    engine: Box<dyn QaEngine>,
}

impl ExtractionPipeline {
    pub fn new(engine: Box<dyn QaEngine>) -> Self {
        Self { engine }
    }

    /// Answer every question against the shared passage.
    ///
    /// Returns exactly one result per question, in input order. The engine
    /// is invoked once per call, and not at all when validation fails.
    pub fn run(&mut self, passage: &str, questions: &[Question]) -> Result<Vec<AnswerResult>> {
        validate(passage, questions)?;
        let request = BatchRequest {
            passage: passage.to_string(),
            questions: questions.to_vec(),
        };
        let predictions = self.engine.predict(&request)?;
        reduce(questions, predictions)
    }
}

fn validate(passage: &str, questions: &[Question]) -> Result<()> {
    if passage.trim().is_empty() {
        return Err(Error::invalid_batch("passage is empty"));
    }
    let mut seen = HashSet::with_capacity(questions.len());
    for question in questions {
        if !seen.insert(question.id.as_str()) {
            return Err(Error::invalid_batch(format!(
                "duplicate question id '{}'",
                question.id
            )));
        }
    }
    Ok(())
}

/// Re-associate predictions with their questions and collapse each ranked
/// candidate list to a single answer. Predictions for ids that were never
/// asked are dropped; a question the engine skipped is an error.
fn reduce(questions: &[Question], predictions: Vec<RawPrediction>) -> Result<Vec<AnswerResult>> {
    let mut by_id: HashMap<String, Answer> = HashMap::with_capacity(predictions.len());
    for prediction in predictions {
        let answer = reduce_one(prediction.answers);
        by_id.insert(prediction.id, answer);
    }

    questions
        .iter()
        .map(|question| {
            let answer = by_id
                .remove(&question.id)
                .ok_or_else(|| Error::MissingPrediction(question.id.clone()))?;
            Ok(AnswerResult {
                id: question.id.clone(),
                answer,
            })
        })
        .collect()
}

/// The first ranked candidate wins. No candidates at all, or an empty
/// string in first position, means the passage does not answer the
/// question.
fn reduce_one(answers: Vec<String>) -> Answer {
    match answers.into_iter().next() {
        Some(text) if !text.is_empty() => Answer::Span(text),
        _ => Answer::NoAnswer,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct ScriptedEngine {
        responses: Vec<RawPrediction>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedEngine {
        fn boxed(responses: Vec<RawPrediction>) -> (Box<dyn QaEngine>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let engine = Self {
                responses,
                calls: Arc::clone(&calls),
            };
            (Box::new(engine), calls)
        }
    }

    impl QaEngine for ScriptedEngine {
        fn predict(&mut self, _request: &BatchRequest) -> Result<Vec<RawPrediction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.responses.clone())
        }
    }

    struct FailingEngine;

    impl QaEngine for FailingEngine {
        fn predict(&mut self, _request: &BatchRequest) -> Result<Vec<RawPrediction>> {
            Err(Error::inference("model blew up"))
        }
    }

    fn prediction(id: &str, answers: &[&str]) -> RawPrediction {
        RawPrediction {
            id: id.to_string(),
            answers: answers.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn question(id: &str, text: &str) -> Question {
        Question::new(id, text)
    }

    #[test]
    fn best_candidate_wins() {
        let (engine, _) = ScriptedEngine::boxed(vec![prediction("0", &["Paris", "France"])]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let results = pipeline
            .run("Paris is the capital of France.", &[question("0", "What is the capital?")])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].answer, Answer::Span("Paris".to_string()));
    }

    #[test]
    fn empty_top_candidate_means_no_answer() {
        let (engine, _) = ScriptedEngine::boxed(vec![prediction("0", &["", "Paris"])]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let results = pipeline
            .run("Paris is the capital of France.", &[question("0", "Who wrote it?")])
            .unwrap();
        assert_eq!(results[0].answer, Answer::NoAnswer);
        assert!(results[0].answer.is_no_answer());
    }

    #[test]
    fn empty_candidate_list_means_no_answer() {
        let (engine, _) = ScriptedEngine::boxed(vec![prediction("0", &[])]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let results = pipeline
            .run("Paris is the capital of France.", &[question("0", "Who wrote it?")])
            .unwrap();
        assert_eq!(results[0].answer, Answer::NoAnswer);
    }

    #[test]
    fn results_come_back_in_input_order() {
        // Engine answers in reverse of the asked order.
        let (engine, _) = ScriptedEngine::boxed(vec![
            prediction("b", &["second"]),
            prediction("a", &["first"]),
        ]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let questions = [question("a", "First?"), question("b", "Second?")];
        let results = pipeline.run("Some passage with answers.", &questions).unwrap();
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].answer, Answer::Span("first".to_string()));
        assert_eq!(results[1].id, "b");
        assert_eq!(results[1].answer, Answer::Span("second".to_string()));
    }

    #[test]
    fn predictions_for_unknown_ids_are_dropped() {
        let (engine, _) = ScriptedEngine::boxed(vec![
            prediction("0", &["Paris"]),
            prediction("stray", &["noise"]),
        ]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let results = pipeline
            .run("Paris is the capital of France.", &[question("0", "Capital?")])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "0");
    }

    #[test]
    fn skipped_question_is_an_error() {
        let (engine, _) = ScriptedEngine::boxed(vec![prediction("0", &["Paris"])]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let err = pipeline
            .run(
                "Paris is the capital of France.",
                &[question("0", "Capital?"), question("1", "Country?")],
            )
            .unwrap_err();
        assert!(matches!(err, Error::MissingPrediction(id) if id == "1"));
    }

    #[test]
    fn blank_passage_is_rejected_before_the_engine_runs() {
        let (engine, calls) = ScriptedEngine::boxed(vec![]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let err = pipeline.run("   \n\t", &[question("0", "Capital?")]).unwrap_err();
        assert!(matches!(err, Error::InvalidBatch(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_ids_are_rejected_before_the_engine_runs() {
        let (engine, calls) = ScriptedEngine::boxed(vec![]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let err = pipeline
            .run(
                "Paris is the capital of France.",
                &[question("0", "Capital?"), question("0", "Country?")],
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBatch(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn engine_failures_propagate() {
        let mut pipeline = ExtractionPipeline::new(Box::new(FailingEngine));
        let err = pipeline
            .run("Paris is the capital of France.", &[question("0", "Capital?")])
            .unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn no_questions_is_a_valid_empty_batch() {
        let (engine, calls) = ScriptedEngine::boxed(vec![]);
        let mut pipeline = ExtractionPipeline::new(engine);
        let results = pipeline.run("Paris is the capital of France.", &[]).unwrap();
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
