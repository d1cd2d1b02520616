//! The seam between the pipeline and whatever actually runs the model.
//!
//! Commands and the server only ever see `Box<dyn QaEngine>`, so tests can
//! swap in scripted engines and a future backend only has to implement one
//! trait.

pub mod candle;

pub use candle::is_checkpoint_dir;

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::ModelType;
use crate::types::{BatchRequest, RawPrediction, TrainingExample};

/// Where checkpoint files come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// A directory on disk holding config, tokenizer and weights.
    Local(PathBuf),
    /// A Hugging Face hub repository id, fetched on demand.
    HuggingFace(String),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Local(path) => write!(f, "local checkpoint {}", path.display()),
            ModelSource::HuggingFace(repo) => write!(f, "hub model {}", repo),
        }
    }
}

/// Inference-time knobs, shared by every backend.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound on tokens per (question, passage) pair; the passage is
    /// truncated to fit, never the question.
    pub max_seq_len: usize,
    /// Longest answer span considered, in tokens.
    pub max_answer_len: usize,
    /// How many ranked candidates to keep per question.
    pub n_best: usize,
    pub gpu: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_seq_len: 384,
            max_answer_len: 30,
            n_best: 5,
            gpu: false,
        }
    }
}

/// Fine-tuning hyperparameters handed through to the engine.
#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub max_seq_len: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub warmup_ratio: f64,
    pub weight_decay: f64,
    pub adam_epsilon: f64,
    pub max_grad_norm: f64,
    pub output_dir: PathBuf,
    pub overwrite_output_dir: bool,
}

impl TrainArgs {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            max_seq_len: 128,
            epochs: 2,
            batch_size: 8,
            learning_rate: 4e-5,
            warmup_ratio: 0.06,
            weight_decay: 0.0,
            adam_epsilon: 1e-8,
            max_grad_norm: 1.0,
            output_dir,
            overwrite_output_dir: true,
        }
    }
}

/// A loaded question answering model.
pub trait QaEngine: Send {
    /// Answer every question in the batch against its shared passage.
    ///
    /// Implementations may return predictions in any order; ranking within
    /// one prediction is best first.
    fn predict(&mut self, request: &BatchRequest) -> Result<Vec<RawPrediction>>;

    /// Fine-tune the loaded model in place. Backends without a training
    /// path keep the default.
    fn fine_tune(&mut self, _examples: &[TrainingExample], _args: &TrainArgs) -> Result<()> {
        Err(Error::unsupported("fine-tuning"))
    }
}

/// Load the default backend for a model architecture.
pub fn load(
    model_type: ModelType,
    source: &ModelSource,
    options: EngineOptions,
) -> Result<Box<dyn QaEngine>> {
    Ok(Box::new(candle::CandleQaEngine::load(
        model_type, source, options,
    )?))
}
