pub mod cmd;
pub mod dataset;
pub mod engine;
pub mod envconfig;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod sink;
pub mod types;

pub use error::{Error, Result};
pub use pipeline::ExtractionPipeline;
pub use types::{Answer, AnswerResult, BatchRequest, Question, RawPrediction, TrainingExample};
