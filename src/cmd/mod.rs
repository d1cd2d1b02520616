//! Command implementations behind the CLI: the built-in demo batch, SQuAD
//! evaluation, fine-tuning and the HTTP server.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::dataset;
use crate::engine::{self, EngineOptions, ModelSource, QaEngine, TrainArgs};
use crate::envconfig;
use crate::models::{self, VariantDescriptor};
use crate::pipeline::ExtractionPipeline;
use crate::sink;
use crate::types::{Question, TrainingExample};

const DEMO_PASSAGE: &str = "Elephants are mammals of the family Elephantidae and the largest existing land animals. Three species are currently recognised: the African bush elephant, the African forest elephant, and the Asian elephant. Elephantidae is the only surviving family of the order Proboscidea; extinct members include the mastodons. The family Elephantidae also contains several now-extinct groups, including the mammoths and straight-tusked elephants. African elephants have larger ears and concave backs, whereas Asian elephants have smaller ears, and convex or level backs. Distinctive features of all elephants include a long proboscis called a trunk, tusks, large ear flaps, massive legs, and tough but sensitive skin. The trunk is used for breathing, bringing food and water to the mouth, and grasping objects. Tusks, which are derived from the incisor teeth, serve both as weapons and as tools for moving objects and digging. The large ear flaps assist in maintaining a constant body temperature as well as in communication. The pillar-like legs carry their great weight.";

const DEMO_QUESTIONS: &[&str] = &[
    "Elephants are mammals of which family?",
    "What is the largest existing land animal?",
    "How many species are currently recognised?",
    "What are the existinct members?",
    "Describe African elephants and Asian elephants",
    "Describe African elephants",
    "Describe Asian elephants",
];

fn demo_questions() -> Vec<Question> {
    DEMO_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, text)| Question::new(i.to_string(), *text))
        .collect()
}

/// Pick a variant's model source: the local fine-tuned checkpoint when its
/// file set is complete, otherwise the published model on the hub. A bare
/// or partial directory, as a failed training run leaves behind, must not
/// capture the choice.
fn model_source(variant: &VariantDescriptor, models_dir: &Path) -> ModelSource {
    let checkpoint = variant.checkpoint_dir(models_dir);
    if engine::is_checkpoint_dir(&checkpoint) {
        return ModelSource::Local(checkpoint);
    }
    if checkpoint.is_dir() {
        tracing::warn!("Ignoring incomplete checkpoint at {}", checkpoint.display());
    }
    ModelSource::HuggingFace(variant.pretrained.to_string())
}

fn load_engine(variant: &VariantDescriptor, gpu: bool) -> Result<Box<dyn QaEngine>> {
    let source = model_source(variant, &envconfig::models_dir());
    let options = EngineOptions {
        gpu,
        ..Default::default()
    };
    Ok(engine::load(variant.model_type, &source, options)?)
}

/// Answer the built-in demo questions against the demo passage.
pub fn ask(variant_name: &str, gpu: bool) -> Result<()> {
    let variant = models::resolve(variant_name)?;
    let engine = load_engine(variant, gpu)?;
    let mut pipeline = ExtractionPipeline::new(engine);

    let questions = demo_questions();
    println!("{}", DEMO_PASSAGE);
    println!();

    let results = pipeline.run(DEMO_PASSAGE, &questions)?;
    sink::print_results(&questions, &results);
    Ok(())
}

/// Run a SQuAD dev set through the pipeline, one paragraph per batch, and
/// write the predictions file the scoring script reads.
pub fn eval(variant_name: &str, data: PathBuf, output: Option<PathBuf>, gpu: bool) -> Result<()> {
    let variant = models::resolve(variant_name)?;

    let paragraphs = dataset::load(&data)
        .with_context(|| format!("failed to load dataset {}", data.display()))?;
    let question_count: usize = paragraphs.iter().map(|p| p.qas.len()).sum();
    println!(
        "Loaded {} paragraphs ({} questions) from {}",
        paragraphs.len(),
        question_count,
        data.display()
    );

    let engine = load_engine(variant, gpu)?;
    let mut pipeline = ExtractionPipeline::new(engine);

    let bar = ProgressBar::new(paragraphs.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} paragraphs ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut results = Vec::with_capacity(question_count);
    for paragraph in &paragraphs {
        let questions = paragraph.questions();
        results.extend(pipeline.run(&paragraph.context, &questions)?);
        bar.inc(1);
    }
    bar.finish();

    let output_root = output.unwrap_or_else(|| PathBuf::from("output"));
    let path = variant.predictions_path(&output_root);
    sink::write_predictions(&path, &results)?;

    println!("Wrote {} predictions to {}", results.len(), path.display());
    println!(
        "Run the SQuAD scoring script against {} for the validation F1 score.",
        path.display()
    );
    Ok(())
}

/// Fine-tune a variant on a SQuAD training set. The starting checkpoint is
/// the variant's `squad_tuned` source; the result lands in the models
/// directory under the variant's name.
pub fn train(
    variant_name: &str,
    data: PathBuf,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f64>,
    gpu: bool,
) -> Result<()> {
    let variant = models::resolve(variant_name)?;

    let paragraphs = dataset::load(&data)
        .with_context(|| format!("failed to load dataset {}", data.display()))?;
    let examples: Vec<TrainingExample> = paragraphs
        .iter()
        .flat_map(|p| p.training_examples())
        .collect();
    println!(
        "Loaded {} training examples from {}",
        examples.len(),
        data.display()
    );

    let output_dir = variant.checkpoint_dir(&envconfig::models_dir());
    let mut args = TrainArgs::new(output_dir.clone());
    if let Some(epochs) = epochs {
        args.epochs = epochs;
    }
    if let Some(batch_size) = batch_size {
        args.batch_size = batch_size;
    }
    if let Some(learning_rate) = learning_rate {
        args.learning_rate = learning_rate;
    }

    let source = ModelSource::HuggingFace(variant.squad_tuned.to_string());
    let options = EngineOptions {
        max_seq_len: args.max_seq_len,
        gpu,
        ..Default::default()
    };
    let mut engine = engine::load(variant.model_type, &source, options)?;

    std::fs::create_dir_all(&output_dir)?;
    engine.fine_tune(&examples, &args)?;

    println!("Saved fine-tuned model to {}", output_dir.display());
    Ok(())
}

/// Load a variant and serve the HTTP surface with it.
pub async fn serve(variant_name: &str, gpu: bool) -> Result<()> {
    let variant = models::resolve(variant_name)?;
    let engine = load_engine(variant, gpu)?;
    let pipeline = ExtractionPipeline::new(engine);
    crate::server::serve(pipeline).await?;
    Ok(())
}
