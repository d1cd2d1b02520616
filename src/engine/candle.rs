//! Candle backend: runs BERT-family extractive QA checkpoints on CPU or CUDA.
//!
//! Checkpoints are the usual Hugging Face trio of `config.json`,
//! `tokenizer.json` and `model.safetensors`, either in a local directory or
//! fetched from the hub on first use. The span head (`qa_outputs`) sits on
//! top of the encoder and yields start/end logits per token. Checkpoints
//! that project embeddings up to a wider hidden size cannot pass through
//! the encoder graphs here and are rejected up front.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use hf_hub::api::sync::{Api, ApiRepo};
use tokenizers::{EncodeInput, Encoding, PaddingParams, Tokenizer, TruncationParams, TruncationStrategy};

use super::{EngineOptions, ModelSource, QaEngine, TrainArgs};
use crate::error::{Error, Result};
use crate::models::ModelType;
use crate::types::{BatchRequest, RawPrediction, TrainingExample};

struct CheckpointFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

const CHECKPOINT_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// True when `dir` holds the complete checkpoint file set. Callers use this
/// to pick between a local directory and the hub before loading anything.
pub fn is_checkpoint_dir(dir: &Path) -> bool {
    CHECKPOINT_FILES.iter().all(|name| dir.join(name).is_file())
}

fn resolve_checkpoint(source: &ModelSource) -> Result<CheckpointFiles> {
    match source {
        ModelSource::Local(dir) => {
            let [config, tokenizer, weights] = CHECKPOINT_FILES.map(|name| dir.join(name));
            for path in [&config, &tokenizer, &weights] {
                if !path.is_file() {
                    return Err(Error::inference(format!(
                        "checkpoint file {} does not exist",
                        path.display()
                    )));
                }
            }
            Ok(CheckpointFiles {
                config,
                tokenizer,
                weights,
            })
        }
        ModelSource::HuggingFace(repo_id) => {
            let api = Api::new().map_err(|e| Error::inference(format!("hub api: {e}")))?;
            let repo = api.model(repo_id.clone());
            Ok(CheckpointFiles {
                config: fetch(&repo, repo_id, "config.json")?,
                tokenizer: fetch(&repo, repo_id, "tokenizer.json")?,
                weights: fetch(&repo, repo_id, "model.safetensors")?,
            })
        }
    }
}

fn fetch(repo: &ApiRepo, repo_id: &str, filename: &str) -> Result<PathBuf> {
    repo.get(filename)
        .map_err(|e| Error::inference(format!("fetch {filename} from {repo_id}: {e}")))
}

/// Width of the encoder's hidden states, validated against the embedding
/// width. Checkpoints that project embeddings up to the hidden size (the
/// small ELECTRA discriminators) have no counterpart in the encoder graphs
/// below and are rejected before any tensor is read.
fn encoder_hidden_size(raw_config: &serde_json::Value, source: &ModelSource) -> Result<usize> {
    let hidden_size = raw_config
        .get("hidden_size")
        .or_else(|| raw_config.get("dim"))
        .and_then(|v| v.as_u64())
        .unwrap_or(768) as usize;
    let embedding_size = raw_config
        .get("embedding_size")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(hidden_size);
    if embedding_size != hidden_size {
        return Err(Error::unsupported(format!(
            "checkpoint {source} projects {embedding_size}-wide embeddings to a hidden size of \
             {hidden_size}; only checkpoints whose embedding and hidden sizes match can load"
        )));
    }
    Ok(hidden_size)
}

/// The encoder half of the network. Roberta and Electra checkpoints both
/// load through the BERT graph; only DistilBERT differs structurally.
enum Encoder {
    Bert(BertModel),
    DistilBert(DistilBertModel),
}

pub struct CandleQaEngine {
    encoder: Encoder,
    qa_outputs: Linear,
    tokenizer: Tokenizer,
    device: Device,
    options: EngineOptions,
}

impl CandleQaEngine {
    pub fn load(
        model_type: ModelType,
        source: &ModelSource,
        options: EngineOptions,
    ) -> Result<Self> {
        let device = if options.gpu {
            Device::cuda_if_available(0).map_err(|e| Error::inference(format!("device: {e}")))?
        } else {
            Device::Cpu
        };

        let files = resolve_checkpoint(source)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::inference(format!("tokenizer: {e}")))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: options.max_seq_len,
                strategy: TruncationStrategy::OnlySecond,
                ..Default::default()
            }))
            .map_err(|e| Error::inference(format!("tokenizer truncation: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams::default()));

        let config_text = std::fs::read_to_string(&files.config)?;
        let raw_config: serde_json::Value = serde_json::from_str(&config_text)
            .map_err(|e| Error::inference(format!("model config: {e}")))?;
        let hidden_size = encoder_hidden_size(&raw_config, source)?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, &device)
        }
        .map_err(|e| Error::inference(format!("weights: {e}")))?;
        let qa_outputs = linear(hidden_size, 2, vb.pp("qa_outputs"))
            .map_err(|e| Error::inference(format!("qa head: {e}")))?;

        let encoder = match model_type {
            ModelType::Distilbert => {
                let config: DistilBertConfig = serde_json::from_str(&config_text)
                    .map_err(|e| Error::inference(format!("model config: {e}")))?;
                let model = DistilBertModel::load(vb, &config)
                    .map_err(|e| Error::inference(format!("encoder: {e}")))?;
                Encoder::DistilBert(model)
            }
            ModelType::Roberta | ModelType::Electra => {
                let config: BertConfig = serde_json::from_str(&config_text)
                    .map_err(|e| Error::inference(format!("model config: {e}")))?;
                let model = BertModel::load(vb, &config)
                    .map_err(|e| Error::inference(format!("encoder: {e}")))?;
                Encoder::Bert(model)
            }
        };

        tracing::info!("Loaded {} model from {}", model_type, source);

        Ok(Self {
            encoder,
            qa_outputs,
            tokenizer,
            device,
            options,
        })
    }

    /// Rank answer spans for one question from its start/end logits.
    ///
    /// Only tokens of the passage segment are eligible. The CLS position
    /// scores the null span; when it beats the best text span the empty
    /// string is ranked first, which the pipeline reads as no-answer.
    fn rank_spans(
        &self,
        passage: &str,
        encoding: &Encoding,
        start: &[f32],
        end: &[f32],
    ) -> Vec<String> {
        let sequence_ids = encoding.get_sequence_ids();
        let special = encoding.get_special_tokens_mask();
        let attention = encoding.get_attention_mask();
        let offsets = encoding.get_offsets();

        let passage_tokens: Vec<usize> = (0..sequence_ids.len())
            .filter(|&i| attention[i] == 1 && special[i] == 0 && sequence_ids[i] == Some(1))
            .collect();

        let null_score = start[0] + end[0];

        let mut spans: Vec<(f32, usize, usize)> = Vec::new();
        for (pos, &s) in passage_tokens.iter().enumerate() {
            for &e in passage_tokens[pos..].iter().take(self.options.max_answer_len) {
                spans.push((start[s] + end[e], s, e));
            }
        }
        spans.sort_by(|a, b| b.0.total_cmp(&a.0));
        spans.truncate(self.options.n_best);

        let mut answers = Vec::with_capacity(spans.len() + 1);
        if spans.first().map_or(true, |best| null_score > best.0) {
            answers.push(String::new());
        }
        for (_score, s, e) in spans {
            let (span_start, _) = offsets[s];
            let (_, span_end) = offsets[e];
            if let Some(text) = passage.get(span_start..span_end) {
                let text = text.trim();
                if !text.is_empty() {
                    answers.push(text.to_string());
                }
            }
        }
        answers
    }
}

impl QaEngine for CandleQaEngine {
    fn predict(&mut self, request: &BatchRequest) -> Result<Vec<RawPrediction>> {
        if request.questions.is_empty() {
            return Ok(Vec::new());
        }

        let inputs: Vec<EncodeInput> = request
            .questions
            .iter()
            .map(|q| EncodeInput::Dual(q.text.as_str().into(), request.passage.as_str().into()))
            .collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| Error::inference(format!("tokenization: {e}")))?;

        let batch = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut type_ids = Vec::with_capacity(batch * seq_len);
        let mut attention = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            ids.extend_from_slice(encoding.get_ids());
            type_ids.extend_from_slice(encoding.get_type_ids());
            attention.extend_from_slice(encoding.get_attention_mask());
        }

        let input_ids = Tensor::from_vec(ids, (batch, seq_len), &self.device)
            .map_err(|e| Error::inference(format!("input tensor: {e}")))?;

        let hidden = match &self.encoder {
            Encoder::Bert(model) => {
                let token_type_ids = Tensor::from_vec(type_ids, (batch, seq_len), &self.device)
                    .map_err(|e| Error::inference(format!("input tensor: {e}")))?;
                let attention_mask = Tensor::from_vec(attention, (batch, seq_len), &self.device)
                    .map_err(|e| Error::inference(format!("input tensor: {e}")))?;
                model
                    .forward(&input_ids, &token_type_ids, Some(&attention_mask))
                    .map_err(|e| Error::inference(format!("forward pass: {e}")))?
            }
            Encoder::DistilBert(model) => {
                // DistilBERT masks positions where the mask is nonzero.
                let pad_mask: Vec<u8> = attention.iter().map(|&m| u8::from(m == 0)).collect();
                let pad_mask = Tensor::from_vec(pad_mask, (batch, 1, 1, seq_len), &self.device)
                    .map_err(|e| Error::inference(format!("input tensor: {e}")))?;
                model
                    .forward(&input_ids, &pad_mask)
                    .map_err(|e| Error::inference(format!("forward pass: {e}")))?
            }
        };

        let logits = self
            .qa_outputs
            .forward(&hidden)
            .map_err(|e| Error::inference(format!("qa head: {e}")))?;
        let start_logits = logits
            .i((.., .., 0))
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|e| Error::inference(format!("logits: {e}")))?;
        let end_logits = logits
            .i((.., .., 1))
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|e| Error::inference(format!("logits: {e}")))?;

        let mut predictions = Vec::with_capacity(batch);
        for (i, encoding) in encodings.iter().enumerate() {
            predictions.push(RawPrediction {
                id: request.questions[i].id.clone(),
                answers: self.rank_spans(
                    &request.passage,
                    encoding,
                    &start_logits[i],
                    &end_logits[i],
                ),
            });
        }
        Ok(predictions)
    }

    fn fine_tune(&mut self, _examples: &[TrainingExample], args: &TrainArgs) -> Result<()> {
        Err(Error::unsupported(format!(
            "fine-tuning on the candle backend; train the checkpoint elsewhere and place it under {}",
            args.output_dir.display()
        )))
    }
}
