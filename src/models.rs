//! Registry of the model variants this crate knows how to run.
//!
//! Every variant name maps to an architecture plus the checkpoints used for
//! inference and fine-tuning. Resolution is total: an unknown name is an
//! error up front, never a partial fallback deep inside a command.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// Transformer architecture backing a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    Distilbert,
    Roberta,
    Electra,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Distilbert => "distilbert",
            ModelType::Roberta => "roberta",
            ModelType::Electra => "electra",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the commands need to know about one variant.
///
/// `pretrained` is the hub checkpoint used when no local fine-tuned copy
/// exists; `squad_tuned` is the starting point for fine-tuning. Both paths
/// on disk are keyed by the variant name, so two variants of the same
/// architecture never collide.
#[derive(Debug, Clone)]
pub struct VariantDescriptor {
    pub name: &'static str,
    pub model_type: ModelType,
    pub pretrained: &'static str,
    pub squad_tuned: &'static str,
}

impl VariantDescriptor {
    /// Directory holding this variant's local checkpoint.
    pub fn checkpoint_dir(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.name)
    }

    /// Where the evaluation command writes this variant's predictions.
    pub fn predictions_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.name).join("predictions.json")
    }
}

const VARIANTS: &[VariantDescriptor] = &[
    VariantDescriptor {
        name: "distilbert",
        model_type: ModelType::Distilbert,
        pretrained: "distilbert-base-uncased-distilled-squad",
        squad_tuned: "distilbert-base-uncased-distilled-squad",
    },
    VariantDescriptor {
        name: "roberta",
        model_type: ModelType::Roberta,
        pretrained: "roberta-base",
        squad_tuned: "deepset/roberta-base-squad2",
    },
    VariantDescriptor {
        name: "electra-base",
        model_type: ModelType::Electra,
        pretrained: "google/electra-base-discriminator",
        squad_tuned: "deepset/electra-base-squad2",
    },
    VariantDescriptor {
        name: "electra-small",
        model_type: ModelType::Electra,
        pretrained: "google/electra-small-discriminator",
        squad_tuned: "google/electra-small-discriminator",
    },
];

pub struct VariantRegistry {
    variants: HashMap<&'static str, &'static VariantDescriptor>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        let mut variants = HashMap::with_capacity(VARIANTS.len());
        for variant in VARIANTS {
            variants.insert(variant.name, variant);
        }
        Self { variants }
    }

    pub fn resolve(&self, name: &str) -> Result<&'static VariantDescriptor> {
        self.variants
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownModelVariant {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    /// Variant names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        VARIANTS.iter().map(|v| v.name).collect()
    }
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: Lazy<VariantRegistry> = Lazy::new(VariantRegistry::new);

/// Resolve a variant name against the global registry.
pub fn resolve(name: &str) -> Result<&'static VariantDescriptor> {
    REGISTRY.resolve(name)
}

/// Names accepted by [`resolve`].
pub fn variant_names() -> Vec<&'static str> {
    REGISTRY.names()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_registered_variant() {
        for name in variant_names() {
            let variant = resolve(name).unwrap();
            assert_eq!(variant.name, name);
        }
    }

    #[test]
    fn electra_variants_share_architecture_but_not_checkpoints() {
        let base = resolve("electra-base").unwrap();
        let small = resolve("electra-small").unwrap();
        assert_eq!(base.model_type, ModelType::Electra);
        assert_eq!(small.model_type, ModelType::Electra);
        assert_ne!(base.pretrained, small.pretrained);
        assert_ne!(base.squad_tuned, small.squad_tuned);
    }

    #[test]
    fn electra_small_fine_tunes_from_its_own_checkpoint() {
        let small = resolve("electra-small").unwrap();
        assert_eq!(small.squad_tuned, "google/electra-small-discriminator");
    }

    #[test]
    fn unknown_variant_is_an_error_listing_the_choices() {
        let err = resolve("bert-large").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bert-large"));
        assert!(msg.contains("distilbert"));
        assert!(msg.contains("electra-small"));
    }

    #[test]
    fn paths_are_keyed_by_variant_name() {
        let base = resolve("electra-base").unwrap();
        let small = resolve("electra-small").unwrap();
        let models = Path::new("models");
        let output = Path::new("output");
        assert_eq!(base.checkpoint_dir(models), Path::new("models/electra-base"));
        assert_eq!(small.checkpoint_dir(models), Path::new("models/electra-small"));
        assert_ne!(
            base.predictions_path(output),
            small.predictions_path(output)
        );
        assert_eq!(
            resolve("roberta").unwrap().predictions_path(output),
            Path::new("output/roberta/predictions.json")
        );
    }
}
