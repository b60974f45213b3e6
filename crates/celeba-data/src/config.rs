//! YAML training configuration.
//!
//! A config file holds one or more YAML documents. Options are read from the
//! `train` mapping of each document; later documents override earlier ones
//! key by key. Every key under `train` must be one of
//! [`RECOGNIZED_OPTIONS`]:
//!
//! ```yaml
//! train:
//!   root: data/celeba
//!   type: align
//!   attributes: [Male, Smiling, { name: Young, categories: 2 }]
//!   batch_size: 32
//!   v_flip: false
//!   h_flip: true
//!   split: { train: 162770, valid: 19867 }
//!   img_size: 64
//!   seed: 0
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::{
    attributes::{AttributeCatalog, AttributeSpec},
    error::DatasetResult,
    loader::{DatasetConfig, DatasetVariant},
    sampler::SamplerConfig,
    split::SplitSpec,
};

/// Option names accepted under `train`.
pub const RECOGNIZED_OPTIONS: [&str; 9] = [
    "batch_size",
    "v_flip",
    "h_flip",
    "root",
    "type",
    "attributes",
    "split",
    "img_size",
    "seed",
];

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config document {index} is not a mapping")]
    InvalidDocument { index: usize },

    #[error("config has no `train` section")]
    MissingTrainSection,

    #[error("`train` section must be a mapping")]
    InvalidTrainSection,

    #[error("unknown option `{name}` (expected one of: {})", RECOGNIZED_OPTIONS.join(", "))]
    UnknownOption { name: String },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

/// Typed contents of the `train` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub v_flip: bool,
    #[serde(default)]
    pub h_flip: bool,
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(rename = "type", default)]
    pub variant: DatasetVariant,
    pub attributes: Vec<AttributeSpec>,
    #[serde(default)]
    pub split: SplitSpec,
    #[serde(default)]
    pub img_size: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_batch_size() -> usize {
    32
}

fn default_root() -> PathBuf {
    PathBuf::from("data/celeba")
}

impl TrainConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&src)
    }

    /// Parses and validates config text.
    pub fn from_yaml_str(src: &str) -> Result<Self, ConfigError> {
        let options = collect_train_options(src)?;

        for key in options.keys() {
            match key.as_str() {
                Some(name) if RECOGNIZED_OPTIONS.contains(&name) => {}
                Some(name) => {
                    return Err(ConfigError::UnknownOption {
                        name: name.to_string(),
                    })
                }
                None => {
                    return Err(ConfigError::UnknownOption {
                        name: format!("{key:?}"),
                    })
                }
            }
        }

        let config: Self = serde_yaml::from_value(Value::Mapping(options))?;
        config.validate()?;

        tracing::debug!(
            root = %config.root.display(),
            variant = %config.variant,
            attributes = config.attributes.len(),
            batch_size = config.batch_size,
            "config parsed"
        );
        Ok(config)
    }

    /// Checks constraints that the YAML types alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                reason: "batch_size must be greater than 0".into(),
            });
        }
        if self.img_size == Some(0) {
            return Err(ConfigError::Invalid {
                reason: "img_size must be greater than 0".into(),
            });
        }
        self.catalog().map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })?;
        Ok(())
    }

    pub fn catalog(&self) -> DatasetResult<AttributeCatalog> {
        AttributeCatalog::new(self.attributes.clone())
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig::new()
            .with_batch_size(self.batch_size)
            .with_v_flip(self.v_flip)
            .with_h_flip(self.h_flip)
            .with_seed(self.seed)
    }

    pub fn dataset_config(&self) -> DatasetResult<DatasetConfig> {
        Ok(DatasetConfig {
            root: self.root.clone(),
            variant: self.variant,
            catalog: self.catalog()?,
            split: self.split.clone(),
        })
    }
}

/// Merges the `train` mappings of every document in `src`.
fn collect_train_options(src: &str) -> Result<Mapping, ConfigError> {
    let mut merged = Mapping::new();
    let mut found = false;

    for (index, document) in serde_yaml::Deserializer::from_str(src).enumerate() {
        let top = match Value::deserialize(document)? {
            Value::Null => continue,
            Value::Mapping(top) => top,
            _ => return Err(ConfigError::InvalidDocument { index }),
        };
        let Some(train) = top.get("train") else {
            continue;
        };
        let Value::Mapping(train) = train else {
            return Err(ConfigError::InvalidTrainSection);
        };

        found = true;
        for (key, value) in train {
            merged.insert(key.clone(), value.clone());
        }
    }

    if found {
        Ok(merged)
    } else {
        Err(ConfigError::MissingTrainSection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::{CELEBA_TRAIN_COUNT, CELEBA_VALID_COUNT};

    #[test]
    fn minimal_config_uses_defaults() {
        let config = TrainConfig::from_yaml_str("train:\n  attributes: [Male]\n").unwrap();

        assert_eq!(config.batch_size, 32);
        assert!(!config.v_flip);
        assert!(!config.h_flip);
        assert_eq!(config.root, PathBuf::from("data/celeba"));
        assert_eq!(config.variant, DatasetVariant::Aligned);
        assert_eq!(config.attributes, vec![AttributeSpec::binary("Male")]);
        assert_eq!(
            config.split,
            SplitSpec::Counts {
                train: CELEBA_TRAIN_COUNT,
                valid: CELEBA_VALID_COUNT,
                test: None
            }
        );
    }

    #[test]
    fn full_config_is_parsed() {
        let src = r#"
model: ignored-top-level-key
train:
  root: /data/celeba
  type: reg
  attributes:
    - Smiling
    - { name: Hair, categories: 4 }
  batch_size: 16
  v_flip: true
  h_flip: true
  split: { train_ratio: 0.8, valid_ratio: 0.1 }
  img_size: 64
  seed: 9
"#;
        let config = TrainConfig::from_yaml_str(src).unwrap();

        assert_eq!(config.variant, DatasetVariant::Regular);
        assert_eq!(config.catalog().unwrap().width(), 6);
        assert_eq!(config.img_size, Some(64));

        let sampler = config.sampler_config();
        assert_eq!(sampler.batch_size, 16);
        assert!(sampler.v_flip);
        assert!(sampler.h_flip);
        assert_eq!(sampler.seed, Some(9));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = TrainConfig::from_yaml_str(
            "train:\n  attributes: [Male]\n  __import__('os').system: 1\n",
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::UnknownOption { name } if name.starts_with("__import__")));
    }

    #[test]
    fn non_string_key_is_rejected() {
        let err = TrainConfig::from_yaml_str("train:\n  attributes: [Male]\n  1: 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
    }

    #[test]
    fn missing_train_section_is_rejected() {
        assert!(matches!(
            TrainConfig::from_yaml_str("model:\n  depth: 3\n"),
            Err(ConfigError::MissingTrainSection)
        ));
        assert!(matches!(
            TrainConfig::from_yaml_str(""),
            Err(ConfigError::MissingTrainSection)
        ));
        assert!(matches!(
            TrainConfig::from_yaml_str("train: 3\n"),
            Err(ConfigError::InvalidTrainSection)
        ));
    }

    #[test]
    fn later_documents_override_earlier_ones() {
        let src = "train:\n  attributes: [Male]\n  batch_size: 8\n---\ntrain:\n  batch_size: 64\n  h_flip: true\n";
        let config = TrainConfig::from_yaml_str(src).unwrap();

        assert_eq!(config.batch_size, 64);
        assert!(config.h_flip);
        assert_eq!(config.attributes, vec![AttributeSpec::binary("Male")]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for src in [
            "train:\n  attributes: [Male]\n  batch_size: 0\n",
            "train:\n  attributes: []\n",
            "train:\n  attributes: [Male, Male]\n",
            "train:\n  attributes: [Male]\n  img_size: 0\n",
        ] {
            assert!(
                matches!(TrainConfig::from_yaml_str(src), Err(ConfigError::Invalid { .. })),
                "{src}"
            );
        }
    }

    #[test]
    fn type_errors_and_bad_variants_are_parse_errors() {
        assert!(matches!(
            TrainConfig::from_yaml_str("train:\n  attributes: [Male]\n  batch_size: many\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            TrainConfig::from_yaml_str("train:\n  attributes: [Male]\n  type: celeba-hd\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            TrainConfig::from_yaml_str("train:\n  batch_size: 4\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn unknown_keys_in_nested_options_are_rejected() {
        for src in [
            "train:\n  attributes: [{ name: Hair, categoires: 3 }]\n",
            "train:\n  attributes: [Male]\n  split: { train: 5, valid: 2, tset: 9 }\n",
            "train:\n  attributes: [Male]\n  split: { train: 5, valid: 2, train_ratio: 0.1 }\n",
        ] {
            assert!(
                matches!(TrainConfig::from_yaml_str(src), Err(ConfigError::Parse(_))),
                "{src}"
            );
        }
    }

    #[test]
    fn dataset_config_carries_loader_options() {
        let config =
            TrainConfig::from_yaml_str("train:\n  root: /tmp/x\n  type: hq\n  attributes: [Bald]\n")
                .unwrap();
        let dataset = config.dataset_config().unwrap();

        assert_eq!(dataset.root, PathBuf::from("/tmp/x"));
        assert_eq!(dataset.variant, DatasetVariant::HighQuality);
        assert_eq!(dataset.catalog.len(), 1);
    }
}
