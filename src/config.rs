/// Configuration for tokenization and text datasets
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Tokenizer settings.
///
/// Defaults match BERT-style encoding of short texts: cased vocabulary,
/// every sequence padded and truncated to 50 tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Path to a `tokenizer.json`, or a hub identifier (requires the `http` feature)
    pub source: String,

    /// Fixed encoding length
    pub max_length: usize,

    /// Cut sequences longer than `max_length`
    pub truncation: bool,

    /// Pad every sequence up to `max_length`
    pub pad_to_max_length: bool,

    /// Insert `[CLS]`/`[SEP]` style tokens from the tokenizer's post-processor
    pub add_special_tokens: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            source: "bert-base-cased".to_string(),
            max_length: 50,
            truncation: true,
            pad_to_max_length: true,
            add_special_tokens: true,
        }
    }
}

impl TokenizerConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.source.trim().is_empty() {
            return Err(crate::DatasetError::Config(
                "tokenizer source must not be empty".to_string(),
            ));
        }

        if self.max_length == 0 {
            return Err(crate::DatasetError::Config(
                "max_length must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Settings for building a [`crate::TextDataset`] from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextDatasetConfig {
    /// CSV file holding the table
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    /// Text columns to tokenize (x)
    pub feature_cols: Vec<String>,

    /// Numeric columns used as targets (y)
    pub target_cols: Vec<String>,

    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

impl TextDatasetConfig {
    pub fn new<F, T>(feature_cols: F, target_cols: T) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            data_path: None,
            feature_cols: feature_cols.into_iter().map(Into::into).collect(),
            target_cols: target_cols.into_iter().map(Into::into).collect(),
            tokenizer: TokenizerConfig::default(),
        }
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Read a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        self.tokenizer.validate()?;

        if self.feature_cols.is_empty() {
            return Err(crate::DatasetError::Config(
                "feature_cols must not be empty".to_string(),
            ));
        }

        if self.target_cols.is_empty() {
            return Err(crate::DatasetError::Config(
                "target_cols must not be empty".to_string(),
            ));
        }

        if let Some(col) = self
            .feature_cols
            .iter()
            .find(|col| self.target_cols.contains(col))
        {
            return Err(crate::DatasetError::Config(format!(
                "Column '{}' is listed as both feature and target",
                col
            )));
        }

        Ok(())
    }
}
