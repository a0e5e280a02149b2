/// Pretrained tokenizer wrapper producing fixed-size encodings
use std::path::Path;
use std::str::FromStr;

use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::config::TokenizerConfig;

/// Raw encoding of one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEncoding {
    pub input_ids: Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl TokenEncoding {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Convert to `[1, seq_len]` u32 tensors
    pub fn to_tensors(&self, device: &Device) -> crate::Result<EncodedText> {
        let len = self.input_ids.len();
        Ok(EncodedText {
            input_ids: Tensor::from_slice(&self.input_ids, (1, len), device)?,
            token_type_ids: Tensor::from_slice(&self.token_type_ids, (1, len), device)?,
            attention_mask: Tensor::from_slice(&self.attention_mask, (1, len), device)?,
        })
    }
}

/// Model-ready encoding of one text, each tensor shaped `[batch, seq_len]`
#[derive(Debug, Clone)]
pub struct EncodedText {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

impl EncodedText {
    pub fn seq_len(&self) -> usize {
        self.input_ids.dims().last().copied().unwrap_or(0)
    }

    pub fn to_device(&self, device: &Device) -> crate::Result<Self> {
        Ok(Self {
            input_ids: self.input_ids.to_device(device)?,
            token_type_ids: self.token_type_ids.to_device(device)?,
            attention_mask: self.attention_mask.to_device(device)?,
        })
    }
}

/// Anything that turns text into token encodings
pub trait TextEncoder {
    fn encode(&self, text: &str) -> crate::Result<TokenEncoding>;

    fn encode_batch(&self, texts: &[&str]) -> crate::Result<Vec<TokenEncoding>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// HuggingFace tokenizer with fixed padding and truncation applied
pub struct PretrainedTokenizer {
    tokenizer: Tokenizer,
    add_special_tokens: bool,
    max_length: usize,
}

impl PretrainedTokenizer {
    /// Resolve `config.source` as a `tokenizer.json` file, a directory holding
    /// one, or (with the `http` feature) a hub identifier
    pub fn from_config(config: &TokenizerConfig) -> crate::Result<Self> {
        config.validate()?;

        let path = Path::new(&config.source);
        if path.is_file() {
            return Self::from_file(path, config);
        }
        if path.is_dir() && path.join("tokenizer.json").is_file() {
            return Self::from_file(path.join("tokenizer.json"), config);
        }

        #[cfg(feature = "http")]
        {
            Self::from_pretrained(&config.source, config)
        }

        #[cfg(not(feature = "http"))]
        {
            Err(crate::DatasetError::Config(format!(
                "Tokenizer file {:?} not found (enable the `http` feature to fetch hub identifiers)",
                config.source
            )))
        }
    }

    /// Load from a `tokenizer.json` file
    pub fn from_file<P: AsRef<Path>>(path: P, config: &TokenizerConfig) -> crate::Result<Self> {
        log::info!("Loading tokenizer from: {:?}", path.as_ref());
        let tokenizer = Tokenizer::from_file(path.as_ref()).map_err(tokenizer_error)?;
        Self::configure(tokenizer, config)
    }

    /// Load from serialized `tokenizer.json` contents
    pub fn from_json(json: &str, config: &TokenizerConfig) -> crate::Result<Self> {
        let tokenizer = Tokenizer::from_str(json).map_err(tokenizer_error)?;
        Self::configure(tokenizer, config)
    }

    /// Download from the HuggingFace hub
    #[cfg(feature = "http")]
    pub fn from_pretrained(identifier: &str, config: &TokenizerConfig) -> crate::Result<Self> {
        log::info!("Fetching pretrained tokenizer: {}", identifier);
        let tokenizer = Tokenizer::from_pretrained(identifier, None).map_err(tokenizer_error)?;
        Self::configure(tokenizer, config)
    }

    fn configure(mut tokenizer: Tokenizer, config: &TokenizerConfig) -> crate::Result<Self> {
        config.validate()?;

        if config.pad_to_max_length {
            let mut padding = PaddingParams {
                strategy: PaddingStrategy::Fixed(config.max_length),
                ..Default::default()
            };
            if let Some(id) = tokenizer.token_to_id(&padding.pad_token) {
                padding.pad_id = id;
            }
            tokenizer.with_padding(Some(padding));
        } else {
            tokenizer.with_padding(None);
        }

        let truncation = config.truncation.then(|| TruncationParams {
            max_length: config.max_length,
            ..Default::default()
        });
        tokenizer
            .with_truncation(truncation)
            .map_err(tokenizer_error)?;

        log::debug!(
            "Tokenizer configured: vocab_size={}, max_length={}, padding={}, truncation={}",
            tokenizer.get_vocab_size(true),
            config.max_length,
            config.pad_to_max_length,
            config.truncation
        );

        Ok(Self {
            tokenizer,
            add_special_tokens: config.add_special_tokens,
            max_length: config.max_length,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    pub fn inner(&self) -> &Tokenizer {
        &self.tokenizer
    }
}

impl TextEncoder for PretrainedTokenizer {
    fn encode(&self, text: &str) -> crate::Result<TokenEncoding> {
        let encoding = self
            .tokenizer
            .encode(text, self.add_special_tokens)
            .map_err(tokenizer_error)?;
        Ok(to_token_encoding(&encoding))
    }

    fn encode_batch(&self, texts: &[&str]) -> crate::Result<Vec<TokenEncoding>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), self.add_special_tokens)
            .map_err(tokenizer_error)?;
        Ok(encodings.iter().map(to_token_encoding).collect())
    }
}

fn to_token_encoding(encoding: &tokenizers::Encoding) -> TokenEncoding {
    TokenEncoding {
        input_ids: encoding.get_ids().to_vec(),
        token_type_ids: encoding.get_type_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
    }
}

fn tokenizer_error(err: tokenizers::Error) -> crate::DatasetError {
    crate::DatasetError::Tokenizer(err.to_string())
}
