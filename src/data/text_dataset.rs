/// Dataset over a table of text columns, tokenized up front
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};

use super::table::TextTable;
use super::tokenize::{EncodedText, PretrainedTokenizer, TextEncoder};
use super::{check_index, Collate, Dataset};
use crate::config::TextDatasetConfig;

/// Name suffix of the encoded column derived from each feature column
pub const ENCODED_COLUMN_SUFFIX: &str = "_bert_tkn";

/// Rows per tokenizer call; also the granularity of progress logging
const ENCODE_CHUNK: usize = 1024;

/// Where the table comes from
#[derive(Debug, Clone)]
pub enum TableSource {
    /// File on disk, read with [`TextTable::load`]
    Path(PathBuf),
    /// Table already in memory
    Table(TextTable),
}

impl From<TextTable> for TableSource {
    fn from(table: TextTable) -> Self {
        TableSource::Table(table)
    }
}

impl From<PathBuf> for TableSource {
    fn from(path: PathBuf) -> Self {
        TableSource::Path(path)
    }
}

impl From<&Path> for TableSource {
    fn from(path: &Path) -> Self {
        TableSource::Path(path.to_path_buf())
    }
}

impl From<&str> for TableSource {
    fn from(path: &str) -> Self {
        TableSource::Path(PathBuf::from(path))
    }
}

/// One row: an encoding per feature column plus the target values
#[derive(Debug, Clone)]
pub struct TextSample {
    pub features: Vec<EncodedText>,
    /// `[n_targets]`, or `[batch, n_targets]` once collated
    pub target: Tensor,
}

/// Text table whose feature columns are encoded by a pretrained tokenizer.
pub struct TextDataset {
    table: TextTable,
    feature_cols: Vec<String>,
    target_cols: Vec<String>,
    /// Parallel to `feature_cols`, one encoding per row
    encoded: Vec<Vec<EncodedText>>,
    /// `[rows, n_targets]`
    targets: Tensor,
}

impl TextDataset {
    /// Tokenize every feature column of `source`.
    ///
    /// # Arguments
    /// * `source` - CSV path or in-memory table; text only
    /// * `feature_cols` - Columns to tokenize (x)
    /// * `target_cols` - Numeric columns used as targets (y)
    /// * `encoder` - Tokenizer applied to each feature cell
    /// * `device` - Device the tensors live on
    pub fn new<F, T, E>(
        source: impl Into<TableSource>,
        feature_cols: F,
        target_cols: T,
        encoder: &E,
        device: &Device,
    ) -> crate::Result<Self>
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
        E: TextEncoder + ?Sized,
    {
        let table = match source.into() {
            TableSource::Path(path) => TextTable::load(path)?,
            TableSource::Table(table) => table,
        };
        let feature_cols: Vec<String> = feature_cols
            .into_iter()
            .map(|col| col.as_ref().to_string())
            .collect();
        let target_cols: Vec<String> = target_cols
            .into_iter()
            .map(|col| col.as_ref().to_string())
            .collect();

        // Fail before spending time on tokenization
        for col in feature_cols.iter().chain(&target_cols) {
            table.column(col)?;
        }

        let mut encoded = Vec::with_capacity(feature_cols.len());
        for col in &feature_cols {
            encoded.push(encode_column(&table, col, encoder, device)?);
        }

        let targets = parse_targets(&table, &target_cols, device)?;

        log::info!(
            "Text dataset ready: {} rows, features {:?}, targets {:?}",
            table.len(),
            feature_cols,
            target_cols
        );

        Ok(Self {
            table,
            feature_cols,
            target_cols,
            encoded,
            targets,
        })
    }

    /// Build tokenizer and table from a config
    pub fn from_config(config: &TextDatasetConfig, device: &Device) -> crate::Result<Self> {
        config.validate()?;

        let path = config.data_path.as_ref().ok_or_else(|| {
            crate::DatasetError::Config("data_path must be set".to_string())
        })?;
        let tokenizer = PretrainedTokenizer::from_config(&config.tokenizer)?;

        Self::new(
            path.clone(),
            &config.feature_cols,
            &config.target_cols,
            &tokenizer,
            device,
        )
    }

    pub fn table(&self) -> &TextTable {
        &self.table
    }

    pub fn feature_cols(&self) -> &[String] {
        &self.feature_cols
    }

    pub fn target_cols(&self) -> &[String] {
        &self.target_cols
    }

    /// Name under which a feature's encodings are exposed
    pub fn encoded_column_name(feature: &str) -> String {
        format!("{}{}", feature, ENCODED_COLUMN_SUFFIX)
    }

    /// Encodings of a feature column, addressed by feature name or encoded name
    pub fn encoded_column(&self, name: &str) -> crate::Result<&[EncodedText]> {
        let feature = name.strip_suffix(ENCODED_COLUMN_SUFFIX).unwrap_or(name);
        self.feature_cols
            .iter()
            .position(|col| col == feature)
            .map(|pos| self.encoded[pos].as_slice())
            .ok_or_else(|| crate::DatasetError::MissingColumn(Self::encoded_column_name(feature)))
    }
}

impl Dataset for TextDataset {
    type Item = TextSample;

    fn len(&self) -> usize {
        self.table.len()
    }

    fn get(&self, idx: usize) -> crate::Result<Self::Item> {
        check_index(idx, self.len())?;
        Ok(TextSample {
            features: self.encoded.iter().map(|column| column[idx].clone()).collect(),
            target: self.targets.get(idx)?,
        })
    }
}

impl Collate for TextSample {
    fn collate(items: Vec<Self>) -> crate::Result<Self> {
        let first = items.first().ok_or_else(|| {
            crate::DatasetError::Shape("cannot collate an empty batch".to_string())
        })?;
        let num_features = first.features.len();
        if let Some(item) = items.iter().find(|item| item.features.len() != num_features) {
            return Err(crate::DatasetError::Shape(format!(
                "sample has {} features, expected {}",
                item.features.len(),
                num_features
            )));
        }

        let mut features = Vec::with_capacity(num_features);
        for f in 0..num_features {
            let mut input_ids = Vec::with_capacity(items.len());
            let mut token_type_ids = Vec::with_capacity(items.len());
            let mut attention_mask = Vec::with_capacity(items.len());

            for item in &items {
                let encoding = &item.features[f];
                input_ids.push(&encoding.input_ids);
                token_type_ids.push(&encoding.token_type_ids);
                attention_mask.push(&encoding.attention_mask);
            }

            features.push(EncodedText {
                input_ids: Tensor::cat(&input_ids, 0)?,
                token_type_ids: Tensor::cat(&token_type_ids, 0)?,
                attention_mask: Tensor::cat(&attention_mask, 0)?,
            });
        }

        let targets: Vec<&Tensor> = items.iter().map(|item| &item.target).collect();
        Ok(TextSample {
            features,
            target: Tensor::stack(&targets, 0)?,
        })
    }

    fn to_device(self, device: &Device) -> crate::Result<Self> {
        Ok(TextSample {
            features: self
                .features
                .iter()
                .map(|encoding| encoding.to_device(device))
                .collect::<crate::Result<_>>()?,
            target: self.target.to_device(device)?,
        })
    }
}

fn encode_column<E: TextEncoder + ?Sized>(
    table: &TextTable,
    col: &str,
    encoder: &E,
    device: &Device,
) -> crate::Result<Vec<EncodedText>> {
    log::info!("Applying bert-tokenization on '{}'...", col);

    let texts: Vec<&str> = table.column(col)?.iter().map(String::as_str).collect();
    let mut encodings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(ENCODE_CHUNK) {
        let batch = encoder.encode_batch(chunk)?;
        if batch.len() != chunk.len() {
            return Err(crate::DatasetError::Shape(format!(
                "encoder returned {} encodings for {} rows of '{}'",
                batch.len(),
                chunk.len(),
                col
            )));
        }
        for encoding in batch {
            encodings.push(encoding.to_tensors(device)?);
        }
        log::debug!("'{}': {}/{} rows tokenized", col, encodings.len(), texts.len());
    }

    Ok(encodings)
}

fn parse_targets(
    table: &TextTable,
    target_cols: &[String],
    device: &Device,
) -> crate::Result<Tensor> {
    let columns = target_cols
        .iter()
        .map(|col| table.column(col))
        .collect::<crate::Result<Vec<_>>>()?;

    let mut values = Vec::with_capacity(table.len() * target_cols.len());
    for row in 0..table.len() {
        for (col, column) in target_cols.iter().zip(&columns) {
            let raw = column[row].trim();
            let value = raw
                .parse::<f32>()
                .map_err(|_| crate::DatasetError::InvalidValue {
                    column: col.clone(),
                    row,
                    value: raw.to_string(),
                })?;
            values.push(value);
        }
    }

    Ok(Tensor::from_vec(
        values,
        (table.len(), target_cols.len()),
        device,
    )?)
}
