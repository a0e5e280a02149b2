//! Tensor datasets for candle training loops
//!
//! Two adapters that expose rows of an in-memory table as `(input, target)`
//! pairs through the [`data::Dataset`] contract:
//!
//! - **ArrayDataset**: numeric feature/label arrays (tabular or pre-tokenized input)
//! - **TextDataset**: text columns encoded by a pretrained tokenizer
//!
//! A [`data::DataLoader`] batches either of them.
//!
//! # Example
//!
//! ```ignore
//! use candle_core::Device;
//! use tensor_datasets::data::{ArrayDataset, DataLoader};
//!
//! let device = Device::Cpu;
//! let dataset = ArrayDataset::new(&x, &y, false, &device)?;
//! let mut loader = DataLoader::new(dataset, 32, true)?;
//! while let Some((inputs, targets)) = loader.next_batch(&device)? {
//!     // ...
//! }
//! ```

pub mod config;
pub mod data;

// Re-export commonly used items
pub use config::{TextDatasetConfig, TokenizerConfig};
pub use data::{ArrayDataset, DataLoader, Dataset, TextDataset};

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("NumPy read error: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
