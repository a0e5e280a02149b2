/// Dataset adapters and batching
pub mod array_dataset;
pub mod loader;
pub mod table;
pub mod text_dataset;
pub mod tokenize;

pub use array_dataset::ArrayDataset;
pub use loader::DataLoader;
pub use table::TextTable;
pub use text_dataset::{TableSource, TextDataset, TextSample, ENCODED_COLUMN_SUFFIX};
pub use tokenize::{EncodedText, PretrainedTokenizer, TextEncoder, TokenEncoding};

use candle_core::Device;

/// Random-access contract consumed by batching loops
pub trait Dataset {
    /// A single row, usually `(input, target)`
    type Item;

    /// Number of rows
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get row at index
    fn get(&self, idx: usize) -> crate::Result<Self::Item>;
}

/// Merge per-row items into one batched item
pub trait Collate: Sized {
    /// Combine `items` along a new leading batch axis
    fn collate(items: Vec<Self>) -> crate::Result<Self>;

    /// Move all tensors to `device`
    fn to_device(self, device: &Device) -> crate::Result<Self>;
}

/// Generic data loader trait
pub trait BatchDataLoader {
    type Batch;

    /// Get next batch
    fn next_batch(&mut self, device: &Device) -> crate::Result<Option<Self::Batch>>;

    /// Reset loader for new epoch
    fn reset(&mut self);

    /// Get total number of batches
    fn num_batches(&self) -> usize;
}

pub(crate) fn check_index(idx: usize, len: usize) -> crate::Result<()> {
    if idx >= len {
        return Err(crate::DatasetError::IndexOutOfBounds { index: idx, len });
    }
    Ok(())
}
