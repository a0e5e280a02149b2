/// Batched iteration over any [`Dataset`]
use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{BatchDataLoader, Collate, Dataset};

impl Collate for (Tensor, Tensor) {
    fn collate(items: Vec<Self>) -> crate::Result<Self> {
        if items.is_empty() {
            return Err(crate::DatasetError::Shape(
                "cannot collate an empty batch".to_string(),
            ));
        }

        let (inputs, targets): (Vec<Tensor>, Vec<Tensor>) = items.into_iter().unzip();
        Ok((Tensor::stack(&inputs, 0)?, Tensor::stack(&targets, 0)?))
    }

    fn to_device(self, device: &Device) -> crate::Result<Self> {
        Ok((self.0.to_device(device)?, self.1.to_device(device)?))
    }
}

/// Data loader yielding collated batches in (optionally shuffled) index order
pub struct DataLoader<D: Dataset> {
    dataset: D,
    batch_size: usize,
    current_idx: usize,
    indices: Vec<usize>,
    shuffle: bool,
    drop_last: bool,
    rng: StdRng,
}

impl<D: Dataset> DataLoader<D> {
    /// Create new data loader
    pub fn new(dataset: D, batch_size: usize, shuffle: bool) -> crate::Result<Self> {
        Self::build(dataset, batch_size, shuffle, StdRng::from_entropy())
    }

    /// Create a loader whose shuffle order is reproducible
    pub fn with_seed(dataset: D, batch_size: usize, shuffle: bool, seed: u64) -> crate::Result<Self> {
        Self::build(dataset, batch_size, shuffle, StdRng::seed_from_u64(seed))
    }

    fn build(dataset: D, batch_size: usize, shuffle: bool, rng: StdRng) -> crate::Result<Self> {
        if batch_size == 0 {
            return Err(crate::DatasetError::Config(
                "batch_size must be > 0".to_string(),
            ));
        }

        let mut loader = Self {
            indices: (0..dataset.len()).collect(),
            dataset,
            batch_size,
            current_idx: 0,
            shuffle,
            drop_last: false,
            rng,
        };
        if loader.shuffle {
            loader.indices.shuffle(&mut loader.rng);
        }
        Ok(loader)
    }

    /// Skip the final batch when it is smaller than `batch_size`
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Get number of batches
    pub fn num_batches(&self) -> usize {
        let len = self.dataset.len();
        if self.drop_last {
            len / self.batch_size
        } else {
            (len + self.batch_size - 1) / self.batch_size
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Get dataset reference
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Reset loader for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;

        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
    }
}

impl<D> DataLoader<D>
where
    D: Dataset,
    D::Item: Collate,
{
    /// Get next batch, moved to `device`
    pub fn next_batch(&mut self, device: &Device) -> crate::Result<Option<D::Item>> {
        if self.current_idx >= self.indices.len() {
            return Ok(None);
        }

        let end_idx = (self.current_idx + self.batch_size).min(self.indices.len());
        if self.drop_last && end_idx - self.current_idx < self.batch_size {
            self.current_idx = self.indices.len();
            return Ok(None);
        }

        let items = self.indices[self.current_idx..end_idx]
            .iter()
            .map(|&idx| self.dataset.get(idx))
            .collect::<crate::Result<Vec<_>>>()?;
        self.current_idx = end_idx;

        let batch = D::Item::collate(items)?;
        Ok(Some(batch.to_device(device)?))
    }
}

impl<D> BatchDataLoader for DataLoader<D>
where
    D: Dataset,
    D::Item: Collate,
{
    type Batch = D::Item;

    fn next_batch(&mut self, device: &Device) -> crate::Result<Option<Self::Batch>> {
        DataLoader::next_batch(self, device)
    }

    fn reset(&mut self) {
        DataLoader::reset(self)
    }

    fn num_batches(&self) -> usize {
        DataLoader::num_batches(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ArrayDataset;
    use ndarray::Array;

    fn dataset(n: usize) -> ArrayDataset {
        let x = Array::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f32);
        let y = Array::from_shape_fn(n, |i| i as f32);
        ArrayDataset::new(&x, &y, false, &Device::Cpu).unwrap()
    }

    fn drain<L: BatchDataLoader<Batch = (Tensor, Tensor)>>(loader: &mut L) -> Vec<f32> {
        let mut labels = Vec::new();
        while let Some((_, y)) = loader.next_batch(&Device::Cpu).unwrap() {
            labels.extend(y.flatten_all().unwrap().to_vec1::<f32>().unwrap());
        }
        labels
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            DataLoader::new(dataset(2), 0, false),
            Err(crate::DatasetError::Config(_))
        ));
    }

    #[test]
    fn test_sequential_batches() -> crate::Result<()> {
        let device = Device::Cpu;
        let mut loader = DataLoader::new(dataset(5), 2, false)?;
        assert_eq!(loader.num_batches(), 3);

        let (x, y) = loader.next_batch(&device)?.unwrap();
        assert_eq!(x.dims(), &[2, 3]);
        assert_eq!(y.dims(), &[2, 1]);
        assert_eq!(x.to_vec2::<f32>()?, vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);

        loader.next_batch(&device)?.unwrap();
        let (x, y) = loader.next_batch(&device)?.unwrap();
        assert_eq!(x.dims(), &[1, 3]);
        assert_eq!(y.to_vec2::<f32>()?, vec![vec![4.0]]);

        assert!(loader.next_batch(&device)?.is_none());
        Ok(())
    }

    #[test]
    fn test_drop_last() -> crate::Result<()> {
        let mut loader = DataLoader::new(dataset(5), 2, false)?.drop_last(true);
        assert_eq!(loader.num_batches(), 2);
        assert_eq!(drain(&mut loader), vec![0.0, 1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_reset_starts_new_epoch() -> crate::Result<()> {
        let mut loader = DataLoader::new(dataset(3), 2, false)?;
        assert_eq!(drain(&mut loader), vec![0.0, 1.0, 2.0]);

        loader.reset();
        assert_eq!(drain(&mut loader), vec![0.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_seeded_shuffle_is_permutation() -> crate::Result<()> {
        let mut first = DataLoader::with_seed(dataset(20), 4, true, 7)?;
        let mut second = DataLoader::with_seed(dataset(20), 4, true, 7)?;

        let order = drain(&mut first);
        assert_eq!(order, drain(&mut second));

        let mut sorted = order.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sorted, (0..20).map(|i| i as f32).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_empty_dataset() -> crate::Result<()> {
        let mut loader = DataLoader::new(dataset(0), 4, true)?;
        assert_eq!(loader.num_batches(), 0);
        assert!(loader.next_batch(&Device::Cpu)?.is_none());
        Ok(())
    }

    #[test]
    fn test_text_batches() -> crate::Result<()> {
        use crate::config::TokenizerConfig;
        use crate::data::tokenize::tests::WORD_LEVEL_JSON;
        use crate::data::{PretrainedTokenizer, TextDataset, TextTable};

        let table = TextTable::new(vec![
            (
                "review".to_string(),
                vec!["the movie".to_string(), "dull".to_string(), "great".to_string()],
            ),
            (
                "label".to_string(),
                vec!["1".to_string(), "0".to_string(), "1".to_string()],
            ),
        ])?;
        let config = TokenizerConfig {
            source: "inline".to_string(),
            max_length: 4,
            ..Default::default()
        };
        let tokenizer = PretrainedTokenizer::from_json(WORD_LEVEL_JSON, &config)?;
        let dataset = TextDataset::new(table, ["review"], ["label"], &tokenizer, &Device::Cpu)?;

        let mut loader = DataLoader::new(dataset, 2, false)?;
        let batch = loader.next_batch(&Device::Cpu)?.unwrap();
        assert_eq!(batch.features[0].input_ids.dims(), &[2, 4]);
        assert_eq!(
            batch.features[0].input_ids.to_vec2::<u32>()?,
            vec![vec![2, 3, 0, 0], vec![6, 0, 0, 0]]
        );
        assert_eq!(batch.target.to_vec2::<f32>()?, vec![vec![1.0], vec![0.0]]);

        let last = loader.next_batch(&Device::Cpu)?.unwrap();
        assert_eq!(last.target.dims(), &[1, 1]);
        Ok(())
    }
}
