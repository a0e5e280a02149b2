/// Dataset over a numeric feature/label array pair
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use candle_core::{Device, Tensor};
use ndarray::{ArrayBase, ArrayD, Data, Dimension};
use ndarray_npy::{ReadNpyError, ReadNpyExt};

use super::{check_index, Dataset};

/// Features and labels held as f32 tensors.
///
/// `x` has shape `[n_samples, n_features]` (or `[n_samples]`), `y` has shape
/// `[n_samples, n_classes]`. One-dimensional labels are stored as `[n_samples, 1]`.
#[derive(Debug, Clone)]
pub struct ArrayDataset {
    x: Tensor,
    y: Tensor,
    vocab_size: usize,
    input_dim: usize,
    output_dim: usize,
}

impl ArrayDataset {
    /// Build from in-memory arrays.
    ///
    /// # Arguments
    /// * `x` - Attributes of the data
    /// * `y` - Targets of the data
    /// * `textual_data` - Whether `x` holds token ids; enables `vocab_size`
    /// * `device` - Device the tensors live on
    pub fn new<S1, D1, S2, D2>(
        x: &ArrayBase<S1, D1>,
        y: &ArrayBase<S2, D2>,
        textual_data: bool,
        device: &Device,
    ) -> crate::Result<Self>
    where
        S1: Data<Elem = f32>,
        D1: Dimension,
        S2: Data<Elem = f32>,
        D2: Dimension,
    {
        if x.ndim() == 0 || y.ndim() == 0 {
            return Err(crate::DatasetError::Shape(format!(
                "x and y must have at least one dimension, got x {:?} and y {:?}",
                x.shape(),
                y.shape()
            )));
        }

        if x.len_of(ndarray::Axis(0)) != y.len_of(ndarray::Axis(0)) {
            return Err(crate::DatasetError::Shape(format!(
                "The parameters x and y must have the same number of samples ({} != {})",
                x.len_of(ndarray::Axis(0)),
                y.len_of(ndarray::Axis(0))
            )));
        }

        let vocab_size = if textual_data { count_unique(x.iter()) } else { 0 };
        let input_dim = if x.ndim() == 1 { 1 } else { x.shape()[1] };
        let output_dim = count_unique(y.iter());

        let x_tensor = to_tensor(x, device)?;
        let mut y_tensor = to_tensor(y, device)?;
        if y.ndim() == 1 {
            y_tensor = y_tensor.unsqueeze(1)?;
        }

        log::info!(
            "Array dataset: x {:?}, y {:?}, input_dim={}, output_dim={}, vocab_size={}",
            x_tensor.dims(),
            y_tensor.dims(),
            input_dim,
            output_dim,
            vocab_size
        );

        Ok(Self {
            x: x_tensor,
            y: y_tensor,
            vocab_size,
            input_dim,
            output_dim,
        })
    }

    /// Load features and labels from NumPy `.npy` files.
    ///
    /// Accepts f32, f64, i64 and i32 arrays; everything is cast to f32.
    pub fn from_npy<P: AsRef<Path>, Q: AsRef<Path>>(
        x_path: P,
        y_path: Q,
        textual_data: bool,
        device: &Device,
    ) -> crate::Result<Self> {
        log::info!(
            "Loading array dataset from {:?} and {:?}",
            x_path.as_ref(),
            y_path.as_ref()
        );

        let x = read_npy_f32(x_path.as_ref())?;
        let y = read_npy_f32(y_path.as_ref())?;
        Self::new(&x, &y, textual_data, device)
    }

    /// Number of distinct token ids in `x`, or 0 for non-textual data
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Feature width per sample
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of distinct label values
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn features(&self) -> &Tensor {
        &self.x
    }

    pub fn labels(&self) -> &Tensor {
        &self.y
    }
}

impl Dataset for ArrayDataset {
    type Item = (Tensor, Tensor);

    fn len(&self) -> usize {
        self.x.dims()[0]
    }

    fn get(&self, idx: usize) -> crate::Result<Self::Item> {
        check_index(idx, self.len())?;
        Ok((self.x.get(idx)?, self.y.get(idx)?))
    }
}

fn to_tensor<S, D>(array: &ArrayBase<S, D>, device: &Device) -> crate::Result<Tensor>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let values: Vec<f32> = array.iter().copied().collect();
    Ok(Tensor::from_vec(values, array.shape().to_vec(), device)?)
}

/// Count distinct values, with `-0.0 == 0.0` and all NaNs collapsed into one
fn count_unique<'a>(values: impl Iterator<Item = &'a f32>) -> usize {
    values
        .map(|&v| {
            if v.is_nan() {
                f32::NAN.to_bits()
            } else {
                (v + 0.0).to_bits()
            }
        })
        .collect::<HashSet<u32>>()
        .len()
}

fn read_npy_f32(path: &Path) -> crate::Result<ArrayD<f32>> {
    match ArrayD::<f32>::read_npy(File::open(path)?) {
        Err(ReadNpyError::WrongDescriptor(..)) => {}
        other => return Ok(other?),
    }
    match ArrayD::<f64>::read_npy(File::open(path)?) {
        Err(ReadNpyError::WrongDescriptor(..)) => {}
        other => return Ok(other?.mapv(|v| v as f32)),
    }
    // Token ids are usually saved as int64
    match ArrayD::<i64>::read_npy(File::open(path)?) {
        Err(ReadNpyError::WrongDescriptor(..)) => {}
        other => return Ok(other?.mapv(|v| v as f32)),
    }
    let array = ArrayD::<i32>::read_npy(File::open(path)?)?;
    Ok(array.mapv(|v| v as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};

    #[test]
    fn test_length_mismatch() {
        let x = Array2::<f32>::zeros((3, 2));
        let y = Array1::<f32>::zeros(4);
        let err = ArrayDataset::new(&x, &y, false, &Device::Cpu).unwrap_err();
        assert!(matches!(err, crate::DatasetError::Shape(_)));
        assert!(err.to_string().contains("same number of samples"));
    }

    #[test]
    fn test_scalar_rejected() {
        let x = ndarray::arr0(1.0f32);
        let y = Array1::<f32>::zeros(1);
        assert!(ArrayDataset::new(&x, &y, false, &Device::Cpu).is_err());
    }

    #[test]
    fn test_labels_unsqueezed() -> crate::Result<()> {
        let x = array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let y = array![0.0f32, 1.0, 0.0];
        let dataset = ArrayDataset::new(&x, &y, false, &Device::Cpu)?;

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.features().dims(), &[3, 2]);
        assert_eq!(dataset.labels().dims(), &[3, 1]);
        assert_eq!(dataset.input_dim(), 2);
        assert_eq!(dataset.output_dim(), 2);
        assert_eq!(dataset.vocab_size(), 0);
        Ok(())
    }

    #[test]
    fn test_get_item() -> crate::Result<()> {
        let x = array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let y = array![[1.0f32, 0.0], [0.0, 1.0], [1.0, 0.0]];
        let dataset = ArrayDataset::new(&x, &y, false, &Device::Cpu)?;

        let (input, target) = dataset.get(1)?;
        assert_eq!(input.to_vec1::<f32>()?, vec![3.0, 4.0]);
        assert_eq!(target.to_vec1::<f32>()?, vec![0.0, 1.0]);
        assert_eq!(dataset.labels().dims(), &[3, 2]);
        Ok(())
    }

    #[test]
    fn test_index_out_of_bounds() -> crate::Result<()> {
        let x = array![[1.0f32], [2.0]];
        let y = array![0.0f32, 1.0];
        let dataset = ArrayDataset::new(&x, &y, false, &Device::Cpu)?;

        match dataset.get(2) {
            Err(crate::DatasetError::IndexOutOfBounds { index, len }) => {
                assert_eq!(index, 2);
                assert_eq!(len, 2);
            }
            other => panic!("expected IndexOutOfBounds, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }

    #[test]
    fn test_one_dimensional_features() -> crate::Result<()> {
        let x = array![0.5f32, 1.5, 2.5, 3.5];
        let y = array![1.0f32, 2.0, 3.0, 1.0];
        let dataset = ArrayDataset::new(&x, &y, false, &Device::Cpu)?;

        assert_eq!(dataset.input_dim(), 1);
        assert_eq!(dataset.output_dim(), 3);

        let (input, target) = dataset.get(3)?;
        assert_eq!(input.to_scalar::<f32>()?, 3.5);
        assert_eq!(target.to_vec1::<f32>()?, vec![1.0]);
        Ok(())
    }

    #[test]
    fn test_textual_vocab_size() -> crate::Result<()> {
        // Pre-tokenized sequences with ids {0, 3, 7, 9}
        let x = array![[3.0f32, 7.0, 0.0], [9.0, 3.0, 0.0]];
        let y = array![1.0f32, 0.0];
        let dataset = ArrayDataset::new(&x, &y, true, &Device::Cpu)?;

        assert_eq!(dataset.vocab_size(), 4);
        assert_eq!(dataset.input_dim(), 3);
        Ok(())
    }

    #[test]
    fn test_unique_counting_edge_values() {
        let values = [0.0f32, -0.0, f32::NAN, f32::NAN, 1.0];
        assert_eq!(count_unique(values.iter()), 3);
    }

    #[test]
    fn test_empty_dataset() -> crate::Result<()> {
        let x = Array2::<f32>::zeros((0, 4));
        let y = Array1::<f32>::zeros(0);
        let dataset = ArrayDataset::new(&x, &y, false, &Device::Cpu)?;

        assert!(dataset.is_empty());
        assert_eq!(dataset.input_dim(), 4);
        assert_eq!(dataset.output_dim(), 0);
        assert!(dataset.get(0).is_err());
        Ok(())
    }

    #[test]
    fn test_from_npy_casts_integers() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let x_path = dir.path().join("inputs.npy");
        let y_path = dir.path().join("labels.npy");

        let x = array![[4i64, 5, 6], [6, 5, 4]];
        let y = array![0.25f64, 0.75];
        ndarray_npy::write_npy(&x_path, &x).unwrap();
        ndarray_npy::write_npy(&y_path, &y).unwrap();

        let dataset = ArrayDataset::from_npy(&x_path, &y_path, true, &Device::Cpu)?;
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.vocab_size(), 3);

        let (input, target) = dataset.get(0)?;
        assert_eq!(input.to_vec1::<f32>()?, vec![4.0, 5.0, 6.0]);
        assert_eq!(target.to_vec1::<f32>()?, vec![0.25]);
        Ok(())
    }

    #[test]
    fn test_from_npy_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ArrayDataset::from_npy(
            dir.path().join("missing_x.npy"),
            dir.path().join("missing_y.npy"),
            false,
            &Device::Cpu,
        );
        assert!(matches!(result, Err(crate::DatasetError::Io(_))));
    }
}
