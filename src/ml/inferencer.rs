// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Runs an exported ONNX model through tract, an inference
// engine that shares no code with the fitting path. Agreement
// between the two is what the round-trip check measures.
//
// The parsed model is kept; each predict call pins the input
// shape to the batch at hand, optimizes and runs it.

use std::path::{Path, PathBuf};

use ndarray::ArrayView2;
use tract_onnx::prelude::*;

use crate::domain::error::{AqiError, Result};

pub struct OnnxSession {
    model: InferenceModel,
    path:  PathBuf,
}

impl OnnxSession {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AqiError::FileNotFound(path.to_path_buf()));
        }
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| AqiError::Inference(format!("cannot load '{}': {e}", path.display())))?;

        tracing::debug!("ONNX model loaded from '{}'", path.display());
        Ok(Self { model, path: path.to_path_buf() })
    }

    /// One prediction per row of `x` (rows, features).
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        let (rows, cols) = x.dim();
        if rows == 0 {
            return Ok(Vec::new());
        }
        self.run(rows, cols, x.iter().map(|&v| v as f32).collect())
            .map_err(|e| AqiError::Inference(format!("'{}': {e}", self.path.display())))
    }

    fn run(&self, rows: usize, cols: usize, data: Vec<f32>) -> TractResult<Vec<f64>> {
        let plan = self
            .model
            .clone()
            .with_input_fact(0, f32::fact([rows, cols]).into())?
            .into_optimized()?
            .into_runnable()?;

        let input   = Tensor::from_shape(&[rows, cols], &data)?;
        let outputs = plan.run(tvec!(input.into()))?;
        let view    = outputs[0].to_array_view::<f32>()?;
        Ok(view.iter().map(|&v| f64::from(v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::export::write_onnx;
    use crate::ml::model::LinearModel;
    use ndarray::array;

    #[test]
    fn test_predicts_like_native_model() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        let model = LinearModel::new(vec!["a".into(), "b".into()], vec![2.0, -0.5], 3.0);
        write_onnx(&model, "y", &path).unwrap();

        let x = array![[1.0, 2.0], [0.0, 0.0], [10.0, 4.0]];
        let session = OnnxSession::load(&path).unwrap();
        let reloaded = session.predict(x.view()).unwrap();
        let native   = model.predict(x.view());

        assert_eq!(reloaded.len(), 3);
        for (a, b) in reloaded.iter().zip(native.iter()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn test_empty_batch() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        write_onnx(&LinearModel::new(vec!["a".into()], vec![1.0], 0.0), "y", &path).unwrap();

        let session = OnnxSession::load(&path).unwrap();
        let empty = ndarray::Array2::<f64>::zeros((0, 1));
        assert!(session.predict(empty.view()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            OnnxSession::load(Path::new("missing.onnx")),
            Err(AqiError::FileNotFound(_))
        ));
    }
}
