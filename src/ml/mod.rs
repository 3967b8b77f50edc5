// ============================================================
// Layer 5 - ML Layer (OLS + ONNX)
// ============================================================
// Everything numeric about the model lives here. Other layers
// hand in a FeatureTable and get back an Evaluation.
//
//   model.rs      - LinearModel: least-squares fit, predict, MAE
//   export.rs     - LinearModel -> ONNX ModelProto (prost) and back
//   inferencer.rs - OnnxSession: runs an exported file with tract
//   trainer.rs    - fit_and_export: select, split, fit, export,
//                   reload, compare
//
// Reference: ONNX IR specification (onnx.proto)
//            tract-onnx documentation

/// Linear regression model and error metric
pub mod model;

/// ONNX serialization of the linear model
pub mod export;

/// tract-backed ONNX inference
pub mod inferencer;

/// Fit/export/reload pipeline
pub mod trainer;
