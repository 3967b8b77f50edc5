// ============================================================
// Layer 5 - ONNX Export
// ============================================================
// Serializes a LinearModel into an ONNX ModelProto.
//
// Graph (IR version 7, default-domain opset 13):
//
//   float_input  f32 [N, k]
//        │
//        ▼
//   MatMul(float_input, coefficients[k, 1])  → linear_term [N, 1]
//        │
//        ▼
//   Add(linear_term, intercept[1])           → variable    [N, 1]
//
// The coefficients and the intercept are stored as f32
// initializers. Feature and target names travel in the
// model's metadata_props.
//
// The message types are the prost-generated ones tract-onnx
// ships in `tract_onnx::pb`, so the writer and the reader agree
// on one schema. prost is pinned to the version tract uses.
//
// Reference: https://github.com/onnx/onnx/blob/main/onnx/onnx.proto

use std::{fs, path::Path};

use prost::Message;
use tract_onnx::pb::tensor_proto::DataType;
use tract_onnx::pb::tensor_shape_proto::{dimension, Dimension};
use tract_onnx::pb::{
    type_proto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, StringStringEntryProto,
    TensorProto, TensorShapeProto, TypeProto, ValueInfoProto,
};
use tract_onnx::prelude::Framework;

use crate::domain::error::{AqiError, Result};
use crate::ml::model::LinearModel;

pub const INPUT_NAME: &str = "float_input";
pub const OUTPUT_NAME: &str = "variable";

const IR_VERSION: i64 = 7;
const OPSET_VERSION: i64 = 13;
const PRODUCER_NAME: &str = "aqi-pipeline";
const BATCH_DIM: &str = "N";

const COEF_NAME: &str = "coefficients";
const INTERCEPT_NAME: &str = "intercept";
const LINEAR_TERM_NAME: &str = "linear_term";

const META_FEATURES: &str = "features";
const META_TARGET: &str = "target";

// ─── Building ─────────────────────────────────────────────────────────────────
/// Build the ONNX model for `model`, predicting `target`.
pub fn to_onnx(model: &LinearModel, target: &str) -> ModelProto {
    let k = model.feature_count();

    let coefficients = TensorProto {
        dims:       vec![k as i64, 1],
        data_type:  DataType::Float as i32,
        float_data: model.coefficients.iter().map(|&c| c as f32).collect(),
        name:       COEF_NAME.into(),
        ..Default::default()
    };
    let intercept = TensorProto {
        dims:       vec![1],
        data_type:  DataType::Float as i32,
        float_data: vec![model.intercept as f32],
        name:       INTERCEPT_NAME.into(),
        ..Default::default()
    };

    let matmul = NodeProto {
        input:   vec![INPUT_NAME.into(), COEF_NAME.into()],
        output:  vec![LINEAR_TERM_NAME.into()],
        name:    "MatMul".into(),
        op_type: "MatMul".into(),
        ..Default::default()
    };
    let add = NodeProto {
        input:   vec![LINEAR_TERM_NAME.into(), INTERCEPT_NAME.into()],
        output:  vec![OUTPUT_NAME.into()],
        name:    "Add".into(),
        op_type: "Add".into(),
        ..Default::default()
    };

    let graph = GraphProto {
        node:        vec![matmul, add],
        name:        "linear_regression".into(),
        initializer: vec![coefficients, intercept],
        input:       vec![float_value_info(INPUT_NAME, k as i64)],
        output:      vec![float_value_info(OUTPUT_NAME, 1)],
        ..Default::default()
    };

    ModelProto {
        ir_version:       IR_VERSION,
        opset_import:     vec![OperatorSetIdProto { domain: String::new(), version: OPSET_VERSION }],
        producer_name:    PRODUCER_NAME.into(),
        producer_version: env!("CARGO_PKG_VERSION").into(),
        model_version:    1,
        doc_string:       format!("Linear regression of {target}"),
        graph:            Some(graph),
        metadata_props:   vec![
            StringStringEntryProto {
                key:   META_FEATURES.into(),
                value: model.feature_names.join(","),
            },
            StringStringEntryProto { key: META_TARGET.into(), value: target.into() },
        ],
        ..Default::default()
    }
}

/// f32 tensor of shape [N, width] with a symbolic batch dimension.
fn float_value_info(name: &str, width: i64) -> ValueInfoProto {
    let shape = TensorShapeProto {
        dim: vec![
            Dimension { value: Some(dimension::Value::DimParam(BATCH_DIM.into())), ..Default::default() },
            Dimension { value: Some(dimension::Value::DimValue(width)), ..Default::default() },
        ],
    };
    ValueInfoProto {
        name:   name.into(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type: DataType::Float as i32,
                shape:     Some(shape),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ─── Files ────────────────────────────────────────────────────────────────────
/// Write the model to `path`, creating parent directories and
/// replacing any existing file.
pub fn write_onnx(model: &LinearModel, target: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = to_onnx(model, target).encode_to_vec();
    fs::write(path, &bytes)?;
    tracing::info!("ONNX model written to '{}' ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Read a model written by `write_onnx` back into a LinearModel.
/// Returns the model and its target name.
pub fn read_onnx(path: &Path) -> Result<(LinearModel, String)> {
    if !path.exists() {
        return Err(AqiError::FileNotFound(path.to_path_buf()));
    }
    let proto = tract_onnx::onnx()
        .proto_model_for_path(path)
        .map_err(|e| AqiError::Export(format!("cannot decode '{}': {e}", path.display())))?;
    from_onnx(&proto)
}

fn from_onnx(proto: &ModelProto) -> Result<(LinearModel, String)> {
    let graph = proto
        .graph
        .as_ref()
        .ok_or_else(|| AqiError::Export("model has no graph".into()))?;

    let initializer = |name: &str| {
        graph
            .initializer
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| AqiError::Export(format!("missing initializer '{name}'")))
    };
    let coefficients: Vec<f64> = initializer(COEF_NAME)?
        .float_data
        .iter()
        .map(|&c| f64::from(c))
        .collect();
    let intercept = initializer(INTERCEPT_NAME)?
        .float_data
        .first()
        .map(|&b| f64::from(b))
        .ok_or_else(|| AqiError::Export("empty intercept".into()))?;

    let meta = |key: &str| {
        proto
            .metadata_props
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.clone())
            .unwrap_or_default()
    };
    let mut feature_names: Vec<String> = meta(META_FEATURES)
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if feature_names.len() != coefficients.len() {
        feature_names = (0..coefficients.len()).map(|i| format!("f{i}")).collect();
    }

    Ok((LinearModel::new(feature_names, coefficients, intercept), meta(META_TARGET)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> LinearModel {
        LinearModel::new(vec!["pm25".into(), "no2".into()], vec![0.75, -1.25], 12.5)
    }

    #[test]
    fn test_graph_layout() {
        let proto = to_onnx(&sample_model(), "aqi");
        let graph = proto.graph.as_ref().unwrap();

        let ops: Vec<&str> = graph.node.iter().map(|n| n.op_type.as_str()).collect();
        assert_eq!(ops, vec!["MatMul", "Add"]);
        assert_eq!(graph.input[0].name, INPUT_NAME);
        assert_eq!(graph.output[0].name, OUTPUT_NAME);
        assert_eq!(graph.initializer[0].dims, vec![2, 1]);
        assert_eq!(proto.opset_import[0].version, OPSET_VERSION);
    }

    #[test]
    fn test_write_then_read_back() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("models").join("aqi.onnx");

        write_onnx(&sample_model(), "aqi", &path).unwrap();
        let (model, target) = read_onnx(&path).unwrap();

        assert_eq!(target, "aqi");
        assert_eq!(model.feature_names, vec!["pm25", "no2"]);
        for (a, b) in model.coefficients.iter().zip(sample_model().coefficients) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!((model.intercept - 12.5).abs() < 1e-6);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        fs::write(&path, b"stale bytes that are not a model").unwrap();

        write_onnx(&sample_model(), "aqi", &path).unwrap();
        assert!(read_onnx(&path).is_ok());
    }

    #[test]
    fn test_written_file_parses_with_tract_schema() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        write_onnx(&sample_model(), "aqi", &path).unwrap();

        let proto = tract_onnx::onnx().proto_model_for_path(&path).unwrap();
        assert_eq!(proto.ir_version, IR_VERSION);
        assert_eq!(proto.producer_name, PRODUCER_NAME);
        let graph = proto.graph.unwrap();
        assert_eq!(graph.initializer[0].data_type, DataType::Float as i32);
        assert_eq!(graph.initializer[1].float_data, vec![12.5_f32]);
    }

    #[test]
    fn test_read_garbage_is_export_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        fs::write(&path, [0xff_u8, 0xff, 0xff]).unwrap();

        assert!(matches!(read_onnx(&path), Err(AqiError::Export(_))));
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            read_onnx(Path::new("no/such/model.onnx")),
            Err(AqiError::FileNotFound(_))
        ));
    }
}
