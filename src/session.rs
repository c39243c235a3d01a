//! The inference runtime seam.
//!
//! [`Probe`](crate::Probe) only talks to an [`InferenceSession`]; [`OrtSession`] is the ONNX Runtime implementation
//! used by the command-line tool.

use std::path::Path;

#[allow(unused)]
use ort::execution_providers::*;
use ort::{
	session::Session,
	tensor::TensorElementType,
	value::{DynValue, Tensor, ValueType}
};
use ndarray::Array4;

use crate::{
	error::{Error, ErrorCode, Result},
	logging::{debug, info},
	metadata::{Dim, ModelInfo, ModelMetadata, NodeInfo},
	output::{ElementType, OutputTensor}
};

/// A loaded model that can describe itself and run on a single image tensor.
pub trait InferenceSession {
	fn model_info(&self) -> Result<ModelInfo>;

	/// Runs the model with `input` bound to `input_name`, returning every output in graph order.
	fn run(&mut self, input_name: &str, input: Array4<f32>) -> Result<Vec<OutputTensor>>;
}

impl<S: InferenceSession + ?Sized> InferenceSession for Box<S> {
	fn model_info(&self) -> Result<ModelInfo> {
		(**self).model_info()
	}

	fn run(&mut self, input_name: &str, input: Array4<f32>) -> Result<Vec<OutputTensor>> {
		(**self).run(input_name, input)
	}
}

/// Registers the execution providers enabled through cargo features. Without any, ONNX Runtime runs on the CPU.
pub fn init_runtime() {
	let _committed = ort::init()
		.with_name("onnx-probe")
		.with_execution_providers([
			#[cfg(feature = "tensorrt")]
			TensorRTExecutionProvider::default().build(),
			#[cfg(feature = "cuda")]
			CUDAExecutionProvider::default().build(),
			#[cfg(feature = "openvino")]
			OpenVINOExecutionProvider::default().build(),
			#[cfg(feature = "directml")]
			DirectMLExecutionProvider::default().build(),
			#[cfg(feature = "coreml")]
			CoreMLExecutionProvider::default().build()
		])
		.commit();
	debug!(committed = ?_committed, "initialized ONNX Runtime environment");
}

/// An ONNX Runtime session.
#[derive(Debug)]
pub struct OrtSession {
	session: Session,
	output_names: Vec<String>
}

impl OrtSession {
	/// Loads the model at `path`.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		if !path.exists() {
			return Err(Error::no_such_file(path));
		}

		let session = Session::builder().map_err(Error::runtime)?.commit_from_file(path).map_err(Error::runtime)?;
		let output_names = session.outputs.iter().map(|output| output.name.clone()).collect();
		info!(path = %path.display(), inputs = session.inputs.len(), outputs = session.outputs.len(), "loaded model");
		Ok(Self { session, output_names })
	}

	fn metadata(&self) -> Result<ModelMetadata> {
		let metadata = self.session.metadata()?;
		let custom_metadata_map = metadata.custom_keys().ok().map(|mut keys| {
			keys.sort();
			keys.into_iter()
				.filter_map(|key| metadata.custom(&key).ok().flatten().map(|value| (key, value)))
				.collect()
		});
		Ok(ModelMetadata {
			custom_metadata_map,
			description: metadata.description().ok(),
			domain: metadata.domain().ok(),
			graph_description: metadata.graph_description().ok(),
			graph_name: metadata.name().ok(),
			producer_name: metadata.producer().ok(),
			version: metadata.version().ok()
		})
	}
}

impl InferenceSession for OrtSession {
	fn model_info(&self) -> Result<ModelInfo> {
		Ok(ModelInfo {
			metadata: self.metadata()?,
			inputs: self.session.inputs.iter().map(|input| node_info(&input.name, &input.input_type)).collect(),
			outputs: self.session.outputs.iter().map(|output| node_info(&output.name, &output.output_type)).collect()
		})
	}

	fn run(&mut self, input_name: &str, input: Array4<f32>) -> Result<Vec<OutputTensor>> {
		debug!(input_name, shape = ?input.shape(), "running inference");
		let tensor = Tensor::from_array(input)?;
		let outputs = self.session.run(ort::inputs![input_name => tensor])?;
		self.output_names.iter().map(|name| extract(name, &outputs[name.as_str()])).collect()
	}
}

fn element_type(ty: TensorElementType) -> Option<ElementType> {
	Some(match ty {
		TensorElementType::Float32 => ElementType::Float32,
		TensorElementType::Float64 => ElementType::Float64,
		TensorElementType::Int8 => ElementType::Int8,
		TensorElementType::Int16 => ElementType::Int16,
		TensorElementType::Int32 => ElementType::Int32,
		TensorElementType::Int64 => ElementType::Int64,
		TensorElementType::Uint8 => ElementType::Uint8,
		TensorElementType::Uint16 => ElementType::Uint16,
		TensorElementType::Uint32 => ElementType::Uint32,
		TensorElementType::Uint64 => ElementType::Uint64,
		TensorElementType::Bool => ElementType::Bool,
		_ => return None
	})
}

fn node_info(name: &str, value_type: &ValueType) -> NodeInfo {
	match value_type {
		ValueType::Tensor { ty, shape, dimension_symbols } => {
			let dims = shape
				.iter()
				.enumerate()
				.map(|(i, &dim)| match dimension_symbols.get(i) {
					_ if dim >= 0 => Dim::Fixed(dim),
					Some(symbol) if !symbol.is_empty() => Dim::Symbolic(symbol.to_string()),
					_ => Dim::Unknown
				})
				.collect();
			let ty_name = match element_type(*ty) {
				Some(element) => element.onnx_name().to_owned(),
				None => format!("tensor({ty:?})").to_lowercase()
			};
			NodeInfo::new(name, dims, ty_name)
		}
		other => NodeInfo::new(name, Vec::new(), other.to_string())
	}
}

fn extract(name: &str, value: &DynValue) -> Result<OutputTensor> {
	let Some(ty) = value.dtype().tensor_type() else {
		return Err(Error::new_with_code(ErrorCode::Runtime, format!("output `{name}` is not a tensor")));
	};
	let Some(dtype) = element_type(ty) else {
		return Err(Error::new_with_code(ErrorCode::Runtime, format!("output `{name}` has unsupported element type {ty:?}")));
	};
	let data = match dtype {
		ElementType::Float32 => value.try_extract_array::<f32>()?.to_owned(),
		ElementType::Float64 => value.try_extract_array::<f64>()?.mapv(|x| x as f32),
		ElementType::Int8 => value.try_extract_array::<i8>()?.mapv(f32::from),
		ElementType::Int16 => value.try_extract_array::<i16>()?.mapv(f32::from),
		ElementType::Int32 => value.try_extract_array::<i32>()?.mapv(|x| x as f32),
		ElementType::Int64 => value.try_extract_array::<i64>()?.mapv(|x| x as f32),
		ElementType::Uint8 => value.try_extract_array::<u8>()?.mapv(f32::from),
		ElementType::Uint16 => value.try_extract_array::<u16>()?.mapv(f32::from),
		ElementType::Uint32 => value.try_extract_array::<u32>()?.mapv(|x| x as f32),
		ElementType::Uint64 => value.try_extract_array::<u64>()?.mapv(|x| x as f32),
		ElementType::Bool => value.try_extract_array::<bool>()?.mapv(|x| f32::from(u8::from(x)))
	};
	Ok(OutputTensor::new(name, dtype, data))
}

#[cfg(test)]
mod tests {
	use ndarray::{ArrayD, IxDyn};
	use test_log::test;

	use super::*;

	#[test]
	fn maps_every_integer_type() {
		for (ty, expected) in [
			(TensorElementType::Int16, ElementType::Int16),
			(TensorElementType::Uint16, ElementType::Uint16),
			(TensorElementType::Uint32, ElementType::Uint32),
			(TensorElementType::Uint64, ElementType::Uint64)
		] {
			assert_eq!(element_type(ty), Some(expected));
		}
		assert_eq!(element_type(TensorElementType::String), None);
	}

	#[test]
	fn widens_integer_outputs() -> Result<()> {
		let class_ids = ArrayD::from_shape_vec(IxDyn(&[1, 2, 2]), vec![0u64, 1, 12, 7])?;
		let value = Tensor::from_array(class_ids)?.into_dyn();
		let output = extract("class_ids", &value)?;
		assert_eq!(output.dtype, ElementType::Uint64);
		assert_eq!(output.shape(), &[1usize, 2, 2][..]);
		assert_eq!(output.data.iter().copied().collect::<Vec<f32>>(), vec![0.0, 1.0, 12.0, 7.0]);

		let counts = ArrayD::from_shape_vec(IxDyn(&[3]), vec![3u16, 0, 65535])?;
		let output = extract("counts", &Tensor::from_array(counts)?.into_dyn())?;
		assert_eq!(output.dtype, ElementType::Uint16);
		assert_eq!(output.summary().max, 65535.0);
		Ok(())
	}
}
