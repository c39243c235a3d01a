use std::fmt;

use ndarray::ArrayD;

/// Element type of a tensor as the model produced it, before conversion to `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
	Float32,
	Float64,
	Int8,
	Int16,
	Int32,
	Int64,
	Uint8,
	Uint16,
	Uint32,
	Uint64,
	Bool
}

impl ElementType {
	/// NumPy-style name, e.g. `float32`.
	pub fn name(&self) -> &'static str {
		match self {
			ElementType::Float32 => "float32",
			ElementType::Float64 => "float64",
			ElementType::Int8 => "int8",
			ElementType::Int16 => "int16",
			ElementType::Int32 => "int32",
			ElementType::Int64 => "int64",
			ElementType::Uint8 => "uint8",
			ElementType::Uint16 => "uint16",
			ElementType::Uint32 => "uint32",
			ElementType::Uint64 => "uint64",
			ElementType::Bool => "bool"
		}
	}

	/// ONNX Runtime's notation for a tensor of this type, e.g. `tensor(float)`.
	pub fn onnx_name(&self) -> &'static str {
		match self {
			ElementType::Float32 => "tensor(float)",
			ElementType::Float64 => "tensor(double)",
			ElementType::Int8 => "tensor(int8)",
			ElementType::Int16 => "tensor(int16)",
			ElementType::Int32 => "tensor(int32)",
			ElementType::Int64 => "tensor(int64)",
			ElementType::Uint8 => "tensor(uint8)",
			ElementType::Uint16 => "tensor(uint16)",
			ElementType::Uint32 => "tensor(uint32)",
			ElementType::Uint64 => "tensor(uint64)",
			ElementType::Bool => "tensor(bool)"
		}
	}
}

impl fmt::Display for ElementType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// A model output, widened to `f32` for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
	pub name: String,
	pub dtype: ElementType,
	pub data: ArrayD<f32>
}

impl OutputTensor {
	pub fn new(name: impl Into<String>, dtype: ElementType, data: ArrayD<f32>) -> Self {
		Self { name: name.into(), dtype, data }
	}

	pub fn shape(&self) -> &[usize] {
		self.data.shape()
	}

	pub fn kind(&self) -> OutputKind {
		OutputKind::classify(self.shape())
	}

	pub fn summary(&self) -> TensorSummary {
		TensorSummary::of(self)
	}
}

/// Shape, type and value range of an output tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSummary {
	pub shape: Vec<usize>,
	pub dtype: ElementType,
	pub min: f32,
	pub max: f32,
	pub mean: f32
}

impl TensorSummary {
	/// Empty tensors summarize to `NaN` statistics.
	pub fn of(tensor: &OutputTensor) -> Self {
		let data = &tensor.data;
		let (min, max, mean) = if data.is_empty() {
			(f32::NAN, f32::NAN, f32::NAN)
		} else {
			let (min, max, sum) = data
				.iter()
				.fold((f32::INFINITY, f32::NEG_INFINITY, 0f64), |(min, max, sum), &x| (min.min(x), max.max(x), sum + x as f64));
			(min, max, (sum / data.len() as f64) as f32)
		};
		Self {
			shape: data.shape().to_vec(),
			dtype: tensor.dtype,
			min,
			max,
			mean
		}
	}
}

/// Formats a shape the way NumPy prints one, e.g. `(1, 150, 80, 80)` or `(5,)`.
pub struct TupleShape<'a>(pub &'a [usize]);

impl fmt::Display for TupleShape<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("(")?;
		for (i, dim) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{dim}")?;
		}
		if self.0.len() == 1 {
			f.write_str(",")?;
		}
		f.write_str(")")
	}
}

/// How an output tensor can be read as a segmentation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
	/// `[batch, classes, height, width]` with more than one class.
	MultiClass { classes: usize },
	/// `[batch, 1, height, width]`.
	SingleChannel,
	/// `[batch, height, width]`.
	Mask,
	Other
}

impl OutputKind {
	pub fn classify(shape: &[usize]) -> Self {
		match *shape {
			[_, 1, _, _] => OutputKind::SingleChannel,
			[_, classes, _, _] => OutputKind::MultiClass { classes },
			[_, _, _] => OutputKind::Mask,
			_ => OutputKind::Other
		}
	}

	pub fn is_segmentation(&self) -> bool {
		!matches!(self, OutputKind::Other)
	}
}
