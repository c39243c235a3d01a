//! C# starter code for running the probed model under Unity Sentis.

use std::fmt;

use crate::{input::ImageSize, output::TupleShape};

/// Dimensions the Unity side needs to feed the model and read its first output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitySnippet {
	pub input_size: ImageSize,
	pub channels: usize,
	pub input_shape: Vec<usize>,
	pub output_shape: Vec<usize>
}

impl UnitySnippet {
	pub fn new(input_size: ImageSize, channels: usize, input_shape: &[usize], output_shape: &[usize]) -> Self {
		Self {
			input_size,
			channels,
			input_shape: input_shape.to_vec(),
			output_shape: output_shape.to_vec()
		}
	}

	/// The output shape as `[batch, classes, height, width]`, left-padded with 1s if the output has fewer dimensions.
	fn output_dims(&self) -> Vec<usize> {
		let padding = 4usize.saturating_sub(self.output_shape.len());
		std::iter::repeat_n(1, padding).chain(self.output_shape.iter().copied()).collect()
	}
}

impl fmt::Display for UnitySnippet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let dims = self.output_dims();
		let (width, height) = (self.input_size.width, self.input_size.height);
		let output_width = dims[dims.len() - 1];
		let output_height = dims[dims.len() - 2];

		writeln!(
			f,
			"For a model with input {} and output {},\nuse the following parameters in C#:\n",
			TupleShape(&self.input_shape),
			TupleShape(&self.output_shape)
		)?;
		writeln!(f, "```csharp")?;
		writeln!(f, "// Model input")?;
		writeln!(f, "int modelInputWidth = {width};")?;
		writeln!(f, "int modelInputHeight = {height};")?;
		writeln!(f, "int modelInputChannels = {};", self.channels)?;
		writeln!(f)?;
		writeln!(f, "// Model output")?;
		writeln!(f, "int outputWidth = {output_width};")?;
		writeln!(f, "int outputHeight = {output_height};")?;
		writeln!(f, "int numClasses = {};", dims[1])?;
		writeln!(f)?;
		writeln!(f, "// Scale between input and output resolution")?;
		writeln!(f, "float scaleX = (float)outputWidth / modelInputWidth;")?;
		writeln!(f, "float scaleY = (float)outputHeight / modelInputHeight;")?;
		writeln!(f)?;
		writeln!(f, "// Reading the model output:")?;
		writeln!(f, "void ProcessModelOutput(Tensor<float> outputTensor)")?;
		writeln!(f, "{{")?;
		writeln!(f, "    // Output tensor dimensions")?;
		writeln!(f, "    int batchSize = {};", dims[0])?;
		writeln!(f, "    int classes = {};", dims[1])?;
		writeln!(f, "    int height = {};", dims[2])?;
		writeln!(f, "    int width = {};", dims[3])?;
		writeln!(f)?;
		writeln!(f, "    // Build the segmentation mask from the tensor")?;
		writeln!(f, "    // ...")?;
		writeln!(f, "}}")?;
		writeln!(f, "```")
	}
}
