use std::fmt;

/// Container for model metadata, including name & producer information.
///
/// ONNX Runtime reports each attribute separately and any of them may fail to read, so every field is optional; an
/// unreadable attribute is listed as `<unavailable>` rather than failing the whole listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMetadata {
	pub custom_metadata_map: Option<Vec<(String, String)>>,
	pub description: Option<String>,
	pub domain: Option<String>,
	pub graph_description: Option<String>,
	pub graph_name: Option<String>,
	pub producer_name: Option<String>,
	pub version: Option<i64>
}

const UNAVAILABLE: &str = "<unavailable>";

impl fmt::Display for ModelMetadata {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fn line(f: &mut fmt::Formatter<'_>, key: &str, value: Option<&dyn fmt::Display>) -> fmt::Result {
			match value {
				Some(value) => writeln!(f, "  {key}: {value}"),
				None => writeln!(f, "  {key}: {UNAVAILABLE}")
			}
		}

		let custom = self.custom_metadata_map.as_deref().map(CustomMap);
		line(f, "custom_metadata_map", custom.as_ref().map(|x| x as &dyn fmt::Display))?;
		line(f, "description", self.description.as_ref().map(|x| x as &dyn fmt::Display))?;
		line(f, "domain", self.domain.as_ref().map(|x| x as &dyn fmt::Display))?;
		line(f, "graph_description", self.graph_description.as_ref().map(|x| x as &dyn fmt::Display))?;
		line(f, "graph_name", self.graph_name.as_ref().map(|x| x as &dyn fmt::Display))?;
		line(f, "producer_name", self.producer_name.as_ref().map(|x| x as &dyn fmt::Display))?;
		line(f, "version", self.version.as_ref().map(|x| x as &dyn fmt::Display))
	}
}

struct CustomMap<'a>(&'a [(String, String)]);

impl fmt::Display for CustomMap<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("{")?;
		for (i, (key, value)) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "'{key}': '{value}'")?;
		}
		f.write_str("}")
	}
}

/// A single dimension of a graph input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dim {
	Fixed(i64),
	/// A dynamic dimension the graph gives a name to, like `batch_size`.
	Symbolic(String),
	Unknown
}

impl fmt::Display for Dim {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Dim::Fixed(x) => write!(f, "{x}"),
			Dim::Symbolic(name) => write!(f, "'{name}'"),
			Dim::Unknown => f.write_str("None")
		}
	}
}

/// Shape of a graph input or output, printed like `[1, 3, 'height', 'width']`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeShape(pub Vec<Dim>);

impl fmt::Display for NodeShape {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[")?;
		for (i, dim) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{dim}")?;
		}
		f.write_str("]")
	}
}

/// Information about a graph input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
	pub name: String,
	pub shape: NodeShape,
	/// Type in ONNX Runtime notation, e.g. `tensor(float)`.
	pub ty: String
}

impl NodeInfo {
	pub fn new(name: impl Into<String>, shape: Vec<Dim>, ty: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			shape: NodeShape(shape),
			ty: ty.into()
		}
	}
}

/// Everything the probe lists about a model before running it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInfo {
	pub metadata: ModelMetadata,
	pub inputs: Vec<NodeInfo>,
	pub outputs: Vec<NodeInfo>
}

impl ModelInfo {
	/// The input the synthetic image is fed to.
	pub fn primary_input(&self) -> Option<&NodeInfo> {
		self.inputs.first()
	}
}

impl fmt::Display for ModelInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fn nodes(f: &mut fmt::Formatter<'_>, nodes: &[NodeInfo]) -> fmt::Result {
			for (i, node) in nodes.iter().enumerate() {
				writeln!(f, "  [{i}] Name: {}", node.name)?;
				writeln!(f, "      Shape: {}", node.shape)?;
				writeln!(f, "      Type: {}", node.ty)?;
			}
			Ok(())
		}

		writeln!(f, "Model metadata:")?;
		write!(f, "{}", self.metadata)?;
		writeln!(f, "\nInputs:")?;
		nodes(f, &self.inputs)?;
		writeln!(f, "\nOutputs:")?;
		nodes(f, &self.outputs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn segformer() -> ModelInfo {
		ModelInfo {
			metadata: ModelMetadata {
				custom_metadata_map: Some(vec![("labels".to_owned(), "wall,floor".to_owned())]),
				description: None,
				domain: Some("ai.onnx".to_owned()),
				graph_description: Some("ADE20K wall segmentation".to_owned()),
				graph_name: Some("main_graph".to_owned()),
				producer_name: Some("pytorch".to_owned()),
				version: Some(0)
			},
			inputs: vec![NodeInfo::new(
				"pixel_values",
				vec![Dim::Symbolic("batch_size".to_owned()), Dim::Fixed(3), Dim::Unknown, Dim::Unknown],
				"tensor(float)"
			)],
			outputs: vec![NodeInfo::new("logits", vec![Dim::Fixed(1), Dim::Fixed(150), Dim::Fixed(80), Dim::Fixed(80)], "tensor(float)")]
		}
	}

	#[test]
	fn lists_metadata_and_nodes() {
		let listing = segformer().to_string();
		assert_eq!(
			listing,
			"Model metadata:
  custom_metadata_map: {'labels': 'wall,floor'}
  description: <unavailable>
  domain: ai.onnx
  graph_description: ADE20K wall segmentation
  graph_name: main_graph
  producer_name: pytorch
  version: 0

Inputs:
  [0] Name: pixel_values
      Shape: ['batch_size', 3, None, None]
      Type: tensor(float)

Outputs:
  [0] Name: logits
      Shape: [1, 150, 80, 80]
      Type: tensor(float)
"
		);
	}

	#[test]
	fn empty_custom_map() {
		let metadata = ModelMetadata {
			custom_metadata_map: Some(Vec::new()),
			..ModelMetadata::default()
		};
		assert!(metadata.to_string().starts_with("  custom_metadata_map: {}\n"));
	}
}
