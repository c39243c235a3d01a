use std::path::{Path, PathBuf};

use crate::{input::ImageSize, segmentation::DEFAULT_SEED};

/// Where the probe looks for a model when none is given.
pub const DEFAULT_MODEL_PATH: &str = "Assets/Models/segformer-model.onnx";
/// Input size tried first; a common resolution for vision models.
pub const DEFAULT_INPUT_SIZE: ImageSize = ImageSize::square(320);
/// Sizes tried, in order, when the model rejects [`DEFAULT_INPUT_SIZE`].
pub const DEFAULT_FALLBACK_SIZES: [ImageSize; 3] = [ImageSize::square(224), ImageSize::square(512), ImageSize::square(256)];
/// Class index of walls in the segformer wall-segmentation model.
pub const DEFAULT_MASK_CLASS: usize = 1;
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.15;

pub const PREVIEW_FILE: &str = "test_input_image.png";
pub const VISUALIZATION_FILE: &str = "segmentation_visualization.png";

/// Options for exporting a single class of a segmentation output as a binary mask.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskOptions {
	pub(crate) class: usize,
	pub(crate) threshold: f32,
	pub(crate) close: bool,
	pub(crate) open: bool
}

impl Default for MaskOptions {
	fn default() -> Self {
		Self {
			class: DEFAULT_MASK_CLASS,
			threshold: DEFAULT_MASK_THRESHOLD,
			close: false,
			open: false
		}
	}
}

impl MaskOptions {
	pub fn new(class: usize) -> Self {
		Self { class, ..Self::default() }
	}

	/// Minimum class probability for a pixel to be part of the mask.
	#[must_use]
	pub fn with_threshold(mut self, threshold: f32) -> Self {
		self.threshold = threshold;
		self
	}

	/// Fills small holes in the mask with a 3x3 closing.
	#[must_use]
	pub fn with_closing(mut self, enable: bool) -> Self {
		self.close = enable;
		self
	}

	/// Removes small specks from the mask with a 3x3 opening. Applied after closing.
	#[must_use]
	pub fn with_opening(mut self, enable: bool) -> Self {
		self.open = enable;
		self
	}

	pub fn class(&self) -> usize {
		self.class
	}

	pub fn file_name(&self) -> String {
		format!("class_{}_mask.png", self.class)
	}
}

/// Configures a [`Probe`](crate::Probe).
///
/// ```
/// # use onnx_probe::{ImageSize, MaskOptions, ProbeOptions};
/// let options = ProbeOptions::default()
/// 	.with_input_size(ImageSize::new(480, 640))
/// 	.with_fallback_sizes([ImageSize::square(512)])
/// 	.with_mask(MaskOptions::new(1).with_threshold(0.3));
/// assert_eq!(options.input_size(), ImageSize::new(480, 640));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOptions {
	model_path: PathBuf,
	input_size: ImageSize,
	fallback_sizes: Vec<ImageSize>,
	output_dir: PathBuf,
	seed: u64,
	mask: Option<MaskOptions>
}

impl Default for ProbeOptions {
	fn default() -> Self {
		Self {
			model_path: PathBuf::from(DEFAULT_MODEL_PATH),
			input_size: DEFAULT_INPUT_SIZE,
			fallback_sizes: DEFAULT_FALLBACK_SIZES.to_vec(),
			output_dir: PathBuf::from("."),
			seed: DEFAULT_SEED,
			mask: None
		}
	}
}

impl ProbeOptions {
	#[must_use]
	pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.model_path = path.into();
		self
	}

	#[must_use]
	pub fn with_input_size(mut self, size: ImageSize) -> Self {
		self.input_size = size;
		self
	}

	/// Replaces the sizes tried after the first inference fails.
	#[must_use]
	pub fn with_fallback_sizes(mut self, sizes: impl IntoIterator<Item = ImageSize>) -> Self {
		self.fallback_sizes = sizes.into_iter().collect();
		self
	}

	/// Directory images are written to.
	#[must_use]
	pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.output_dir = dir.into();
		self
	}

	/// Seed for the visualization palette.
	#[must_use]
	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = seed;
		self
	}

	#[must_use]
	pub fn with_mask(mut self, mask: MaskOptions) -> Self {
		self.mask = Some(mask);
		self
	}

	pub fn model_path(&self) -> &Path {
		&self.model_path
	}

	pub fn input_size(&self) -> ImageSize {
		self.input_size
	}

	pub fn fallback_sizes(&self) -> &[ImageSize] {
		&self.fallback_sizes
	}

	pub fn output_dir(&self) -> &Path {
		&self.output_dir
	}

	pub fn seed(&self) -> u64 {
		self.seed
	}

	pub fn mask(&self) -> Option<&MaskOptions> {
		self.mask.as_ref()
	}

	pub(crate) fn output_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
		self.output_dir.join(file_name)
	}
}
