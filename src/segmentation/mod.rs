//! Turning segmentation outputs into class maps, masks and pictures.

use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use ndarray::{Array2, Array3, ArrayD, ArrayView2, ArrayView3, Axis, Ix3};

use crate::error::{Error, Result};

pub mod morphology;
mod palette;

pub use self::palette::{DEFAULT_SEED, Palette};

/// Threshold single-channel outputs are binarized at.
pub const MASK_THRESHOLD: f32 = 0.5;
/// Rendered maps are scaled up until their longer side reaches this many pixels.
pub const MIN_RENDER_SIDE: u32 = 512;
const LEGEND_GAP: u32 = 8;
const LEGEND_WIDTH: u32 = 24;

/// Per-pixel class indices for the first item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
	pub indices: Array2<usize>,
	pub num_classes: usize
}

impl ClassMap {
	pub fn height(&self) -> usize {
		self.indices.nrows()
	}

	pub fn width(&self) -> usize {
		self.indices.ncols()
	}

	/// Number of pixels assigned to each class.
	pub fn histogram(&self) -> Vec<usize> {
		let mut counts = vec![0; self.num_classes];
		for &class in &self.indices {
			counts[class] += 1;
		}
		counts
	}
}

fn first_in_batch(output: &ArrayD<f32>) -> Result<ndarray::ArrayViewD<'_, f32>> {
	if output.ndim() == 0 || output.shape()[0] == 0 {
		return Err(Error::shape(format!("expected a batched output, got shape {:?}", output.shape())));
	}
	Ok(output.index_axis(Axis(0), 0))
}

fn logits(output: &ArrayD<f32>) -> Result<Option<ArrayView3<'_, f32>>> {
	if output.ndim() != 4 {
		return Ok(None);
	}
	let logits = first_in_batch(output)?.into_dimensionality::<Ix3>()?;
	if logits.shape()[0] == 0 {
		return Err(Error::shape("segmentation output has no classes"));
	}
	Ok(Some(logits))
}

fn mask_plane(output: &ArrayD<f32>) -> Result<ArrayView2<'_, f32>> {
	let plane = first_in_batch(output)?;
	let plane = match plane.ndim() {
		// [batch, 1, H, W]
		3 if plane.shape()[0] == 1 => plane.index_axis_move(Axis(0), 0),
		_ => plane
	};
	plane
		.into_dimensionality()
		.map_err(|_| Error::shape(format!("cannot read an output of shape {:?} as a 2D mask", output.shape())))
}

/// Index of the largest value. A `NaN` compares greater than everything, so the first one wins.
fn argmax(values: impl Iterator<Item = f32>) -> usize {
	let mut best = (0, f32::NEG_INFINITY);
	for (i, value) in values.enumerate() {
		if value.is_nan() {
			return i;
		}
		if i == 0 || value > best.1 {
			best = (i, value);
		}
	}
	best.0
}

/// Reads a segmentation output as a class map.
///
/// `[batch, classes, height, width]` outputs take the most likely class of each pixel, so a single-channel output maps
/// every pixel to class 0. Anything else is read as a `[batch, height, width]` foreground mask and binarized at
/// [`MASK_THRESHOLD`], giving two classes.
pub fn class_map(output: &ArrayD<f32>) -> Result<ClassMap> {
	if let Some(logits) = logits(output)? {
		let (classes, height, width) = logits.dim();
		let indices = Array2::from_shape_fn((height, width), |(y, x)| argmax((0..classes).map(|class| logits[[class, y, x]])));
		return Ok(ClassMap { indices, num_classes: classes });
	}

	let plane = mask_plane(output)?;
	Ok(ClassMap {
		indices: plane.mapv(|p| usize::from(p > MASK_THRESHOLD)),
		num_classes: 2
	})
}

/// Per-class probabilities `[classes, height, width]` for the first item of a batch.
///
/// Multi-class logits go through a softmax over the class axis. Single-channel outputs are already foreground
/// probabilities, and come back as the two classes `[1 - p, p]`.
pub fn class_probabilities(output: &ArrayD<f32>) -> Result<Array3<f32>> {
	if let Some(logits) = logits(output)? {
		if logits.shape()[0] > 1 {
			let mut probabilities = logits.to_owned();
			for mut pixel in probabilities.lanes_mut(Axis(0)) {
				let max = pixel.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
				pixel.mapv_inplace(|x| (x - max).exp());
				let sum = pixel.sum();
				pixel /= sum;
			}
			return Ok(probabilities);
		}
	}

	let plane = mask_plane(output)?;
	let foreground = plane.mapv(|p| p.clamp(0.0, 1.0));
	let background = foreground.mapv(|p| 1.0 - p);
	Ok(ndarray::stack(Axis(0), &[background.view(), foreground.view()])?)
}

/// Pixels where `class` has a probability of at least `threshold`.
pub fn class_mask(output: &ArrayD<f32>, class: usize, threshold: f32) -> Result<Array2<bool>> {
	let probabilities = class_probabilities(output)?;
	let classes = probabilities.shape()[0];
	if class >= classes {
		return Err(Error::invalid_argument(format!("class {class} is out of range for an output with {classes} classes")));
	}
	Ok(probabilities.index_axis(Axis(0), class).mapv(|p| p >= threshold))
}

/// Fraction of pixels set in `mask`.
pub fn coverage(mask: &Array2<bool>) -> f32 {
	if mask.is_empty() {
		return 0.0;
	}
	mask.iter().filter(|x| **x).count() as f32 / mask.len() as f32
}

/// Writes a mask as a grayscale PNG, white where set.
pub fn save_mask(mask: &Array2<bool>, path: impl AsRef<Path>) -> Result<()> {
	let (height, width) = mask.dim();
	let image = GrayImage::from_fn(width as u32, height as u32, |x, y| Luma([if mask[[y as usize, x as usize]] { 255 } else { 0 }]));
	image.save(path)?;
	Ok(())
}

/// Paints a class map with `palette` and adds a legend strip on the right, highest class at the top.
pub fn render(map: &ClassMap, palette: &Palette) -> RgbImage {
	let (height, width) = (map.height() as u32, map.width() as u32);
	let painted = RgbImage::from_fn(width, height, |x, y| palette.color(map.indices[[y as usize, x as usize]]));

	let longest = height.max(width).max(1);
	let scale = MIN_RENDER_SIDE.div_ceil(longest).max(1);
	let painted = imageops::resize(&painted, width * scale, height * scale, imageops::FilterType::Nearest);

	let (height, width) = (painted.height(), painted.width());
	let classes = map.num_classes.max(1) as u64;
	let mut canvas = RgbImage::from_pixel(width + LEGEND_GAP + LEGEND_WIDTH, height, Rgb([255, 255, 255]));
	imageops::replace(&mut canvas, &painted, 0, 0);
	for y in 0..height {
		let band = (y as u64 * classes / height as u64) as usize;
		let color = palette.color(map.num_classes.saturating_sub(1).saturating_sub(band));
		for x in width + LEGEND_GAP..canvas.width() {
			canvas.put_pixel(x, y, color);
		}
	}
	canvas
}

/// Renders a segmentation output to a PNG at `path`, returning the class map it drew.
pub fn visualize(output: &ArrayD<f32>, path: impl AsRef<Path>, seed: u64) -> Result<ClassMap> {
	let map = class_map(output)?;
	let palette = Palette::seeded(map.num_classes, seed);
	render(&map, &palette).save(path)?;
	Ok(map)
}

#[cfg(test)]
mod tests {
	use ndarray::{Array, IxDyn, array};

	use super::*;

	fn three_class_logits() -> ArrayD<f32> {
		// 3 classes over a 2x2 image
		Array::from_shape_vec((1, 3, 2, 2), vec![
			5.0, 0.0, 0.0, 0.0, // class 0
			0.0, 5.0, 0.0, 1.0, // class 1
			0.0, 0.0, 5.0, 0.5 // class 2
		])
		.unwrap()
		.into_dyn()
	}

	#[test]
	fn argmax_over_classes() {
		let map = class_map(&three_class_logits()).unwrap();
		assert_eq!(map.num_classes, 3);
		assert_eq!(map.indices, array![[0usize, 1], [2, 1]]);
		assert_eq!(map.histogram(), vec![1usize, 2, 1]);
	}

	#[test]
	fn single_channel_is_one_class() {
		let output = Array::from_shape_vec((1, 1, 1, 2), vec![0.1, 0.9]).unwrap().into_dyn();
		let map = class_map(&output).unwrap();
		assert_eq!(map.num_classes, 1);
		assert_eq!(map.indices, array![[0usize, 0]]);
		assert_eq!(map.histogram(), vec![2usize]);
	}

	#[test]
	fn rank_three_mask_is_binarized() {
		let output = Array::from_shape_vec((1, 2, 2), vec![0.7, 0.2, 0.2, 0.7]).unwrap().into_dyn();
		let map = class_map(&output).unwrap();
		assert_eq!(map.num_classes, 2);
		assert_eq!(map.indices, array![[1usize, 0], [0, 1]]);
	}

	#[test]
	fn argmax_picks_first_nan() {
		let output = Array::from_shape_vec((1, 3, 1, 2), vec![1.0, f32::NAN, f32::NAN, 0.0, 2.0, f32::NAN]).unwrap().into_dyn();
		assert_eq!(class_map(&output).unwrap().indices, array![[1usize, 0]]);
		assert_eq!(argmax([f32::NEG_INFINITY, f32::NEG_INFINITY].into_iter()), 0);
	}

	#[test]
	fn rejects_non_spatial_outputs() {
		let output = ArrayD::<f32>::zeros(IxDyn(&[1, 1000]));
		assert!(class_map(&output).is_err());
		let output = ArrayD::<f32>::zeros(IxDyn(&[0, 3, 4, 4]));
		assert!(class_map(&output).is_err());
	}

	#[test]
	fn softmax_sums_to_one() {
		let probabilities = class_probabilities(&three_class_logits()).unwrap();
		for pixel in probabilities.lanes(Axis(0)) {
			assert!((pixel.sum() - 1.0).abs() < 1e-6);
		}
		assert!(probabilities[[0, 0, 0]] > 0.98);
	}

	#[test]
	fn masks_a_class() {
		let mask = class_mask(&three_class_logits(), 1, 0.15).unwrap();
		assert_eq!(mask, array![[false, true], [false, true]]);
		assert_eq!(coverage(&mask), 0.5);
		assert!(class_mask(&three_class_logits(), 3, 0.15).is_err());

		let output = Array::from_shape_vec((1, 1, 1, 2), vec![0.1, 0.9]).unwrap().into_dyn();
		assert_eq!(class_mask(&output, 0, 0.5).unwrap(), array![[true, false]]);
	}

	#[test]
	fn render_scales_up_and_adds_legend() {
		let map = class_map(&three_class_logits()).unwrap();
		let palette = Palette::seeded(map.num_classes, DEFAULT_SEED);
		let image = render(&map, &palette);
		assert_eq!(image.height(), 512);
		assert_eq!(image.width(), 512 + LEGEND_GAP + LEGEND_WIDTH);
		assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));
		assert_eq!(*image.get_pixel(511, 0), palette.color(1));
		assert_eq!(*image.get_pixel(0, 511), palette.color(2));
		// top of the legend shows the highest class, bottom shows the background
		assert_eq!(*image.get_pixel(image.width() - 1, 0), palette.color(2));
		assert_eq!(*image.get_pixel(image.width() - 1, 511), palette.color(0));
		assert_eq!(*image.get_pixel(512 + 1, 0), Rgb([255, 255, 255]));
	}

	#[test]
	fn writes_visualization_and_mask() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("segmentation_visualization.png");
		let map = visualize(&three_class_logits(), &path, DEFAULT_SEED).unwrap();
		assert_eq!(map.num_classes, 3);
		assert!(path.exists());

		let mask_path = dir.path().join("class_1_mask.png");
		save_mask(&array![[true, false]], &mask_path).unwrap();
		let mask = image::open(&mask_path).unwrap().to_luma8();
		assert_eq!(mask.get_pixel(0, 0).0, [255]);
		assert_eq!(mask.get_pixel(1, 0).0, [0]);
	}
}
