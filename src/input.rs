//! Synthetic model input.
//!
//! The probe doesn't need a real photo to exercise a vision model; a coordinate gradient is enough to tell whether the
//! graph accepts a given resolution and what it returns for it.

use std::{fmt, path::Path, str::FromStr};

use image::{ImageBuffer, Rgb};
use ndarray::{Array3, Array4, Axis};

use crate::error::{Error, Result};

/// Number of color channels in the synthetic image.
pub const CHANNELS: usize = 3;

/// Spatial size of a model input, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
	pub height: usize,
	pub width: usize
}

impl ImageSize {
	pub const fn new(height: usize, width: usize) -> Self {
		Self { height, width }
	}

	pub const fn square(side: usize) -> Self {
		Self { height: side, width: side }
	}

	fn validate(&self) -> Result<()> {
		if self.height == 0 || self.width == 0 {
			return Err(Error::invalid_argument(format!("image size must be non-zero, got {self}")));
		}
		Ok(())
	}
}

impl fmt::Display for ImageSize {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.height, self.width)
	}
}

impl FromStr for ImageSize {
	type Err = Error;

	/// Parses `HxW` (e.g. `320x240`) or a single number for a square size.
	fn from_str(s: &str) -> Result<Self> {
		let parse = |part: &str| {
			part.trim()
				.parse::<usize>()
				.map_err(|e| Error::invalid_argument(format!("invalid image size `{s}`: {e}")))
		};
		let size = match s.split_once(|c: char| c == 'x' || c == 'X') {
			Some((height, width)) => ImageSize::new(parse(height)?, parse(width)?),
			None => ImageSize::square(parse(s)?)
		};
		size.validate()?;
		Ok(size)
	}
}

/// Builds an `[H, W, 3]` gradient image: red grows down the rows, green across the columns and blue along the diagonal.
pub fn gradient_image(size: ImageSize) -> Result<Array3<f32>> {
	size.validate()?;
	let (height, width) = (size.height as f32, size.width as f32);
	Ok(Array3::from_shape_fn((size.height, size.width, CHANNELS), |(i, j, c)| match c {
		0 => i as f32 / height,
		1 => j as f32 / width,
		_ => (i + j) as f32 / (height + width)
	}))
}

/// Converts an `[H, W, C]` image into the `[1, C, H, W]` layout vision models take.
pub fn to_nchw(image: &Array3<f32>) -> Array4<f32> {
	image.view().permuted_axes([2, 0, 1]).insert_axis(Axis(0)).as_standard_layout().into_owned()
}

/// Writes an `[H, W, 3]` image with values in `[0, 1]` as an 8-bit RGB PNG.
pub fn save_preview(image: &Array3<f32>, path: impl AsRef<Path>) -> Result<()> {
	let (height, width, channels) = image.dim();
	if channels != CHANNELS {
		return Err(Error::shape(format!("expected a {CHANNELS}-channel image, got {channels} channels")));
	}
	let buffer = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
		let (x, y) = (x as usize, y as usize);
		// `as` saturates, so out-of-range values clamp instead of wrapping
		Rgb([0, 1, 2].map(|c| (image[[y, x, c]] * 255.0) as u8))
	});
	buffer.save(path)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorCode;

	#[test]
	fn gradient_follows_pixel_coordinates() {
		let image = gradient_image(ImageSize::new(4, 8)).unwrap();
		assert_eq!(image.dim(), (4, 8, 3));
		assert_eq!(image[[0, 0, 0]], 0.0);
		assert_eq!(image[[3, 5, 0]], 0.75);
		assert_eq!(image[[3, 5, 1]], 0.625);
		assert_eq!(image[[3, 5, 2]], 8.0 / 12.0);
	}

	#[test]
	fn nchw_keeps_values_in_place() {
		let image = gradient_image(ImageSize::new(5, 7)).unwrap();
		let tensor = to_nchw(&image);
		assert_eq!(tensor.shape(), &[1, 3, 5, 7]);
		assert!(tensor.is_standard_layout());
		for ((i, j, c), v) in image.indexed_iter() {
			assert_eq!(tensor[[0, c, i, j]], *v);
		}
	}

	#[test]
	fn parses_sizes() {
		assert_eq!("224x320".parse::<ImageSize>().unwrap(), ImageSize::new(224, 320));
		assert_eq!("512".parse::<ImageSize>().unwrap(), ImageSize::square(512));
		assert_eq!(ImageSize::new(256, 128).to_string(), "256x128");
		assert_eq!("0x4".parse::<ImageSize>().unwrap_err().code(), ErrorCode::InvalidArgument);
		assert_eq!("big".parse::<ImageSize>().unwrap_err().code(), ErrorCode::InvalidArgument);
	}

	#[test]
	fn preview_round_trips_through_png() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test_input_image.png");
		let image = gradient_image(ImageSize::new(16, 16)).unwrap();
		save_preview(&image, &path).unwrap();

		let loaded = image::open(&path).unwrap().to_rgb8();
		assert_eq!(loaded.dimensions(), (16, 16));
		assert_eq!(loaded.get_pixel(0, 0).0, [0, 0, 0]);
		// row 8 -> red 0.5, column 4 -> green 0.25, blue 12 / 32
		assert_eq!(loaded.get_pixel(4, 8).0, [127, 63, 95]);
	}
}
