//! 3x3 binary morphology for cleaning up class masks.
//!
//! Neighbours outside the mask are ignored, so a filled mask stays filled under erosion.

use ndarray::Array2;

fn neighbourhood(mask: &Array2<bool>, y: usize, x: usize) -> impl Iterator<Item = bool> + '_ {
	let (height, width) = mask.dim();
	let rows = y.saturating_sub(1)..=(y + 1).min(height - 1);
	rows.flat_map(move |ny| {
		let cols = x.saturating_sub(1)..=(x + 1).min(width - 1);
		cols.map(move |nx| mask[[ny, nx]])
	})
}

/// Sets every pixel with at least one set neighbour.
pub fn dilate(mask: &Array2<bool>) -> Array2<bool> {
	Array2::from_shape_fn(mask.dim(), |(y, x)| neighbourhood(mask, y, x).any(|v| v))
}

/// Clears every pixel with at least one clear neighbour.
pub fn erode(mask: &Array2<bool>) -> Array2<bool> {
	Array2::from_shape_fn(mask.dim(), |(y, x)| neighbourhood(mask, y, x).all(|v| v))
}

/// Dilation followed by erosion; fills small holes.
pub fn close(mask: &Array2<bool>) -> Array2<bool> {
	erode(&dilate(mask))
}

/// Erosion followed by dilation; removes small specks.
pub fn open(mask: &Array2<bool>) -> Array2<bool> {
	dilate(&erode(mask))
}

#[cfg(test)]
mod tests {
	use ndarray::array;

	use super::*;

	#[test]
	fn dilate_grows_a_point() {
		let mut mask = Array2::from_elem((3, 4), false);
		mask[[1, 1]] = true;
		assert_eq!(dilate(&mask), array![[true, true, true, false], [true, true, true, false], [true, true, true, false]]);
	}

	#[test]
	fn close_fills_holes() {
		let mut mask = Array2::from_elem((5, 5), true);
		mask[[2, 2]] = false;
		assert_eq!(close(&mask), Array2::from_elem((5, 5), true));
		assert_eq!(erode(&Array2::from_elem((2, 2), true)), Array2::from_elem((2, 2), true));
	}

	#[test]
	fn open_removes_specks() {
		let mut mask = Array2::from_elem((5, 5), false);
		mask[[0, 4]] = true;
		for y in 2..5 {
			for x in 0..3 {
				mask[[y, x]] = true;
			}
		}
		let opened = open(&mask);
		assert!(!opened[[0, 4]]);
		assert!(opened[[3, 1]]);
		assert_eq!(opened.iter().filter(|v| **v).count(), 9);
	}
}
