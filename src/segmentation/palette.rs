use image::Rgb;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Seed used for visualization colors unless told otherwise, so repeated runs color classes the same way.
pub const DEFAULT_SEED: u64 = 42;

/// One color per class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
	colors: Vec<Rgb<u8>>
}

impl Palette {
	/// Draws a random color for each class from an RNG seeded with `seed`.
	///
	/// When there's more than one class, class 0 is treated as background and always painted black.
	pub fn seeded(num_classes: usize, seed: u64) -> Self {
		let mut rng = StdRng::seed_from_u64(seed);
		let mut colors: Vec<Rgb<u8>> = (0..num_classes).map(|_| Rgb(rng.gen::<[f32; 3]>().map(|x| (x * 255.0) as u8))).collect();
		if num_classes > 1 {
			colors[0] = Rgb([0, 0, 0]);
		}
		Self { colors }
	}

	pub fn len(&self) -> usize {
		self.colors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.colors.is_empty()
	}

	/// Color of `class`; indices past the end wrap around.
	pub fn color(&self, class: usize) -> Rgb<u8> {
		if self.colors.is_empty() {
			return Rgb([0, 0, 0]);
		}
		self.colors[class % self.colors.len()]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_seed_same_colors() {
		assert_eq!(Palette::seeded(150, DEFAULT_SEED), Palette::seeded(150, DEFAULT_SEED));
		assert_ne!(Palette::seeded(150, DEFAULT_SEED), Palette::seeded(150, 7));
	}

	#[test]
	fn background_is_black() {
		let palette = Palette::seeded(3, DEFAULT_SEED);
		assert_eq!(palette.len(), 3);
		assert_eq!(palette.color(0), Rgb([0, 0, 0]));
		assert_eq!(palette.color(3), palette.color(0));
	}
}
