use std::{
	io::Write,
	path::PathBuf,
	time::{Duration, Instant}
};

use ndarray::ArrayD;

use crate::{
	error::{Error, Result},
	input::{self, CHANNELS, ImageSize},
	logging::{error, info, trace, warning},
	options::{MaskOptions, PREVIEW_FILE, ProbeOptions, VISUALIZATION_FILE},
	output::{OutputKind, OutputTensor, TupleShape},
	segmentation::{self, morphology},
	session::InferenceSession,
	snippet::UnitySnippet
};

/// How a probe run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
	/// The model ran at the configured input size.
	Succeeded,
	/// The configured size failed, but one of the fallback sizes worked.
	Recovered,
	/// Neither the configured size nor any fallback size worked.
	Failed
}

/// What a probe run did, for callers that need more than the printed report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
	pub outcome: ProbeOutcome,
	/// The input size the model accepted.
	pub input_size: Option<ImageSize>,
	pub inference_time: Option<Duration>,
	pub output_shapes: Vec<Vec<usize>>,
	/// Every file written, in the order it was written.
	pub files: Vec<PathBuf>
}

impl ProbeReport {
	fn new() -> Self {
		Self {
			outcome: ProbeOutcome::Failed,
			input_size: None,
			inference_time: None,
			output_shapes: Vec::new(),
			files: Vec::new()
		}
	}

	fn record_run(&mut self, outcome: ProbeOutcome, size: ImageSize, elapsed: Duration, outputs: &[OutputTensor]) {
		self.outcome = outcome;
		self.input_size = Some(size);
		self.inference_time = Some(elapsed);
		self.output_shapes = outputs.iter().map(|output| output.shape().to_vec()).collect();
	}
}

/// Runs a model once on a synthetic image and reports what it sees.
///
/// The human-readable report goes to the writer passed to [`Probe::run`]; images go to the configured output
/// directory.
pub struct Probe<S> {
	session: S,
	options: ProbeOptions
}

impl<S: InferenceSession> Probe<S> {
	pub fn new(session: S, options: ProbeOptions) -> Self {
		Self { session, options }
	}

	pub fn options(&self) -> &ProbeOptions {
		&self.options
	}

	pub fn into_session(self) -> S {
		self.session
	}

	/// Lists the model, runs it at the configured input size and, if that fails, at each fallback size until one
	/// works.
	///
	/// Inference failures are part of the report, not errors; `Err` means the model couldn't be described, the
	/// preview image couldn't be written, or `out` failed.
	pub fn run<W: Write>(&mut self, out: &mut W) -> Result<ProbeReport> {
		let mut report = ProbeReport::new();

		writeln!(out, "Analyzing model: {}", self.options.model_path().display())?;
		writeln!(out, "{}", "-".repeat(50))?;

		let info = self.session.model_info()?;
		write!(out, "{info}")?;
		let input_name = match info.primary_input() {
			Some(input) => input.name.clone(),
			None => return Err(Error::invalid_argument("model has no inputs"))
		};

		let size = self.options.input_size();
		writeln!(out, "\nInput dimensions for the test:")?;
		writeln!(out, "  Using dimensions: batch_size=1, channels={CHANNELS}, height={}, width={}", size.height, size.width)?;

		let image = input::gradient_image(size)?;
		let tensor = input::to_nchw(&image);
		writeln!(out, "  {input_name}: shape = {}, dtype = float32", TupleShape(tensor.shape()))?;

		let preview_path = self.options.output_path(PREVIEW_FILE);
		input::save_preview(&image, &preview_path)?;
		writeln!(out, "  Test image saved to {}", preview_path.display())?;
		report.files.push(preview_path);

		writeln!(out, "\nRunning inference...")?;
		let start = Instant::now();
		let attempt = self.session.run(&input_name, tensor).and_then(|outputs| {
			let elapsed = start.elapsed();
			self.describe_outputs(out, size, elapsed, &outputs, &mut report)?;
			Ok((outputs, elapsed))
		});
		match attempt {
			Ok((outputs, elapsed)) => {
				report.record_run(ProbeOutcome::Succeeded, size, elapsed, &outputs);
				info!(%size, "inference succeeded");
			}
			Err(e) => {
				warning!(%size, error = %e, "inference failed, trying fallback sizes");
				writeln!(out, "\nError while running inference: {e}")?;
				writeln!(out, "\nRetrying with other image sizes...")?;
				self.try_fallback_sizes(out, &input_name, &mut report)?;
			}
		}

		Ok(report)
	}

	/// Prints timing, per-output statistics, visualizations and the Unity snippet for a successful run.
	fn describe_outputs<W: Write>(
		&self,
		out: &mut W,
		size: ImageSize,
		elapsed: Duration,
		outputs: &[OutputTensor],
		report: &mut ProbeReport
	) -> Result<()> {
		writeln!(out, "Inference time: {:.4} seconds", elapsed.as_secs_f64())?;

		writeln!(out, "\nOutputs:")?;
		let mut visualized = 0;
		for (i, output) in outputs.iter().enumerate() {
			let summary = output.summary();
			trace!(name = %output.name, ?summary, "output summary");
			writeln!(out, "  [{i}] Shape: {}, Type: {}", TupleShape(&summary.shape), summary.dtype)?;
			writeln!(out, "  Min: {}, Max: {}, Mean: {}", summary.min, summary.max, summary.mean)?;

			match output.kind() {
				OutputKind::MultiClass { classes } => {
					writeln!(out, "  Number of classes: {classes}")?;
					writeln!(out, "  Model returns multi-class segmentation")?;
				}
				OutputKind::SingleChannel => {
					writeln!(out, "  Number of classes: 1")?;
					writeln!(out, "  Model returns a single-channel segmentation mask")?;
				}
				OutputKind::Mask => writeln!(out, "  Model returns a [batch, height, width] mask")?,
				OutputKind::Other => continue
			}

			let file_name = match visualized {
				0 => VISUALIZATION_FILE.to_owned(),
				_ => format!("segmentation_visualization_{i}.png")
			};
			self.visualize(out, &output.data, file_name, report)?;
			if visualized == 0 {
				if let Some(mask) = self.options.mask() {
					self.export_mask(out, &output.data, mask, report)?;
				}
			}
			visualized += 1;
		}

		let first = outputs.first().ok_or_else(|| Error::shape("model returned no outputs"))?;
		let input_shape = [1, CHANNELS, size.height, size.width];
		writeln!(out, "\nUnity Sentis integration hints:")?;
		writeln!(out, "\n{}", UnitySnippet::new(size, CHANNELS, &input_shape, first.shape()))?;
		Ok(())
	}

	fn visualize<W: Write>(&self, out: &mut W, data: &ArrayD<f32>, file_name: String, report: &mut ProbeReport) -> Result<()> {
		let path = self.options.output_path(file_name);
		let map = segmentation::visualize(data, &path, self.options.seed())?;
		trace!(path = %path.display(), classes = map.num_classes, histogram = ?map.histogram(), "wrote visualization");
		writeln!(out, "Visualization saved to {}", path.display())?;
		report.files.push(path);
		Ok(())
	}

	fn export_mask<W: Write>(&self, out: &mut W, data: &ArrayD<f32>, options: &MaskOptions, report: &mut ProbeReport) -> Result<()> {
		let mut mask = segmentation::class_mask(data, options.class, options.threshold)?;
		if options.close {
			mask = morphology::close(&mask);
		}
		if options.open {
			mask = morphology::open(&mask);
		}

		let path = self.options.output_path(options.file_name());
		segmentation::save_mask(&mask, &path)?;
		writeln!(
			out,
			"Class {} mask saved to {} (coverage {:.1}%)",
			options.class,
			path.display(),
			segmentation::coverage(&mask) * 100.0
		)?;
		report.files.push(path);
		Ok(())
	}

	fn try_fallback_sizes<W: Write>(&mut self, out: &mut W, input_name: &str, report: &mut ProbeReport) -> Result<()> {
		let sizes = self.options.fallback_sizes().to_vec();
		for size in sizes {
			writeln!(out, "Trying size {size}:")?;
			match self.try_size(out, input_name, size, report) {
				Ok(()) => return Ok(()),
				Err(e) => {
					writeln!(out, "  Error: {e}")?;
				}
			}
		}
		error!("no fallback size worked");
		Ok(())
	}

	fn try_size<W: Write>(&mut self, out: &mut W, input_name: &str, size: ImageSize, report: &mut ProbeReport) -> Result<()> {
		let image = input::gradient_image(size)?;
		let start = Instant::now();
		let outputs = self.session.run(input_name, input::to_nchw(&image))?;
		let elapsed = start.elapsed();
		let first = outputs.first().ok_or_else(|| Error::shape("model returned no outputs"))?;
		writeln!(out, "  Success! Output shape: {}", TupleShape(first.shape()))?;

		self.visualize(out, &first.data, format!("segmentation_size_{size}.png"), report)?;
		report.record_run(ProbeOutcome::Recovered, size, elapsed, &outputs);
		info!(%size, "inference succeeded at fallback size");
		Ok(())
	}
}
