use std::{io, path::PathBuf, process::ExitCode};

use clap::Parser;
use onnx_probe::{
	ImageSize, MaskOptions, OrtSession, Probe, ProbeOptions,
	options::{DEFAULT_MASK_THRESHOLD, DEFAULT_MODEL_PATH},
	session
};
use tracing_subscriber::EnvFilter;

/// Inspect an ONNX segmentation model and run it once on a synthetic gradient image.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
	/// Path to the .onnx model
	#[arg(default_value = DEFAULT_MODEL_PATH)]
	model: PathBuf,

	/// Input size to try first, as HxW or a single number for a square
	#[arg(long, value_parser = parse_size)]
	size: Option<ImageSize>,

	/// Size to try if the first run fails; repeat to try several, in order
	#[arg(long = "fallback-size", value_parser = parse_size)]
	fallback_sizes: Vec<ImageSize>,

	/// Directory to write images to
	#[arg(long, default_value = ".")]
	output_dir: PathBuf,

	/// Seed for visualization colors
	#[arg(long)]
	seed: Option<u64>,

	/// Also export this class of the first segmentation output as a binary mask
	#[arg(long)]
	mask_class: Option<usize>,

	/// Minimum class probability for a pixel to be part of the mask [default: 0.15]
	#[arg(long, requires = "mask_class")]
	mask_threshold: Option<f32>,

	/// Fill small holes in the mask
	#[arg(long, requires = "mask_class")]
	close: bool,

	/// Remove small specks from the mask
	#[arg(long, requires = "mask_class")]
	open: bool
}

fn parse_size(s: &str) -> Result<ImageSize, String> {
	s.parse().map_err(|e: onnx_probe::Error| e.to_string())
}

impl Cli {
	fn options(&self) -> ProbeOptions {
		let mut options = ProbeOptions::default().with_model_path(&self.model).with_output_dir(&self.output_dir);
		if let Some(size) = self.size {
			options = options.with_input_size(size);
		}
		if !self.fallback_sizes.is_empty() {
			options = options.with_fallback_sizes(self.fallback_sizes.iter().copied());
		}
		if let Some(seed) = self.seed {
			options = options.with_seed(seed);
		}
		if let Some(class) = self.mask_class {
			options = options.with_mask(
				MaskOptions::new(class)
					.with_threshold(self.mask_threshold.unwrap_or(DEFAULT_MASK_THRESHOLD))
					.with_closing(self.close)
					.with_opening(self.open)
			);
		}
		options
	}
}

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(io::stderr)
		.init();

	let options = Cli::parse().options();
	if !options.model_path().exists() {
		println!("Error: model file not found: {}", options.model_path().display());
		return ExitCode::FAILURE;
	}

	session::init_runtime();
	let result = OrtSession::open(options.model_path()).and_then(|session| Probe::new(session, options).run(&mut io::stdout().lock()));
	match result {
		Ok(report) => {
			tracing::debug!(?report, "probe finished");
			ExitCode::SUCCESS
		}
		Err(e) => {
			tracing::error!(code = ?e.code(), "{e}");
			println!("Error: {e}");
			ExitCode::FAILURE
		}
	}
}
