#![allow(clippy::tabs_in_doc_comments)]
#![warn(clippy::unwrap_used)]

//! `onnx-probe` inspects an ONNX vision model and checks what it does with an image.
//!
//! A [`Probe`] lists the model's metadata, inputs and outputs, feeds it a synthetic gradient image, times the run,
//! summarizes every output, renders segmentation outputs to PNG and prints the dimensions a Unity Sentis integration
//! needs. If the model rejects the first input size, a handful of common sizes are tried instead.
//!
//! ```no_run
//! use onnx_probe::{OrtSession, Probe, ProbeOptions};
//!
//! # fn main() -> onnx_probe::Result<()> {
//! let options = ProbeOptions::default().with_model_path("segformer.onnx");
//! let session = OrtSession::open(options.model_path())?;
//! let report = Probe::new(session, options).run(&mut std::io::stdout())?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod input;
pub(crate) mod logging;
pub mod metadata;
pub mod options;
pub mod output;
mod probe;
pub mod segmentation;
pub mod session;
pub mod snippet;

pub use self::{
	error::{Error, ErrorCode, Result},
	input::ImageSize,
	metadata::ModelInfo,
	options::{MaskOptions, ProbeOptions},
	output::OutputTensor,
	probe::{Probe, ProbeOutcome, ProbeReport},
	session::{InferenceSession, OrtSession}
};
