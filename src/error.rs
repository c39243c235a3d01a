use std::{error::Error as StdError, fmt, io, path::Path};

/// Type alias for the `Result` type returned by `onnx-probe` functions.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error returned by any `onnx-probe` API.
pub struct Error {
	code: ErrorCode,
	message: String,
	cause: Option<Box<dyn StdError + Send + Sync + 'static>>
}

impl Error {
	/// Creates a custom [`Error`] with the given message.
	pub fn new(msg: impl Into<String>) -> Self {
		Self::new_internal(ErrorCode::GenericFailure, msg, None)
	}

	/// Creates a custom [`Error`] with the given [`ErrorCode`] and message.
	pub fn new_with_code(code: ErrorCode, msg: impl Into<String>) -> Self {
		Self::new_internal(code, msg, None)
	}

	/// Wraps an error from another crate, keeping it available through [`StdError::source`].
	pub fn wrap<T: StdError + Send + Sync + 'static>(code: ErrorCode, err: T) -> Self {
		Self::new_internal(code, err.to_string(), Some(Box::new(err)))
	}

	pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
		Self::new_internal(ErrorCode::InvalidArgument, msg, None)
	}

	pub(crate) fn shape(msg: impl Into<String>) -> Self {
		Self::new_internal(ErrorCode::Shape, msg, None)
	}

	pub(crate) fn no_such_file(path: &Path) -> Self {
		Self::new_internal(ErrorCode::NoSuchFile, format!("model file not found: {}", path.display()), None)
	}

	/// Converts anything ONNX Runtime hands back into a [`ErrorCode::Runtime`] error.
	///
	/// `ort` parameterizes some of its errors over a recovery value, so this takes any displayable error rather than
	/// just `ort::Error`.
	pub(crate) fn runtime(err: impl fmt::Display) -> Self {
		Self::new_internal(ErrorCode::Runtime, err.to_string(), None)
	}

	fn new_internal(code: ErrorCode, message: impl Into<String>, cause: Option<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
		Self { code, message: message.into(), cause }
	}

	pub fn code(&self) -> ErrorCode {
		self.code
	}

	pub fn message(&self) -> &str {
		self.message.as_str()
	}
}

impl fmt::Debug for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Error")
			.field("code", &self.code)
			.field("message", &self.message)
			.field("cause", &self.cause)
			.finish()
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.cause.as_ref().map(|x| &**x as &(dyn StdError + 'static))
	}
}

impl From<io::Error> for Error {
	fn from(err: io::Error) -> Self {
		Error::wrap(ErrorCode::Io, err)
	}
}

impl From<image::ImageError> for Error {
	fn from(err: image::ImageError) -> Self {
		Error::wrap(ErrorCode::Image, err)
	}
}

impl From<ndarray::ShapeError> for Error {
	fn from(err: ndarray::ShapeError) -> Self {
		Error::wrap(ErrorCode::Shape, err)
	}
}

impl From<ort::Error> for Error {
	fn from(err: ort::Error) -> Self {
		Error::runtime(err)
	}
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
	GenericFailure,
	InvalidArgument,
	NoSuchFile,
	/// ONNX Runtime failed to load the model or run it.
	Runtime,
	/// A tensor did not have the rank or dimensions an operation needs.
	Shape,
	Image,
	Io
}
