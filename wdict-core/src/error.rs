use thiserror::Error;

/// Result type returned by the weighted dictionary operations.
pub type Result<T> = std::result::Result<T, WeightedDictError>;

/// Errors raised by the weighted dictionary operations.
///
/// All errors are raised synchronously; retrying an operation with the same
/// inputs reproduces the same failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightedDictError {
	/// One or more requested keys are absent from the dictionary.
	#[error("key(s) not found in dictionary: {}", .0.join(", "))]
	KeyNotFound(Vec<String>),

	/// Malformed input: empty key list, no dictionary, all-zero weights...
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// The items/weights key sets of a raw dictionary disagree.
	#[error("malformed dictionary: {0}")]
	MalformedDictionary(String),
}

impl WeightedDictError {
	/// Shorthand for a single missing key.
	pub(crate) fn key_not_found(key: &str) -> Self {
		Self::KeyNotFound(vec![key.to_owned()])
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidArgument(message.into())
	}
}
