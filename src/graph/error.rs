use thiserror::Error;

/// Failures surfaced by the synchronization engine.
#[derive(Debug, Error)]
pub enum GraphError {
	/// Bad credentials, unreachable host, or no active session.
	#[error("connection error: {0}")]
	Connection(String),

	/// Malformed or failing statement, or a response that cannot be decoded.
	#[error("query error: {0}")]
	Query(String),

	/// Rejected locally before any remote call.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// A result field of a type the parser cannot map onto nodes or edges.
	#[error("unsupported result type `{kind}` in field `{field}`")]
	UnsupportedResultType {
		/// Column name.
		field: String,
		/// Type name of the value.
		kind: String,
	},
}

impl GraphError {
	/// The error for operations issued without a session.
	pub fn not_connected() -> Self {
		GraphError::Connection("no active session".into())
	}
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, GraphError>;
