//! User-visible notices raised at operation boundaries.

use log::{error, info};

/// How a [`Notice`] is presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
	/// Informational.
	Info,
	/// Failure.
	Error,
}

/// A user-visible message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
	/// Presentation.
	pub severity: Severity,
	/// Text shown to the user.
	pub message: String,
}

impl Notice {
	/// An informational notice.
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			severity: Severity::Info,
			message: message.into(),
		}
	}

	/// An error notice.
	pub fn error(message: impl Into<String>) -> Self {
		Self {
			severity: Severity::Error,
			message: message.into(),
		}
	}
}

/// Sink for user-visible notifications raised at operation boundaries.
pub trait Notifier {
	/// Show or record `notice`.
	fn notify(&self, notice: Notice);

	/// Raise an error notice.
	fn error(&self, message: &str) {
		self.notify(Notice::error(message));
	}

	/// Raise an informational notice.
	fn info(&self, message: &str) {
		self.notify(Notice::info(message));
	}
}

/// Notifier that only writes to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
	fn notify(&self, notice: Notice) {
		match notice.severity {
			Severity::Info => info!("{}", notice.message),
			Severity::Error => error!("{}", notice.message),
		}
	}
}
