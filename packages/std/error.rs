use anstream::eprintln;
use crossterm::style::Stylize as _;
use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The configuration is missing a value or holds an invalid one.
	#[error("invalid configuration: {0}")]
	Config(String),

	/// The configuration file could not be parsed.
	#[error("failed to parse the config file {}", path.display())]
	ConfigFile {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	/// A filesystem operation failed.
	#[error("{message}: {}", path.display())]
	Io {
		message: &'static str,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// An external program could not be started.
	#[error("could not run {}", program.display())]
	Spawn {
		program: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// An external program exited unsuccessfully.
	#[error("{} failed with status: {status}", program.display())]
	Status {
		program: PathBuf,
		status: std::process::ExitStatus,
	},

	/// A file with the shared library suffix is not a loadable shared library.
	#[error("{} is not a loadable shared library: {reason}", path.display())]
	InvalidLibrary { path: PathBuf, reason: String },

	#[error("failed to serialize the output")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Create a closure that wraps an [`std::io::Error`] for the given path.
	pub fn io(message: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self + use<> {
		let path = path.to_owned();
		move |source| Self::Io {
			message,
			path,
			source,
		}
	}
}

/// Print an error followed by its chain of sources.
pub fn print_error(error: &(dyn std::error::Error + 'static)) {
	let mut current = Some(error);
	while let Some(error) = current {
		// Print the message.
		let message = error.to_string();
		eprintln!("{} {}", "->".red(), message.replace('\n', "\n   "));

		// Print the exit code, if there is one.
		if let Some(Error::Status { status, .. }) = error.downcast_ref::<Error>() {
			if let Some(code) = status.code() {
				eprintln!("   code = {code}");
			}
		}

		current = error.source();
	}
}

#[cfg(test)]
mod tests {
	use super::Error;
	use std::error::Error as _;

	#[test]
	fn io_errors_keep_their_source() {
		let error = Error::io("failed to create the output root", "/nope".as_ref())(
			std::io::Error::from(std::io::ErrorKind::PermissionDenied),
		);
		assert_eq!(error.to_string(), "failed to create the output root: /nope");
		assert!(error.source().is_some());
	}
}
