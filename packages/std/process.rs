use crate::{Error, Result};
use std::path::Path;

/// Run a command to completion. Fails if it cannot be started or exits unsuccessfully.
pub(crate) fn run(program: &Path, mut command: std::process::Command) -> Result<()> {
	#[cfg(feature = "tracing")]
	tracing::debug!(?command, "running");

	let status = command.status().map_err(|source| Error::Spawn {
		program: program.to_owned(),
		source,
	})?;
	if !status.success() {
		return Err(Error::Status {
			program: program.to_owned(),
			status,
		});
	}
	Ok(())
}

/// Run a packaging command given as a program followed by its arguments.
pub fn run_packaging(command: &[String]) -> Result<()> {
	let Some((program, args)) = command.split_first() else {
		return Err(Error::Config("the packaging command is empty".to_owned()));
	};
	#[cfg(feature = "tracing")]
	tracing::info!(?program, ?args, "running the packaging command");
	let mut packaging = std::process::Command::new(program);
	packaging.args(args);
	run(Path::new(program), packaging)
}
