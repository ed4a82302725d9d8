use crate::{Error, Result, process};
use itertools::Itertools as _;
use std::path::{Path, PathBuf};

/// Rewrites the loader search path of a shared library in place.
pub trait Patcher {
	fn set_search_path(&self, path: &Path, search_path: &str) -> Result<()>;
}

/// An external patch tool invoked as `<program> [args...] --set-rpath <search path> <file>`, the interface of `patchelf`.
#[derive(Clone, Debug)]
pub struct PatchTool {
	program: PathBuf,
	args: Vec<String>,
}

impl PatchTool {
	#[must_use]
	pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
		Self {
			program: program.into(),
			args,
		}
	}
}

impl Patcher for PatchTool {
	fn set_search_path(&self, path: &Path, search_path: &str) -> Result<()> {
		let mut command = std::process::Command::new(&self.program);
		command
			.args(&self.args)
			.arg("--set-rpath")
			.arg(search_path)
			.arg(path);
		process::run(&self.program, command)
	}
}

/// List the entries of `directory` whose names end with `suffix`, sorted by name.
pub fn shared_libraries(directory: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
	let entries = std::fs::read_dir(directory)
		.map_err(Error::io("failed to list the package directory", directory))?;
	let mut libraries = Vec::new();
	for entry in entries {
		let entry = entry.map_err(Error::io("failed to list the package directory", directory))?;
		let name = entry.file_name();
		#[cfg(feature = "tracing")]
		tracing::debug!(?name, "found entry");
		if name.to_string_lossy().ends_with(suffix) {
			libraries.push(entry.path());
		}
	}
	Ok(libraries.into_iter().sorted().collect())
}
