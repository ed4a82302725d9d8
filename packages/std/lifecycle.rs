use crate::{Error, Result};
use std::path::PathBuf;

/// A phase of the packaging driver whose destination paths can be overridden.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	BuildExt,
	Bdist,
	Sdist,
	InstallLib,
}

impl Phase {
	pub const ALL: [Self; 4] = [Self::BuildExt, Self::Bdist, Self::Sdist, Self::InstallLib];

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::BuildExt => "build-ext",
			Self::Bdist => "bdist",
			Self::Sdist => "sdist",
			Self::InstallLib => "install-lib",
		}
	}
}

impl std::fmt::Display for Phase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Phase {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|phase| phase.as_str() == s)
			.ok_or_else(|| Error::Config(format!("unknown phase {s:?}")))
	}
}

/// Options of the extension build.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildExtOptions {
	/// Where intermediate build files go.
	pub build_temp: PathBuf,

	/// Where the finished libraries go.
	pub build_lib: PathBuf,
}

/// Options of the binary distribution.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BdistOptions {
	pub dist_dir: PathBuf,
	pub bdist_base: PathBuf,
}

/// Options of the source distribution.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdistOptions {
	pub dist_dir: PathBuf,
}

/// Options of the library install.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallLibOptions {
	pub build_dir: PathBuf,
}

// The driver's own defaults, relative to the project directory.

impl Default for BuildExtOptions {
	fn default() -> Self {
		Self {
			build_temp: "build/temp".into(),
			build_lib: "build/lib".into(),
		}
	}
}

impl Default for BdistOptions {
	fn default() -> Self {
		Self {
			dist_dir: "dist".into(),
			bdist_base: "build/bdist".into(),
		}
	}
}

impl Default for SdistOptions {
	fn default() -> Self {
		Self {
			dist_dir: "dist".into(),
		}
	}
}

impl Default for InstallLibOptions {
	fn default() -> Self {
		Self {
			build_dir: "build/lib".into(),
		}
	}
}

/// The finalized options of one phase.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum Options {
	BuildExt(BuildExtOptions),
	Bdist(BdistOptions),
	Sdist(SdistOptions),
	InstallLib(InstallLibOptions),
}

/// Hooks the packaging driver calls while finalizing the options of each phase. Every hook defaults to leaving the driver's options unchanged.
pub trait Lifecycle {
	fn configure_build_extension(&self, target: &str, options: &mut BuildExtOptions) -> Result<()> {
		let _ = (target, options);
		Ok(())
	}

	fn configure_binary_distribution(&self, options: &mut BdistOptions) -> Result<()> {
		let _ = options;
		Ok(())
	}

	fn configure_source_distribution(&self, options: &mut SdistOptions) -> Result<()> {
		let _ = options;
		Ok(())
	}

	fn configure_library_install(&self, options: &mut InstallLibOptions) -> Result<()> {
		let _ = options;
		Ok(())
	}
}

/// Keeps every driver default.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl Lifecycle for Passthrough {}

/// Finalize the options of `phase`: start from the driver defaults, then run the hook.
pub fn finalize(lifecycle: &dyn Lifecycle, phase: Phase, target: &str) -> Result<Options> {
	let options = match phase {
		Phase::BuildExt => {
			let mut options = BuildExtOptions::default();
			lifecycle.configure_build_extension(target, &mut options)?;
			Options::BuildExt(options)
		},
		Phase::Bdist => {
			let mut options = BdistOptions::default();
			lifecycle.configure_binary_distribution(&mut options)?;
			Options::Bdist(options)
		},
		Phase::Sdist => {
			let mut options = SdistOptions::default();
			lifecycle.configure_source_distribution(&mut options)?;
			Options::Sdist(options)
		},
		Phase::InstallLib => {
			let mut options = InstallLibOptions::default();
			lifecycle.configure_library_install(&mut options)?;
			Options::InstallLib(options)
		},
	};
	Ok(options)
}
