use build_router_std::{Config, Machine, Phase, Platform, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, clap::Parser)]
#[command(
	name = "build-router",
	about = "Route native extension build outputs into a fixed tree and fix their loader paths."
)]
pub(crate) struct Args {
	/// The config file. Defaults to `build-router.json` in the working directory, if it exists.
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// The absolute directory that receives every build output.
	#[arg(long, global = true)]
	pub root: Option<PathBuf>,

	/// The name of the native extension.
	#[arg(long, global = true)]
	pub extension: Option<String>,

	/// The name of the package inside the staging directory.
	#[arg(long, global = true)]
	pub package: Option<String>,

	/// The target platform. Defaults to the host.
	#[arg(long, global = true)]
	pub platform: Option<Platform>,

	/// The architecture shared libraries must be built for. Defaults to the host.
	#[arg(long, global = true)]
	pub machine: Option<Machine>,

	/// The program that rewrites loader search paths.
	#[arg(long, global = true)]
	pub patch_tool: Option<PathBuf>,

	/// Patch every suffixed file without checking that it is a shared library.
	#[arg(long, global = true)]
	pub no_verify: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Command {
	/// Create the output root.
	EnsureRoot,

	/// Print the finalized options of one phase as JSON.
	Finalize {
		/// One of `build-ext`, `bdist`, `sdist`, or `install-lib`.
		phase: Phase,
	},

	/// Run the extension build hook.
	BuildExt {
		/// The extension to build. Defaults to the configured extension.
		target: Option<String>,
	},

	/// Rewrite the loader search path of the shared libraries in a directory.
	FixLoaderPaths {
		/// Defaults to the package directory.
		directory: Option<PathBuf>,
	},

	/// Run the extension build hook, then the packaging command.
	Build {
		/// The extension to build. Defaults to the configured extension.
		target: Option<String>,

		/// The packaging command, run only if the build succeeds.
		#[arg(last = true)]
		command: Vec<String>,
	},

	/// Print the layout and the finalized options of every phase as JSON.
	Layout,
}

impl Args {
	/// Resolve the config: flags override the environment, which overrides the config file.
	pub(crate) fn resolve_config(
		&self,
		directory: &Path,
		var: impl Fn(&str) -> Option<String>,
	) -> Result<Config> {
		let mut config = Config::load(self.config.as_deref(), directory)?;
		config.apply_env(var);
		if let Some(root) = &self.root {
			config.root = Some(root.clone());
		}
		if let Some(extension) = &self.extension {
			config.extension.clone_from(extension);
		}
		if let Some(package) = &self.package {
			config.package.clone_from(package);
		}
		if let Some(platform) = self.platform {
			config.platform = Some(platform);
		}
		if let Some(machine) = self.machine {
			config.machine = Some(machine);
		}
		if let Some(patch_tool) = &self.patch_tool {
			config.patch_tool.clone_from(patch_tool);
		}
		if self.no_verify {
			config.verify = false;
		}
		Ok(config)
	}
}
