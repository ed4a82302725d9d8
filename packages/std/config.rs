use crate::{Error, Platform, Result, elf::Machine};
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

/// The name of the config file read from the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "build-router.json";

/// The environment variable that overrides the output root.
pub const ROOT_VAR: &str = "BUILD_ROUTER_ROOT";

/// The environment variable that overrides the patch tool.
pub const PATCH_TOOL_VAR: &str = "BUILD_ROUTER_PATCH_TOOL";

/// The router configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Config {
	/// The absolute directory that receives every build output.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub root: Option<PathBuf>,

	/// The name of the native extension. The staging directory is `<root>/<extension>.wheel`.
	pub extension: String,

	/// The name of the installable package inside the staging directory.
	pub package: String,

	/// Files in the package directory whose names end with this suffix are shared libraries.
	pub shared_library_suffix: String,

	/// The loader search path written into every shared library.
	pub search_path: String,

	/// The program that rewrites loader search paths.
	pub patch_tool: PathBuf,

	/// Arguments placed before the patch arguments.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub patch_tool_args: Vec<String>,

	/// Whether to check that every shared library is an ELF shared object for `machine` before patching.
	pub verify: bool,

	/// The target platform. Defaults to the host.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub platform: Option<Platform>,

	/// The architecture shared libraries must be built for. Defaults to the host.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub machine: Option<Machine>,

	/// The external native build. When absent, compilation happens out of band.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub builder: Option<BuilderConfig>,
}

/// An external native build command.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct BuilderConfig {
	pub program: PathBuf,

	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<String>,

	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub env: BTreeMap<String, String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			root: None,
			extension: "pylcf2xml".to_owned(),
			package: "pylcf2xml".to_owned(),
			shared_library_suffix: ".so".to_owned(),
			search_path: "$ORIGIN".to_owned(),
			patch_tool: "patchelf".into(),
			patch_tool_args: Vec::new(),
			verify: true,
			platform: None,
			machine: None,
			builder: None,
		}
	}
}

impl Config {
	/// Read a config file.
	pub fn read(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let contents = std::fs::read(path)
			.map_err(Error::io("failed to read the config file", path))?;
		serde_json::from_slice(&contents).map_err(|source| Error::ConfigFile {
			path: path.to_owned(),
			source,
		})
	}

	/// Load the config from `path`, or from [`CONFIG_FILE_NAME`] in `directory` if it exists, or fall back to the defaults.
	pub fn load(path: Option<&Path>, directory: &Path) -> Result<Self> {
		if let Some(path) = path {
			return Self::read(path);
		}
		let path = directory.join(CONFIG_FILE_NAME);
		if path.is_file() {
			return Self::read(path);
		}
		Ok(Self::default())
	}

	/// Apply overrides from the environment.
	pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
		if let Some(root) = var(ROOT_VAR).filter(|root| !root.is_empty()) {
			self.root = Some(root.into());
		}
		if let Some(patch_tool) = var(PATCH_TOOL_VAR).filter(|tool| !tool.is_empty()) {
			self.patch_tool = patch_tool.into();
		}
	}
}

/// The fixed directory tree every lifecycle phase writes into.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Layout {
	/// Final distributable artifacts.
	pub root: PathBuf,

	/// Intermediate staging for distribution builds.
	pub staging: PathBuf,

	/// The installable package contents, including compiled shared libraries.
	pub package: PathBuf,
}

impl Layout {
	pub fn new(config: &Config) -> Result<Self> {
		let root = config
			.root
			.clone()
			.ok_or_else(|| Error::Config(format!("no output root, set {ROOT_VAR} or \"root\"")))?;
		if !root.is_absolute() {
			return Err(Error::Config(format!(
				"the output root must be absolute, got {}",
				root.display()
			)));
		}
		validate_name("extension", &config.extension)?;
		validate_name("package", &config.package)?;
		if config.shared_library_suffix.is_empty() {
			return Err(Error::Config("the shared library suffix is empty".to_owned()));
		}
		let staging = root.join(format!("{}.wheel", config.extension));
		let package = staging.join(&config.package);
		Ok(Self {
			root,
			staging,
			package,
		})
	}
}

fn validate_name(field: &str, name: &str) -> Result<()> {
	if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
		return Err(Error::Config(format!(
			"the {field} name must be a single path component, got {name:?}"
		)));
	}
	Ok(())
}
