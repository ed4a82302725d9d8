use crate::{
	BdistOptions, BuildExtOptions, Config, Error, InstallLibOptions, Layout, Lifecycle, Options,
	Phase, Platform, Result, SdistOptions,
	builder::{self, Builder},
	elf,
	loader::{self, PatchTool, Patcher},
	process,
};
use std::path::{Path, PathBuf};

/// Routes every lifecycle phase into one fixed directory tree and rewrites the loader search path of the shared libraries it produces.
pub struct Router {
	config: Config,
	layout: Layout,
	platform: Platform,
	builder: Box<dyn Builder>,
	patcher: Box<dyn Patcher>,
}

/// The layout and the finalized options of every phase.
#[derive(Debug, serde::Serialize)]
pub struct Report {
	pub platform: Platform,
	pub layout: Layout,
	pub phases: Vec<Options>,
}

/// Create `root` and its parents if they do not exist.
pub fn ensure_output_root(root: &Path) -> Result<()> {
	std::fs::create_dir_all(root).map_err(Error::io("failed to create the output root", root))?;
	#[cfg(feature = "tracing")]
	tracing::debug!(?root, "ensured the output root");
	Ok(())
}

impl Router {
	/// Create a router. The output root exists once this returns.
	pub fn new(config: Config) -> Result<Self> {
		let layout = Layout::new(&config)?;
		let platform = config.platform.unwrap_or_else(Platform::host);
		let builder: Box<dyn Builder> = match &config.builder {
			Some(builder) => Box::new(builder::Command::new(builder.clone())),
			None => Box::new(builder::OutOfBand),
		};
		let patcher = Box::new(PatchTool::new(
			config.patch_tool.clone(),
			config.patch_tool_args.clone(),
		));
		ensure_output_root(&layout.root)?;
		#[cfg(feature = "tracing")]
		tracing::info!(?layout, %platform, "created the router");
		Ok(Self {
			config,
			layout,
			platform,
			builder,
			patcher,
		})
	}

	#[must_use]
	pub fn with_builder(mut self, builder: impl Builder + 'static) -> Self {
		self.builder = Box::new(builder);
		self
	}

	#[must_use]
	pub fn with_patcher(mut self, patcher: impl Patcher + 'static) -> Self {
		self.patcher = Box::new(patcher);
		self
	}

	#[must_use]
	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	#[must_use]
	pub fn platform(&self) -> Platform {
		self.platform
	}

	/// The architecture shared libraries are validated against. Defaults to the host.
	#[must_use]
	pub fn machine(&self) -> Option<elf::Machine> {
		self.config.machine.or_else(elf::Machine::host)
	}

	pub fn ensure_output_root(&self) -> Result<()> {
		ensure_output_root(&self.layout.root)
	}

	/// Finalize the options of one phase.
	pub fn finalize(&self, phase: Phase) -> Result<Options> {
		crate::lifecycle::finalize(self, phase, &self.config.extension)
	}

	/// Finalize the options of every phase.
	pub fn report(&self) -> Result<Report> {
		let phases = Phase::ALL
			.into_iter()
			.map(|phase| self.finalize(phase))
			.collect::<Result<_>>()?;
		Ok(Report {
			platform: self.platform,
			layout: self.layout.clone(),
			phases,
		})
	}

	/// Run the extension build: finalize its options, run the external builder, then fix the loader paths on ELF platforms.
	pub fn build_extension(&self, target: Option<&str>) -> Result<BuildExtOptions> {
		let target = target.unwrap_or(&self.config.extension);
		let mut options = BuildExtOptions::default();
		self.configure_build_extension(target, &mut options)?;
		self.builder.build(target, &options)?;
		if self.platform.is_elf() {
			self.fix_loader_paths(&options.build_lib)?;
		} else {
			#[cfg(feature = "tracing")]
			tracing::info!(platform = %self.platform, "not an ELF platform, leaving loader paths unchanged");
		}
		Ok(options)
	}

	/// Run the extension build, then the packaging command if one is given.
	pub fn build(&self, target: Option<&str>, packaging: &[String]) -> Result<BuildExtOptions> {
		let options = self.build_extension(target)?;
		if !packaging.is_empty() {
			process::run_packaging(packaging)?;
		}
		Ok(options)
	}

	/// Set the loader search path of every shared library in `directory`. Returns the patched files.
	pub fn fix_loader_paths(&self, directory: &Path) -> Result<Vec<PathBuf>> {
		let libraries = loader::shared_libraries(directory, &self.config.shared_library_suffix)?;

		// Validate every library before touching any of them.
		if self.config.verify {
			let machine = self.machine().map(elf::Machine::e_machine);
			for library in &libraries {
				elf::validate_shared_library(library, machine)?;
			}
		}

		for library in &libraries {
			#[cfg(feature = "tracing")]
			tracing::info!(?library, search_path = %self.config.search_path, "fixing");
			self.patcher
				.set_search_path(library, &self.config.search_path)?;
		}
		Ok(libraries)
	}
}

impl Lifecycle for Router {
	fn configure_build_extension(&self, target: &str, options: &mut BuildExtOptions) -> Result<()> {
		#[cfg(feature = "tracing")]
		tracing::debug!(%target, "configuring the extension build");
		let _ = target;
		self.ensure_output_root()?;
		options.build_temp.clone_from(&self.layout.root);
		options.build_lib.clone_from(&self.layout.package);
		Ok(())
	}

	fn configure_binary_distribution(&self, options: &mut BdistOptions) -> Result<()> {
		self.ensure_output_root()?;
		options.dist_dir.clone_from(&self.layout.root);
		options.bdist_base.clone_from(&self.layout.staging);
		Ok(())
	}

	fn configure_source_distribution(&self, options: &mut SdistOptions) -> Result<()> {
		self.ensure_output_root()?;
		options.dist_dir.clone_from(&self.layout.root);
		Ok(())
	}

	fn configure_library_install(&self, options: &mut InstallLibOptions) -> Result<()> {
		self.ensure_output_root()?;
		options.build_dir.clone_from(&self.layout.staging);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::Router;
	use crate::{
		BdistOptions, Builder, BuildExtOptions, Config, Error, InstallLibOptions, Options, Phase,
		Platform, Result, SdistOptions,
		elf::{Machine, header_bytes},
		loader::Patcher,
	};
	use goblin::elf::header::{EM_AARCH64, EM_X86_64, ET_DYN};
	use std::{
		cell::RefCell,
		path::{Path, PathBuf},
		rc::Rc,
	};

	#[derive(Clone, Default)]
	struct Recorder {
		calls: Rc<RefCell<Vec<(PathBuf, String)>>>,
	}

	impl Patcher for Recorder {
		fn set_search_path(&self, path: &Path, search_path: &str) -> Result<()> {
			self.calls
				.borrow_mut()
				.push((path.to_owned(), search_path.to_owned()));
			Ok(())
		}
	}

	/// Writes the staging package the way an external build would.
	struct Staging(&'static [&'static str]);

	impl Builder for Staging {
		fn build(&self, _target: &str, options: &BuildExtOptions) -> Result<()> {
			std::fs::create_dir_all(&options.build_lib).unwrap();
			for name in self.0 {
				let contents = if name.ends_with(".so") {
					header_bytes(ET_DYN, crate::elf::host_machine().unwrap_or(0))
				} else {
					b"notes".to_vec()
				};
				std::fs::write(options.build_lib.join(name), contents).unwrap();
			}
			Ok(())
		}
	}

	fn config(root: &Path, platform: Platform) -> Config {
		Config {
			root: Some(root.to_owned()),
			extension: "pylcf2xml".to_owned(),
			package: "pylcf2xml".to_owned(),
			platform: Some(platform),
			..Config::default()
		}
	}

	#[test]
	fn finalizing_creates_the_output_root() {
		let directory = tempfile::tempdir().unwrap();
		let root = directory.path().join("tmp/out");
		assert!(!root.exists());
		let router = Router::new(config(&root, Platform::Linux)).unwrap();
		std::fs::remove_dir_all(&root).unwrap();
		router.finalize(Phase::Sdist).unwrap();
		assert!(root.is_dir());
	}

	#[test]
	fn ensure_output_root_is_idempotent() {
		let directory = tempfile::tempdir().unwrap();
		let root = directory.path().join("out");
		let router = Router::new(config(&root, Platform::Linux)).unwrap();
		std::fs::write(root.join("keep"), "x").unwrap();
		router.ensure_output_root().unwrap();
		router.ensure_output_root().unwrap();
		assert_eq!(std::fs::read_to_string(root.join("keep")).unwrap(), "x");
	}

	#[test]
	fn every_phase_is_routed_into_the_fixed_tree() {
		let directory = tempfile::tempdir().unwrap();
		let root = directory.path().join("out");
		let router = Router::new(config(&root, Platform::Darwin)).unwrap();
		let staging = root.join("pylcf2xml.wheel");
		let package = staging.join("pylcf2xml");

		let report = router.report().unwrap();
		assert_eq!(
			report.phases,
			[
				Options::BuildExt(BuildExtOptions {
					build_temp: root.clone(),
					build_lib: package.clone(),
				}),
				Options::Bdist(BdistOptions {
					dist_dir: root.clone(),
					bdist_base: staging.clone(),
				}),
				Options::Sdist(SdistOptions {
					dist_dir: root.clone(),
				}),
				Options::InstallLib(InstallLibOptions { build_dir: staging }),
			]
		);
	}

	#[test]
	fn build_extension_patches_only_shared_libraries() {
		let directory = tempfile::tempdir().unwrap();
		let root = directory.path().join("out");
		let recorder = Recorder::default();
		let router = Router::new(config(&root, Platform::Linux))
			.unwrap()
			.with_builder(Staging(&["b.so", "a.so", "c.txt"]))
			.with_patcher(recorder.clone());

		let options = router.build_extension(None).unwrap();
		assert_eq!(options.build_temp, root);
		let package = root.join("pylcf2xml.wheel/pylcf2xml");
		assert_eq!(options.build_lib, package);
		assert_eq!(
			*recorder.calls.borrow(),
			[
				(package.join("a.so"), "$ORIGIN".to_owned()),
				(package.join("b.so"), "$ORIGIN".to_owned()),
			]
		);
	}

	#[test]
	fn non_elf_platforms_are_never_patched() {
		let directory = tempfile::tempdir().unwrap();
		let recorder = Recorder::default();
		let router = Router::new(config(&directory.path().join("out"), Platform::Darwin))
			.unwrap()
			.with_builder(Staging(&["a.so", "b.so"]))
			.with_patcher(recorder.clone());
		router.build_extension(Some("pylcf2xml")).unwrap();
		assert!(recorder.calls.borrow().is_empty());
	}

	#[test]
	fn invalid_libraries_stop_patching_before_it_starts() {
		let directory = tempfile::tempdir().unwrap();
		let root = directory.path().join("out");
		let recorder = Recorder::default();
		let router = Router::new(config(&root, Platform::Linux))
			.unwrap()
			.with_patcher(recorder.clone());
		let package = router.layout().package.clone();
		std::fs::create_dir_all(&package).unwrap();
		let host = crate::elf::host_machine().unwrap_or(0);
		std::fs::write(package.join("a.so"), header_bytes(ET_DYN, host)).unwrap();
		std::fs::write(package.join("b.so"), "not a library").unwrap();

		let error = router.fix_loader_paths(&package).unwrap_err();
		assert!(matches!(error, Error::InvalidLibrary { .. }), "{error}");
		assert!(recorder.calls.borrow().is_empty());

		// A valid library sorted first is still left untouched.
		assert!(package.join("a.so").exists());

		// Without verification, every suffixed file is trusted.
		let mut trusting = config(&root, Platform::Linux);
		trusting.verify = false;
		let router = Router::new(trusting)
			.unwrap()
			.with_patcher(recorder.clone());
		assert_eq!(router.fix_loader_paths(&package).unwrap().len(), 2);
		assert_eq!(recorder.calls.borrow().len(), 2);
	}

	#[test]
	fn libraries_are_validated_against_the_configured_machine() {
		let directory = tempfile::tempdir().unwrap();
		let root = directory.path().join("out");
		let mut cross = config(&root, Platform::Linux);
		cross.machine = Some(Machine::Aarch64);
		let recorder = Recorder::default();
		let router = Router::new(cross).unwrap().with_patcher(recorder.clone());
		assert_eq!(router.machine(), Some(Machine::Aarch64));
		let package = router.layout().package.clone();
		std::fs::create_dir_all(&package).unwrap();
		std::fs::write(package.join("liblcf.so"), header_bytes(ET_DYN, EM_AARCH64)).unwrap();

		let patched = router.fix_loader_paths(&package).unwrap();
		assert_eq!(patched, [package.join("liblcf.so")]);
		assert_eq!(recorder.calls.borrow().len(), 1);

		// Libraries for another machine are still rejected.
		std::fs::write(package.join("liblcf.so"), header_bytes(ET_DYN, EM_X86_64)).unwrap();
		let error = router.fix_loader_paths(&package).unwrap_err();
		assert!(matches!(error, Error::InvalidLibrary { .. }), "{error}");
		assert_eq!(recorder.calls.borrow().len(), 1);
	}

	#[test]
	fn patch_tool_failure_stops_the_build_before_packaging() {
		let directory = tempfile::tempdir().unwrap();
		let root = directory.path().join("out");
		let script = directory.path().join("patchelf.sh");
		let log = directory.path().join("patched");
		std::fs::write(
			&script,
			format!(
				"case \"$3\" in\n*/a.so) exit 1 ;;\nesac\necho \"$3\" >> {}\n",
				log.display()
			),
		)
		.unwrap();
		let marker = directory.path().join("packaged");

		let mut config = config(&root, Platform::Linux);
		config.verify = false;
		config.patch_tool = "/bin/sh".into();
		config.patch_tool_args = vec![script.display().to_string()];
		let router = Router::new(config)
			.unwrap()
			.with_builder(Staging(&["a.so", "b.so"]));

		let packaging = ["touch".to_owned(), marker.display().to_string()];
		let error = router.build(None, &packaging).unwrap_err();
		assert!(matches!(error, Error::Status { .. }), "{error}");
		assert!(!marker.exists());
		assert!(!log.exists());
	}

	#[test]
	fn successful_builds_run_the_packaging_command() {
		let directory = tempfile::tempdir().unwrap();
		let marker = directory.path().join("packaged");
		let recorder = Recorder::default();
		let router = Router::new(config(&directory.path().join("out"), Platform::Linux))
			.unwrap()
			.with_builder(Staging(&["a.so"]))
			.with_patcher(recorder.clone());
		router
			.build(None, &["touch".to_owned(), marker.display().to_string()])
			.unwrap();
		assert!(marker.exists());
		assert_eq!(recorder.calls.borrow().len(), 1);
	}
}
