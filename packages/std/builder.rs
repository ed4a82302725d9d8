use crate::{BuildExtOptions, BuilderConfig, Result, process};

/// The external native build system. It compiles `target` and places its outputs in the directories of `options`.
pub trait Builder {
	fn build(&self, target: &str, options: &BuildExtOptions) -> Result<()>;
}

/// Compilation happens out of band, before the router runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutOfBand;

impl Builder for OutOfBand {
	fn build(&self, target: &str, options: &BuildExtOptions) -> Result<()> {
		#[cfg(feature = "tracing")]
		tracing::info!(%target, ?options, "no builder configured, expecting outputs from an out of band build");
		let _ = (target, options);
		Ok(())
	}
}

/// Run a configured command, such as `cmake --build`, with the build directories in its environment.
#[derive(Clone, Debug)]
pub struct Command {
	config: BuilderConfig,
}

impl Command {
	#[must_use]
	pub fn new(config: BuilderConfig) -> Self {
		Self { config }
	}
}

impl Builder for Command {
	fn build(&self, target: &str, options: &BuildExtOptions) -> Result<()> {
		#[cfg(feature = "tracing")]
		tracing::info!(program = ?self.config.program, %target, "running the builder");

		let mut command = std::process::Command::new(&self.config.program);
		command
			.args(&self.config.args)
			.envs(&self.config.env)
			.env("BUILD_ROUTER_TARGET", target)
			.env("BUILD_ROUTER_BUILD_TEMP", &options.build_temp)
			.env("BUILD_ROUTER_BUILD_LIB", &options.build_lib);
		process::run(&self.config.program, command)?;

		#[cfg(feature = "tracing")]
		tracing::info!(%target, "builder succeeded");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::{Builder as _, Command};
	use crate::{BuildExtOptions, BuilderConfig, Error};

	#[test]
	fn builder_sees_the_build_directories() {
		let directory = tempfile::tempdir().unwrap();
		let log = directory.path().join("log");
		let script = directory.path().join("build.sh");
		std::fs::write(
			&script,
			"printf '%s %s %s %s' \"$BUILD_ROUTER_TARGET\" \"$BUILD_ROUTER_BUILD_TEMP\" \"$BUILD_ROUTER_BUILD_LIB\" \"$EXTRA\" > \"$1\"\n",
		)
		.unwrap();
		let builder = Command::new(BuilderConfig {
			program: "/bin/sh".into(),
			args: vec![
				script.display().to_string(),
				log.display().to_string(),
			],
			env: [("EXTRA".to_owned(), "yes".to_owned())].into(),
		});
		let options = BuildExtOptions {
			build_temp: "/out".into(),
			build_lib: "/out/ext.wheel/pkg".into(),
		};
		builder.build("pylcf2xml", &options).unwrap();
		assert_eq!(
			std::fs::read_to_string(&log).unwrap(),
			"pylcf2xml /out /out/ext.wheel/pkg yes"
		);
	}

	#[test]
	fn builder_failure_is_fatal() {
		let builder = Command::new(BuilderConfig {
			program: "/bin/sh".into(),
			args: vec!["-c".to_owned(), "exit 3".to_owned()],
			env: std::collections::BTreeMap::new(),
		});
		let error = builder
			.build("pylcf2xml", &BuildExtOptions::default())
			.unwrap_err();
		let Error::Status { status, .. } = error else {
			panic!("expected a status error, got {error:?}");
		};
		assert_eq!(status.code(), Some(3));
	}
}
