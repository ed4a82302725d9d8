use anstream::eprintln;
use build_router_std::{Router, error::print_error};
use clap::Parser as _;

mod args;

fn main() {
	// Setup tracing.
	build_router_std::tracing::setup("BUILD_ROUTER_TRACING");

	if let Err(error) = main_inner() {
		eprintln!("build router failed:");
		print_error(&error);
		std::process::exit(1);
	}
}

fn main_inner() -> build_router_std::Result<()> {
	let args = args::Args::parse();
	tracing::info!(?args, "parsed arguments");

	// Resolve the config.
	let directory = std::env::current_dir().map_err(build_router_std::Error::io(
		"failed to get the working directory",
		".".as_ref(),
	))?;
	let config = args.resolve_config(&directory, |name| std::env::var(name).ok())?;
	tracing::debug!(?config, "resolved the config");

	// Create the router. This creates the output root.
	let router = Router::new(config)?;

	match args.command {
		args::Command::EnsureRoot => {
			router.ensure_output_root()?;
		},
		args::Command::Finalize { phase } => {
			let options = router.finalize(phase)?;
			println!("{}", serde_json::to_string_pretty(&options)?);
		},
		args::Command::BuildExt { target } => {
			let options = router.build_extension(target.as_deref())?;
			println!("{}", serde_json::to_string_pretty(&options)?);
		},
		args::Command::FixLoaderPaths { directory } => {
			let directory = directory.unwrap_or_else(|| router.layout().package.clone());
			if router.platform().is_elf() {
				for library in router.fix_loader_paths(&directory)? {
					println!("{}", library.display());
				}
			} else {
				tracing::warn!(platform = %router.platform(), "not an ELF platform, nothing to fix");
			}
		},
		args::Command::Build { target, command } => {
			let options = router.build(target.as_deref(), &command)?;
			tracing::info!(?options, "build succeeded");
		},
		args::Command::Layout => {
			let report = router.report()?;
			println!("{}", serde_json::to_string_pretty(&report)?);
		},
	}

	Ok(())
}
