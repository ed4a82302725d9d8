pub mod builder;
pub mod config;
pub mod elf;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod platform;
mod process;
pub mod router;

#[cfg(feature = "tracing")]
pub mod tracing;

pub use builder::Builder;
pub use config::{BuilderConfig, Config, Layout};
pub use elf::Machine;
pub use error::{Error, Result};
pub use lifecycle::{
	BdistOptions, BuildExtOptions, InstallLibOptions, Lifecycle, Options, Passthrough, Phase,
	SdistOptions,
};
pub use loader::{PatchTool, Patcher};
pub use platform::Platform;
pub use process::run_packaging;
pub use router::{Report, Router, ensure_output_root};
