use crate::{Error, Result};

/// The operating system a build targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
	Linux,
	FreeBsd,
	#[serde(alias = "macos")]
	Darwin,
	Windows,
	Other,
}

impl Platform {
	/// Get the platform of the current host.
	#[must_use]
	pub fn host() -> Self {
		#[cfg(target_os = "linux")]
		{
			Self::Linux
		}
		#[cfg(target_os = "freebsd")]
		{
			Self::FreeBsd
		}
		#[cfg(target_os = "macos")]
		{
			Self::Darwin
		}
		#[cfg(target_os = "windows")]
		{
			Self::Windows
		}
		#[cfg(not(any(
			target_os = "linux",
			target_os = "freebsd",
			target_os = "macos",
			target_os = "windows"
		)))]
		{
			Self::Other
		}
	}

	/// Whether shared libraries on this platform are ELF objects whose loader search path can be rewritten.
	#[must_use]
	pub fn is_elf(self) -> bool {
		matches!(self, Self::Linux | Self::FreeBsd)
	}

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Linux => "linux",
			Self::FreeBsd => "freebsd",
			Self::Darwin => "darwin",
			Self::Windows => "windows",
			Self::Other => "other",
		}
	}
}

impl std::fmt::Display for Platform {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Platform {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"linux" => Ok(Self::Linux),
			"freebsd" => Ok(Self::FreeBsd),
			"darwin" | "macos" => Ok(Self::Darwin),
			"windows" => Ok(Self::Windows),
			"other" => Ok(Self::Other),
			_ => Err(Error::Config(format!("unknown platform {s:?}"))),
		}
	}
}
