use crate::{Error, Result};
use goblin::elf::header;
use std::path::Path;

/// The architecture a shared library must be built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Machine {
	#[serde(rename = "x86_64", alias = "amd64")]
	Amd64,
	#[serde(alias = "arm64")]
	Aarch64,
	#[serde(alias = "i686")]
	X86,
	Arm,
	Riscv64,
}

impl Machine {
	pub const ALL: [Self; 5] = [Self::Amd64, Self::Aarch64, Self::X86, Self::Arm, Self::Riscv64];

	/// The machine of the host, if it is one the router knows about.
	#[must_use]
	pub fn host() -> Option<Self> {
		if cfg!(target_arch = "x86_64") {
			Some(Self::Amd64)
		} else if cfg!(target_arch = "aarch64") {
			Some(Self::Aarch64)
		} else if cfg!(target_arch = "x86") {
			Some(Self::X86)
		} else if cfg!(target_arch = "arm") {
			Some(Self::Arm)
		} else if cfg!(target_arch = "riscv64") {
			Some(Self::Riscv64)
		} else {
			None
		}
	}

	/// The `e_machine` value of the ELF header.
	#[must_use]
	pub fn e_machine(self) -> u16 {
		match self {
			Self::Amd64 => header::EM_X86_64,
			Self::Aarch64 => header::EM_AARCH64,
			Self::X86 => header::EM_386,
			Self::Arm => header::EM_ARM,
			Self::Riscv64 => header::EM_RISCV,
		}
	}

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Amd64 => "x86_64",
			Self::Aarch64 => "aarch64",
			Self::X86 => "x86",
			Self::Arm => "arm",
			Self::Riscv64 => "riscv64",
		}
	}
}

impl std::fmt::Display for Machine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Machine {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"amd64" => Ok(Self::Amd64),
			"arm64" => Ok(Self::Aarch64),
			"i686" => Ok(Self::X86),
			_ => Self::ALL
				.into_iter()
				.find(|machine| machine.as_str() == s)
				.ok_or_else(|| Error::Config(format!("unknown machine {s:?}"))),
		}
	}
}

/// The ELF machine of the host, if it is one the router knows about.
#[must_use]
pub fn host_machine() -> Option<u16> {
	Machine::host().map(Machine::e_machine)
}

/// Check that the file at `path` is an ELF shared object, built for `machine` if one is given.
pub fn validate_shared_library(path: &Path, machine: Option<u16>) -> Result<()> {
	let invalid = |reason: String| Error::InvalidLibrary {
		path: path.to_owned(),
		reason,
	};

	let bytes =
		std::fs::read(path).map_err(Error::io("failed to read the shared library", path))?;
	let object = goblin::Object::parse(&bytes)
		.map_err(|error| invalid(format!("failed to parse the file as an object: {error}")))?;
	let goblin::Object::Elf(elf) = object else {
		return Err(invalid("expected an ELF file".to_owned()));
	};

	// Only shared objects carry a loader search path the dynamic linker honors for their dependencies.
	if elf.header.e_type != header::ET_DYN {
		return Err(invalid(format!(
			"expected a shared object, found {}",
			header::et_to_str(elf.header.e_type)
		)));
	}

	if let Some(machine) = machine {
		if elf.header.e_machine != machine {
			return Err(invalid(format!(
				"built for {}, expected {}",
				header::machine_to_str(elf.header.e_machine),
				header::machine_to_str(machine)
			)));
		}
	}

	Ok(())
}

/// A bare little-endian 64-bit ELF header with no program or section headers.
#[cfg(test)]
pub(crate) fn header_bytes(e_type: u16, e_machine: u16) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(64);
	bytes.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
	bytes.extend_from_slice(&[0; 8]);
	bytes.extend_from_slice(&e_type.to_le_bytes());
	bytes.extend_from_slice(&e_machine.to_le_bytes());
	bytes.extend_from_slice(&1u32.to_le_bytes());
	// e_entry, e_phoff, e_shoff.
	bytes.extend_from_slice(&[0; 24]);
	// e_flags.
	bytes.extend_from_slice(&0u32.to_le_bytes());
	// e_ehsize, e_phentsize, e_phnum, e_shentsize, e_shnum, e_shstrndx.
	for value in [64u16, 56, 0, 64, 0, 0] {
		bytes.extend_from_slice(&value.to_le_bytes());
	}
	bytes
}

#[cfg(test)]
mod tests {
	use super::{Machine, header_bytes, validate_shared_library};
	use crate::Error;
	use goblin::elf::header::{EM_AARCH64, EM_X86_64, ET_DYN, ET_EXEC};

	#[test]
	fn accepts_shared_objects() {
		let directory = tempfile::tempdir().unwrap();
		let path = directory.path().join("liblcf.so");
		std::fs::write(&path, header_bytes(ET_DYN, EM_X86_64)).unwrap();
		validate_shared_library(&path, None).unwrap();
		validate_shared_library(&path, Some(EM_X86_64)).unwrap();
	}

	#[test]
	fn rejects_other_files() {
		let directory = tempfile::tempdir().unwrap();

		let text = directory.path().join("notes.so");
		std::fs::write(&text, "this is not a library\n").unwrap();
		let error = validate_shared_library(&text, None).unwrap_err();
		assert!(matches!(error, Error::InvalidLibrary { .. }), "{error}");

		let executable = directory.path().join("main.so");
		std::fs::write(&executable, header_bytes(ET_EXEC, EM_X86_64)).unwrap();
		assert!(validate_shared_library(&executable, None).is_err());

		let foreign = directory.path().join("foreign.so");
		std::fs::write(&foreign, header_bytes(ET_DYN, EM_AARCH64)).unwrap();
		let error = validate_shared_library(&foreign, Some(EM_X86_64)).unwrap_err();
		assert!(error.to_string().contains("expected"), "{error}");

		let missing = directory.path().join("missing.so");
		assert!(matches!(
			validate_shared_library(&missing, None),
			Err(Error::Io { .. })
		));
	}

	#[test]
	fn machine_names() {
		for machine in Machine::ALL {
			assert_eq!(machine.as_str().parse::<Machine>().unwrap(), machine);
			let json = serde_json::to_string(&machine).unwrap();
			assert_eq!(serde_json::from_str::<Machine>(&json).unwrap(), machine);
		}
		assert_eq!("arm64".parse::<Machine>().unwrap(), Machine::Aarch64);
		assert_eq!(
			serde_json::from_str::<Machine>(r#""amd64""#).unwrap(),
			Machine::Amd64
		);
		assert!("sparc".parse::<Machine>().is_err());
	}
}
