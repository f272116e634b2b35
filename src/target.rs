use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetKind {
	Executable,
	StaticLibrary,
}

/// A user-declared build unit. Targets are plain descriptions owned by the
/// build script; all build state lives in the session.
#[derive(Debug)]
pub struct Target {
	pub name: String,
	pub kind: TargetKind,
	pub sources: Vec<PathBuf>,
	pub compile_flags: Vec<String>,
}

impl Target {
	pub fn executable(name: impl Into<String>) -> Self {
		Target::new(name, TargetKind::Executable)
	}

	pub fn static_library(name: impl Into<String>) -> Self {
		Target::new(name, TargetKind::StaticLibrary)
	}

	fn new(name: impl Into<String>, kind: TargetKind) -> Self {
		Target {
			name: name.into(),
			kind,
			sources: Vec::new(),
			compile_flags: Vec::new(),
		}
	}

	pub fn add_source(&mut self, source: impl Into<PathBuf>) -> Result<()> {
		let source = source.into();
		if !source.exists() {
			return Err(Error::missing_source(source));
		}
		self.sources.push(source);
		Ok(())
	}

	pub fn add_sources<I>(&mut self, sources: I) -> Result<()>
	where
		I: IntoIterator,
		I::Item: Into<PathBuf>,
	{
		for source in sources {
			self.add_source(source)?;
		}
		Ok(())
	}

	pub fn add_compile_flag(&mut self, flag: impl Into<String>) {
		self.compile_flags.push(flag.into());
	}

	pub fn add_compile_flags<I>(&mut self, flags: I)
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		for flag in flags {
			self.add_compile_flag(flag);
		}
	}

	pub fn add_include_directories<I>(&mut self, directories: I)
	where
		I: IntoIterator,
		I::Item: AsRef<Path>,
	{
		for directory in directories {
			self.compile_flags
				.push(format!("-I{}", directory.as_ref().display()));
		}
	}

	/// Flags flattened to the exact string compared and stored by the cache.
	/// Ordering matters: the same flags in a different order count as a
	/// change.
	pub(crate) fn flattened_flags(&self) -> String {
		self.compile_flags.join(" ")
	}
}
