use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ErrorKind {
	CommandFailed(i32),
	EmptyCommand,
	FailedToCanonicalize(PathBuf),
	FailedToCreateDirectory(PathBuf),
	FailedToExecute(PathBuf),
	FailedToRead(PathBuf),
	FailedToRemoveDirectory(PathBuf),
	FailedToRemoveFile(PathBuf),
	FailedToWrite(PathBuf),
	MalformedRecord(PathBuf),
	Message(String),
	MissingSource(PathBuf),
	PathHasInvalidFileName(PathBuf),
	SourceOutsideProject(PathBuf),
}

#[derive(Debug)]
pub struct Error {
	pub kind: ErrorKind,
	source: Option<Box<dyn StdError + Sync + Send>>,
}

impl Error {
	pub fn command_failed(exit_code: i32) -> Self {
		Error {
			kind: ErrorKind::CommandFailed(exit_code),
			source: None,
		}
	}

	pub fn empty_command() -> Self {
		Error {
			kind: ErrorKind::EmptyCommand,
			source: None,
		}
	}

	pub fn failed_to_canonicalize(path: impl Into<PathBuf>, source: ::std::io::Error) -> Self {
		Error {
			kind: ErrorKind::FailedToCanonicalize(path.into()),
			source: Some(source.into()),
		}
	}

	pub fn failed_to_create_directory(path: impl Into<PathBuf>, source: ::std::io::Error) -> Self {
		Error {
			kind: ErrorKind::FailedToCreateDirectory(path.into()),
			source: Some(source.into()),
		}
	}

	pub fn failed_to_execute(path: impl Into<PathBuf>, source: ::std::io::Error) -> Self {
		Error {
			kind: ErrorKind::FailedToExecute(path.into()),
			source: Some(source.into()),
		}
	}

	pub fn failed_to_read(path: impl Into<PathBuf>, source: ::std::io::Error) -> Self {
		Error {
			kind: ErrorKind::FailedToRead(path.into()),
			source: Some(source.into()),
		}
	}

	pub fn failed_to_remove_directory(path: impl Into<PathBuf>, source: ::std::io::Error) -> Self {
		Error {
			kind: ErrorKind::FailedToRemoveDirectory(path.into()),
			source: Some(source.into()),
		}
	}

	pub fn failed_to_remove_file(path: impl Into<PathBuf>, source: ::std::io::Error) -> Self {
		Error {
			kind: ErrorKind::FailedToRemoveFile(path.into()),
			source: Some(source.into()),
		}
	}

	pub fn failed_to_write(path: impl Into<PathBuf>, source: ::std::io::Error) -> Self {
		Error {
			kind: ErrorKind::FailedToWrite(path.into()),
			source: Some(source.into()),
		}
	}

	pub fn malformed_record(path: impl Into<PathBuf>) -> Self {
		Error {
			kind: ErrorKind::MalformedRecord(path.into()),
			source: None,
		}
	}

	pub fn message(text: impl ToString) -> Self {
		Error {
			kind: ErrorKind::Message(text.to_string()),
			source: None,
		}
	}

	pub fn missing_source(path: impl Into<PathBuf>) -> Self {
		Error {
			kind: ErrorKind::MissingSource(path.into()),
			source: None,
		}
	}

	pub fn path_has_invalid_file_name(path: impl Into<PathBuf>) -> Self {
		Error {
			kind: ErrorKind::PathHasInvalidFileName(path.into()),
			source: None,
		}
	}

	pub fn source_outside_project(path: impl Into<PathBuf>) -> Self {
		Error {
			kind: ErrorKind::SourceOutsideProject(path.into()),
			source: None,
		}
	}

	/// Exit code the program terminates with when this error aborts a build:
	/// a failing subprocess propagates its own code, everything else is an
	/// ordinary fatal error.
	pub fn exit_code(&self) -> i32 {
		match self.kind {
			ErrorKind::CommandFailed(exit_code) => exit_code,
			_ => 1,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.kind {
			ErrorKind::CommandFailed(exit_code) => {
				write!(f, "Command failed with code {}.", exit_code)
			}
			ErrorKind::EmptyCommand => write!(f, "Cannot launch an empty command."),
			ErrorKind::FailedToCanonicalize(path) => {
				write!(f, "Failed to resolve path '{}'.", path.to_string_lossy())
			}
			ErrorKind::FailedToCreateDirectory(path) => write!(
				f,
				"Failed to create directory '{}'.",
				path.to_string_lossy(),
			),
			ErrorKind::FailedToExecute(path) => {
				write!(f, "Failed to execute '{}'.", path.to_string_lossy())
			}
			ErrorKind::FailedToRead(path) => {
				write!(f, "Failed to read '{}'.", path.to_string_lossy())
			}
			ErrorKind::FailedToRemoveDirectory(path) => write!(
				f,
				"Failed to remove directory '{}'.",
				path.to_string_lossy(),
			),
			ErrorKind::FailedToRemoveFile(path) => {
				write!(f, "Failed to remove '{}'.", path.to_string_lossy())
			}
			ErrorKind::FailedToWrite(path) => {
				write!(f, "Failed to write '{}'.", path.to_string_lossy())
			}
			ErrorKind::MalformedRecord(path) => {
				write!(f, "Malformed build record '{}'.", path.to_string_lossy())
			}
			ErrorKind::Message(message) => write!(f, "{}", message),
			ErrorKind::MissingSource(path) => write!(
				f,
				"Source file '{}' does not exist.",
				path.to_string_lossy(),
			),
			ErrorKind::PathHasInvalidFileName(path) => {
				write!(f, "Path '{}' has invalid filename.", path.to_string_lossy())
			}
			ErrorKind::SourceOutsideProject(path) => write!(
				f,
				"Source file '{}' is outside the project directory.",
				path.to_string_lossy(),
			),
		}
	}
}

impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source
			.as_ref()
			.map(|c| &**c as &(dyn StdError + 'static))
	}
}

impl From<&str> for Error {
	fn from(text: &str) -> Self {
		Self::message(text)
	}
}

impl From<String> for Error {
	fn from(text: String) -> Self {
		Self::message(text)
	}
}

pub type Result<T> = ::std::result::Result<T, Error>;
