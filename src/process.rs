use crate::errors::{Error, Result};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command};

/// One launched subprocess. Polling never blocks: `Ok(None)` means still
/// running, `Ok(Some(code))` means the process exited with that code.
pub trait ProcessHandle {
	fn poll(&mut self) -> Result<Option<i32>>;
}

/// Capability interface over the platform's spawn/poll/exec primitives, so
/// the scheduler and the self-rebuild bootstrap never talk to the OS
/// directly. Commands are argument vectors with the program first.
pub trait ProcessLauncher {
	fn spawn(&mut self, command: &[String]) -> Result<Box<dyn ProcessHandle>>;

	/// Replaces the current process image. Never returns on success; the
	/// returned error is the failure to exec.
	fn replace_image(&mut self, command: &[String]) -> Error;
}

pub struct NativeLauncher;

struct NativeProcess {
	child: Child,
	program: PathBuf,
}

impl ProcessHandle for NativeProcess {
	fn poll(&mut self) -> Result<Option<i32>> {
		match self.child.try_wait() {
			// A signal-terminated child carries no exit code; report -1 like
			// a conventional abnormal exit.
			Ok(Some(status)) => Ok(Some(status.code().unwrap_or(-1))),
			Ok(None) => Ok(None),
			Err(err) => Err(Error::failed_to_execute(&self.program, err)),
		}
	}
}

impl ProcessLauncher for NativeLauncher {
	fn spawn(&mut self, command: &[String]) -> Result<Box<dyn ProcessHandle>> {
		let (program, args) = command.split_first().ok_or_else(Error::empty_command)?;
		let child = Command::new(program)
			.args(args)
			.spawn()
			.map_err(|err| Error::failed_to_execute(program, err))?;
		Ok(Box::new(NativeProcess {
			child,
			program: PathBuf::from(program),
		}))
	}

	fn replace_image(&mut self, command: &[String]) -> Error {
		let (program, args) = match command.split_first() {
			Some(split) => split,
			None => return Error::empty_command(),
		};
		let err = Command::new(program).args(args).exec();
		Error::failed_to_execute(program, err)
	}
}
