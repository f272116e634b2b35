use crate::bootstrap;
use crate::console;
use crate::errors::{Error, ErrorKind, Result};
use crate::jobs::TargetBuildState;
use crate::plan::{self, PlanContext};
use crate::process::{NativeLauncher, ProcessLauncher};
use crate::scheduler::{self, RunOptions};
use crate::target::Target;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use structopt::StructOpt;

pub const DEFAULT_BUILD_DIRECTORY: &str = "./build_dir";
pub const DEFAULT_COMPILER: &str = "g++";
pub const DEFAULT_LINKER: &str = "g++";

#[derive(Clone, Debug)]
pub struct Toolchain {
	pub compiler: String,
	pub linker: String,
}

impl Default for Toolchain {
	fn default() -> Self {
		Toolchain {
			compiler: DEFAULT_COMPILER.to_string(),
			linker: DEFAULT_LINKER.to_string(),
		}
	}
}

#[derive(Debug, StructOpt)]
#[structopt(name = "build", about = "Incremental build orchestrator.")]
struct Args {
	/// Removes the build directory instead of building.
	#[structopt(short = "c", long)]
	clean: bool,

	/// Maximum number of parallel jobs.
	#[structopt(short = "m", long = "jobs")]
	jobs: Option<usize>,
}

/// One build invocation's worth of context: directories, toolchain,
/// parallelism and the per-target build-state table. Everything the engine
/// touches lives here, so sessions can run in isolation.
pub struct BuildSession {
	project_directory: PathBuf,
	build_directory: PathBuf,
	parallel_jobs: usize,
	clean_mode: bool,
	toolchain: Toolchain,
	states: Vec<TargetBuildState>,
	launcher: Box<dyn ProcessLauncher>,
}

fn default_parallel_jobs() -> usize {
	thread::available_parallelism()
		.map(|parallelism| parallelism.get())
		.unwrap_or(1)
}

impl BuildSession {
	pub fn new() -> Self {
		BuildSession::with_launcher(Box::new(NativeLauncher))
	}

	pub fn with_launcher(launcher: Box<dyn ProcessLauncher>) -> Self {
		BuildSession {
			project_directory: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
			build_directory: PathBuf::from(DEFAULT_BUILD_DIRECTORY),
			parallel_jobs: default_parallel_jobs(),
			clean_mode: false,
			toolchain: Toolchain::default(),
			states: Vec::new(),
			launcher,
		}
	}

	/// Applies `--clean` and `--jobs` from the process arguments. Unknown
	/// flags and unparsable values are argument errors; `--help` prints usage
	/// and exits 0.
	pub fn parse_command_line(&mut self) {
		self.apply_args(Args::from_args());
	}

	fn apply_args(&mut self, args: Args) {
		if args.clean {
			self.clean_mode = true;
		}
		if let Some(jobs) = args.jobs {
			if jobs == 0 {
				console::error("--jobs requires a positive value.");
				process::exit(1);
			}
			self.parallel_jobs = jobs;
		}
	}

	pub fn set_project_directory(&mut self, directory: impl Into<PathBuf>) {
		self.project_directory = directory.into();
	}

	pub fn project_directory(&self) -> &Path {
		&self.project_directory
	}

	pub fn set_build_directory(&mut self, directory: impl Into<PathBuf>) {
		self.build_directory = directory.into();
	}

	pub fn set_compiler(&mut self, compiler: impl Into<String>) {
		self.toolchain.compiler = compiler.into();
	}

	pub fn set_linker(&mut self, linker: impl Into<String>) {
		self.toolchain.linker = linker.into();
	}

	pub fn set_parallel_jobs(&mut self, jobs: usize) {
		self.parallel_jobs = jobs.max(1);
	}

	/// Builds (or, in clean mode, removes the build directory for) one
	/// target. Any failure is reported and terminates the program: a failing
	/// subprocess propagates its exit code, every other error exits 1.
	pub fn build_target(&mut self, target: &Target) {
		if self.clean_mode {
			if let Err(error) = self.remove_build_directory() {
				fail(error);
			}
			return;
		}

		if let Err(error) = self.execute_target(target, true) {
			fail(error);
		}
	}

	/// Link dependencies between targets are an extension point; nothing is
	/// propagated yet.
	// TODO: mark depending targets for relinking when a linked library is
	// rebuilt, and pass library artifacts to the link command.
	pub fn link_libraries(&mut self, _target: &Target, _libraries: &[&Target]) {}

	/// Rebuilds and restarts the running build script when its own source
	/// changed. Must be called from the script itself: the calling file is
	/// the one watched for changes. On a rebuild the process image is
	/// replaced and this never returns.
	#[track_caller]
	pub fn enable_self_rebuild(&mut self) {
		let script = PathBuf::from(::std::panic::Location::caller().file());
		if let Err(error) = bootstrap::ensure_self_up_to_date(self, &script) {
			fail(error);
		}
	}

	fn remove_build_directory(&self) -> Result<()> {
		if !self.build_directory.exists() {
			return Ok(());
		}
		fs::remove_dir_all(&self.build_directory)
			.map_err(|err| Error::failed_to_remove_directory(&self.build_directory, err))
	}

	pub(crate) fn execute_target(&mut self, target: &Target, use_build_dir: bool) -> Result<()> {
		let index = self.prepare_target(target, use_build_dir)?;
		self.run_target(index)
	}

	/// Plans compile and link jobs for the target, creating or reusing its
	/// build state. Returns the state's index in the session table.
	pub(crate) fn prepare_target(&mut self, target: &Target, use_build_dir: bool) -> Result<usize> {
		let index = self.state_index(&target.name);
		let BuildSession {
			states,
			project_directory,
			build_directory,
			..
		} = self;
		let context = PlanContext {
			project_directory,
			build_directory,
			use_build_dir,
		};
		let state = &mut states[index];
		plan::prepare_compilation(&context, target, state)?;
		plan::prepare_linking(&context, target, state)?;
		Ok(index)
	}

	pub(crate) fn run_target(&mut self, index: usize) -> Result<()> {
		let BuildSession {
			states,
			toolchain,
			parallel_jobs,
			launcher,
			..
		} = self;
		let options = RunOptions {
			toolchain,
			parallel_jobs: *parallel_jobs,
		};
		scheduler::run(&options, &mut states[index], launcher.as_mut())
	}

	pub(crate) fn state(&self, index: usize) -> &TargetBuildState {
		&self.states[index]
	}

	pub(crate) fn replace_image(&mut self, command: &[String]) -> Error {
		self.launcher.replace_image(command)
	}

	fn state_index(&mut self, name: &str) -> usize {
		if let Some(index) = self
			.states
			.iter()
			.position(|state| state.target_name == name)
		{
			return index;
		}
		self.states.push(TargetBuildState::new(name));
		self.states.len() - 1
	}
}

impl Default for BuildSession {
	fn default() -> Self {
		BuildSession::new()
	}
}

fn fail(error: Error) -> ! {
	// The scheduler already printed the red failure line for a failing job.
	if !matches!(error.kind, ErrorKind::CommandFailed(_)) {
		console::error(&error.to_string());
	}
	process::exit(error.exit_code());
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::process::testing::{FakeLauncher, LaunchLog};
	use std::cell::RefCell;
	use std::rc::Rc;
	use std::time::Duration;

	fn session_with_log(project: &Path) -> (BuildSession, Rc<RefCell<LaunchLog>>) {
		let log = Rc::new(RefCell::new(LaunchLog::default()));
		let launcher = FakeLauncher::new(Rc::clone(&log));
		let mut session = BuildSession::with_launcher(Box::new(launcher));
		session.set_project_directory(project);
		session.set_build_directory(project.join("build_dir"));
		session.set_parallel_jobs(2);
		(session, log)
	}

	fn write_source(project: &Path, name: &str) -> PathBuf {
		let path = project.join(name);
		fs::write(&path, format!("// {}\nint x;\n", name)).unwrap();
		path
	}

	fn demo_target(project: &Path) -> Target {
		let mut target = Target::executable("demo");
		for name in &["a.cpp", "b.cpp", "c.cpp"] {
			target.add_source(project.join(name)).unwrap();
		}
		target
	}

	#[test]
	fn test_fresh_then_incremental_then_touched_scenario() {
		let project = tempfile::tempdir().unwrap();
		for name in &["a.cpp", "b.cpp", "c.cpp"] {
			write_source(project.path(), name);
		}

		// First run: three compiles plus one link.
		let (mut session, log) = session_with_log(project.path());
		let target = demo_target(project.path());
		session.execute_target(&target, true).unwrap();
		assert_eq!(log.borrow().commands.len(), 4);
		assert!(log.borrow().max_in_flight <= 2);

		// Second run in a fresh session: everything is up to date.
		let (mut session, log) = session_with_log(project.path());
		let target = demo_target(project.path());
		session.execute_target(&target, true).unwrap();
		assert_eq!(log.borrow().commands.len(), 0);

		// Touch one source; exactly that compile plus the link rerun.
		std::thread::sleep(Duration::from_millis(20));
		write_source(project.path(), "b.cpp");
		let (mut session, log) = session_with_log(project.path());
		let target = demo_target(project.path());
		session.execute_target(&target, true).unwrap();

		let log = log.borrow();
		assert_eq!(log.commands.len(), 2);
		assert!(log.commands[0].last().unwrap().ends_with("b.cpp"));
		assert!(!log.commands[1].contains(&"-c".to_string()));
	}

	#[test]
	fn test_build_state_is_reused_by_target_name() {
		let project = tempfile::tempdir().unwrap();
		write_source(project.path(), "a.cpp");

		let (mut session, _log) = session_with_log(project.path());
		let mut target = Target::executable("demo");
		target.add_source(project.path().join("a.cpp")).unwrap();

		let first = session.prepare_target(&target, true).unwrap();
		let second = session.prepare_target(&Target::executable("demo"), true).unwrap();
		let other = session.prepare_target(&Target::executable("tests"), true).unwrap();

		assert_eq!(first, second);
		assert_ne!(first, other);
		assert_eq!(session.state(first).target_name, "demo");
	}

	#[test]
	fn test_jobs_flag_overrides_parallelism() {
		let project = tempfile::tempdir().unwrap();
		let (mut session, _log) = session_with_log(project.path());
		session.apply_args(Args {
			clean: false,
			jobs: Some(7),
		});
		assert_eq!(session.parallel_jobs, 7);

		session.apply_args(Args {
			clean: true,
			jobs: None,
		});
		assert!(session.clean_mode);
		assert_eq!(session.parallel_jobs, 7);
	}

	#[test]
	fn test_clean_mode_removes_the_build_directory() {
		let project = tempfile::tempdir().unwrap();
		write_source(project.path(), "a.cpp");

		let (mut session, log) = session_with_log(project.path());
		let mut target = Target::executable("demo");
		target.add_source(project.path().join("a.cpp")).unwrap();
		session.execute_target(&target, true).unwrap();
		assert!(project.path().join("build_dir").exists());

		let spawned_before_clean = log.borrow().commands.len();

		let (mut session, clean_log) = session_with_log(project.path());
		session.clean_mode = true;
		let mut target = Target::executable("demo");
		target.add_source(project.path().join("a.cpp")).unwrap();
		session.build_target(&target);

		assert!(!project.path().join("build_dir").exists());
		assert_eq!(spawned_before_clean, 2);
		// Cleaning spawns nothing.
		assert!(clean_log.borrow().commands.is_empty());
	}

	#[test]
	fn test_set_parallel_jobs_clamps_zero() {
		let project = tempfile::tempdir().unwrap();
		let (mut session, _log) = session_with_log(project.path());
		session.set_parallel_jobs(0);
		assert_eq!(session.parallel_jobs, 1);
	}
}
