use crate::console;
use crate::errors::{Error, Result};
use crate::paths::{self, OBJECT_SUFFIX};
use crate::session::BuildSession;
use crate::target::Target;
use std::fs;
use std::path::Path;

/// Standard-conformance flag the build script itself is compiled with.
const SCRIPT_STANDARD_FLAG: &str = "--std=c++23";

/// Runs the build script's own source through the ordinary
/// cache/compile/link pipeline, in place. When the script is unchanged this
/// returns and the caller continues; when it was rebuilt, the intermediate
/// object is removed and the process image is replaced with the fresh
/// binary. The restarted process receives no command-line arguments.
pub fn ensure_self_up_to_date(session: &mut BuildSession, script: &Path) -> Result<()> {
	let canonical_script = script
		.canonicalize()
		.map_err(|err| Error::failed_to_canonicalize(script, err))?;
	console::notice(&format!(
		"Self rebuild active. File {} will be checked for changes every time the build runs.",
		canonical_script.display(),
	));

	let name = script
		.file_stem()
		.ok_or_else(|| Error::path_has_invalid_file_name(script))?
		.to_string_lossy()
		.into_owned();

	let mut script_target = Target::executable(name);
	script_target.add_source(script)?;
	script_target.add_compile_flag(SCRIPT_STANDARD_FLAG);

	let index = session.prepare_target(&script_target, false)?;
	if !session.state(index).needs_linking {
		console::success("Build script has not changed. No need to rebuild.");
		return Ok(());
	}

	session.run_target(index)?;
	clean_script_artifacts(&script_target)?;

	let binary = match session.state(index).link_job.as_ref() {
		Some(link_job) => link_job.params.target_file.clone(),
		None => return Err(Error::message("Self rebuild produced no binary.")),
	};
	console::notice(&format!("Restarting with new binary: {}", binary.display()));
	Err(session.replace_image(&[binary.display().to_string()]))
}

/// Removes the in-place object files left over from a self rebuild; the
/// linked binary and the sidecar records stay.
fn clean_script_artifacts(target: &Target) -> Result<()> {
	for source in &target.sources {
		let object_file = paths::append_suffix(source.clone(), OBJECT_SUFFIX);
		if object_file.exists() {
			fs::remove_file(&object_file)
				.map_err(|err| Error::failed_to_remove_file(object_file.clone(), err))?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::process::testing::{FakeLauncher, LaunchLog};
	use std::cell::RefCell;
	use std::rc::Rc;

	fn script_session(project: &Path) -> (BuildSession, Rc<RefCell<LaunchLog>>) {
		let log = Rc::new(RefCell::new(LaunchLog::default()));
		let launcher = FakeLauncher::new(Rc::clone(&log));
		let mut session = BuildSession::with_launcher(Box::new(launcher));
		session.set_project_directory(project);
		session.set_build_directory(project.join("build_dir"));
		(session, log)
	}

	#[test]
	fn test_changed_script_is_rebuilt_and_restart_is_requested() {
		let project = tempfile::tempdir().unwrap();
		let script = project.path().join("build.cpp");
		fs::write(&script, "int main() { return 0; }\n").unwrap();

		let (mut session, log) = script_session(project.path());
		// The fake launcher cannot replace the process image, so the restart
		// request surfaces as the final error.
		let error = ensure_self_up_to_date(&mut session, &script).unwrap_err();
		assert_eq!(error.exit_code(), 1);

		let log = log.borrow();
		// One compile, one link, then the exec request for the new binary.
		assert_eq!(log.commands.len(), 2);
		assert_eq!(log.replace_requests.len(), 1);
		assert!(log.replace_requests[0][0].ends_with("build"));
		assert_eq!(log.replace_requests[0].len(), 1);
	}

	#[test]
	fn test_unchanged_script_is_left_alone() {
		let project = tempfile::tempdir().unwrap();
		let script = project.path().join("build.cpp");
		fs::write(&script, "int main() { return 0; }\n").unwrap();

		// First pass writes the sidecar record via the fake build.
		let (mut session, _log) = script_session(project.path());
		ensure_self_up_to_date(&mut session, &script).unwrap_err();

		// A fresh session (a fresh process, after the restart) sees the
		// script as up to date and spawns nothing.
		let (mut session, log) = script_session(project.path());
		ensure_self_up_to_date(&mut session, &script).unwrap();
		assert!(log.borrow().commands.is_empty());
		assert!(log.borrow().replace_requests.is_empty());
	}

	#[test]
	fn test_object_artifact_is_cleaned_after_rebuild() {
		let project = tempfile::tempdir().unwrap();
		let script = project.path().join("build.cpp");
		fs::write(&script, "int main() { return 0; }\n").unwrap();
		// A stray object from an earlier compile.
		let object = paths::append_suffix(script.clone(), OBJECT_SUFFIX);
		fs::write(&object, "stale").unwrap();

		let (mut session, _log) = script_session(project.path());
		ensure_self_up_to_date(&mut session, &script).unwrap_err();
		assert!(!object.exists());
	}
}
