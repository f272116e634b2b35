use crate::cache::{self, BuildRecord};
use crate::errors::{Error, Result};
use crate::jobs::{CompileJob, LinkJob, LinkParameters, TargetBuildState};
use crate::paths::{self, OBJECT_SUFFIX};
use crate::target::Target;
use std::fs;
use std::path::{Path, PathBuf};

pub struct PlanContext<'a> {
	pub project_directory: &'a Path,
	pub build_directory: &'a Path,
	/// Normal builds mirror sources under the build directory; the
	/// self-rebuild compiles in place, next to the script.
	pub use_build_dir: bool,
}

fn create_directory_if_missing(directory: &Path) -> Result<()> {
	fs::create_dir_all(directory)
		.map_err(|err| Error::failed_to_create_directory(directory, err))
}

/// Normalizes a source path to its project-root-relative spelling, the
/// canonical cache key and object-path suffix. Relative paths are taken as
/// already project-relative.
fn relative_source_path(context: &PlanContext, source: &Path) -> Result<PathBuf> {
	if !source.is_absolute() {
		return Ok(source.to_path_buf());
	}
	source
		.strip_prefix(context.project_directory)
		.map(Path::to_path_buf)
		.map_err(|_| Error::source_outside_project(source))
}

/// Derived object path for one source: mirrored under the build directory in
/// normal mode, beside the source in in-place mode.
pub fn object_file_path(context: &PlanContext, source: &Path) -> Result<PathBuf> {
	if !context.use_build_dir {
		return Ok(paths::append_suffix(source.to_path_buf(), OBJECT_SUFFIX));
	}

	let relative = relative_source_path(context, source)?;
	let build_directory = context
		.build_directory
		.canonicalize()
		.map_err(|err| Error::failed_to_canonicalize(context.build_directory, err))?;
	Ok(paths::append_suffix(
		build_directory.join(relative),
		OBJECT_SUFFIX,
	))
}

/// Adds a compile job for every source whose cached record no longer matches.
/// The object directory tree is created before the record lookup because the
/// sidecar file lives beside the object.
pub fn prepare_compilation(
	context: &PlanContext,
	target: &Target,
	state: &mut TargetBuildState,
) -> Result<()> {
	if context.use_build_dir {
		create_directory_if_missing(context.build_directory)?;
	}

	let flags = target.flattened_flags();

	for source in &target.sources {
		let relative = relative_source_path(context, source)?;
		let object_file = object_file_path(context, source)?;

		if context.use_build_dir {
			if let Some(parent) = object_file.parent() {
				create_directory_if_missing(parent)?;
			}
		}

		let record = BuildRecord {
			source_file: relative,
			object_file,
			compile_flags: flags.clone(),
			source_timestamp: cache::source_timestamp(source),
		};

		if cache::is_up_to_date(&record)? {
			continue;
		}

		state.compile_jobs.push(CompileJob::new(record));
		state.needs_linking = true;
	}

	Ok(())
}

/// Appends the one link job, depending on every compile job of the target.
/// Skipped entirely when nothing was recompiled, so an up-to-date target
/// reuses its previous binary untouched.
pub fn prepare_linking(
	context: &PlanContext,
	target: &Target,
	state: &mut TargetBuildState,
) -> Result<()> {
	if !state.needs_linking {
		return Ok(());
	}

	let output_root = if context.use_build_dir {
		context.build_directory
	} else {
		context.project_directory
	};
	let output_root = output_root
		.canonicalize()
		.map_err(|err| Error::failed_to_canonicalize(output_root, err))?;

	// The link consumes every object of the target, including the ones that
	// were already up to date this run.
	let mut object_files = Vec::with_capacity(target.sources.len());
	for source in &target.sources {
		object_files.push(object_file_path(context, source)?);
	}

	let depends_on = (0..state.compile_jobs.len()).collect();
	state.link_job = Some(LinkJob::new(
		LinkParameters {
			object_files,
			target_file: output_root.join(&target.name),
			link_flags: String::new(),
		},
		depends_on,
	));

	Ok(())
}
