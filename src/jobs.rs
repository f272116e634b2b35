use crate::cache::BuildRecord;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus {
	Pending,
	Running,
	Completed,
	Failed,
}

#[derive(Debug)]
pub struct CompileJob {
	pub params: BuildRecord,
	pub status: JobStatus,
	pub exit_code: Option<i32>,
}

impl CompileJob {
	pub fn new(params: BuildRecord) -> Self {
		CompileJob {
			params,
			status: JobStatus::Pending,
			exit_code: None,
		}
	}
}

#[derive(Debug)]
pub struct LinkParameters {
	pub object_files: Vec<PathBuf>,
	pub target_file: PathBuf,
	pub link_flags: String,
}

#[derive(Debug)]
pub struct LinkJob {
	pub params: LinkParameters,
	/// Indices of the compile jobs this link depends on; the link may only
	/// start once every one of them is Completed.
	pub depends_on: Vec<usize>,
	pub status: JobStatus,
	pub exit_code: Option<i32>,
}

impl LinkJob {
	pub fn new(params: LinkParameters, depends_on: Vec<usize>) -> Self {
		LinkJob {
			params,
			depends_on,
			status: JobStatus::Pending,
			exit_code: None,
		}
	}
}

/// Per-target build bookkeeping for one engine invocation. Looked up (or
/// created) by target name in the session table; the on-disk cache, not this
/// struct, is what survives between runs.
#[derive(Debug)]
pub struct TargetBuildState {
	pub target_name: String,
	pub compile_jobs: Vec<CompileJob>,
	pub link_job: Option<LinkJob>,
	pub needs_linking: bool,
}

impl TargetBuildState {
	pub fn new(target_name: impl Into<String>) -> Self {
		TargetBuildState {
			target_name: target_name.into(),
			compile_jobs: Vec::new(),
			link_job: None,
			needs_linking: false,
		}
	}

	pub fn has_compilation_finished(&self) -> bool {
		self.compile_jobs
			.iter()
			.all(|job| job.status == JobStatus::Completed)
	}

	pub fn has_linking_finished(&self) -> bool {
		match &self.link_job {
			Some(link_job) => link_job.status == JobStatus::Completed,
			None => true,
		}
	}
}
