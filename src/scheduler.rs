use crate::cache;
use crate::console;
use crate::errors::{Error, Result};
use crate::jobs::{CompileJob, JobStatus, LinkJob, TargetBuildState};
use crate::process::{ProcessHandle, ProcessLauncher};
use crate::session::Toolchain;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct RunOptions<'a> {
	pub toolchain: &'a Toolchain,
	pub parallel_jobs: usize,
}

#[derive(Clone, Copy)]
enum JobSlot {
	Compile(usize),
	Link,
}

struct RunningProcess {
	slot: JobSlot,
	handle: Box<dyn ProcessHandle>,
}

pub fn compile_command(toolchain: &Toolchain, job: &CompileJob) -> Vec<String> {
	let mut command = vec![toolchain.compiler.clone()];
	command.extend(
		job.params
			.compile_flags
			.split_whitespace()
			.map(str::to_string),
	);
	command.push("-c".to_string());
	command.push("-o".to_string());
	command.push(job.params.object_file.display().to_string());
	command.push(job.params.source_file.display().to_string());
	command
}

pub fn link_command(toolchain: &Toolchain, job: &LinkJob) -> Vec<String> {
	let mut command = vec![toolchain.linker.clone()];
	command.extend(
		job.params
			.link_flags
			.split_whitespace()
			.map(str::to_string),
	);
	command.push("-o".to_string());
	command.push(job.params.target_file.display().to_string());
	for object_file in &job.params.object_files {
		command.push(object_file.display().to_string());
	}
	command
}

fn compute_percent(completed: usize, in_flight: usize, total_jobs: usize) -> usize {
	(completed + in_flight + 1) * 100 / total_jobs
}

/// Executes a planned target: bounded-parallel compile jobs in ascending
/// index order, then the link job once every compile is Completed. Fails fast
/// on the first nonzero exit; running siblings are left to finish on their
/// own, but no new work is issued.
pub fn run(
	options: &RunOptions,
	state: &mut TargetBuildState,
	launcher: &mut dyn ProcessLauncher,
) -> Result<()> {
	let compile_count = state.compile_jobs.len();
	if compile_count == 0 && state.link_job.is_none() {
		console::success(&format!(
			"Nothing to build for target {}.",
			state.target_name,
		));
		return Ok(());
	}

	let total_jobs = compile_count + state.link_job.iter().count();
	let parallel_jobs = options.parallel_jobs.max(1);
	console::success(&format!(
		"Running build of {} with {} jobs (max {} parallel)...",
		state.target_name, compile_count, parallel_jobs,
	));

	let mut running: Vec<RunningProcess> = Vec::new();
	let mut completed = 0;
	let mut next_compile = 0;
	let mut link_started = false;

	while !(state.has_compilation_finished() && state.has_linking_finished()) {
		// Non-blocking reap pass over everything in flight.
		let mut index = 0;
		while index < running.len() {
			let exit = running[index].handle.poll()?;
			match exit {
				Some(exit_code) if exit_code != 0 => {
					match running[index].slot {
						JobSlot::Compile(job_index) => {
							let job = &mut state.compile_jobs[job_index];
							job.status = JobStatus::Failed;
							job.exit_code = Some(exit_code);
						}
						JobSlot::Link => {
							if let Some(link_job) = state.link_job.as_mut() {
								link_job.status = JobStatus::Failed;
								link_job.exit_code = Some(exit_code);
							}
						}
					}
					console::error(&format!(
						"Command failed with code {}. Stopping build.",
						exit_code,
					));
					return Err(Error::command_failed(exit_code));
				}
				Some(_) => {
					completed += 1;
					match running[index].slot {
						JobSlot::Compile(job_index) => {
							let job = &mut state.compile_jobs[job_index];
							job.status = JobStatus::Completed;
							job.exit_code = Some(0);
							// Recorded only now, so a failed attempt never
							// counts as up to date.
							cache::write_record(&job.params)?;
						}
						JobSlot::Link => {
							if let Some(link_job) = state.link_job.as_mut() {
								link_job.status = JobStatus::Completed;
								link_job.exit_code = Some(0);
							}
							console::success("Linking completed successfully.");
						}
					}
					running.remove(index);
				}
				None => {
					index += 1;
				}
			}
		}

		// Fill spare capacity; compile jobs become eligible strictly in
		// ascending index order.
		while running.len() < parallel_jobs && next_compile < compile_count {
			let job = &mut state.compile_jobs[next_compile];
			job.status = JobStatus::Running;
			let command = compile_command(options.toolchain, job);
			console::job_status(
				compute_percent(completed, running.len(), total_jobs),
				completed + running.len(),
				compile_count,
				console::GREEN_FAINT,
				"Compiling",
				&command,
			);
			let handle = launcher.spawn(&command)?;
			running.push(RunningProcess {
				slot: JobSlot::Compile(next_compile),
				handle,
			});
			next_compile += 1;
		}

		// The link job only ever starts after its whole dependency set is
		// Completed; anything earlier could read half-written objects.
		if !link_started {
			let dependencies_completed = match &state.link_job {
				Some(link_job) => link_job
					.depends_on
					.iter()
					.all(|&job_index| state.compile_jobs[job_index].status == JobStatus::Completed),
				None => false,
			};
			if dependencies_completed {
				let percent = compute_percent(completed, running.len(), total_jobs);
				let ordinal = completed + running.len();
				if let Some(link_job) = state.link_job.as_mut() {
					link_job.status = JobStatus::Running;
					let command = link_command(options.toolchain, link_job);
					console::job_status(
						percent,
						ordinal,
						compile_count,
						console::GREEN,
						"Linking",
						&command,
					);
					let handle = launcher.spawn(&command)?;
					running.push(RunningProcess {
						slot: JobSlot::Link,
						handle,
					});
					link_started = true;
				}
			}
		}

		if !running.is_empty() {
			thread::sleep(POLL_INTERVAL);
		}
	}

	Ok(())
}
