use crate::errors::{Error, Result};
use crate::paths::{self, RECORD_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Fingerprint of one source file's last successful compile. Doubles as the
/// parameter block of a compile job; the sidecar file next to the object
/// stores exactly these four fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildRecord {
	pub source_file: PathBuf,
	pub object_file: PathBuf,
	pub compile_flags: String,
	pub source_timestamp: u64,
}

pub fn record_path(object_file: &Path) -> PathBuf {
	paths::append_suffix(object_file.to_path_buf(), RECORD_SUFFIX)
}

/// Modification timestamp as an opaque comparable integer. A missing file
/// reads as 0 so no stored record can ever match it.
pub fn source_timestamp(path: &Path) -> u64 {
	fs::metadata(path)
		.and_then(|metadata| metadata.modified())
		.ok()
		.and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
		.map(|duration| duration.as_nanos() as u64)
		.unwrap_or(0)
}

pub fn read_record(path: &Path) -> Result<BuildRecord> {
	let contents = fs::read_to_string(path).map_err(|err| Error::failed_to_read(path, err))?;
	let mut lines = contents.lines();

	let source_file = lines.next().ok_or_else(|| Error::malformed_record(path))?;
	let object_file = lines.next().ok_or_else(|| Error::malformed_record(path))?;
	let compile_flags = lines.next().ok_or_else(|| Error::malformed_record(path))?;
	let source_timestamp = lines
		.next()
		.ok_or_else(|| Error::malformed_record(path))?
		.trim()
		.parse::<u64>()
		.map_err(|_| Error::malformed_record(path))?;

	Ok(BuildRecord {
		source_file: PathBuf::from(source_file),
		object_file: PathBuf::from(object_file),
		compile_flags: compile_flags.to_string(),
		source_timestamp,
	})
}

/// Persists the record beside its object file. Called only after the compile
/// job succeeded, so the cache never claims a file is built when the last
/// attempt failed.
pub fn write_record(record: &BuildRecord) -> Result<()> {
	let path = record_path(&record.object_file);
	let contents = format!(
		"{}\n{}\n{}\n{}\n",
		record.source_file.display(),
		record.object_file.display(),
		record.compile_flags,
		record.source_timestamp,
	);
	fs::write(&path, contents).map_err(|err| Error::failed_to_write(path, err))
}

/// A source is up to date only if a sidecar record exists and every field
/// matches the freshly computed record. A record that exists but cannot be
/// parsed is a fatal error, not a cache miss.
pub fn is_up_to_date(fresh: &BuildRecord) -> Result<bool> {
	let path = record_path(&fresh.object_file);
	if !path.exists() {
		return Ok(false);
	}
	let stored = read_record(&path)?;
	Ok(stored == *fresh)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_record(directory: &Path) -> BuildRecord {
		BuildRecord {
			source_file: PathBuf::from("src/main.cpp"),
			object_file: directory.join("main.cpp.o"),
			compile_flags: "-O2 -Iinclude".to_string(),
			source_timestamp: 1_234_567,
		}
	}

	#[test]
	fn test_missing_record_is_stale() {
		let directory = tempfile::tempdir().unwrap();
		let record = sample_record(directory.path());
		assert!(!is_up_to_date(&record).unwrap());
	}

	#[test]
	fn test_written_record_is_up_to_date() {
		let directory = tempfile::tempdir().unwrap();
		let record = sample_record(directory.path());
		write_record(&record).unwrap();
		assert!(is_up_to_date(&record).unwrap());
	}

	#[test]
	fn test_any_field_change_is_stale() {
		let directory = tempfile::tempdir().unwrap();
		let record = sample_record(directory.path());
		write_record(&record).unwrap();

		let mut touched = record.clone();
		touched.source_timestamp += 1;
		assert!(!is_up_to_date(&touched).unwrap());

		let mut reordered_flags = record.clone();
		reordered_flags.compile_flags = "-Iinclude -O2".to_string();
		assert!(!is_up_to_date(&reordered_flags).unwrap());
	}

	#[test]
	fn test_empty_flags_round_trip() {
		let directory = tempfile::tempdir().unwrap();
		let mut record = sample_record(directory.path());
		record.compile_flags = String::new();
		write_record(&record).unwrap();
		assert!(is_up_to_date(&record).unwrap());
	}

	#[test]
	fn test_truncated_record_is_fatal() {
		let directory = tempfile::tempdir().unwrap();
		let record = sample_record(directory.path());
		fs::write(record_path(&record.object_file), "src/main.cpp\nonly two\n").unwrap();
		assert!(is_up_to_date(&record).is_err());
	}

	#[test]
	fn test_unparsable_timestamp_is_fatal() {
		let directory = tempfile::tempdir().unwrap();
		let record = sample_record(directory.path());
		fs::write(
			record_path(&record.object_file),
			"src/main.cpp\nmain.cpp.o\n-O2\nnot-a-number\n",
		)
		.unwrap();
		assert!(is_up_to_date(&record).is_err());
	}

	#[test]
	fn test_missing_source_timestamp_is_zero() {
		assert_eq!(source_timestamp(Path::new("no/such/file.cpp")), 0);
	}
}
