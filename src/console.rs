pub const RESET: &str = "\x1b[0m";
pub const RED: &str = "\x1b[31;1m";
pub const GREEN: &str = "\x1b[32;1m";
pub const GREEN_FAINT: &str = "\x1b[32;2m";
pub const YELLOW: &str = "\x1b[33;1m";

pub fn error(message: &str) {
	eprintln!("{}Error: {}{}", RED, message, RESET);
}

pub fn notice(message: &str) {
	println!("{}{}{}", YELLOW, message, RESET);
}

pub fn success(message: &str) {
	println!("{}{}{}", GREEN, message, RESET);
}

pub fn job_status(percent: usize, ordinal: usize, total: usize, color: &str, verb: &str, command: &[String]) {
	println!(
		"[{:3}%] {}/{} {}{} {}{}",
		percent,
		ordinal,
		total,
		color,
		verb,
		command.join(" "),
		RESET,
	);
}
