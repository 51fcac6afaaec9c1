//! Test helpers shared between the workspace crates.

use crate::util::logger::{Level, Logger, Record};

use std::collections::HashMap;
use std::sync::Mutex;

/// A [`Logger`] which records every line it is given so tests can assert on them.
pub struct TestLogger {
	level: Level,
	/// (module path, formatted message) -> count of times seen
	pub lines: Mutex<HashMap<(String, String), usize>>,
}

impl TestLogger {
	/// Creates a logger accepting all levels.
	pub fn new() -> TestLogger {
		TestLogger { level: Level::Gossip, lines: Mutex::new(HashMap::new()) }
	}

	/// Raises the minimum level this logger records.
	pub fn enable(&mut self, level: Level) {
		self.level = level;
	}

	/// Asserts that a line matching `module` and `line` exactly was logged `count` times.
	pub fn assert_log(&self, module: &str, line: &str, count: usize) {
		let log_entries = self.lines.lock().unwrap();
		assert_eq!(log_entries.get(&(module.to_owned(), line.to_owned())), Some(&count));
	}

	/// Asserts that `count` logged lines under `module` contain `line` as a substring.
	pub fn assert_log_contains(&self, module: &str, line: &str, count: usize) {
		let log_entries = self.lines.lock().unwrap();
		let l: usize = log_entries
			.iter()
			.filter(|&(&(ref m, ref l), _c)| m == module && l.contains(line))
			.map(|(_, c)| c)
			.sum();
		assert_eq!(l, count);
	}
}

impl Default for TestLogger {
	fn default() -> Self {
		Self::new()
	}
}

impl Logger for TestLogger {
	fn log(&self, record: Record) {
		if record.level < self.level {
			return;
		}
		*self
			.lines
			.lock()
			.unwrap()
			.entry((record.module_path.to_owned(), format!("{}", record.args)))
			.or_insert(0) += 1;
		println!("{}", record);
	}
}
