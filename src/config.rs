use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

pub const DEFAULT_DELIMITER: &str = "|";
pub const DELIMITER_ENV: &str = "ISHPIPE_DELIMITER";
pub const LAUNCH_ORDER_ENV: &str = "ISHPIPE_LAUNCH_ORDER";

/// Order in which stages are spawned. Either is correct: every stage gets
/// its own copy of the descriptors it needs, whatever order they come in.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum LaunchOrder {
	Forward,
	#[default]
	Reverse,
}

impl LaunchOrder {
	/// Stage indices `0..stages` in launch order.
	pub fn stages(self, stages: usize) -> impl Iterator<Item = usize> {
		(0 .. stages).map(move |i| match self {
			LaunchOrder::Forward => i,
			LaunchOrder::Reverse => stages - 1 - i,
		})
	}
}

impl FromStr for LaunchOrder {
	type Err = String;

	fn from_str(s: &str) -> Result<LaunchOrder, String> {
		match s.to_ascii_lowercase().as_str() {
			"forward" => Ok(LaunchOrder::Forward),
			"reverse" => Ok(LaunchOrder::Reverse),
			_ => Err(format!("unknown launch order '{}', expected 'forward' or 'reverse'", s)),
		}
	}
}

impl fmt::Display for LaunchOrder {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			LaunchOrder::Forward => write!(f, "forward"),
			LaunchOrder::Reverse => write!(f, "reverse"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub delimiter: String,
	pub launch_order: LaunchOrder,
}

impl Default for Config {
	fn default() -> Config {
		Config { delimiter: DEFAULT_DELIMITER.to_owned(), launch_order: LaunchOrder::default() }
	}
}

impl Config {
	pub fn new() -> Config {
		Config::default()
	}

	pub fn with_delimiter<S: Into<String>>(mut self, delimiter: S) -> Config {
		self.delimiter = delimiter.into();
		self
	}

	pub fn with_launch_order(mut self, order: LaunchOrder) -> Config {
		self.launch_order = order;
		self
	}

	/// Defaults overridden by `ISHPIPE_DELIMITER` and `ISHPIPE_LAUNCH_ORDER`.
	pub fn from_env() -> Config {
		Config::from_vars(|key| env::var(key).ok())
	}

	fn from_vars<F: Fn(&str) -> Option<String>>(get: F) -> Config {
		let mut config = Config::default();
		if let Some(d) = get(DELIMITER_ENV).filter(|d| !d.is_empty()) {
			config.delimiter = d;
		}
		if let Some(o) = get(LAUNCH_ORDER_ENV) {
			match o.parse() {
				Ok(order) => config.launch_order = order,
				Err(e) => warn!("ignoring {}: {}", LAUNCH_ORDER_ENV, e),
			}
		}
		config
	}
}
