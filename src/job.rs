use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process;

use nix::sys::signal::Signal;
use tracing::{debug, warn};

/// What happened to one stage of a pipeline.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StageStatus {
	/// Never reached: construction failed, or an earlier spawn did.
	NotLaunched,
	Exited(i32),
	Signaled(i32),
	/// The command could not replace the process image; carries the
	/// distinguished exit code (127 missing, 126 not executable).
	ExecFailed(i32),
	/// The process existed but its status could not be collected.
	WaitFailed,
}

impl StageStatus {
	pub fn is_success(self) -> bool {
		self == StageStatus::Exited(0)
	}

	/// Whether a process was actually created for the stage.
	pub fn was_spawned(self) -> bool {
		match self {
			StageStatus::Exited(..) | StageStatus::Signaled(..) | StageStatus::WaitFailed => true,
			StageStatus::NotLaunched | StageStatus::ExecFailed(..) => false,
		}
	}
}

impl From<process::ExitStatus> for StageStatus {
	fn from(status: process::ExitStatus) -> StageStatus {
		match (status.code(), status.signal()) {
			(Some(code), _) => StageStatus::Exited(code),
			(None, Some(sig)) => StageStatus::Signaled(sig),
			(None, None) => StageStatus::WaitFailed,
		}
	}
}

impl fmt::Display for StageStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			StageStatus::NotLaunched => write!(f, "not launched"),
			StageStatus::Exited(c) => write!(f, "exited with {}", c),
			StageStatus::Signaled(s) => match Signal::try_from(s) {
				Ok(sig) => write!(f, "killed by {}", sig),
				Err(_) => write!(f, "killed by signal {}", s),
			},
			StageStatus::ExecFailed(c) => write!(f, "could not execute ({})", c),
			StageStatus::WaitFailed => write!(f, "status unavailable"),
		}
	}
}

/// A spawned stage waiting to be reaped.
#[derive(Debug)]
pub struct ChildRecord {
	stage: usize,
	child: process::Child,
}

impl ChildRecord {
	pub fn new(stage: usize, child: process::Child) -> ChildRecord {
		ChildRecord { stage: stage, child: child }
	}

	pub fn stage(&self) -> usize {
		self.stage
	}

	pub fn pid(&self) -> u32 {
		self.child.id()
	}

	/// Blocks until this child terminates. Consumes the record so a child
	/// is waited for at most once.
	pub fn wait(mut self) -> StageStatus {
		match self.child.wait() {
			Ok(status) => {
				let s = StageStatus::from(status);
				debug!(stage = self.stage, pid = self.pid(), status = %s, "stage reaped");
				s
			},
			Err(e) => {
				warn!(stage = self.stage, pid = self.pid(), error = %e, "wait failed");
				StageStatus::WaitFailed
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_zero_exit_is_success() {
		assert!(StageStatus::Exited(0).is_success());
		assert!(!StageStatus::Exited(1).is_success());
		assert!(!StageStatus::ExecFailed(127).is_success());
		assert!(!StageStatus::Signaled(9).is_success());
		assert!(!StageStatus::WaitFailed.is_success());
		assert!(!StageStatus::NotLaunched.is_success());
	}

	#[test]
	fn decodes_exit_status() {
		assert_eq!(StageStatus::from(process::ExitStatus::from_raw(3 << 8)), StageStatus::Exited(3));
		assert_eq!(StageStatus::from(process::ExitStatus::from_raw(libc::SIGPIPE)), StageStatus::Signaled(libc::SIGPIPE));
	}

	#[test]
	fn display_names_signals() {
		assert_eq!(StageStatus::Signaled(libc::SIGPIPE).to_string(), "killed by SIGPIPE");
	}

	#[test]
	fn reaps_child_once() {
		let child = process::Command::new("sh").args(["-c", "exit 7"]).spawn().unwrap();
		let record = ChildRecord::new(2, child);
		assert_eq!(record.stage(), 2);
		assert_eq!(record.wait(), StageStatus::Exited(7));
	}
}
