use std::ffi::OsStr;
use std::fmt;

use crate::fabric::PipeFabric;

/// One stage of a pipeline: a non-empty argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
	argv: Vec<String>,
}

impl Command {
	/// Returns `None` for an empty argument vector.
	pub fn new(argv: Vec<String>) -> Option<Command> {
		if argv.is_empty() {
			None
		} else {
			Some(Command { argv: argv })
		}
	}

	pub fn program(&self) -> &str {
		&self.argv[0]
	}

	pub fn args(&self) -> impl Iterator<Item = &OsStr> {
		self.argv[1..].iter().map(OsStr::new)
	}

	pub fn argv(&self) -> &[String] {
		&self.argv
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.argv.join(" "))
	}
}

/// Table indices a stage reads from and writes to. `None` leaves the
/// corresponding standard stream inherited from the orchestrator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageWiring {
	pub input_index: Option<usize>,
	pub output_index: Option<usize>,
}

impl StageWiring {
	/// Stage `stage` of `stages`: reads pipe `stage - 1`, writes pipe `stage`.
	pub fn for_stage(stage: usize, stages: usize) -> StageWiring {
		StageWiring {
			input_index: if stage > 0 { Some(2 * (stage - 1)) } else { None },
			output_index: if stage + 1 < stages { Some(2 * stage + 1) } else { None },
		}
	}
}

#[derive(Debug)]
pub struct PipelinePlan {
	pub commands: Vec<Command>,
	pub fabric: PipeFabric,
	pub wirings: Vec<StageWiring>,
}

impl PipelinePlan {
	pub fn new(commands: Vec<Command>, fabric: PipeFabric) -> PipelinePlan {
		let n = commands.len();
		let wirings = (0 .. n).map(|i| StageWiring::for_stage(i, n)).collect();
		PipelinePlan { commands: commands, fabric: fabric, wirings: wirings }
	}

	pub fn stages(&self) -> usize {
		self.commands.len()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineResult {
	pub success: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_command_is_rejected() {
		assert!(Command::new(vec![]).is_none());
	}

	#[test]
	fn command_splits_program_and_args() {
		let cmd = Command::new(vec!["grep".into(), "-v".into(), "x".into()]).unwrap();
		assert_eq!(cmd.program(), "grep");
		assert_eq!(cmd.args().collect::<Vec<_>>(), vec![OsStr::new("-v"), OsStr::new("x")]);
		assert_eq!(cmd.to_string(), "grep -v x");
	}

	#[test]
	fn single_stage_is_unwired() {
		assert_eq!(StageWiring::for_stage(0, 1), StageWiring::default());
	}

	#[test]
	fn wiring_follows_pipe_layout() {
		// pipes: [r0 w0 r1 w1]
		assert_eq!(StageWiring::for_stage(0, 3), StageWiring { input_index: None, output_index: Some(1) });
		assert_eq!(StageWiring::for_stage(1, 3), StageWiring { input_index: Some(0), output_index: Some(3) });
		assert_eq!(StageWiring::for_stage(2, 3), StageWiring { input_index: Some(2), output_index: None });
	}
}
