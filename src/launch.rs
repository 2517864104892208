use std::io;
use std::process::{self, Stdio};

use nix::errno::Errno;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::fabric::PipeFabric;
use crate::job::ChildRecord;
use crate::types::{Command, StageWiring};

/// Exit code for a stage whose program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code for a stage whose program exists but could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

#[derive(Debug)]
pub enum Launched {
	Running(ChildRecord),
	ExecFailed { stage: usize, code: i32 },
}

/// Starts the process for one stage.
pub trait Launcher {
	fn launch(&mut self, stage: usize, command: &Command, fabric: &PipeFabric, wiring: StageWiring) -> Result<Launched>;
}

/// Spawns real processes through [`launch`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
	fn launch(&mut self, stage: usize, command: &Command, fabric: &PipeFabric, wiring: StageWiring) -> Result<Launched> {
		launch(stage, command, fabric, wiring)
	}
}

impl<'a, L: Launcher + ?Sized> Launcher for &'a mut L {
	fn launch(&mut self, stage: usize, command: &Command, fabric: &PipeFabric, wiring: StageWiring) -> Result<Launched> {
		(**self).launch(stage, command, fabric, wiring)
	}
}

/// Spawns one stage. A command that cannot be executed is reported as
/// [`Launched::ExecFailed`], not as an error.
pub fn launch(stage: usize, command: &Command, fabric: &PipeFabric, wiring: StageWiring) -> Result<Launched> {
	let spawn_err = |e: io::Error| PipelineError::Spawn {
		stage: stage,
		program: command.program().to_owned(),
		source: e,
	};

	let mut cmd = process::Command::new(command.program());
	cmd.args(command.args());
	if let Some(i) = wiring.input_index {
		cmd.stdin(redirect(fabric, i).map_err(spawn_err)?);
	}
	if let Some(i) = wiring.output_index {
		cmd.stdout(redirect(fabric, i).map_err(spawn_err)?);
	}

	let spawned = cmd.spawn();
	drop(cmd);
	match spawned {
		Ok(child) => {
			debug!(stage = stage, pid = child.id(), command = %command, stdin = ?wiring.input_index, stdout = ?wiring.output_index, "stage spawned");
			Ok(Launched::Running(ChildRecord::new(stage, child)))
		},
		Err(e) => match exec_failure_code(&e) {
			Some(code) => {
				warn!(stage = stage, command = %command, error = %e, code = code, "cannot execute command");
				Ok(Launched::ExecFailed { stage: stage, code: code })
			},
			None => {
				warn!(stage = stage, command = %command, error = %e, "spawn failed");
				Err(spawn_err(e))
			},
		},
	}
}

fn redirect(fabric: &PipeFabric, index: usize) -> io::Result<Stdio> {
	let fd = fabric.get(index).ok_or_else(|| {
		io::Error::new(io::ErrorKind::InvalidInput, format!("no descriptor at table index {}", index))
	})?;
	Ok(Stdio::from(fd.try_clone_to_owned()?))
}

// Only resource exhaustion is a spawn failure; anything else is this
// command's own exec failure.
fn exec_failure_code(e: &io::Error) -> Option<i32> {
	let errno = match e.raw_os_error() {
		Some(raw) => Errno::from_raw(raw),
		None if e.kind() == io::ErrorKind::InvalidInput => return Some(EXIT_NOT_EXECUTABLE),
		None => return None,
	};
	match errno {
		Errno::EAGAIN | Errno::ENOMEM | Errno::EMFILE | Errno::ENFILE => None,
		Errno::ENOENT | Errno::ENOTDIR | Errno::ENAMETOOLONG | Errno::ELOOP => Some(EXIT_NOT_FOUND),
		_ => Some(EXIT_NOT_EXECUTABLE),
	}
}
