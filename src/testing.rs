//! Failure injection for exercising error paths.

use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;

use crate::error::{PipelineError, Result};
use crate::fabric::{PipeFabric, PipeSource};
use crate::launch::{Launched, Launcher};
use crate::types::{Command, StageWiring};

/// Fails the `fail_at`-th pipe, delegating the others to `inner`.
#[derive(Debug)]
pub struct FailPipeAt<P> {
	inner: P,
	fail_at: usize,
	error: Errno,
	opened: usize,
	created: Vec<RawFd>,
}

impl<P: PipeSource> FailPipeAt<P> {
	pub fn new(inner: P, fail_at: usize, error: Errno) -> FailPipeAt<P> {
		FailPipeAt { inner: inner, fail_at: fail_at, error: error, opened: 0, created: vec![] }
	}

	/// Raw numbers of every descriptor handed out so far.
	pub fn created(&self) -> &[RawFd] {
		&self.created
	}
}

impl<P: PipeSource> PipeSource for FailPipeAt<P> {
	fn open_pipe(&mut self) -> nix::Result<(OwnedFd, OwnedFd)> {
		let k = self.opened;
		self.opened += 1;
		if k == self.fail_at {
			return Err(self.error);
		}
		let (r, w) = self.inner.open_pipe()?;
		self.created.push(r.as_raw_fd());
		self.created.push(w.as_raw_fd());
		Ok((r, w))
	}
}

/// Fails the spawn of stage `fail_at` with `error`, delegating the others.
#[derive(Debug)]
pub struct FailSpawnAt<L> {
	inner: L,
	fail_at: usize,
	error: Errno,
	attempts: Vec<usize>,
}

impl<L: Launcher> FailSpawnAt<L> {
	pub fn new(inner: L, fail_at: usize, error: Errno) -> FailSpawnAt<L> {
		FailSpawnAt { inner: inner, fail_at: fail_at, error: error, attempts: vec![] }
	}

	/// Stages launch was requested for, in request order.
	pub fn attempts(&self) -> &[usize] {
		&self.attempts
	}
}

impl<L: Launcher> Launcher for FailSpawnAt<L> {
	fn launch(&mut self, stage: usize, command: &Command, fabric: &PipeFabric, wiring: StageWiring) -> Result<Launched> {
		self.attempts.push(stage);
		if stage == self.fail_at {
			return Err(PipelineError::Spawn {
				stage: stage,
				program: command.program().to_owned(),
				source: io::Error::from_raw_os_error(self.error as i32),
			});
		}
		self.inner.launch(stage, command, fabric, wiring)
	}
}
