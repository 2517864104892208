//! Every pipe descriptor of one pipeline in a flat `[r0, w0, r1, w1, ...]`
//! table. Entries are close-on-exec and closed when the fabric is dropped.

use std::os::unix::io::{AsRawFd, BorrowedFd, OwnedFd, RawFd};

use nix::unistd;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Creates one pipe, returning `(read_end, write_end)`.
pub trait PipeSource {
	fn open_pipe(&mut self) -> nix::Result<(OwnedFd, OwnedFd)>;
}

/// Kernel pipes with `O_CLOEXEC` set on both ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelPipes;

impl PipeSource for KernelPipes {
	#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
	fn open_pipe(&mut self) -> nix::Result<(OwnedFd, OwnedFd)> {
		unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
	}

	// No pipe2 here; the flag is set right after creation instead.
	#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd")))]
	fn open_pipe(&mut self) -> nix::Result<(OwnedFd, OwnedFd)> {
		use nix::fcntl::{fcntl, FcntlArg, FdFlag};
		let (r, w) = unistd::pipe()?;
		fcntl(&r, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
		fcntl(&w, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
		Ok((r, w))
	}
}

impl<'a, P: PipeSource + ?Sized> PipeSource for &'a mut P {
	fn open_pipe(&mut self) -> nix::Result<(OwnedFd, OwnedFd)> {
		(**self).open_pipe()
	}
}

#[derive(Debug, Default)]
pub struct PipeFabric {
	fds: Vec<OwnedFd>,
}

impl PipeFabric {
	/// Builds the `stages - 1` pipes a pipeline of `stages` commands needs.
	///
	/// A single stage (or none) gets an empty fabric. If pipe `k` cannot be
	/// created, pipes `0..k` are closed before the error is returned.
	pub fn build<P: PipeSource>(stages: usize, mut source: P) -> Result<PipeFabric> {
		let pipes = stages.saturating_sub(1);
		let mut fds: Vec<OwnedFd> = Vec::new();
		fds.try_reserve_exact(2 * pipes)?;

		for k in 0 .. pipes {
			let (r, w) = source.open_pipe().map_err(|e| {
				debug!(pipe = k, error = %e, opened = fds.len(), "pipe creation failed, unwinding fabric");
				PipelineError::PipeCreation { pipe: k, source: e }
			})?;
			fds.push(r);
			fds.push(w);
		}
		debug!(pipes = pipes, descriptors = fds.len(), "pipe fabric built");
		Ok(PipeFabric { fds: fds })
	}

	pub fn pipe_count(&self) -> usize {
		self.fds.len() / 2
	}

	pub fn len(&self) -> usize {
		self.fds.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fds.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<BorrowedFd> {
		use std::os::unix::io::AsFd;
		self.fds.get(index).map(|fd| fd.as_fd())
	}

	pub fn read_end(&self, pipe: usize) -> Option<BorrowedFd> {
		self.get(2 * pipe)
	}

	pub fn write_end(&self, pipe: usize) -> Option<BorrowedFd> {
		self.get(2 * pipe + 1)
	}

	pub fn raw_fds(&self) -> Vec<RawFd> {
		self.fds.iter().map(|fd| fd.as_raw_fd()).collect()
	}
}
