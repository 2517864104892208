use std::collections::TryReserveError;
use std::io;

use nix::errno::Errno;
use thiserror::Error;

/// Failures that stop a pipeline from being fully constructed.
///
/// Exec and wait failures are not here: they belong to a single stage and
/// show up in that stage's [`StageStatus`](crate::job::StageStatus).
#[derive(Debug, Error)]
pub enum PipelineError {
	#[error("empty command at stage {stage}")]
	Segmentation { stage: usize },

	#[error("failed to create pipe {pipe}: {source}")]
	PipeCreation {
		pipe: usize,
		#[source]
		source: Errno,
	},

	#[error("allocation failed: {0}")]
	Allocation(#[from] TryReserveError),

	#[error("failed to spawn stage {stage} ({program}): {source}")]
	Spawn {
		stage: usize,
		program: String,
		#[source]
		source: io::Error,
	},
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
