//! Runs pipelines of external commands: `cmd1 | cmd2 | ... | cmdN`.
//!
//! ```no_run
//! let result = ishpipe::run_pipeline(&["echo", "hello", "|", "rev"]);
//! assert!(result.success);
//! ```

pub mod config;
pub mod error;
pub mod fabric;
pub mod job;
pub mod launch;
pub mod pipeline;
pub mod segment;
pub mod types;

#[doc(hidden)]
pub mod testing;

pub use config::{Config, LaunchOrder};
pub use error::PipelineError;
pub use fabric::{KernelPipes, PipeFabric, PipeSource};
pub use job::StageStatus;
pub use launch::{launch, Launcher, ProcessLauncher};
pub use pipeline::{run_pipeline, Orchestrator, PipelineReport};
pub use segment::segment;
pub use types::{Command, PipelineResult, StageWiring};
