//! Runs `cmd1 | cmd2 | ... | cmdN`, reaping every stage it started.

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::fabric::{KernelPipes, PipeFabric, PipeSource};
use crate::job::{ChildRecord, StageStatus};
use crate::launch::{Launched, Launcher, ProcessLauncher};
use crate::segment::segment;
use crate::types::{PipelinePlan, PipelineResult};

/// Outcome of one pipeline invocation.
#[derive(Debug)]
pub struct PipelineReport {
	/// One entry per stage. Empty when the pipeline could not be built.
	pub stages: Vec<StageStatus>,
	/// The failure that stopped construction or launching, if any.
	pub error: Option<PipelineError>,
}

impl PipelineReport {
	fn aborted(error: PipelineError) -> PipelineReport {
		PipelineReport { stages: vec![], error: Some(error) }
	}

	pub fn success(&self) -> bool {
		self.error.is_none() && !self.stages.is_empty() && self.stages.iter().all(|s| s.is_success())
	}

	pub fn result(&self) -> PipelineResult {
		PipelineResult { success: self.success() }
	}

	/// Number of stages for which a process was created.
	pub fn spawned(&self) -> usize {
		self.stages.iter().filter(|s| s.was_spawned()).count()
	}
}

#[derive(Debug)]
pub struct Orchestrator<P = KernelPipes, L = ProcessLauncher> {
	config: Config,
	pipes: P,
	launcher: L,
}

impl Orchestrator<KernelPipes, ProcessLauncher> {
	pub fn new(config: Config) -> Orchestrator<KernelPipes, ProcessLauncher> {
		Orchestrator::with_pipes(config, KernelPipes)
	}
}

impl<P: PipeSource> Orchestrator<P, ProcessLauncher> {
	pub fn with_pipes(config: Config, pipes: P) -> Orchestrator<P, ProcessLauncher> {
		Orchestrator { config: config, pipes: pipes, launcher: ProcessLauncher }
	}
}

impl<P: PipeSource, L: Launcher> Orchestrator<P, L> {
	pub fn with_launcher<M: Launcher>(self, launcher: M) -> Orchestrator<P, M> {
		Orchestrator { config: self.config, pipes: self.pipes, launcher: launcher }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn pipes(&self) -> &P {
		&self.pipes
	}

	pub fn launcher(&self) -> &L {
		&self.launcher
	}

	pub fn plan<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<PipelinePlan> {
		let commands = segment(tokens, &self.config.delimiter)?;
		let fabric = PipeFabric::build(commands.len(), &mut self.pipes)?;
		Ok(PipelinePlan::new(commands, fabric))
	}

	pub fn run<S: AsRef<str>>(&mut self, tokens: &[S]) -> PipelineReport {
		let plan = match self.plan(tokens) {
			Ok(plan) => plan,
			Err(e) => {
				warn!(error = %e, "pipeline not started");
				return PipelineReport::aborted(e);
			},
		};
		let stages = plan.stages();
		debug!(stages = stages, pipes = plan.fabric.pipe_count(), order = %self.config.launch_order, "pipeline planned");

		let (mut statuses, children) = match reserve(stages) {
			Ok(reserved) => reserved,
			Err(e) => return PipelineReport::aborted(e),
		};
		let (children, error) = self.launch_all(plan, children, &mut statuses);

		for record in children {
			let stage = record.stage();
			statuses[stage] = record.wait();
		}
		let report = PipelineReport { stages: statuses, error: error };
		debug!(success = report.success(), spawned = report.spawned(), "pipeline finished");
		report
	}

	// Consumes the plan, so the parent's fabric is closed before any wait.
	fn launch_all(&mut self, plan: PipelinePlan, mut children: Vec<ChildRecord>, statuses: &mut [StageStatus])
	              -> (Vec<ChildRecord>, Option<PipelineError>) {
		let stages = plan.stages();
		for stage in self.config.launch_order.stages(stages) {
			match self.launcher.launch(stage, &plan.commands[stage], &plan.fabric, plan.wirings[stage]) {
				Ok(Launched::Running(record)) => children.push(record),
				Ok(Launched::ExecFailed { stage, code }) => statuses[stage] = StageStatus::ExecFailed(code),
				Err(e) => {
					warn!(error = %e, launched = children.len(), "aborting launch, reaping started stages");
					return (children, Some(e));
				},
			}
		}
		(children, None)
	}
}

fn reserve(stages: usize) -> Result<(Vec<StageStatus>, Vec<ChildRecord>)> {
	let mut statuses = Vec::new();
	statuses.try_reserve_exact(stages)?;
	statuses.resize(stages, StageStatus::NotLaunched);
	let mut children = Vec::new();
	children.try_reserve_exact(stages)?;
	Ok((statuses, children))
}

/// Runs `tokens` as one pipeline with the default configuration.
pub fn run_pipeline<S: AsRef<str>>(tokens: &[S]) -> PipelineResult {
	Orchestrator::new(Config::default()).run(tokens).result()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::LaunchOrder;
	use crate::testing::{FailPipeAt, FailSpawnAt};
	use nix::errno::Errno;

	#[test]
	fn single_stage() {
		assert!(run_pipeline(&["true"]).success);
		assert!(!run_pipeline(&["false"]).success);
	}

	#[test]
	fn plan_wires_every_stage() {
		let mut orch = Orchestrator::new(Config::default());
		let plan = orch.plan(&["a", "|", "b", "|", "c"]).unwrap();
		assert_eq!(plan.stages(), 3);
		assert_eq!(plan.fabric.pipe_count(), 2);
		assert_eq!(plan.wirings[1].input_index, Some(0));
		assert_eq!(plan.wirings[1].output_index, Some(3));
	}

	#[test]
	fn segmentation_failure_launches_nothing() {
		let report = Orchestrator::new(Config::default()).run(&["|", "true"]);
		assert!(matches!(report.error, Some(PipelineError::Segmentation { stage: 0 })));
		assert_eq!(report.spawned(), 0);
		assert!(!report.result().success);

		let report = Orchestrator::new(Config::default()).run(&["true", "|"]);
		assert!(matches!(report.error, Some(PipelineError::Segmentation { stage: 1 })));
		assert!(report.stages.is_empty());
	}

	#[test]
	fn pipe_failure_launches_nothing() {
		let mut orch = Orchestrator::with_pipes(Config::default(), FailPipeAt::new(KernelPipes, 1, Errno::ENFILE));
		let report = orch.run(&["true", "|", "true", "|", "true"]);
		assert!(matches!(report.error, Some(PipelineError::PipeCreation { pipe: 1, .. })));
		assert_eq!(report.spawned(), 0);
		assert_eq!(orch.pipes().created().len(), 2);
	}

	#[test]
	fn missing_middle_stage_fails_but_reaps_the_rest() {
		for &order in &[LaunchOrder::Forward, LaunchOrder::Reverse] {
			let report = Orchestrator::new(Config::new().with_launch_order(order))
				.run(&["echo", "x", "|", "ishpipe-no-such-command", "|", "cat"]);
			assert!(report.error.is_none());
			assert_eq!(report.stages.len(), 3);
			assert_eq!(report.stages[1], StageStatus::ExecFailed(127));
			assert_eq!(report.stages[2], StageStatus::Exited(0));
			assert_eq!(report.spawned(), 2);
			assert!(!report.result().success);
		}
	}

	#[test]
	fn failing_stage_fails_pipeline() {
		let report = Orchestrator::new(Config::default()).run(&["true", "|", "sh", "-c", "cat; exit 3", "|", "cat"]);
		assert_eq!(report.stages, vec![StageStatus::Exited(0), StageStatus::Exited(3), StageStatus::Exited(0)]);
		assert!(!report.success());
	}

	#[test]
	fn spawn_failure_stops_launching_and_reaps_started_stages() {
		// reverse order: stages 3 and 2 start, 1 fails, 0 is never tried
		let mut orch = Orchestrator::new(Config::default())
			.with_launcher(FailSpawnAt::new(ProcessLauncher, 1, Errno::EAGAIN));
		let report = orch.run(&["true", "|", "cat", "|", "cat", "|", "cat"]);
		assert!(matches!(report.error, Some(PipelineError::Spawn { stage: 1, .. })), "{:?}", report);
		assert_eq!(report.stages, vec![StageStatus::NotLaunched, StageStatus::NotLaunched, StageStatus::Exited(0), StageStatus::Exited(0)]);
		assert_eq!(orch.launcher().attempts(), &[3, 2, 1]);
		assert!(!report.result().success);

		let mut orch = Orchestrator::new(Config::new().with_launch_order(LaunchOrder::Forward))
			.with_launcher(FailSpawnAt::new(ProcessLauncher, 2, Errno::ENOMEM));
		let report = orch.run(&["true", "|", "cat", "|", "cat", "|", "cat"]);
		assert!(matches!(report.error, Some(PipelineError::Spawn { stage: 2, .. })), "{:?}", report);
		assert_eq!(report.stages, vec![StageStatus::Exited(0), StageStatus::Exited(0), StageStatus::NotLaunched, StageStatus::NotLaunched]);
		assert_eq!(orch.launcher().attempts(), &[0, 1, 2]);
	}

	#[test]
	fn oversized_argument_stays_local_to_its_stage() {
		let big = "x".repeat(200 * 1024);
		let report = Orchestrator::new(Config::default()).run(&["echo", "a", "|", "cat", big.as_str(), "|", "cat"]);
		assert!(report.error.is_none(), "{:?}", report);
		assert_eq!(report.stages[1], StageStatus::ExecFailed(126));
		assert!(report.stages[0].was_spawned());
		assert_eq!(report.stages[2], StageStatus::Exited(0));
		assert!(!report.success());
	}

	#[test]
	fn custom_delimiter() {
		let report = Orchestrator::new(Config::new().with_delimiter("::")).run(&["echo", "|", "::", "grep", "-q", "|"]);
		assert!(report.success(), "{:?}", report);
	}
}
