//! Saga executor: runs steps, tracks outcomes, compensates on failure.
//!
//! Invariants:
//! - a compensation runs iff its forward step succeeded and a later step in
//!   the same run failed (or the run was cancelled)
//! - compensations run in reverse commit order
//! - a `ParallelBarrier` group is awaited to quiescence before anything is
//!   compensated, so an undo never races its own forward call
//! - once the run is terminal nothing else is issued

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::{
    FailurePhase, RunOutcome, RunStatus, SagaError, StepId, StoreError, WorkflowRun, WorkflowStep,
};
use crate::ports::{Clock, IdGenerator};

use super::cancel::CancelToken;
use super::step::{Compensation, SagaStep};

/// How a group of steps is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One after another; the first failure stops the group.
    Sequential,

    /// All issued concurrently; the group completes only when every member
    /// has resolved.
    ParallelBarrier,
}

/// Shared wiring for starting runs.
#[derive(Clone)]
pub struct SagaContext {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    compensation_timeout: Option<Duration>,
}

impl SagaContext {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ids,
            clock,
            compensation_timeout: None,
        }
    }

    pub fn with_compensation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.compensation_timeout = timeout;
        self
    }

    /// Start a fresh run.
    pub fn start(&self, workflow: &str, cancel: CancelToken) -> Saga {
        let run = WorkflowRun::new(self.ids.generate_run_id(), workflow, self.clock.now());
        info!(run_id = %run.id, workflow, "run started");
        Saga {
            run,
            committed: Vec::new(),
            ids: Arc::clone(&self.ids),
            clock: Arc::clone(&self.clock),
            cancel,
            compensation_timeout: self.compensation_timeout,
        }
    }
}

struct Committed {
    step_id: StepId,
    name: String,
    compensation: Option<Box<dyn Compensation>>,
    commit_point: bool,
}

/// One in-flight run.
pub struct Saga {
    run: WorkflowRun,
    /// Succeeded forward steps, in commit order.
    committed: Vec<Committed>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    compensation_timeout: Option<Duration>,
}

impl Saga {
    pub fn run_record(&self) -> &WorkflowRun {
        &self.run
    }

    /// Run a group of steps.
    ///
    /// On failure, every step committed so far in this run is compensated
    /// and the run ends `Failed`.
    pub async fn run<S: SagaStep>(
        &mut self,
        steps: Vec<S>,
        mode: Mode,
    ) -> Result<Vec<S::Output>, SagaError> {
        match mode {
            Mode::Sequential => {
                let mut outputs = Vec::with_capacity(steps.len());
                for step in steps {
                    outputs.push(self.step(step).await?);
                }
                Ok(outputs)
            }
            Mode::ParallelBarrier => self.barrier(steps).await,
        }
    }

    /// Run a single step.
    pub async fn step<S: SagaStep>(&mut self, step: S) -> Result<S::Output, SagaError> {
        self.check_open().await?;
        let step_id = self.begin(&step)?;

        match step.forward().await {
            Ok(output) => {
                self.commit(step_id, &step);
                Ok(output)
            }
            Err(err) => Err(self.fail(step_id, step.name(), err).await),
        }
    }

    async fn barrier<S: SagaStep>(&mut self, steps: Vec<S>) -> Result<Vec<S::Output>, SagaError> {
        self.check_open().await?;
        if steps.is_empty() {
            return Ok(Vec::new());
        }

        let mut step_ids = Vec::with_capacity(steps.len());
        for step in &steps {
            step_ids.push(self.begin(step)?);
        }
        info!(run_id = %self.run.id, members = steps.len(), "barrier issued");

        let mut in_flight: FuturesUnordered<_> = steps
            .iter()
            .enumerate()
            .map(|(idx, step)| async move { (idx, step.forward().await) })
            .collect();

        let mut outputs: Vec<Option<S::Output>> = steps.iter().map(|_| None).collect();
        let mut first_failure: Option<(usize, StoreError)> = None;

        // Wait for every member, even after a failure.
        while let Some((idx, result)) = in_flight.next().await {
            match result {
                Ok(output) => {
                    self.commit(step_ids[idx], &steps[idx]);
                    outputs[idx] = Some(output);
                }
                Err(err) => {
                    warn!(
                        run_id = %self.run.id,
                        step = %steps[idx].name(),
                        status = err.status,
                        "barrier member failed"
                    );
                    self.run
                        .mark_step_failed(step_ids[idx], err.clone(), self.clock.now());
                    if first_failure.is_none() {
                        first_failure = Some((idx, err));
                    }
                }
            }
        }
        drop(in_flight);

        if let Some((idx, err)) = first_failure {
            let phase = self.failure_phase();
            self.compensate_all().await;
            self.run.mark_failed(self.clock.now());
            return Err(SagaError::Step {
                step: steps[idx].name(),
                phase,
                source: err,
            });
        }

        debug!(run_id = %self.run.id, "barrier released");
        Ok(outputs.into_iter().flatten().collect())
    }

    /// Close the run with the workflow's result.
    pub fn finish<T>(mut self, result: Result<T, SagaError>) -> (WorkflowRun, RunOutcome<T>) {
        let now = self.clock.now();
        match &result {
            Ok(_) if self.run.status == RunStatus::Pending => {
                self.run.mark_succeeded(now);
                info!(run_id = %self.run.id, committed = self.run.committed_count, "run committed");
            }
            Err(err) => {
                if self.run.status == RunStatus::Pending {
                    self.run.mark_failed(now);
                }
                warn!(run_id = %self.run.id, error = %err, "run failed");
            }
            Ok(_) => {}
        }
        (self.run, result.into())
    }

    /// Refuse to issue anything once terminal; honour cancellation.
    async fn check_open(&mut self) -> Result<(), SagaError> {
        if self.run.status.is_terminal() {
            return Err(SagaError::RunTerminated);
        }
        if self.cancel.is_cancelled() {
            let phase = self.failure_phase();
            info!(run_id = %self.run.id, "cancellation observed");
            self.compensate_all().await;
            self.run.mark_failed(self.clock.now());
            return Err(SagaError::Cancelled { phase });
        }
        Ok(())
    }

    fn begin<S: SagaStep>(&mut self, step: &S) -> Result<StepId, SagaError> {
        let step_id = self.ids.generate_step_id();
        self.run
            .push_step(WorkflowStep::forward(step_id, step.name(), self.clock.now()))?;
        debug!(run_id = %self.run.id, step = %step.name(), "step issued");
        Ok(step_id)
    }

    fn commit<S: SagaStep>(&mut self, step_id: StepId, step: &S) {
        self.run.mark_step_succeeded(step_id, self.clock.now());
        debug!(run_id = %self.run.id, step = %step.name(), "step succeeded");
        self.committed.push(Committed {
            step_id,
            name: step.name(),
            compensation: step.compensation(),
            commit_point: step.is_commit_point(),
        });
    }

    async fn fail(&mut self, step_id: StepId, name: String, err: StoreError) -> SagaError {
        warn!(run_id = %self.run.id, step = %name, status = err.status, "step failed");
        self.run.mark_step_failed(step_id, err.clone(), self.clock.now());
        let phase = self.failure_phase();
        self.compensate_all().await;
        self.run.mark_failed(self.clock.now());
        SagaError::Step {
            step: name,
            phase,
            source: err,
        }
    }

    fn failure_phase(&self) -> FailurePhase {
        if self.committed.iter().any(|c| c.commit_point) {
            FailurePhase::PostCommit
        } else if self.committed.iter().any(|c| c.compensation.is_some()) {
            FailurePhase::MidRun
        } else {
            FailurePhase::PreCondition
        }
    }

    /// Best-effort undo of everything committed, newest first.
    ///
    /// A failed compensation is logged and recorded; the remaining ones still
    /// run and the caller's error stays the original trigger.
    async fn compensate_all(&mut self) {
        while let Some(committed) = self.committed.pop() {
            let Some(compensation) = committed.compensation else {
                debug!(run_id = %self.run.id, step = %committed.name, "nothing to compensate");
                continue;
            };

            let comp_id = self.ids.generate_step_id();
            let comp_name = compensation.name();
            if let Err(err) = self.run.push_step(WorkflowStep::compensating(
                comp_id,
                comp_name.clone(),
                committed.step_id,
                self.clock.now(),
            )) {
                debug!(run_id = %self.run.id, step = %comp_name, error = %err, "compensation not recorded");
            }

            let result = match self.compensation_timeout {
                Some(limit) => tokio::time::timeout(limit, compensation.compensate())
                    .await
                    .unwrap_or_else(|_| Err(StoreError::new(504, "compensation timed out"))),
                None => compensation.compensate().await,
            };

            match result {
                Ok(()) => {
                    info!(run_id = %self.run.id, step = %comp_name, "compensated");
                    self.run.mark_step_succeeded(comp_id, self.clock.now());
                }
                Err(err) => {
                    warn!(
                        run_id = %self.run.id,
                        step = %comp_name,
                        error = %err,
                        "compensation failed, continuing"
                    );
                    self.run.mark_step_failed(comp_id, err, self.clock.now());
                }
            }
        }
    }
}
