//! Cutover engine: one pipeline at a time per service.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use cutover_health::{HealthProber, ProbeReport};
use cutover_state::{StateError, StateStore, StoreLock};
use cutover_supervisor::{ProcessSpec, ProcessSupervisor};
use cutover_switch::TrafficSwitch;
use cutover_types::{
    DeploymentState, EnvName, Environment, FailureReason, TransitionAction, TransitionRecord,
    ValidationError,
};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{CutoverError, CutoverResult};
use crate::phase::{TransitionAttempt, TransitionPhase};
use crate::report::{StatusReport, TransitionReport};

/// What the caller asked for.
#[derive(Debug, Clone)]
enum Request {
    Rollback,
    Promote {
        env: EnvName,
        version: String,
        path: Option<String>,
    },
}

impl Request {
    fn action(&self) -> TransitionAction {
        match self {
            Request::Rollback => TransitionAction::Rollback,
            Request::Promote { .. } => TransitionAction::Promote,
        }
    }
}

/// Exclusivity held for the whole pipeline. Released on drop.
struct TransitionGuard {
    _local: OwnedMutexGuard<()>,
    _store: StoreLock,
}

fn publish(
    phase_tx: &watch::Sender<TransitionPhase>,
    attempt: &mut TransitionAttempt,
    next: TransitionPhase,
) {
    debug!(attempt_id = %attempt.id, from = %attempt.phase, to = %next, "Phase change");
    attempt.advance(next);
    phase_tx.send_replace(next);
}

/// Blue-green cutover engine for one service.
///
/// Owns its collaborators and the in-process transition lock. Construct one
/// per service and share it behind an `Arc` if several tasks need it.
pub struct CutoverEngine {
    store: Arc<dyn StateStore>,
    supervisor: Arc<dyn ProcessSupervisor>,
    prober: Arc<dyn HealthProber>,
    switch: Arc<dyn TrafficSwitch>,
    config: EngineConfig,
    in_flight: Arc<Mutex<()>>,
    phase_tx: Arc<watch::Sender<TransitionPhase>>,
}

impl CutoverEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        supervisor: Arc<dyn ProcessSupervisor>,
        prober: Arc<dyn HealthProber>,
        switch: Arc<dyn TrafficSwitch>,
        config: EngineConfig,
    ) -> Self {
        let (phase_tx, _) = watch::channel(TransitionPhase::Idle);
        Self {
            store,
            supervisor,
            prober,
            switch,
            config,
            in_flight: Arc::new(Mutex::new(())),
            phase_tx: Arc::new(phase_tx),
        }
    }

    pub fn service(&self) -> &str {
        self.store.service()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Observe phase changes of the current or most recent attempt.
    pub fn subscribe(&self) -> watch::Receiver<TransitionPhase> {
        self.phase_tx.subscribe()
    }

    /// Move traffic back to the environment that is not active.
    #[instrument(skip(self), fields(service = %self.service()))]
    pub async fn rollback_to_previous(&self) -> CutoverResult<TransitionReport> {
        self.execute(Request::Rollback, std::future::pending()).await
    }

    /// Like [`rollback_to_previous`](Self::rollback_to_previous), abandoned
    /// if `cancel` completes before traffic starts to switch.
    #[instrument(skip(self, cancel), fields(service = %self.service()))]
    pub async fn rollback_to_previous_until<C>(&self, cancel: C) -> CutoverResult<TransitionReport>
    where
        C: Future<Output = ()> + Send,
    {
        self.execute(Request::Rollback, cancel).await
    }

    /// Record `version` (and optionally `path`) for `env` and move traffic
    /// to it. The new version is persisted only if the switch commits.
    #[instrument(skip(self), fields(service = %self.service()))]
    pub async fn promote(
        &self,
        env: &EnvName,
        version: &str,
        path: Option<&str>,
    ) -> CutoverResult<TransitionReport> {
        self.execute(Self::promote_request(env, version, path), std::future::pending())
            .await
    }

    /// Cancellable [`promote`](Self::promote).
    #[instrument(skip(self, cancel), fields(service = %self.service()))]
    pub async fn promote_until<C>(
        &self,
        env: &EnvName,
        version: &str,
        path: Option<&str>,
        cancel: C,
    ) -> CutoverResult<TransitionReport>
    where
        C: Future<Output = ()> + Send,
    {
        self.execute(Self::promote_request(env, version, path), cancel)
            .await
    }

    /// Active environment, slots and the last `limit` history records.
    pub async fn status(&self, limit: usize) -> CutoverResult<StatusReport> {
        let state = self.store.load().await?;
        Ok(StatusReport::from_state(&state, limit))
    }

    fn promote_request(env: &EnvName, version: &str, path: Option<&str>) -> Request {
        Request::Promote {
            env: env.clone(),
            version: version.to_string(),
            path: path.map(str::to_string),
        }
    }

    async fn acquire(&self) -> CutoverResult<TransitionGuard> {
        let local = self.in_flight.clone().try_lock_owned().map_err(|_| {
            warn!(service = self.service(), "Rejecting concurrent transition");
            CutoverError::ConcurrentTransitionRejected(self.service().to_string())
        })?;

        let store = match self.store.try_lock().await {
            Ok(lock) => lock,
            Err(StateError::Locked(_)) => {
                warn!(
                    service = self.service(),
                    "Rejecting transition, store is locked by another process"
                );
                return Err(CutoverError::ConcurrentTransitionRejected(
                    self.service().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(TransitionGuard {
            _local: local,
            _store: store,
        })
    }

    fn resolve(state: &DeploymentState, request: &Request) -> CutoverResult<(EnvName, Environment)> {
        match request {
            Request::Rollback => {
                let corrupt = || {
                    CutoverError::StateStore(StateError::Corrupt {
                        service: state.service().to_string(),
                        source: ValidationError::EnvironmentCount(state.environments().len()),
                    })
                };
                let target = state.inactive_env().ok_or_else(corrupt)?;
                let environment = state.environment(target).ok_or_else(corrupt)?;
                Ok((target.clone(), environment.clone()))
            }
            Request::Promote { env, version, path } => {
                let mut candidate = state
                    .environment(env)
                    .cloned()
                    .ok_or_else(|| CutoverError::UnknownEnvironment(env.clone()))?;
                candidate.version = version.clone();
                if let Some(path) = path {
                    candidate.path = path.clone();
                }
                Ok((env.clone(), candidate))
            }
        }
    }

    async fn execute<C>(&self, request: Request, cancel: C) -> CutoverResult<TransitionReport>
    where
        C: Future<Output = ()> + Send,
    {
        let guard = self.acquire().await?;

        // 1. Load; nothing has been touched yet
        let mut state = self.store.load().await?;
        let (target, candidate) = Self::resolve(&state, &request)?;
        let active = state.active_env().clone();
        // A promoted release must replace whatever instance is running
        let redeploy = state
            .environment(&target)
            .map_or(true, |current| {
                current.version != candidate.version || current.path != candidate.path
            });

        if target == active {
            info!(env = %target, "Target environment is already active, nothing to do");
            let version = state
                .active()
                .map(|env| env.version.clone())
                .unwrap_or_default();
            return Ok(TransitionReport {
                attempt_id: None,
                service: self.service().to_string(),
                action: request.action(),
                from_env: active,
                to_env: target,
                version,
                changed: false,
                health: None,
                completed_at: Utc::now(),
            });
        }

        let mut attempt = TransitionAttempt::new(self.service(), request.action(), active, target);
        self.phase_tx.send_replace(TransitionPhase::Idle);
        info!(
            attempt_id = %attempt.id,
            action = %attempt.action,
            from = %attempt.from_env,
            to = %attempt.to_env,
            version = %candidate.version,
            "Starting transition"
        );

        // 2-3. Process and health checks; the caller may still withdraw
        tokio::pin!(cancel);
        let checked = tokio::select! {
            biased;
            _ = &mut cancel => None,
            result = self.verify(&mut attempt, &candidate, redeploy) => Some(result),
        };

        let health = match checked {
            Some(Ok(report)) => report,
            Some(Err(err)) => return Err(self.abort(&mut state, &mut attempt, err).await),
            None => {
                let err = CutoverError::Cancelled {
                    phase: attempt.phase,
                };
                return Err(self.abort(&mut state, &mut attempt, err).await);
            }
        };

        // 4-5. Point of no return: commit and persist outlive the caller
        publish(&self.phase_tx, &mut attempt, TransitionPhase::Switching);
        let env = attempt.to_env.clone();
        let task = CommitTask {
            store: self.store.clone(),
            switch: self.switch.clone(),
            phase_tx: self.phase_tx.clone(),
            history_limit: self.config.history_limit,
            state,
            attempt,
            candidate,
            health,
            _guard: guard,
        };

        match tokio::spawn(task.run()).await {
            Ok(result) => result,
            Err(join_err) => {
                error!(
                    alarm = true,
                    env = %env,
                    error = %join_err,
                    "Commit task did not finish, routing may not match persisted state"
                );
                Err(CutoverError::CommitInconsistent {
                    env,
                    reason: format!("commit task failed: {}", join_err),
                })
            }
        }
    }

    async fn verify(
        &self,
        attempt: &mut TransitionAttempt,
        candidate: &Environment,
        redeploy: bool,
    ) -> CutoverResult<ProbeReport> {
        publish(&self.phase_tx, attempt, TransitionPhase::VerifyingProcess);
        let spec = ProcessSpec::for_environment(&attempt.service, &attempt.to_env, candidate);
        let policy = &self.config.start_policy;
        let started = if redeploy {
            self.supervisor.redeploy(&spec, policy).await
        } else {
            self.supervisor.ensure_running(&spec, policy).await
        };
        started.map_err(|source| CutoverError::ProcessUnavailable {
            env: attempt.to_env.clone(),
            source,
        })?;

        publish(&self.phase_tx, attempt, TransitionPhase::CheckingHealth);
        self.check_health(&attempt.to_env, candidate).await
    }

    async fn check_health(&self, env: &EnvName, candidate: &Environment) -> CutoverResult<ProbeReport> {
        let url = candidate.health_url(&self.config.health_path);
        let attempts = self.config.health_attempts.max(1);
        let mut last_outcome = None;

        for attempt in 1..=attempts {
            let report = self.prober.check(env, &url).await;
            if report.is_healthy() {
                debug!(env = %env, attempt, latency_ms = report.latency_ms, "Target healthy");
                return Ok(report);
            }

            debug!(env = %env, attempt, outcome = %report.outcome, "Target not healthy yet");
            last_outcome = Some(report.outcome);
            if attempt < attempts {
                tokio::time::sleep(self.config.health_interval).await;
            }
        }

        Err(CutoverError::HealthCheckFailed {
            env: env.clone(),
            attempts,
            reason: last_outcome
                .map(|outcome| outcome.to_string())
                .unwrap_or_else(|| "no probe issued".to_string()),
        })
    }

    /// Close out an attempt that never reached the switch.
    async fn abort(
        &self,
        state: &mut DeploymentState,
        attempt: &mut TransitionAttempt,
        err: CutoverError,
    ) -> CutoverError {
        let Some(reason) = err.failure_reason() else {
            return err;
        };

        publish(&self.phase_tx, attempt, TransitionPhase::Aborted(reason));
        warn!(
            attempt_id = %attempt.id,
            env = %attempt.to_env,
            reason = %reason,
            error = %err,
            "Transition aborted, traffic unchanged"
        );

        state.record(
            TransitionRecord::failed(
                attempt.action,
                attempt.from_env.clone(),
                attempt.to_env.clone(),
                reason,
                err.to_string(),
            ),
            self.config.history_limit,
        );
        if let Err(save_err) = self.store.save(state).await {
            warn!(
                attempt_id = %attempt.id,
                error = %save_err,
                "Failed to record aborted transition"
            );
        }

        err
    }
}

/// Commit and persist, detached from the caller's future.
struct CommitTask {
    store: Arc<dyn StateStore>,
    switch: Arc<dyn TrafficSwitch>,
    phase_tx: Arc<watch::Sender<TransitionPhase>>,
    history_limit: usize,
    state: DeploymentState,
    attempt: TransitionAttempt,
    candidate: Environment,
    health: ProbeReport,
    _guard: TransitionGuard,
}

impl CommitTask {
    async fn run(mut self) -> CutoverResult<TransitionReport> {
        let env = self.attempt.to_env.clone();

        if let Err(source) = self
            .switch
            .commit(&self.attempt.service, &env, &self.candidate)
            .await
        {
            error!(
                alarm = true,
                attempt_id = %self.attempt.id,
                env = %env,
                switch = self.switch.name(),
                error = %source,
                "Traffic commit failed, routing may not match persisted state"
            );
            self.fail(format!("traffic commit failed: {}", source)).await;
            return Err(CutoverError::TrafficCommitFailed { env, source });
        }

        if let Err(e) = self.apply(&env) {
            error!(
                alarm = true,
                attempt_id = %self.attempt.id,
                env = %env,
                error = %e,
                "Traffic moved but state could not be updated"
            );
            self.fail(format!("state update failed: {}", e)).await;
            return Err(CutoverError::CommitInconsistent {
                env,
                reason: e.to_string(),
            });
        }
        publish(&self.phase_tx, &mut self.attempt, TransitionPhase::Committed);

        if let Err(e) = self.store.save(&self.state).await {
            error!(
                alarm = true,
                attempt_id = %self.attempt.id,
                env = %env,
                error = %e,
                "Traffic moved but state was not persisted"
            );
            return Err(CutoverError::CommitInconsistent {
                env,
                reason: e.to_string(),
            });
        }

        info!(
            attempt_id = %self.attempt.id,
            action = %self.attempt.action,
            from = %self.attempt.from_env,
            to = %env,
            version = %self.candidate.version,
            "Transition committed"
        );

        Ok(TransitionReport {
            attempt_id: Some(self.attempt.id),
            service: self.attempt.service,
            action: self.attempt.action,
            from_env: self.attempt.from_env,
            to_env: env,
            version: self.candidate.version,
            changed: true,
            health: Some(self.health),
            completed_at: Utc::now(),
        })
    }

    fn apply(&mut self, env: &EnvName) -> Result<(), ValidationError> {
        let slot = self
            .state
            .environment_mut(env)
            .ok_or_else(|| ValidationError::UnknownEnvironment(env.clone()))?;
        *slot = self.candidate.clone();
        self.state.set_active(env.clone())?;

        let details = format!(
            "{} -> {} (version {})",
            self.attempt.from_env, env, self.candidate.version
        );
        self.state.record(
            TransitionRecord::success(
                self.attempt.action,
                self.attempt.from_env.clone(),
                env.clone(),
                details,
            ),
            self.history_limit,
        );
        Ok(())
    }

    /// Record a commit-phase failure against the unchanged state.
    async fn fail(&mut self, details: String) {
        let reason = FailureReason::CommitInconsistent;
        publish(&self.phase_tx, &mut self.attempt, TransitionPhase::Aborted(reason));
        self.state.record(
            TransitionRecord::failed(
                self.attempt.action,
                self.attempt.from_env.clone(),
                self.attempt.to_env.clone(),
                reason,
                details,
            ),
            self.history_limit,
        );
        if let Err(e) = self.store.save(&self.state).await {
            error!(
                alarm = true,
                attempt_id = %self.attempt.id,
                error = %e,
                "Failed to record inconsistent transition"
            );
        }
    }
}
