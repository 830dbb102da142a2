//! Scripted prober for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cutover_types::EnvName;

use crate::probe::{HealthOutcome, HealthProber, ProbeReport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Prober answering from per-environment outcome queues.
///
/// The last queued outcome sticks. Environments without a script are
/// healthy. Every probed URL is recorded.
#[derive(Default)]
pub struct StaticProber {
    outcomes: Mutex<HashMap<EnvName, VecDeque<HealthOutcome>>>,
    calls: Mutex<Vec<(EnvName, String)>>,
}

impl StaticProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin an environment to one outcome.
    pub fn set(&self, env: EnvName, outcome: HealthOutcome) {
        lock(&self.outcomes).insert(env, VecDeque::from([outcome]));
    }

    /// Queue an outcome sequence for an environment.
    pub fn script(&self, env: EnvName, outcomes: Vec<HealthOutcome>) {
        lock(&self.outcomes).insert(env, outcomes.into());
    }

    /// `(env, url)` of every check, in call order.
    pub fn calls(&self) -> Vec<(EnvName, String)> {
        lock(&self.calls).clone()
    }

    fn next(&self, env: &EnvName) -> HealthOutcome {
        let mut outcomes = lock(&self.outcomes);
        match outcomes.get_mut(env) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(HealthOutcome::Healthy),
            Some(queue) => queue.front().cloned().unwrap_or(HealthOutcome::Healthy),
            None => HealthOutcome::Healthy,
        }
    }
}

#[async_trait]
impl HealthProber for StaticProber {
    async fn check(&self, env: &EnvName, url: &str) -> ProbeReport {
        lock(&self.calls).push((env.clone(), url.to_string()));
        ProbeReport::new(env.clone(), url, self.next(env), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::UnhealthyReason;

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let prober = StaticProber::new();
        prober.script(
            EnvName::green(),
            vec![
                HealthOutcome::Unhealthy(UnhealthyReason::Status(503)),
                HealthOutcome::Healthy,
            ],
        );

        assert!(!prober.check(&EnvName::green(), "u").await.is_healthy());
        assert!(prober.check(&EnvName::green(), "u").await.is_healthy());
        assert!(prober.check(&EnvName::blue(), "u").await.is_healthy());
        assert_eq!(prober.calls().len(), 3);
    }
}
