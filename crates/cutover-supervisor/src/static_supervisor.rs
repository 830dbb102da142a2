//! Scripted supervisor for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{SupervisorError, SupervisorResult};
use crate::process::{ProcessEntry, ProcessSpec, ProcessStatus};
use crate::supervisor::ProcessSupervisor;

/// In-memory supervisor with scripted statuses and failure injection.
///
/// Each process has a queue of statuses; every status query pops the front
/// until a single status is left, which then sticks. Unknown processes are
/// offline. By default a `start` call brings the process online.
pub struct StaticSupervisor {
    statuses: Mutex<HashMap<String, VecDeque<ProcessStatus>>>,
    started: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
    start_brings_online: AtomicBool,
    fail_list: AtomicBool,
    fail_start: AtomicBool,
    fail_stop_all: AtomicBool,
    fail_start_all: AtomicBool,
    stop_all_calls: AtomicUsize,
    start_all_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StaticSupervisor {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
            start_brings_online: AtomicBool::new(true),
            fail_list: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            fail_stop_all: AtomicBool::new(false),
            fail_start_all: AtomicBool::new(false),
            stop_all_calls: AtomicUsize::new(0),
            start_all_calls: AtomicUsize::new(0),
        }
    }

    /// Pin a process to one status.
    pub fn set_status(&self, process: &str, status: ProcessStatus) {
        lock(&self.statuses).insert(process.to_string(), VecDeque::from([status]));
    }

    /// Queue a status sequence for a process.
    pub fn script(&self, process: &str, statuses: Vec<ProcessStatus>) {
        lock(&self.statuses).insert(process.to_string(), statuses.into());
    }

    pub fn set_start_brings_online(&self, enabled: bool) {
        self.start_brings_online.store(enabled, Ordering::SeqCst);
    }

    /// Make `list` (and therefore `status`) fail.
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stop_all(&self, fail: bool) {
        self.fail_stop_all.store(fail, Ordering::SeqCst);
    }

    pub fn fail_start_all(&self, fail: bool) {
        self.fail_start_all.store(fail, Ordering::SeqCst);
    }

    /// Processes passed to `start`, in call order.
    pub fn started(&self) -> Vec<String> {
        lock(&self.started).clone()
    }

    /// Processes passed to `stop`, in call order.
    pub fn stopped(&self) -> Vec<String> {
        lock(&self.stopped).clone()
    }

    pub fn stop_all_calls(&self) -> usize {
        self.stop_all_calls.load(Ordering::SeqCst)
    }

    pub fn start_all_calls(&self) -> usize {
        self.start_all_calls.load(Ordering::SeqCst)
    }

    fn next_status(&self, process: &str) -> ProcessStatus {
        let mut statuses = lock(&self.statuses);
        match statuses.get_mut(process) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(ProcessStatus::Offline),
            Some(queue) => queue.front().copied().unwrap_or(ProcessStatus::Offline),
            None => ProcessStatus::Offline,
        }
    }
}

impl Default for StaticSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSupervisor for StaticSupervisor {
    fn name(&self) -> &str {
        "static"
    }

    async fn list(&self) -> SupervisorResult<Vec<ProcessEntry>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SupervisorError::Unreachable("injected list failure".into()));
        }
        let names: Vec<String> = lock(&self.statuses).keys().cloned().collect();
        Ok(names
            .into_iter()
            .map(|name| {
                let status = self.next_status(&name);
                ProcessEntry::new(name, status)
            })
            .collect())
    }

    async fn status(&self, process: &str) -> ProcessStatus {
        if self.fail_list.load(Ordering::SeqCst) {
            return ProcessStatus::Unknown;
        }
        self.next_status(process)
    }

    async fn start(&self, spec: &ProcessSpec) -> SupervisorResult<()> {
        lock(&self.started).push(spec.name.clone());
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(SupervisorError::CommandFailed {
                command: format!("start {}", spec.name),
                code: Some(1),
                stderr: "injected start failure".into(),
            });
        }
        if self.start_brings_online.load(Ordering::SeqCst) {
            self.set_status(&spec.name, ProcessStatus::Online);
        }
        Ok(())
    }

    async fn stop(&self, process: &str) -> SupervisorResult<()> {
        lock(&self.stopped).push(process.to_string());
        self.set_status(process, ProcessStatus::Offline);
        Ok(())
    }

    async fn stop_all(&self) -> SupervisorResult<()> {
        self.stop_all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop_all.load(Ordering::SeqCst) {
            return Err(SupervisorError::Unreachable("injected stop-all failure".into()));
        }
        Ok(())
    }

    async fn start_all(&self) -> SupervisorResult<()> {
        self.start_all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start_all.load(Ordering::SeqCst) {
            return Err(SupervisorError::Unreachable("injected start-all failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_sticks_on_last_status() {
        let supervisor = StaticSupervisor::new();
        supervisor.script("api-blue", vec![ProcessStatus::Offline, ProcessStatus::Online]);

        assert_eq!(supervisor.status("api-blue").await, ProcessStatus::Offline);
        assert_eq!(supervisor.status("api-blue").await, ProcessStatus::Online);
        assert_eq!(supervisor.status("api-blue").await, ProcessStatus::Online);
        assert_eq!(supervisor.status("api-green").await, ProcessStatus::Offline);
    }

    #[tokio::test]
    async fn test_stop_marks_offline() {
        let supervisor = StaticSupervisor::new();
        supervisor.set_status("api-blue", ProcessStatus::Online);
        supervisor.stop("api-blue").await.unwrap();

        assert_eq!(supervisor.status("api-blue").await, ProcessStatus::Offline);
        assert_eq!(supervisor.stopped(), vec!["api-blue".to_string()]);
    }
}
