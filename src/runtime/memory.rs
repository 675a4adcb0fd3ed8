// In-process runtime for tests and docker-less runs.
// Tracks a known set of containers, which of them run, and how often
// start/stop were called.

use super::{ContainerUsage, Runtime};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    known: BTreeSet<String>,
    running: HashSet<String>,
    failing: HashSet<String>,
    starts: HashMap<String, usize>,
    stops: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct MemoryRuntime {
    state: Mutex<State>,
}

impl MemoryRuntime {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rt = Self::default();
        for n in names {
            rt.add(n);
        }
        rt
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn add(&self, name: impl Into<String>) {
        self.with_state(|s| {
            s.known.insert(name.into());
        });
    }

    /// Flips running state directly, bypassing the call counters.
    pub fn set_running(&self, name: &str, running: bool) {
        self.with_state(|s| {
            if running {
                s.running.insert(name.to_string());
            } else {
                s.running.remove(name);
            }
        });
    }

    /// Makes every call for `name` fail until cleared.
    pub fn set_failing(&self, name: &str, failing: bool) {
        self.with_state(|s| {
            if failing {
                s.failing.insert(name.to_string());
            } else {
                s.failing.remove(name);
            }
        });
    }

    pub fn start_calls(&self, name: &str) -> usize {
        self.with_state(|s| s.starts.get(name).copied().unwrap_or(0))
    }

    pub fn stop_calls(&self, name: &str) -> usize {
        self.with_state(|s| s.stops.get(name).copied().unwrap_or(0))
    }

    pub fn running(&self, name: &str) -> bool {
        self.with_state(|s| s.running.contains(name))
    }
}

fn check(state: &State, name: &str) -> anyhow::Result<()> {
    anyhow::ensure!(state.known.contains(name), "no such container: {}", name);
    anyhow::ensure!(
        !state.failing.contains(name),
        "runtime failure for container {}",
        name
    );
    Ok(())
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn is_running(&self, name: &str) -> anyhow::Result<bool> {
        self.with_state(|s| {
            check(s, name)?;
            Ok(s.running.contains(name))
        })
    }

    async fn start(&self, name: &str) -> anyhow::Result<()> {
        self.with_state(|s| {
            *s.starts.entry(name.to_string()).or_default() += 1;
            check(s, name)?;
            s.running.insert(name.to_string());
            Ok(())
        })
    }

    async fn stop(&self, name: &str) -> anyhow::Result<()> {
        self.with_state(|s| {
            *s.stops.entry(name.to_string()).or_default() += 1;
            check(s, name)?;
            s.running.remove(name);
            Ok(())
        })
    }

    async fn list_containers(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.with_state(|s| s.known.iter().cloned().collect()))
    }

    async fn stats(&self, name: &str) -> anyhow::Result<ContainerUsage> {
        self.with_state(|s| {
            check(s, name)?;
            Ok(ContainerUsage::default())
        })
    }
}
