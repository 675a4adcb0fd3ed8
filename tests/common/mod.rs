// Shared test helpers

#![allow(dead_code)]

use async_trait::async_trait;
use dockhours::document_file::{Loader, Saver};
use dockhours::error::{Error, Result};
use dockhours::models::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ALL_DAYS: [u8; 7] = [0, 1, 2, 3, 4, 5, 6];

pub fn container(name: &str, active: bool) -> Container {
    Container {
        name: name.into(),
        friendly_name: name.to_uppercase(),
        url: format!("http://{}.local", name),
        running: None,
        active: Some(active),
        activated_at: None,
    }
}

pub fn group(name: &str, members: &[&str], active: Option<bool>) -> Group {
    Group {
        name: name.into(),
        container: members.iter().map(|m| m.to_string()).collect(),
        active,
    }
}

pub fn timer(start: &str, stop: &str, days: &[u8]) -> Timer {
    Timer {
        start_time: start.into(),
        stop_time: stop.into(),
        days: days.iter().map(|d| i64::from(*d)).collect(),
        active: Some(true),
    }
}

pub fn schedule(id: &str, target: &str, target_type: TargetType, timers: Vec<Timer>) -> Schedule {
    Schedule {
        id: id.into(),
        target: target.into(),
        target_type,
        timers,
    }
}

/// `web` (active) with schedule S1 09:00-17:00 every day.
pub fn office_hours_doc() -> DataDocument {
    DataDocument {
        metadata: Metadata { last_update: 1000 },
        containers: vec![container("web", true)],
        order: vec!["web".into()],
        schedules: vec![schedule(
            "S1",
            "web",
            TargetType::Container,
            vec![timer("09:00", "17:00", &ALL_DAYS)],
        )],
        ..Default::default()
    }
}

/// Loader returning a fixed document.
pub struct StaticLoader(pub DataDocument);

#[async_trait]
impl Loader for StaticLoader {
    async fn load(&self) -> Result<DataDocument> {
        Ok(self.0.clone())
    }
}

/// Saver that fails the first `failures` calls, then records every saved document.
pub struct FlakySaver {
    failures: AtomicUsize,
    pub attempts: AtomicUsize,
    pub saved: Mutex<Vec<DataDocument>>,
}

impl FlakySaver {
    pub fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn saved_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }
}

#[async_trait]
impl Saver for FlakySaver {
    async fn save(&self, doc: &DataDocument) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::io(
                "data.json",
                std::io::Error::other("disk full"),
            ));
        }
        self.saved.lock().unwrap().push(doc.clone());
        Ok(())
    }
}
