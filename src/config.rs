use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON data file holding containers, groups and schedules.
    pub data_file: String,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Quiet period before an external edit of the data file is reloaded.
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_watch_debounce_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// IANA timezone name; day boundaries and timer windows use this zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval_secs(),
            timezone: default_timezone(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_timezone() -> String {
    "UTC".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Docker,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSection {
    #[serde(default)]
    pub kind: RuntimeKind,
    /// Containers pre-registered with the in-memory runtime.
    #[serde(default)]
    pub containers: Vec<String>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed `scheduler.timezone`.
    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.scheduler
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("scheduler.timezone {:?}: {}", self.scheduler.timezone, e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.storage.data_file.is_empty(),
            "storage.data_file must be non-empty"
        );
        anyhow::ensure!(
            self.storage.flush_interval_ms > 0,
            "storage.flush_interval_ms must be > 0, got {}",
            self.storage.flush_interval_ms
        );
        anyhow::ensure!(
            self.storage.watch_debounce_ms > 0,
            "storage.watch_debounce_ms must be > 0, got {}",
            self.storage.watch_debounce_ms
        );
        anyhow::ensure!(
            self.scheduler.poll_interval_secs > 0,
            "scheduler.poll_interval_secs must be > 0, got {}",
            self.scheduler.poll_interval_secs
        );
        self.timezone()?;
        Ok(())
    }
}
