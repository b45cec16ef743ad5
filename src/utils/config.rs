use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use config::{builder::DefaultState, Config as ConfigLib, ConfigBuilder, ConfigError, Environment, File};
use crate::utils::error::{Result, EngineError};

const DEFAULT_TRACK_THRESHOLD: f64 = 0.8;
const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;
const DEFAULT_HOLD_SECS: f64 = 1.0;
const DEFAULT_FRAME_STRIDE: u32 = 3;
const DEFAULT_SAMPLE_QUEUE: usize = 256;
const DEFAULT_GLOBAL_COOLDOWN_SECS: f64 = 3.0;
const DEFAULT_CANDIDATE_COOLDOWN_SECS: f64 = 10.0;
const DEFAULT_DEDUP_WINDOW_HOURS: i64 = 24;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RECORDER_QUEUE: usize = 16;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_METRICS_INTERVAL_SECS: u64 = 60;

// Upper bounds keep the chrono conversions below in range.
const MAX_WINDOW_SECS: f64 = 86_400.0;
const MAX_DEDUP_WINDOW_HOURS: i64 = 24 * 366 * 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub cooldown: CooldownConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Confidence a sample must exceed to start or continue a hold.
    pub track_threshold: f64,
    /// Oracle scores at or below this are treated as "unknown".
    pub match_threshold: f64,
    pub hold_secs: f64,
    /// Only every n-th frame is sent to the oracle.
    pub frame_stride: u32,
    pub sample_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            track_threshold: DEFAULT_TRACK_THRESHOLD,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            hold_secs: DEFAULT_HOLD_SECS,
            frame_stride: DEFAULT_FRAME_STRIDE,
            sample_queue_capacity: DEFAULT_SAMPLE_QUEUE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub global_secs: f64,
    pub candidate_secs: f64,
    pub rollback_on_write_failure: bool,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            global_secs: DEFAULT_GLOBAL_COOLDOWN_SECS,
            candidate_secs: DEFAULT_CANDIDATE_COOLDOWN_SECS,
            rollback_on_write_failure: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    pub dedup_window_hours: i64,
    pub store_timeout_secs: u64,
    pub recorder_queue_capacity: usize,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            dedup_window_hours: DEFAULT_DEDUP_WINDOW_HOURS,
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            recorder_queue_capacity: DEFAULT_RECORDER_QUEUE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub delivery_timeout_secs: u64,
    /// Zero disables the periodic metrics log line.
    pub metrics_interval_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: DEFAULT_DELIVERY_TIMEOUT_SECS,
            metrics_interval_secs: DEFAULT_METRICS_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Rocksdb,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "rollcall.log".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        let builder = Self::with_defaults()?
            // Load from config file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., ROLLCALL_ENGINE__HOLD_SECS)
            .add_source(
                Environment::with_prefix("ROLLCALL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn with_defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(ConfigLib::builder()
            .set_default("engine.track_threshold", DEFAULT_TRACK_THRESHOLD)?
            .set_default("engine.match_threshold", DEFAULT_MATCH_THRESHOLD)?
            .set_default("engine.hold_secs", DEFAULT_HOLD_SECS)?
            .set_default("engine.frame_stride", DEFAULT_FRAME_STRIDE as i64)?
            .set_default("engine.sample_queue_capacity", DEFAULT_SAMPLE_QUEUE as i64)?
            .set_default("cooldown.global_secs", DEFAULT_GLOBAL_COOLDOWN_SECS)?
            .set_default("cooldown.candidate_secs", DEFAULT_CANDIDATE_COOLDOWN_SECS)?
            .set_default("cooldown.rollback_on_write_failure", false)?
            .set_default("attendance.dedup_window_hours", DEFAULT_DEDUP_WINDOW_HOURS)?
            .set_default("attendance.store_timeout_secs", DEFAULT_STORE_TIMEOUT_SECS as i64)?
            .set_default("attendance.recorder_queue_capacity", DEFAULT_RECORDER_QUEUE as i64)?
            .set_default("notifications.delivery_timeout_secs", DEFAULT_DELIVERY_TIMEOUT_SECS as i64)?
            .set_default("notifications.metrics_interval_secs", DEFAULT_METRICS_INTERVAL_SECS as i64)?
            .set_default("storage.backend", "memory")?
            .set_default("logging.level", "info")?)
    }

    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if !(0.0..=1.0).contains(&engine.track_threshold) {
            return Err(EngineError::Config("track_threshold must be within [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&engine.match_threshold) {
            return Err(EngineError::Config("match_threshold must be within [0, 1]".into()));
        }
        if !window_in_range(engine.hold_secs) || engine.hold_secs <= 0.0 {
            return Err(EngineError::Config(format!(
                "hold_secs must be within (0, {}]",
                MAX_WINDOW_SECS
            )));
        }
        if engine.frame_stride == 0 {
            return Err(EngineError::Config("frame_stride must be greater than 0".into()));
        }
        if engine.sample_queue_capacity == 0 {
            return Err(EngineError::Config("sample_queue_capacity must be greater than 0".into()));
        }

        if !window_in_range(self.cooldown.global_secs) || !window_in_range(self.cooldown.candidate_secs) {
            return Err(EngineError::Config(format!(
                "cooldown windows must be within [0, {}] seconds",
                MAX_WINDOW_SECS
            )));
        }

        if !(0..=MAX_DEDUP_WINDOW_HOURS).contains(&self.attendance.dedup_window_hours) {
            return Err(EngineError::Config(format!(
                "dedup_window_hours must be within [0, {}]",
                MAX_DEDUP_WINDOW_HOURS
            )));
        }
        if self.attendance.store_timeout_secs == 0 {
            return Err(EngineError::Config("store_timeout_secs must be greater than 0".into()));
        }
        if self.attendance.recorder_queue_capacity == 0 {
            return Err(EngineError::Config("recorder_queue_capacity must be greater than 0".into()));
        }

        if self.notifications.delivery_timeout_secs == 0 {
            return Err(EngineError::Config("delivery_timeout_secs must be greater than 0".into()));
        }

        if self.storage.backend == StorageBackend::Rocksdb && self.storage.path.is_none() {
            return Err(EngineError::Config("storage.path must be set for the rocksdb backend".into()));
        }

        Ok(())
    }

    pub fn hold_duration(&self) -> chrono::Duration {
        secs_to_chrono(self.engine.hold_secs)
    }

    pub fn global_cooldown(&self) -> chrono::Duration {
        secs_to_chrono(self.cooldown.global_secs)
    }

    pub fn candidate_cooldown(&self) -> chrono::Duration {
        secs_to_chrono(self.cooldown.candidate_secs)
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.attendance.dedup_window_hours)
    }

    pub fn get_store_timeout(&self) -> Duration {
        Duration::from_secs(self.attendance.store_timeout_secs)
    }

    pub fn get_delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.notifications.delivery_timeout_secs)
    }

    pub fn get_metrics_interval(&self) -> Option<Duration> {
        match self.notifications.metrics_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Rejects NaN along with out-of-range values.
fn window_in_range(secs: f64) -> bool {
    (0.0..=MAX_WINDOW_SECS).contains(&secs)
}

fn secs_to_chrono(secs: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((secs * 1000.0).round() as i64)
}

impl From<ConfigError> for EngineError {
    fn from(error: ConfigError) -> Self {
        EngineError::Config(error.to_string())
    }
}
