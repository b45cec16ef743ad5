pub mod core;
pub mod notify;
pub mod storage;
pub mod utils;

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    core::{
        attendance::AttendanceRecorder,
        services::{EngineHandle, EngineSettings, RecognitionEngine},
    },
    notify::EventBroadcaster,
    storage::{AttendanceRecord, AttendanceStore, InMemoryAttendanceStore, RocksAttendanceStore},
    utils::{
        config::{Config, StorageBackend},
        error::{EngineError, Result},
        metrics::{EngineMetrics, MetricsSnapshot},
        monitoring,
    },
};

pub struct Application {
    config: Arc<Config>,
    store: Arc<dyn AttendanceStore>,
    broadcaster: Arc<EventBroadcaster>,
    metrics: Arc<EngineMetrics>,
    engine: RecognitionEngine,
    reporter: Option<JoinHandle<()>>,
}

impl Application {
    /// Fails when the configured store cannot be opened; that is the one fatal
    /// error in the pipeline.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        info!("Initializing storage...");
        let store = open_store(&config)?;

        Ok(Self::with_store(config, store))
    }

    /// Wires the engine around an already opened store.
    pub fn with_store(config: Arc<Config>, store: Arc<dyn AttendanceStore>) -> Self {
        let metrics = Arc::new(EngineMetrics::new());

        info!("Initializing recorder and broadcaster...");
        let recorder = Arc::new(AttendanceRecorder::new(
            store.clone(),
            config.dedup_window(),
            config.get_store_timeout(),
        ));
        let broadcaster = Arc::new(EventBroadcaster::new(
            config.get_delivery_timeout(),
            metrics.clone(),
        ));

        info!("Starting recognition engine...");
        let engine = RecognitionEngine::start(
            EngineSettings::from_config(&config),
            recorder,
            broadcaster.clone(),
            metrics.clone(),
        );

        let reporter = config
            .get_metrics_interval()
            .map(|interval| monitoring::spawn_reporter(metrics.clone(), interval));

        Self {
            config,
            store,
            broadcaster,
            metrics,
            engine,
            reporter,
        }
    }

    pub fn engine(&self) -> EngineHandle {
        self.engine.handle()
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Read-only attendance listing for dashboards.
    pub async fn attendance_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        Ok(self.store.attendance_on(day).await?)
    }

    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down application...");

        if let Some(reporter) = self.reporter {
            reporter.abort();
        }

        self.engine.shutdown().await?;

        // The recorder may have just handed its last payloads to the broadcaster.
        self.broadcaster
            .drain(self.config.get_delivery_timeout())
            .await;

        let metrics = self.metrics.snapshot();
        info!(
            recorded = metrics.recorded,
            already_attended = metrics.already_attended,
            store_failures = metrics.store_failures,
            "Application shutdown complete"
        );
        Ok(())
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn AttendanceStore>> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryAttendanceStore::new())),
        StorageBackend::Rocksdb => {
            let path = config
                .storage
                .path
                .as_ref()
                .ok_or_else(|| EngineError::Config("storage.path must be set for the rocksdb backend".into()))?;
            info!("Opening attendance database at {}", path.display());
            Ok(Arc::new(RocksAttendanceStore::open(path)?))
        }
    }
}
