//! ShelfMedia Plugin Entry Point

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::handlers::UploadHandler;
use crate::models::{OptimizationPreset, PresetName, PresetRegistry};
use crate::services::{
    InputValidator, JsonRecordStore, LocalStorage, MigrationDriver, MigrationOptions,
    MigrationReport, ObjectStore, OptimizerService, RecordError, RecordStore, StorageError,
};
use crate::settings::MediaSettings;

/// ShelfMedia Plugin
pub struct ShelfMediaPlugin {
    /// Plugin settings
    settings: Arc<RwLock<MediaSettings>>,

    /// Services
    presets: Arc<PresetRegistry>,
    storage: Arc<LocalStorage>,
    optimizer: OptimizerService,

    /// Handlers
    upload_handler: Arc<UploadHandler>,
}

impl ShelfMediaPlugin {
    /// Create a new plugin instance with default settings
    pub fn new() -> Self {
        Self::with_settings(MediaSettings::default())
    }

    /// Create with custom settings
    pub fn with_settings(settings: MediaSettings) -> Self {
        let presets = Arc::new(PresetRegistry::standard());
        let storage = Arc::new(LocalStorage::new(&settings.storage_path, &settings.base_url));
        let optimizer = OptimizerService::new(Arc::clone(&presets))
            .with_validator(InputValidator::with_max_upload_bytes(settings.max_upload_bytes));

        let object_store: Arc<dyn ObjectStore> = storage.clone();
        let upload_handler = Arc::new(UploadHandler::new(optimizer.clone(), object_store));

        Self {
            settings: Arc::new(RwLock::new(settings)),
            presets,
            storage,
            optimizer,
            upload_handler,
        }
    }

    /// Initialize the plugin
    pub async fn initialize(&self) -> Result<(), StorageError> {
        self.storage.init().await?;
        tracing::info!(root = %self.storage.root().display(), "ShelfMedia initialized");
        Ok(())
    }

    /// Get plugin name
    pub fn name(&self) -> &'static str {
        "ShelfMedia"
    }

    /// Get plugin version
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Get plugin description
    pub fn description(&self) -> &'static str {
        "Adaptive image optimization for bookstore media"
    }

    // Service accessors
    pub fn presets(&self) -> &Arc<PresetRegistry> {
        &self.presets
    }

    pub fn preset(&self, name: PresetName) -> &OptimizationPreset {
        self.presets.get(name)
    }

    pub fn storage(&self) -> &Arc<LocalStorage> {
        &self.storage
    }

    pub fn optimizer(&self) -> &OptimizerService {
        &self.optimizer
    }

    pub fn upload_handler(&self) -> &Arc<UploadHandler> {
        &self.upload_handler
    }

    /// Get current settings
    pub async fn get_settings(&self) -> MediaSettings {
        self.settings.read().await.clone()
    }

    /// Open the record store named in the settings
    pub async fn open_records(&self) -> Result<Arc<JsonRecordStore>, RecordError> {
        let path = self.settings.read().await.records_path.clone();
        Ok(Arc::new(JsonRecordStore::open(path).await?))
    }

    /// Build a migration driver over this plugin's storage
    pub async fn migration_driver(&self, records: Arc<dyn RecordStore>) -> MigrationDriver {
        let threshold = self.settings.read().await.skip_threshold_percent;
        let storage: Arc<dyn ObjectStore> = self.storage.clone();

        MigrationDriver::new(storage, records, self.optimizer.clone()).with_skip_threshold(threshold)
    }

    /// Re-optimize stored images against the record store from the settings
    pub async fn migrate(&self, options: &MigrationOptions) -> Result<MigrationReport, RecordError> {
        let records = self.open_records().await?;
        let driver = self.migration_driver(records).await;
        driver.run(options).await
    }
}

impl Default for ShelfMediaPlugin {
    fn default() -> Self {
        Self::new()
    }
}
