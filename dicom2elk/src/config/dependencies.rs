//! Dependency initialization and wiring for a dicom2elk run.

use std::sync::Arc;
use tracing::{info, warn};

use super::{OutputMode, RunSettings};
use crate::AppError;
use dicom2elk_pipeline::{BulkSink, Dispatcher, ErrorLog, ProgressObserver, RunController};
use dicom2elk_repository::{BulkIndexProvider, IndexConnection, OpenSearchClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured controller ready to run.
    pub controller: RunController,
    /// Side-channel receiving the paths of unreadable files.
    pub error_log: Arc<ErrorLog>,
}

impl Dependencies {
    /// Build the pipeline for `settings`.
    ///
    /// In search index mode the connection file is loaded and the cluster
    /// is probed; an unhealthy or unreachable cluster only warns here, the
    /// first bulk upload decides.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If the connection file is missing or invalid
    pub async fn new(
        settings: &RunSettings,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<Self, AppError> {
        let error_log = Arc::new(ErrorLog::for_log_file(&settings.log_file));

        let dispatcher = Dispatcher::from_config(
            &settings.dispatch_config(),
            settings.job_settings(),
            error_log.clone(),
        )
        .with_progress(progress);

        let controller = match settings.mode {
            OutputMode::Json => RunController::new(dispatcher),
            OutputMode::Elasticsearch => {
                let config_path = settings.config.as_ref().ok_or_else(|| {
                    AppError::config("a connection file is required in elasticsearch mode")
                })?;
                let connection = IndexConnection::from_file(config_path)?;

                info!(
                    url = %connection.url,
                    port = connection.port,
                    index = %connection.index,
                    "Initializing search index client"
                );

                let client = OpenSearchClient::new(&connection)?;

                match client.health_check().await {
                    Ok(true) => info!("Search index connection verified"),
                    Ok(false) => warn!("Search index cluster reports an unhealthy status"),
                    Err(e) => warn!(error = %e, "Search index health check failed"),
                }

                RunController::with_bulk_sink(dispatcher, BulkSink::new(Arc::new(client)))
            }
        };

        Ok(Self {
            controller,
            error_log,
        })
    }
}
