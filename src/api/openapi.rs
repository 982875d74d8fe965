//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time by utoipa and served at
//! `/openapi.json` (and through Swagger UI when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the catalog-dl REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "catalog-dl REST API",
        version = "0.1.0",
        description = "Submit catalog tracks for download, follow job status and tune concurrency at runtime",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local server")
    ),
    paths(
        // Downloads
        crate::api::routes::submit_download,

        // Status
        crate::api::routes::list_status,
        crate::api::routes::get_status,

        // Configuration
        crate::api::routes::get_config,
        crate::api::routes::update_config,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(
        schemas(
            crate::api::routes::SubmitDownloadRequest,
            crate::api::routes::SubmitDownloadResponse,
            crate::api::routes::JobStatusView,
            crate::types::JobId,
            crate::types::JobStatus,
            crate::types::JobMetadata,
            crate::types::Job,
            crate::types::Store,
            crate::types::TrackRequest,
            crate::types::Event,
            crate::config::Config,
            crate::config::DownloadConfig,
            crate::config::CatalogConfig,
            crate::config::ApiConfig,
            crate::config::ConfigUpdate,
            crate::config::DownloadLimits,
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "downloads", description = "Batch submission"),
        (name = "status", description = "Job status queries"),
        (name = "config", description = "Runtime configuration"),
        (name = "system", description = "Health, documentation and events")
    )
)]
pub struct ApiDoc;
