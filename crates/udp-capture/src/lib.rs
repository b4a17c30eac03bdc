mod bundle;
mod config;
mod engine;
mod extract;
mod fingerprint;
mod window;

pub use config::load_table_specs;
pub use engine::CaptureEngine;
pub use extract::ExtractOutcome;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    SourceDb(#[from] udp_source_db::SourceDbError),
    #[error(transparent)]
    Render(#[from] udp_cdc::RenderError),
    #[error(transparent)]
    Cloud(#[from] udp_cloud::CloudError),
    #[error(transparent)]
    Watermark(#[from] udp_watermark::StoreError),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
