#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[cfg(feature = "prometheus")]
    #[error(transparent)]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),

    /// Collection was requested but no exporter is compiled in.
    #[cfg(not(feature = "prometheus"))]
    #[error("metrics enabled but no exporter compiled in; build with `prometheus`")]
    ExporterUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
