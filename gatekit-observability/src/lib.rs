pub mod access_log;
pub mod logger;
pub mod metrics;
pub mod prometheus_exporter;
