//! Configuration for Depot
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Depot - real-time shared depot for collaborative construction projects
#[derive(Parser, Debug, Clone)]
#[command(name = "depot")]
#[command(about = "Real-time shared depot for collaborative construction projects")]
pub struct Args {
    /// Unique node identifier for this depot instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Storage backend: "memory" (process lifetime) or "file" (JSON index)
    #[arg(long, env = "STORAGE", default_value = "memory")]
    pub storage: String,

    /// Data directory for the file storage backend
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Retention window in days; projects older than this are swept
    #[arg(long, env = "RETENTION_DAYS", default_value = "30")]
    pub retention_days: u64,

    /// Interval between retention sweeps in seconds
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "3600")]
    pub sweep_interval_secs: u64,

    /// Per-project broadcast channel capacity (slow subscribers beyond this lag and resync)
    #[arg(long, env = "BROADCAST_CAPACITY", default_value = "64")]
    pub broadcast_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Retention window as a duration
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    /// Sweep interval as a duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.storage.as_str() {
            "memory" | "file" => {}
            other => {
                return Err(format!(
                    "STORAGE must be \"memory\" or \"file\", got \"{}\"",
                    other
                ))
            }
        }

        if self.retention_days == 0 {
            return Err("RETENTION_DAYS must be at least 1".to_string());
        }

        if self.sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be at least 1".to_string());
        }

        if self.broadcast_capacity == 0 {
            return Err("BROADCAST_CAPACITY must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["depot"])
    }

    #[test]
    fn test_defaults_are_valid() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.storage, "memory");
        assert_eq!(args.retention_days, 30);
    }

    #[test]
    fn test_rejects_unknown_storage_backend() {
        let mut args = base_args();
        args.storage = "mongodb".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_retention() {
        let mut args = base_args();
        args.retention_days = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_retention_duration() {
        let args = base_args();
        assert_eq!(args.retention(), Duration::from_secs(30 * 24 * 60 * 60));
    }
}
