//! Configuration structures for MatrixPool
//!
//! Both binaries load a YAML file named by `MATRIXPOOL_CONFIG`. Without one
//! they fall back to the built-in topology: a coordinator on port 8080 and
//! three workers on localhost:9001-9003.

use crate::error::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "MATRIXPOOL_CONFIG";

/// Top-level configuration for MatrixPool components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Mode: either "worker" or "coordinator"
    pub mode: String,

    /// Server binding address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Server port (coordinator only; workers bind their own endpoints)
    #[serde(default = "default_coordinator_port")]
    pub port: u16,

    /// Coordinator-specific configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<CoordinatorConfig>,

    /// Worker-specific configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,

    /// Observability configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

/// Coordinator-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Static worker pool, in selection order
    #[serde(default = "default_worker_endpoints")]
    pub worker_endpoints: Vec<String>,
}

/// Worker-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Addresses this worker process listens on, one listener each
    #[serde(default = "default_worker_endpoints")]
    pub endpoints: Vec<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_metrics")]
    pub enable_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            enable_metrics: default_metrics(),
        }
    }
}

/// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_coordinator_port() -> u16 {
    8080
}

fn default_worker_endpoints() -> Vec<String> {
    vec![
        "localhost:9001".to_string(),
        "localhost:9002".to_string(),
        "localhost:9003".to_string(),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics() -> bool {
    true
}

impl PoolConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| PoolError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let config: PoolConfig = serde_yaml::from_str(&content)
            .map_err(|e| PoolError::Config(format!("Failed to parse config file {}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `MATRIXPOOL_CONFIG` if set, otherwise use `fallback`
    pub fn from_env_or(fallback: impl FnOnce() -> Self) -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => {
                let config = fallback();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Built-in coordinator topology
    pub fn default_coordinator() -> Self {
        Self {
            mode: "coordinator".to_string(),
            bind_address: default_bind_address(),
            port: default_coordinator_port(),
            coordinator: Some(CoordinatorConfig {
                worker_endpoints: default_worker_endpoints(),
            }),
            worker: None,
            observability: None,
        }
    }

    /// Built-in worker topology
    pub fn default_worker() -> Self {
        Self {
            mode: "worker".to_string(),
            bind_address: default_bind_address(),
            port: default_coordinator_port(),
            coordinator: None,
            worker: Some(WorkerConfig {
                endpoints: default_worker_endpoints(),
            }),
            observability: None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.mode.as_str() {
            "worker" => {
                let worker = self.worker.as_ref()
                    .ok_or_else(|| PoolError::config("Worker config required for worker mode"))?;
                validate_endpoints(&worker.endpoints)?;
            }
            "coordinator" => {
                let coordinator = self.coordinator.as_ref()
                    .ok_or_else(|| PoolError::config("Coordinator config required for coordinator mode"))?;
                validate_endpoints(&coordinator.worker_endpoints)?;
            }
            _ => {
                return Err(PoolError::config(format!("Invalid mode: {}", self.mode)));
            }
        }
        Ok(())
    }

    /// Address the coordinator listener binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Configured log level, defaulting to "info"
    pub fn log_level(&self) -> String {
        self.observability
            .as_ref()
            .map(|o| o.log_level.clone())
            .unwrap_or_else(default_log_level)
    }

    /// Whether metrics are collected, defaulting to true
    pub fn metrics_enabled(&self) -> bool {
        self.observability
            .as_ref()
            .map_or_else(default_metrics, |o| o.enable_metrics)
    }
}

fn validate_endpoints(endpoints: &[String]) -> Result<()> {
    if endpoints.is_empty() {
        return Err(PoolError::config("At least one worker endpoint is required"));
    }

    for endpoint in endpoints {
        let (host, port) = endpoint
            .rsplit_once(':')
            .ok_or_else(|| PoolError::config(format!("Endpoint {} is not host:port", endpoint)))?;

        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(PoolError::config(format!("Endpoint {} is not host:port", endpoint)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_topologies_validate() {
        let coordinator = PoolConfig::default_coordinator();
        assert!(coordinator.validate().is_ok());
        assert_eq!(coordinator.listen_address(), "0.0.0.0:8080");
        assert_eq!(
            coordinator.coordinator.unwrap().worker_endpoints,
            vec!["localhost:9001", "localhost:9002", "localhost:9003"]
        );

        let worker = PoolConfig::default_worker();
        assert!(worker.validate().is_ok());
        assert_eq!(worker.worker.unwrap().endpoints.len(), 3);
    }

    #[test]
    fn test_config_validation_missing_coordinator() {
        let config = PoolConfig {
            coordinator: None,
            ..PoolConfig::default_coordinator()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_endpoint() {
        let mut config = PoolConfig::default_coordinator();
        config.coordinator = Some(CoordinatorConfig {
            worker_endpoints: vec!["localhost".to_string()],
        });
        assert!(config.validate().is_err());

        config.coordinator = Some(CoordinatorConfig {
            worker_endpoints: Vec::new(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_mode() {
        let config = PoolConfig {
            mode: "client".to_string(),
            ..PoolConfig::default_coordinator()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mode: coordinator\nport: 8181\ncoordinator:\n  worker_endpoints:\n    - 127.0.0.1:9101\nobservability:\n  log_level: debug\n"
        )
        .unwrap();

        let config = PoolConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8181);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.log_level(), "debug");
        assert!(config.metrics_enabled());
        assert_eq!(config.coordinator.unwrap().worker_endpoints, vec!["127.0.0.1:9101"]);
    }

    #[test]
    fn test_metrics_can_be_disabled() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mode: worker\nworker:\n  endpoints:\n    - 127.0.0.1:9101\nobservability:\n  enable_metrics: false\n"
        )
        .unwrap();

        let config = PoolConfig::from_file(file.path()).unwrap();
        assert!(!config.metrics_enabled());
        assert_eq!(config.log_level(), "info");
        assert!(PoolConfig::default_worker().metrics_enabled());
    }

    #[test]
    fn test_from_file_missing() {
        let err = PoolConfig::from_file("/nonexistent/matrixpool.yaml").unwrap_err();
        assert!(matches!(err, PoolError::Config(_)));
    }
}
