use std::net::Ipv4Addr;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Prometheus exposition of the watch and store metrics
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    /// Serve `/metrics` from the `dwatch` binary
    #[serde(default)]
    pub prometheus_enabled: bool,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: false,
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    /// An enabled exporter needs a fixed, unprivileged port.
    pub fn validate(&self) -> Result<()> {
        if self.prometheus_enabled && self.prometheus_port < 1024 {
            return Err(Error::InvalidConfig(format!(
                "monitoring.prometheus_port must be in 1024..=65535 when enabled, got {}",
                self.prometheus_port
            )));
        }
        Ok(())
    }

    /// Address of the metrics endpoint, `None` while the exporter is disabled.
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.prometheus_enabled
            .then(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.prometheus_port)))
    }
}

fn default_prometheus_port() -> u16 {
    9090
}
