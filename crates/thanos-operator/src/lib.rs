//! # Thanos Kubernetes Operator
//!
//! Builds the Deployments and Services of a Thanos installation from a
//! `Thanos` custom resource and reconciles them against the cluster.

pub mod cli;
pub mod controller;
pub mod error;
pub mod manager;
pub mod reconciler;
pub mod resource_reconciler;
pub mod resources;

pub use controller::*;
pub use error::*;
pub use manager::*;
pub use reconciler::*;
pub use resource_reconciler::*;
pub use resources::*;

use std::net::SocketAddr;
use std::time::Duration;

/// Operator configuration
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Namespace to watch, all namespaces when unset
    pub namespace: Option<String>,
    /// Field manager used for server-side apply
    pub field_manager: String,
    pub health_addr: SocketAddr,
    /// Requeue interval after a successful pass
    pub requeue_interval: Duration,
    /// Requeue interval after a failed pass
    pub error_requeue_interval: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            field_manager: MANAGED_BY.to_string(),
            health_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            requeue_interval: Duration::from_secs(300),
            error_requeue_interval: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_config_default() {
        let config = OperatorConfig::default();
        assert!(config.namespace.is_none());
        assert_eq!(config.field_manager, "thanos-operator");
        assert_eq!(config.health_addr.port(), 8080);
        assert_eq!(config.requeue_interval, Duration::from_secs(300));
        assert_eq!(config.error_requeue_interval, Duration::from_secs(30));
    }
}
