//! Command-line arguments of the operator binary

use crate::OperatorConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "thanos-operator", version, about = "Kubernetes operator for Thanos")]
pub struct Cli {
    /// Namespace to watch, all namespaces when omitted
    #[arg(long, env = "THANOS_OPERATOR_NAMESPACE")]
    pub namespace: Option<String>,

    /// Listen address of the health endpoint
    #[arg(long, env = "THANOS_OPERATOR_HEALTH_ADDR", default_value = "0.0.0.0:8080")]
    pub health_addr: SocketAddr,

    /// Seconds between periodic reconciliations
    #[arg(long, env = "THANOS_OPERATOR_REQUEUE_SECS", default_value_t = 300)]
    pub requeue_secs: u64,

    /// Seconds before retrying a failed reconciliation
    #[arg(long, env = "THANOS_OPERATOR_ERROR_REQUEUE_SECS", default_value_t = 30)]
    pub error_requeue_secs: u64,

    /// Field manager name for server-side apply
    #[arg(long, env = "THANOS_OPERATOR_FIELD_MANAGER", default_value = "thanos-operator")]
    pub field_manager: String,
}

impl From<Cli> for OperatorConfig {
    fn from(cli: Cli) -> Self {
        Self {
            namespace: cli.namespace,
            field_manager: cli.field_manager,
            health_addr: cli.health_addr,
            requeue_interval: Duration::from_secs(cli.requeue_secs),
            error_requeue_interval: Duration::from_secs(cli.error_requeue_secs),
        }
    }
}
