//! # Kubernetes Controller
//!
//! Controller wiring for Thanos resources

use crate::error::{Error, Result};
use crate::reconciler::ThanosComponentReconciler;
use crate::resource_reconciler::GenericResourceReconciler;
use crate::OperatorConfig;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, ListParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use std::sync::Arc;
use thanos_operator_sdk::{ObjectStore, Thanos};
use tracing::{debug, info, instrument, warn, Level};

/// Shared state of the reconcile and error policy functions
pub struct Context {
    pub client: Client,
    pub config: OperatorConfig,
}

/// Reconcile one Thanos resource
#[instrument(
    skip_all,
    fields(name = thanos.metadata.name, namespace = thanos.metadata.namespace),
    err(level = Level::WARN)
)]
pub async fn reconcile(thanos: Arc<Thanos>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = thanos
        .namespace()
        .ok_or_else(|| Error::MissingNamespace(thanos.name_any()))?;

    let object_stores: Api<ObjectStore> = Api::namespaced(ctx.client.clone(), &namespace);
    let object_stores = object_stores.list(&ListParams::default()).await?.items;
    debug!(count = object_stores.len(), "Found object stores");

    let mut engine = GenericResourceReconciler::new(ctx.client.clone(), &ctx.config.field_manager);
    if let Some(owner) = thanos.controller_owner_ref(&()) {
        engine = engine.with_owner(owner);
    }

    let reconciler =
        ThanosComponentReconciler::new(thanos.as_ref().clone(), object_stores, &engine)?;

    match reconciler.reconcile().await? {
        Some(action) => Ok(action),
        None => {
            info!("All components reconciled");
            Ok(requeue_action(&ctx.config))
        }
    }
}

fn requeue_action(config: &OperatorConfig) -> Action {
    Action::requeue(config.requeue_interval)
}

/// Configuration errors wait for the resource to change, everything else is retried
#[allow(clippy::needless_pass_by_value)]
pub fn error_policy(thanos: Arc<Thanos>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(name = %thanos.name_any(), %error, "Reconciliation failed");
    error_action(error, &ctx.config)
}

fn error_action(error: &Error, config: &OperatorConfig) -> Action {
    if error.is_configuration() {
        Action::await_change()
    } else {
        Action::requeue(config.error_requeue_interval)
    }
}

/// Controller for Thanos resources
pub struct ThanosController {
    client: Client,
    config: OperatorConfig,
}

impl ThanosController {
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self { client, config }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
    {
        match &self.config.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    /// Run the controller until its watch streams end
    pub async fn run(self) {
        info!(namespace = ?self.config.namespace, "Starting Thanos controller");

        let thanos: Api<Thanos> = self.api();
        let deployments: Api<Deployment> = self.api();
        let services: Api<Service> = self.api();

        let ctx = Arc::new(Context {
            client: self.client.clone(),
            config: self.config.clone(),
        });

        Controller::new(thanos, watcher::Config::default())
            .owns(deployments, watcher::Config::default())
            .owns(services, watcher::Config::default())
            .run(reconcile, error_policy, ctx)
            .for_each(|result| async move {
                match result {
                    Ok((object, action)) => debug!(%object, ?action, "Reconciled"),
                    Err(err) => warn!(%err, "Reconcile loop error"),
                }
            })
            .await;

        info!("Thanos controller stopped");
    }
}
