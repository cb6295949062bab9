//! Prints the CRD manifests of the operator as a YAML stream

use kube::CustomResourceExt;
use thanos_operator_sdk::{ObjectStore, Thanos};

fn main() -> anyhow::Result<()> {
    let crds = [Thanos::crd(), ObjectStore::crd()];

    for crd in &crds {
        println!("---");
        print!("{}", serde_yaml::to_string(crd)?);
    }

    Ok(())
}
