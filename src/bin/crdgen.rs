//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of every resource kind as a
//! multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/all-crds.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use console_sync_controller::crd::{
    GitRepository, InfrastructureStack, NamespaceCredentials, NotificationRouter,
};
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [
        GitRepository::crd(),
        InfrastructureStack::crd(),
        NotificationRouter::crd(),
        NamespaceCredentials::crd(),
    ];

    for (i, crd) in crds.iter().enumerate() {
        if i > 0 {
            println!("---");
        }
        print!("{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
