//! # Resource Kinds
//!
//! Console API adapters for every synchronized resource kind.
//!
//! Each adapter implements [`Syncable`](crate::engine::Syncable): it maps a
//! resource to Console API attributes and issues the GraphQL calls for its
//! kind. Everything else is handled by the generic engine.

mod git_repository;
mod infrastructure_stack;
mod notification_router;

pub use git_repository::{GitRepositoryAdapter, GitRepositoryAttributes, GitRepositoryFragment};
pub use infrastructure_stack::{
    InfrastructureStackAdapter, InfrastructureStackFragment, StackAttributes,
};
pub use notification_router::{
    NotificationRouterAdapter, NotificationRouterAttributes, NotificationRouterFragment,
    RouterSinkAttributes,
};

use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

/// Kinds whose controllers can be enabled with `RECONCILERS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    GitRepository,
    InfrastructureStack,
    NotificationRouter,
    NamespaceCredentials,
}

impl ResourceKind {
    pub fn all() -> &'static [ResourceKind] {
        &[
            Self::GitRepository,
            Self::InfrastructureStack,
            Self::NotificationRouter,
            Self::NamespaceCredentials,
        ]
    }

    /// Name accepted by `RECONCILERS`
    pub fn name(self) -> &'static str {
        match self {
            Self::GitRepository => "gitrepository",
            Self::InfrastructureStack => "infrastructurestack",
            Self::NotificationRouter => "notificationrouter",
            Self::NamespaceCredentials => "namespacecredentials",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::all().iter().map(|k| k.name()).collect();
                anyhow!("unknown reconciler '{}', expected one of: {}", s, known.join(", "))
            })
    }
}
