//! Error types of the operator

use thanos_operator_sdk::MergeError;

/// Failure to build a desired object
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Failure of the reconcile-resource engine
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("{0} has no name")]
    MissingName(&'static str),

    #[error("{kind} {name} has no namespace")]
    MissingNamespace { kind: &'static str, name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to apply component defaults: {0}")]
    Defaults(#[from] MergeError),

    #[error("failed to create desired object {resource}: {source}")]
    Build {
        resource: &'static str,
        #[source]
        source: BuildError,
    },

    #[error("reconcile error: resource {resource} returned no object")]
    MissingObject { resource: &'static str },

    #[error("failed to reconcile resource {resource}: {source}")]
    Apply {
        resource: &'static str,
        #[source]
        source: ApplyError,
    },

    #[error("Thanos resource {0} has no namespace")]
    MissingNamespace(String),

    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl Error {
    /// Errors that only a change to the custom resource can fix
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Defaults(_) | Error::Build { .. } | Error::MissingNamespace(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
