use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    dependency_graph::{DependencyGraphError, DependencyGraphErrors},
    types::DynError,
};

/// Errors when declaring a dependency
#[derive(Error, Debug, Clone)]
pub enum AddError {
    /// The declaration does not fit into the dependency graph
    #[error(transparent)]
    Graph(#[from] DependencyGraphError),
    /// The name was already requested, its value can no longer be replaced
    #[error("'{0}' has already been requested and can no longer be redeclared")]
    AlreadyResolved(String),
}

/// Errors while resolving named values
///
/// A single failure is handed to every waiter of a name, so all variants are cheap to clone.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// Nothing was declared under the requested name
    #[error("'{name}' is not registered{}", required_by_suffix(.required_by))]
    Unregistered {
        name: String,
        required_by: Option<String>,
    },
    /// A producer failed, or one of the producers it depends on failed
    #[error("Producer for '{name}' failed - error: {error}")]
    ProducerFailed { name: String, error: Arc<DynError> },
    /// Resolution did not finish in time
    #[error("Resolution timed out after {0:?}")]
    Timeout(Duration),
    /// Every handle of the resolver was dropped while `name` was still pending
    #[error("Resolver was dropped before '{0}' was produced")]
    ResolverDropped(String),
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(dependent) => format!(" (required by '{dependent}')"),
        None => String::new(),
    }
}

/// Errors when accessing a resolved value
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    /// Positional access past the end of the resolved values
    #[error("No value at position {index}, only {len} values were resolved")]
    OutOfRange { index: usize, len: usize },
    /// Access by a name which was not part of the request
    #[error("'{0}' was not requested")]
    NotRequested(String),

    #[error("Failed to downcast '{name}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        name: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
}

/// Errors while building a resolver
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// A declaration was rejected
    #[error(transparent)]
    Add(#[from] AddError),
    /// There are issues with the dependency graph
    #[error(transparent)]
    Graph(#[from] DependencyGraphErrors),
}

/// A completion handle was dropped without being called
#[derive(Error, Debug, Clone, Copy)]
#[error("Completion handle was dropped before the producer completed")]
pub struct CompletionDropped;
