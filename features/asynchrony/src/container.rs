use std::{
    collections::HashMap,
    fmt::Debug,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    builder::{ResolverBuilder, ResolverConfig},
    dependency_graph::{DependencyGraph, DependencyGraphErrors},
    errors::{AddError, ResolveError},
    factories::{Declaration, ProduceFn},
    memo::MemoFuture,
    resolved::Resolved,
};

/// Container resolving named values
///
/// Every declared producer runs at most once for the lifetime of the resolver,
/// no matter how many consumers request its value or how deep it is nested in the graph.
/// Cloning is cheap, all clones share the same declarations and memos.
#[derive(Clone)]
pub struct Resolver(pub(crate) Arc<ResolverInner>);
pub(crate) struct ResolverInner {
    state: Mutex<ResolverState>,
    config: ResolverConfig,
}

/// Declarations and memos, guarded together so memo creation is a single check-and-set
#[derive(Default)]
pub(crate) struct ResolverState {
    pub(crate) graph: DependencyGraph,
    pub(crate) producers: HashMap<String, ProduceFn>,
    pub(crate) memos: HashMap<String, MemoFuture>,
}

impl ResolverState {
    /// Declared names without a memo, sorted
    fn unrequested(&self) -> Vec<String> {
        self.graph
            .names()
            .filter(|name| !self.memos.contains_key(*name))
            .map(str::to_string)
            .collect()
    }
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        let mut map = f.debug_struct("Resolver");
        for name in state.graph.names() {
            let val = if state.memos.contains_key(name) {
                "requested"
            } else {
                "declared"
            };
            map.field(name, &val);
        }
        map.finish()
    }
}
impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self(Arc::new(ResolverInner {
            state: Mutex::new(ResolverState::default()),
            config,
        }))
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.0.config
    }

    /// Declares `name`, replacing an earlier declaration which was never requested
    ///
    /// Never triggers any computation. Fails if the declaration closes a cycle,
    /// in which case the previous declaration of `name` stays in place.
    pub fn add(&self, name: impl Into<String>, declaration: Declaration) -> Result<(), AddError> {
        let name = name.into();
        let Declaration {
            dependencies,
            produce,
        } = declaration;

        let mut state = self.state();
        if state.memos.contains_key(&name) {
            tracing::error!("Tried to redeclare '{}' after it was requested", name);
            return Err(AddError::AlreadyResolved(name));
        }

        let previous = state.graph.insert(name.clone(), dependencies);
        if let Err(error) = state.graph.check_from(&name) {
            state.graph.restore(&name, previous);
            tracing::error!("Rejected declaration of '{}': {}", name, error);
            return Err(error.into());
        }

        match previous {
            Some(_) => tracing::debug!("Redeclared '{}'", name),
            None => tracing::debug!("Declared '{}'", name),
        }
        state.producers.insert(name, produce);

        Ok(())
    }

    /// Resolves all `names`, returning their values in request order
    pub async fn invoke<I, S>(&self, names: I) -> Result<Resolved, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.settle(names, self.0.config.timeout).await
    }

    /// Resolves all `names` and hands their values to `consumer`
    pub async fn invoke_with<I, S, F, R>(&self, names: I, consumer: F) -> Result<R, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(Resolved) -> R,
    {
        self.invoke(names).await.map(consumer)
    }

    /// Like [Resolver::invoke], with a timeout for this call only
    pub async fn invoke_timeout<I, S>(
        &self,
        names: I,
        timeout: Duration,
    ) -> Result<Resolved, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.settle(names, Some(timeout)).await
    }

    /// Resolves every declared name which was not requested so far
    ///
    /// The set of names is taken when called, names declared afterwards are not included.
    /// Values are ordered by name.
    pub fn invoke_remaining(&self) -> impl Future<Output = Result<Resolved, ResolveError>> + '_ {
        let remaining = self.state().unrequested();

        tracing::debug!("Flushing {} remaining declarations", remaining.len());
        self.settle(remaining, self.0.config.timeout)
    }

    /// Validates the whole graph
    ///
    /// Reports missing dependencies, which [Resolver::add] allows for out of order declaration.
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        self.state().graph.check()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state().graph.contains(name)
    }

    /// Returns true once `name` was requested, its value may still be pending
    pub fn is_memoized(&self, name: &str) -> bool {
        self.state().memos.contains_key(name)
    }

    /// All declared names, sorted
    pub fn names(&self) -> Vec<String> {
        self.state().graph.names().map(str::to_string).collect()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ResolverState> {
        // State is only mutated in short critical sections which never call user code
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
