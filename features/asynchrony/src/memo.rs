use std::{
    future::Future,
    pin::pin,
    sync::{mpsc, Arc, Weak},
    thread,
    time::Duration,
};

use futures::{
    future::{self, BoxFuture, Either, Shared},
    FutureExt,
};
use futures_channel::oneshot;

use crate::{
    container::{Resolver, ResolverInner},
    errors::ResolveError,
    factories::ProduceFn,
    resolved::Resolved,
    types::Instance,
};

/// Single assignment result of a name, shared by all of its waiters
pub(crate) type MemoFuture = Shared<BoxFuture<'static, Result<Instance, ResolveError>>>;

impl Resolver {
    /// Returns the memo of `name`, creating it on first request
    ///
    /// Lookup and creation happen under one lock, so two requests can never create two memos.
    /// The memo is lazy: dependencies are requested once it is first polled.
    pub(crate) fn resolve(&self, name: &str, required_by: Option<&str>) -> MemoFuture {
        let mut state = self.state();

        // Check if we already have a memo
        if let Some(memo) = state.memos.get(name) {
            tracing::trace!("'{}' is already memoized", name);
            return memo.clone();
        }

        let (Some(producer), Some(dependencies)) =
            (state.producers.get(name), state.graph.dependencies(name))
        else {
            // Not memoized, the name may still be declared later
            tracing::error!("Tried to resolve an unregistered name: {}", name);
            let error = ResolveError::Unregistered {
                name: name.to_string(),
                required_by: required_by.map(str::to_string),
            };
            return future::ready(Err(error)).boxed().shared();
        };

        // The memo is owned by the resolver, so it only keeps a weak handle back
        let memo = Self::produce(
            Arc::downgrade(&self.0),
            name.to_string(),
            dependencies.to_vec(),
            producer.clone(),
        )
        .boxed()
        .shared();
        state.memos.insert(name.to_string(), memo.clone());
        tracing::debug!("Created memo for '{}'", name);

        memo
    }

    /// Waits for every dependency of `name`, then runs its producer
    async fn produce(
        resolver: Weak<ResolverInner>,
        name: String,
        dependencies: Vec<String>,
        producer: ProduceFn,
    ) -> Result<Instance, ResolveError> {
        let Some(inner) = resolver.upgrade() else {
            tracing::warn!("Resolver was dropped before '{}' was produced", name);
            return Err(ResolveError::ResolverDropped(name));
        };
        let pending: Vec<MemoFuture> = {
            let resolver = Resolver(inner);
            dependencies
                .iter()
                .map(|dependency| resolver.resolve(dependency, Some(name.as_str())))
                .collect()
        };
        let settled = future::join_all(pending).await;

        let mut values = Vec::with_capacity(dependencies.len());
        for (dependency, result) in dependencies.into_iter().zip(settled) {
            match result {
                Ok(instance) => values.push((dependency, instance)),
                Err(error) => {
                    tracing::error!(
                        "'{}' can not be produced, its dependency '{}' failed: {}",
                        name,
                        dependency,
                        error
                    );
                    return Err(error);
                }
            }
        }

        tracing::debug!("Producing '{}'", name);
        match producer(Resolved::new(values)).await {
            Ok(instance) => {
                tracing::debug!("Produced '{}' of type {}", name, instance.info);
                Ok(instance)
            }
            Err(error) => {
                tracing::error!("Producer for '{}' failed: {}", name, error);
                Err(ResolveError::ProducerFailed {
                    name,
                    error: Arc::new(error),
                })
            }
        }
    }

    /// Requests all `names` and waits until every one of them settled
    pub(crate) async fn settle(
        &self,
        names: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<Resolved, ResolveError> {
        let pending: Vec<MemoFuture> = names.iter().map(|name| self.resolve(name, None)).collect();

        let fan_in = async move {
            let settled = future::join_all(pending).await;

            let mut values = Vec::with_capacity(names.len());
            for (name, result) in names.into_iter().zip(settled) {
                values.push((name, result?));
            }
            Ok::<_, ResolveError>(Resolved::new(values))
        };

        match timeout {
            Some(timeout) => with_timeout(fan_in, timeout).await,
            None => fan_in.await,
        }
    }
}

/// Races `work` against a timer thread
///
/// The timer thread exits as soon as `work` finishes or is dropped.
async fn with_timeout<T>(
    work: impl Future<Output = Result<T, ResolveError>>,
    timeout: Duration,
) -> Result<T, ResolveError> {
    let (timeout_tx, timeout_rx) = oneshot::channel::<()>();
    let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
    // We don't join the thread - dropping cancel_tx wakes it up
    thread::spawn(move || {
        if let Err(mpsc::RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(timeout) {
            let _ = timeout_tx.send(());
        }
    });

    let result = match future::select(pin!(work), timeout_rx).await {
        Either::Left((result, _)) => result,
        Either::Right(_) => {
            tracing::error!("Resolution timed out after {:?}", timeout);
            Err(ResolveError::Timeout(timeout))
        }
    };
    drop(cancel_tx);
    result
}
