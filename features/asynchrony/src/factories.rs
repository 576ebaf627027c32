use std::{convert::Infallible, fmt::Debug, future::Future, sync::Arc};

use futures::{
    future::{self, BoxFuture},
    FutureExt,
};
use futures_channel::oneshot;

use crate::{
    errors::CompletionDropped,
    resolved::Resolved,
    types::{DynError, Injectable, Instance},
};

/// Type erased producer, called at most once per resolver
pub(crate) type ProduceFn =
    Arc<dyn Fn(Resolved) -> BoxFuture<'static, Result<Instance, DynError>> + Send + Sync>;

/// A Factory providing a named value
pub trait InstanceFactory: Send + Sync + 'static {
    type Provides: Injectable;

    /// Names the factory needs, in the order they are handed to [InstanceFactory::construct]
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Constructs the provided value
    ///
    /// Returns the constructed value, or an error if the construction failed
    fn construct(
        &self,
        dependencies: Resolved,
    ) -> impl Future<Output = Result<Self::Provides, impl Into<DynError>>> + Send;
}

/// Everything needed to produce a named value
///
/// # Example
/// ```rust
/// use std::convert::Infallible;
/// use asynchrony::{Declaration, Resolved};
///
/// let port = Declaration::new(|_| async { Ok::<_, Infallible>(8080_u16) });
/// let address = Declaration::new(|deps: Resolved| async move {
///     let port = deps.get::<u16>(0)?;
///     Ok::<_, asynchrony::RequireError>(format!("127.0.0.1:{port}"))
/// })
/// .depends_on(["port"]);
/// ```
#[derive(Clone)]
pub struct Declaration {
    pub(crate) dependencies: Vec<String>,
    pub(crate) produce: ProduceFn,
}
impl Debug for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Declaration")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl Declaration {
    /// Declares an async producer
    pub fn new<F, Fut, T, E>(producer: F) -> Self
    where
        F: Fn(Resolved) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError>,
    {
        let produce: ProduceFn = Arc::new(move |dependencies| {
            producer(dependencies)
                .map(|result| {
                    result
                        .map(Instance::new)
                        .map_err(|error| -> DynError { error.into() })
                })
                .boxed()
        });

        Self {
            dependencies: Vec::new(),
            produce,
        }
    }

    /// Declares an async producer together with its dependencies
    pub fn with_dependencies<I, S, F, Fut, T, E>(dependencies: I, producer: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Resolved) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError>,
    {
        Self::new(producer).depends_on(dependencies)
    }

    /// Declares a callback style producer which signals its result through a [Completion]
    ///
    /// The callback is invoked synchronously when the value is first needed.
    /// Dropping the [Completion] without calling it fails the value.
    pub fn from_callback<F>(callback: F) -> Self
    where
        F: Fn(Resolved, Completion) + Send + Sync + 'static,
    {
        let produce: ProduceFn = Arc::new(move |dependencies| {
            let (tx, rx) = oneshot::channel();
            callback(dependencies, Completion { tx });

            async move {
                match rx.await {
                    Ok(result) => result,
                    Err(oneshot::Canceled) => Err(Box::new(CompletionDropped) as DynError),
                }
            }
            .boxed()
        });

        Self {
            dependencies: Vec::new(),
            produce,
        }
    }

    /// Declares a factory, taking the dependencies it names
    pub fn from_factory<Factory: InstanceFactory>(factory: Factory) -> Self {
        let dependencies = factory.dependencies();
        let factory = Arc::new(factory);

        let produce: ProduceFn = Arc::new(move |resolved| {
            let factory = factory.clone();
            async move {
                // Forward the call to the specific implementation
                factory
                    .construct(resolved)
                    .await
                    .map(Instance::new)
                    .map_err(|e| -> DynError { e.into() })
            }
            .boxed()
        });

        Self {
            dependencies,
            produce,
        }
    }

    /// Declares an already built value
    pub fn instance<T: Injectable>(value: T) -> Self {
        let instance = Instance::new(value);
        let produce: ProduceFn =
            Arc::new(move |_| future::ready(Ok::<_, DynError>(instance.clone())).boxed());

        Self {
            dependencies: Vec::new(),
            produce,
        }
    }

    /// Sets the names this declaration depends on, in the order they are handed to the producer
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Single use completion handle handed to callback producers
///
/// Consumed when called, so a producer can complete at most once.
pub struct Completion {
    tx: oneshot::Sender<Result<Instance, DynError>>,
}
impl Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("canceled", &self.tx.is_canceled())
            .finish()
    }
}

impl Completion {
    /// Completes with either a value or an error
    pub fn complete<T: Injectable, E: Into<DynError>>(self, result: Result<T, E>) {
        // Error can be ignored as it just means nobody waits for the value anymore
        let _ = self.tx.send(result.map(Instance::new).map_err(Into::into));
    }

    pub fn resolve<T: Injectable>(self, value: T) {
        self.complete(Ok::<_, Infallible>(value));
    }

    pub fn reject(self, error: impl Into<DynError>) {
        self.complete(Err::<(), _>(error));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;

    use super::*;

    #[test]
    fn async_producer_receives_dependencies() {
        let declaration = Declaration::with_dependencies(["a", "b"], |deps: Resolved| async move {
            let a = deps.get::<u32>(0)?;
            let b = deps.get::<u32>(1)?;
            Ok::<_, DynError>(*a * 10 + *b)
        });
        assert_eq!(declaration.dependencies(), ["a", "b"]);

        let deps = Resolved::new(vec![
            ("a".to_string(), Instance::new(4_u32)),
            ("b".to_string(), Instance::new(2_u32)),
        ]);
        let produced = block_on((declaration.produce)(deps)).unwrap();
        assert_eq!(*produced.downcast::<u32>().unwrap(), 42);
    }

    #[test]
    fn callback_producer_completes_through_handle() {
        let declaration = Declaration::from_callback(|_, complete| complete.resolve("done"));

        let produced = block_on((declaration.produce)(Resolved::default())).unwrap();
        assert_eq!(*produced.downcast::<&str>().unwrap(), "done");
    }

    #[test]
    fn callback_producer_rejects() {
        let declaration =
            Declaration::from_callback(|_, complete| complete.reject("no connection"));

        let error = block_on((declaration.produce)(Resolved::default())).unwrap_err();
        assert_eq!(error.to_string(), "no connection");
    }

    #[test]
    fn dropped_completion_fails_instead_of_stalling() {
        let declaration = Declaration::from_callback(|_, complete| drop(complete));

        let error = block_on((declaration.produce)(Resolved::default())).unwrap_err();
        assert!(error.downcast_ref::<CompletionDropped>().is_some());
    }

    #[test]
    fn instance_is_shared_not_rebuilt() {
        let declaration = Declaration::instance(String::from("config"));

        let first = block_on((declaration.produce)(Resolved::default())).unwrap();
        let second = block_on((declaration.produce)(Resolved::default())).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(*first.downcast::<String>().unwrap(), "config");
    }

    struct Counted {
        built: Arc<AtomicUsize>,
    }
    impl InstanceFactory for Counted {
        type Provides = usize;

        fn dependencies(&self) -> Vec<String> {
            vec!["seed".to_string()]
        }

        async fn construct(&self, dependencies: Resolved) -> Result<usize, DynError> {
            let seed = dependencies.get::<usize>(0)?;
            Ok(*seed + self.built.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn factory_declares_its_own_dependencies() {
        let built = Arc::new(AtomicUsize::new(0));
        let declaration = Declaration::from_factory(Counted {
            built: built.clone(),
        });
        assert_eq!(declaration.dependencies(), ["seed"]);

        let deps = Resolved::new(vec![("seed".to_string(), Instance::new(5_usize))]);
        let produced = block_on((declaration.produce)(deps)).unwrap();
        assert_eq!(*produced.downcast::<usize>().unwrap(), 5);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
