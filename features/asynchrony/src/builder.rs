use std::time::Duration;

use crate::{
    container::Resolver,
    dependency_graph::DependencyGraph,
    errors::BuildError,
    factories::{Declaration, InstanceFactory},
    types::Injectable,
};

/// Settings shared by all requests of a [Resolver]
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Upper bound for every `invoke` call - None waits forever
    pub timeout: Option<Duration>,
}

/// Collects declarations and validates them as a whole before building a [Resolver]
///
/// Unlike [Resolver::add], building fails if a declaration names a dependency nobody declared,
/// and reports every issue of the graph at once.
#[derive(Debug)]
pub struct ResolverBuilder {
    declarations: Vec<(String, Declaration)>,
    config: ResolverConfig,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    pub fn new() -> Self {
        ResolverBuilder {
            declarations: Vec::new(),
            config: ResolverConfig::default(),
        }
    }
}
impl ResolverBuilder {
    pub fn add(mut self, name: impl Into<String>, declaration: Declaration) -> Self {
        self.declarations.push((name.into(), declaration));
        self
    }

    pub fn add_instance<T: Injectable>(self, name: impl Into<String>, instance: T) -> Self {
        self.add(name, Declaration::instance(instance))
    }

    pub fn add_factory<Factory: InstanceFactory>(
        self,
        name: impl Into<String>,
        factory: Factory,
    ) -> Self {
        self.add(name, Declaration::from_factory(factory))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Resolver, BuildError> {
        let ResolverBuilder {
            declarations,
            config,
        } = self;

        tracing::debug!(
            "Building resolver with {} declarations",
            declarations.len()
        );

        // Build and check Graph - later declarations of a name replace earlier ones
        let mut graph = DependencyGraph::new();
        for (name, declaration) in &declarations {
            graph.insert(name.clone(), declaration.dependencies().to_vec());
        }
        graph.check()?;

        let resolver = Resolver::with_config(config);
        for (name, declaration) in declarations {
            resolver.add(name, declaration)?;
        }

        Ok(resolver)
    }
}
