//! Asynchrony resolves a graph of named, asynchronous producers.
//!
//! Every name is declared together with the names it depends on and a producer.
//! Values are only produced when requested, and each producer runs at most once,
//! however many consumers request its value.
//!
//! The crate consists of three parts:
//! 1. [Declaration]: a producer plus its ordered dependency names
//! 2. [Resolver]: holds declarations and memoized results, resolves requests by name
//! 3. [Resolved]: ordered values handed to producers and consumers, downcast on access
//!
//! # Examples
//!
//! ```rust
//! use std::convert::Infallible;
//! use asynchrony::{Declaration, Resolved, Resolver};
//!
//! let resolver = Resolver::new();
//! resolver.add("thing1", Declaration::new(|_| async { Ok::<_, Infallible>(1_u32) })).unwrap();
//! resolver.add("thing2", Declaration::new(|_| async { Ok::<_, Infallible>(2_u32) })).unwrap();
//! resolver
//!     .add(
//!         "thing3",
//!         Declaration::with_dependencies(["thing1", "thing2"], |deps: Resolved| async move {
//!             Ok::<_, asynchrony::RequireError>(*deps.get::<u32>(0)? + *deps.get::<u32>(1)?)
//!         }),
//!     )
//!     .unwrap();
//!
//! let values = futures::executor::block_on(resolver.invoke(["thing3", "thing1"])).unwrap();
//! assert_eq!(*values.get::<u32>(0).unwrap(), 3);
//! assert_eq!(*values.get::<u32>(1).unwrap(), 1);
//!
//! // thing2 was produced for thing3, nothing is left
//! let remaining = futures::executor::block_on(resolver.invoke_remaining()).unwrap();
//! assert!(remaining.is_empty());
//! ```

pub mod builder;
pub mod container;
pub mod dependency_graph;
pub mod errors;
pub mod factories;
mod memo;
pub mod resolved;
pub mod types;

pub use builder::{ResolverBuilder, ResolverConfig};
pub use container::Resolver;
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{AddError, BuildError, CompletionDropped, RequireError, ResolveError};
pub use factories::{Completion, Declaration, InstanceFactory};
pub use resolved::Resolved;
pub use types::{DynError, Injectable, Instance, TypeInfo};
