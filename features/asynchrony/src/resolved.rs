use std::{any::type_name, collections::HashMap, fmt::Debug, sync::Arc};

use crate::{
    errors::RequireError,
    types::{Injectable, Instance},
};

/// Named values in the order they were requested
///
/// Producers receive their dependencies as [Resolved], in declared order.
/// Consumers of [crate::Resolver::invoke] receive them in request order.
#[derive(Clone, Default)]
pub struct Resolved {
    values: Vec<(String, Instance)>,
}
impl Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, instance) in &self.values {
            map.entry(name, &instance.info.type_name);
        }
        map.finish()
    }
}

impl Resolved {
    pub(crate) fn new(values: Vec<(String, Instance)>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Typed access by position
    pub fn get<T: Injectable>(&self, index: usize) -> Result<Arc<T>, RequireError> {
        let (name, instance) = self.values.get(index).ok_or(RequireError::OutOfRange {
            index,
            len: self.values.len(),
        })?;

        downcast(name, instance)
    }

    /// Typed access by name
    ///
    /// If a name was requested more than once, the first occurrence is returned.
    pub fn by_name<T: Injectable>(&self, name: &str) -> Result<Arc<T>, RequireError> {
        let instance = self
            .instance_by_name(name)
            .ok_or_else(|| RequireError::NotRequested(name.to_string()))?;

        downcast(name, instance)
    }

    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).map(|(_, instance)| instance)
    }

    pub fn instance_by_name(&self, name: &str) -> Option<&Instance> {
        self.values
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, instance)| instance)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.values
            .iter()
            .map(|(name, instance)| (name.as_str(), instance))
    }

    /// Converts into a name keyed map, dropping repeated names
    pub fn into_map(self) -> HashMap<String, Instance> {
        self.values.into_iter().collect()
    }
}

fn downcast<T: Injectable>(name: &str, instance: &Instance) -> Result<Arc<T>, RequireError> {
    instance
        .downcast()
        .map_err(|actual_type| RequireError::DowncastFailed {
            name: name.to_string(),
            required_type: type_name::<T>(),
            actual_type,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved() -> Resolved {
        Resolved::new(vec![
            ("port".to_string(), Instance::new(8080_u16)),
            ("host".to_string(), Instance::new("localhost".to_string())),
        ])
    }

    #[test]
    fn positional_and_named_access() {
        let resolved = resolved();

        assert_eq!(*resolved.get::<u16>(0).unwrap(), 8080);
        assert_eq!(*resolved.by_name::<String>("host").unwrap(), "localhost");
        assert_eq!(resolved.names().collect::<Vec<_>>(), vec!["port", "host"]);
    }

    #[test]
    fn wrong_type_reports_both_types() {
        let error = resolved().get::<u32>(0).unwrap_err();

        match error {
            RequireError::DowncastFailed {
                name,
                required_type,
                actual_type,
            } => {
                assert_eq!(name, "port");
                assert_eq!(required_type, "u32");
                assert_eq!(actual_type, "u16");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_entries() {
        let resolved = resolved();

        assert!(matches!(
            resolved.get::<u16>(2),
            Err(RequireError::OutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            resolved.by_name::<u16>("user"),
            Err(RequireError::NotRequested(name)) if name == "user"
        ));
    }
}
