use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

/// Errors produced by user supplied producers
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume that producers may run on a multithreaded async runtime
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A produced value
///
/// Cheap to clone, every waiter of a name receives a clone of the same instance.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub fn new<Value: Injectable>(value: Value) -> Self {
        Instance {
            info: TypeInfo::of::<Value>(),
            instance: Arc::new(value),
        }
    }

    /// Downcasts the instance, returning the actual type name on mismatch
    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        if !self.info.is::<T>() {
            return Err(self.info.type_name);
        }
        Arc::downcast::<T>(self.instance.clone()).map_err(|_| self.info.type_name)
    }

    /// Returns true if both instances point to the same value
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

/// Type of a produced value, compared by id and reported by name
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Returns true if this describes `T`
    pub fn is<T: 'static + ?Sized>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_info_matches_by_id() {
        let info = TypeInfo::of::<u32>();

        assert!(info.is::<u32>());
        assert!(!info.is::<u64>());
        assert_eq!(info.to_string(), "u32");
    }

    #[test]
    fn downcast_reports_actual_type() {
        let instance = Instance::new(String::from("value"));

        assert_eq!(*instance.downcast::<String>().unwrap(), "value");
        assert_eq!(
            instance.downcast::<u32>().unwrap_err(),
            std::any::type_name::<String>()
        );
    }
}
