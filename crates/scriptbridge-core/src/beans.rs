//! Shared registry of host objects ("beans") visible to every engine
//!
//! The registry is a cheap-to-clone handle around one shared map. The
//! manager owns the canonical handle; engines receive clones through their
//! [`EngineContext`](crate::EngineContext) and always read the live map, so
//! a bean removed by the host is gone for every script immediately.

use crate::value::{BeanType, HostValue};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// A named host object with an optional declared type.
#[derive(Debug, Clone)]
pub struct Bean {
    pub name: String,
    pub value: HostValue,
    pub declared_type: Option<BeanType>,
}

impl Bean {
    pub fn is_declared(&self) -> bool {
        self.declared_type.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BeanRegistry {
    inner: Arc<RwLock<AHashMap<String, Bean>>>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name` without a declared type.
    pub fn register(&self, name: impl Into<String>, value: impl Into<HostValue>) {
        self.insert(name.into(), value.into(), None);
    }

    /// Insert or overwrite `name` with a declared type.
    pub fn declare(&self, name: impl Into<String>, value: impl Into<HostValue>, bean_type: BeanType) {
        self.insert(name.into(), value.into(), Some(bean_type));
    }

    fn insert(&self, name: String, value: HostValue, declared_type: Option<BeanType>) {
        tracing::trace!(bean = %name, declared = ?declared_type, "storing bean");
        let bean = Bean {
            name: name.clone(),
            value,
            declared_type,
        };
        self.inner.write().insert(name, bean);
    }

    /// Remove `name`. Returns whether a bean was present.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.inner.write().remove(name).is_some();
        tracing::trace!(bean = name, removed, "unregistered bean");
        removed
    }

    /// Remove `name`. Returns whether a bean was present.
    ///
    /// Declared and registered beans share one namespace, so this removes
    /// the entry regardless of how it was created.
    pub fn undeclare(&self, name: &str) -> bool {
        let removed = self.inner.write().remove(name).is_some();
        tracing::trace!(bean = name, removed, "undeclared bean");
        removed
    }

    pub fn lookup(&self, name: &str) -> Option<Bean> {
        self.inner.read().get(name).cloned()
    }

    /// Value of `name`, or `HostValue::Null` when absent.
    pub fn lookup_value(&self, name: &str) -> HostValue {
        self.inner
            .read()
            .get(name)
            .map(|bean| bean.value.clone())
            .unwrap_or_default()
    }

    /// The bean under `name` if it was declared with a type.
    pub fn lookup_declared(&self, name: &str) -> Option<(HostValue, BeanType)> {
        let beans = self.inner.read();
        let bean = beans.get(name)?;
        bean.declared_type.map(|ty| (bean.value.clone(), ty))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// All bean names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// All declared beans, sorted by name.
    pub fn declared(&self) -> Vec<Bean> {
        let mut beans: Vec<Bean> = self
            .inner
            .read()
            .values()
            .filter(|bean| bean.is_declared())
            .cloned()
            .collect();
        beans.sort_by(|a, b| a.name.cmp(&b.name));
        beans
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
