//! StrategyRegistry — discriminant name → strategy implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use rebalancer_core::Union;

use crate::error::{RebalanceError, RebalanceResult};

/// A table of implementations for one strategy family.
///
/// Writes happen only during startup composition; afterwards every access
/// is a read, so concurrent reconcile passes never contend.
pub struct StrategyRegistry<T: ?Sized> {
    family: &'static str,
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: ?Sized> StrategyRegistry<T> {
    /// Create an empty registry for the named family.
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Family name, e.g. "metrics".
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Register an implementation under a discriminant.
    ///
    /// # Panics
    ///
    /// If `name` is already registered.
    pub fn register(&self, name: &str, strategy: Arc<T>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            panic!("{} strategy {name:?} already registered", self.family);
        }
        entries.insert(name.to_string(), strategy);
        debug!(family = self.family, %name, "strategy registered");
    }

    /// Look up an implementation by discriminant.
    pub fn lookup(&self, name: &str) -> Option<Arc<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).cloned()
    }

    /// Registered discriminants, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Pick the implementation selected by a union.
    ///
    /// The union must have exactly one populated member, and that member's
    /// discriminant must be registered.
    pub fn resolve<U: Union>(&self, union: &U) -> RebalanceResult<Arc<T>> {
        let name = union.discriminant()?;
        self.lookup(name).ok_or_else(|| RebalanceError::NotFound {
            family: self.family,
            name: name.to_string(),
        })
    }
}
