use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{Ctp1, Dtlz2, Function, Zdt1};

type Constructor = Arc<dyn Fn() -> Arc<dyn Function> + Send + Sync>;

/// A name-keyed factory for evaluation functions.
///
/// Lookups by unknown names return `None`.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the benchmark functions registered.
    ///
    /// Registered names: `strand::zdt1` (30 variables), `strand::dtlz2`
    /// (12 variables, 3 objectives) and `strand::ctp1`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("strand::zdt1", || Arc::new(Zdt1::new(30)));
        registry.register("strand::dtlz2", || Arc::new(Dtlz2::new(12, 3)));
        registry.register("strand::ctp1", || Arc::new(Ctp1));
        registry
    }

    /// Registers a constructor, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Arc<dyn Function> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    /// Constructs the function registered under `name`.
    #[must_use]
    pub fn create(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.constructors.get(name).map(|constructor| constructor())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
