//! Host environment
//!
//! The runtime never touches storage itself: resolving what a module path
//! means and producing a compiled module for it belong to the host. Both
//! operations may suspend (loading is I/O, equivalence may canonicalize
//! paths) and both may fail; failures surface out of `next_output`
//! unchanged.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use libretto_compiler::Module;

use crate::error::BoxError;

#[async_trait]
pub trait Environment: Send + Sync {
    /// Whether two module identifiers name the same module.
    async fn module_path_equals(&self, a: &str, b: &str) -> Result<bool, BoxError>;

    /// Produce the module for `target`. `current_path` is the requesting
    /// module, letting hosts resolve relative references.
    async fn load_module(&self, target: &str, current_path: &str) -> Result<Module, BoxError>;
}

#[derive(Debug, Error)]
#[error("module not found: {0}")]
pub struct ModuleNotFound(pub String);

/// In-memory environment: exact path strings mapped to modules. The
/// reference implementation for hosts that precompile everything, and the
/// backbone of the test suites.
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    modules: HashMap<String, Module>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.path().to_string(), module);
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.insert(module);
        self
    }
}

#[async_trait]
impl Environment for MemoryEnvironment {
    async fn module_path_equals(&self, a: &str, b: &str) -> Result<bool, BoxError> {
        Ok(a.trim() == b.trim())
    }

    async fn load_module(&self, target: &str, _current_path: &str) -> Result<Module, BoxError> {
        self.modules
            .get(target.trim())
            .cloned()
            .ok_or_else(|| ModuleNotFound(target.to_string()).into())
    }
}
