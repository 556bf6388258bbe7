//! Interfaces of compiled modules, shared between compilations.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use viuact_emit::{InterfaceSource, ModuleView};
use viuact_ir::{Name, StringInterner};

use crate::CompiledModule;

/// Module views keyed by module path (`Std::Io` is `[Std, Io]`).
///
/// Libraries are compiled first and published here; modules importing them
/// are then compiled against the registry.
#[derive(Default)]
pub struct InterfaceRegistry {
    modules: RwLock<FxHashMap<Vec<Name>, Arc<ModuleView>>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `view` importable as `path`. Returns the view it replaces.
    pub fn register(&self, path: Vec<Name>, view: Arc<ModuleView>) -> Option<Arc<ModuleView>> {
        tracing::debug!(module = view.name(), "interface registered");
        self.modules.write().insert(path, view)
    }

    /// Make a compiled module importable under its own name.
    pub fn publish(
        &self,
        compiled: &CompiledModule,
        interner: &StringInterner,
    ) -> Option<Arc<ModuleView>> {
        let path = compiled
            .name
            .split("::")
            .map(|segment| interner.intern(segment))
            .collect();
        self.register(path, Arc::clone(&compiled.view))
    }

    pub fn contains(&self, path: &[Name]) -> bool {
        self.modules.read().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

impl InterfaceSource for InterfaceRegistry {
    fn interface(&self, path: &[Name]) -> Option<Arc<ModuleView>> {
        self.modules.read().get(path).cloned()
    }
}
