pub mod books;

use std::sync::Arc;

use bookshelf_kernel::ModuleRegistry;

use books::storage::BookStorage;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, storage: Arc<dyn BookStorage>) {
    registry.register(books::create_module(storage));
}
