//! Built-in codegen plugins
//!
//! Default order matters: rebuilding matches classes by their canonical name,
//! so it must run before renaming.

use crate::pipeline::CodegenPlugin;

mod class_rebuilding;
mod class_renaming;
mod head_import_rewriting;
mod import_auto_adding;

pub use class_rebuilding::ClassRebuildingPlugin;
pub use class_renaming::ClassRenamingPlugin;
pub use head_import_rewriting::HeadImportRewritingPlugin;
pub use import_auto_adding::ImportAutoAddingPlugin;

/// Built-in plugins in their default order
#[must_use]
pub fn default_plugins() -> Vec<Box<dyn CodegenPlugin>> {
    vec![
        Box::new(ClassRebuildingPlugin),
        Box::new(ClassRenamingPlugin),
        Box::new(ImportAutoAddingPlugin),
        Box::new(HeadImportRewritingPlugin),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order() {
        let names: Vec<String> = default_plugins().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["class-rebuilding", "class-renaming", "import-auto-adding", "head-import-rewriting"]
        );
    }
}
