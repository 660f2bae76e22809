//
//  mod.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

mod helpers;
mod javascript;

use std::path::Path;

use tree_sitter::{Node, Parser};

use super::docblock;
use crate::error::MetadataError;

/// Everything the index and resolver need from one JavaScript source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedModule {
    /// Name declared with `@providesModule`.
    pub haste_name: Option<String>,
    /// Synchronous references in source order, deduplicated.
    pub dependencies: Vec<String>,
    /// `import()` / `System.import()` references, deduplicated.
    pub async_dependencies: Vec<String>,
}

impl ExtractedModule {
    fn push_sync(&mut self, name: String) {
        if !name.is_empty() && !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
    }

    fn push_async(&mut self, name: String) {
        if !name.is_empty() && !self.async_dependencies.contains(&name) {
            self.async_dependencies.push(name);
        }
    }
}

/// Parse a JavaScript file and collect its dependency references.
pub fn extract_module(path: &Path, source: &str) -> Result<ExtractedModule, MetadataError> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| MetadataError::ParserInit(path.to_path_buf(), e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| MetadataError::Parse(path.to_path_buf()))?;

    let mut module = ExtractedModule {
        haste_name: docblock::provides_module(source),
        ..Default::default()
    };

    // Preorder walk so references come out in source order.
    let mut stack: Vec<Node> = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        javascript::extract_js_node(&node, source.as_bytes(), &mut module);

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    Ok(module)
}
