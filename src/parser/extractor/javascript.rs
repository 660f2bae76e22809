//! JavaScript dependency-reference extraction.

use tree_sitter::Node;

use super::helpers::{node_text, string_literal};
use super::ExtractedModule;

pub fn extract_js_node(node: &Node, source: &[u8], module: &mut ExtractedModule) {
    match node.kind() {
        "call_expression" => {
            extract_js_call(node, source, module);
        }
        "import_statement" | "export_statement" => {
            // `export const x = 1` has no source and is skipped
            if let Some(name) = node
                .child_by_field_name("source")
                .and_then(|src| string_literal(&src, source))
            {
                module.push_sync(name);
            }
        }
        _ => {}
    }
}

/// `require('x')`, `import('x')` and `System.import('x')`.
fn extract_js_call(node: &Node, source: &[u8], module: &mut ExtractedModule) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    let Some(name) = first_string_argument(node, source) else {
        return;
    };

    match function.kind() {
        "identifier" if node_text(&function, source) == "require" => module.push_sync(name),
        "import" => module.push_async(name),
        "member_expression" if node_text(&function, source) == "System.import" => {
            module.push_async(name)
        }
        _ => {}
    }
}

fn first_string_argument(node: &Node, source: &[u8]) -> Option<String> {
    let arguments = node.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    string_literal(&first, source)
}
