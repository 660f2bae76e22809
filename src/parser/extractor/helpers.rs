//
//  helpers.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use tree_sitter::Node;

/// Get the full text of a node.
pub fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Strip one layer of matching quotes or backticks.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for quote in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Value of a plain string literal node (no template substitutions).
pub fn string_literal(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => Some(strip_quotes(node_text(node, source)).to_string()),
        "template_string" if !has_substitution(node) => {
            Some(strip_quotes(node_text(node, source)).to_string())
        }
        _ => None,
    }
}

fn has_substitution(node: &Node) -> bool {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "template_substitution");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"hello\""), "hello");
        assert_eq!(strip_quotes("'hello'"), "hello");
        assert_eq!(strip_quotes("`hello`"), "hello");
        assert_eq!(strip_quotes("hello"), "hello");
        assert_eq!(strip_quotes("'"), "'");
    }
}
