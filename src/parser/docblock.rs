//! Leading docblock parsing (`/** @providesModule Name */`).

/// Return the leading `/** ... */` comment of a source file, if any.
///
/// A shebang line before the comment is allowed.
pub fn extract(source: &str) -> Option<&str> {
    let mut rest = source.trim_start();
    if rest.starts_with("#!") {
        rest = rest.split_once('\n').map(|(_, tail)| tail).unwrap_or("").trim_start();
    }
    if !rest.starts_with("/**") {
        return None;
    }
    let end = rest.find("*/")?;
    Some(&rest[3..end])
}

/// Haste name declared by `@providesModule` (or the short `@provides`).
pub fn provides_module(source: &str) -> Option<String> {
    let block = extract(source)?;
    for line in block.lines() {
        let line = line.trim_start().trim_start_matches('*').trim();
        let value = line
            .strip_prefix("@providesModule")
            .or_else(|| line.strip_prefix("@provides"));
        if let Some(value) = value {
            // `@providesModuleFoo` is not a directive
            if !value.starts_with(char::is_whitespace) {
                continue;
            }
            if let Some(name) = value.split_whitespace().next() {
                return Some(name.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provides_module() {
        let src = "/**\n * Copyright\n *\n * @providesModule Utils\n * @flow\n */\nmodule.exports = 1;";
        assert_eq!(provides_module(src), Some("Utils".to_string()));
    }

    #[test]
    fn test_short_provides_and_shebang() {
        let src = "#!/usr/bin/env node\n/** @provides Tool extra */\n";
        assert_eq!(provides_module(src), Some("Tool".to_string()));
    }

    #[test]
    fn test_no_docblock() {
        assert_eq!(provides_module("var x = 1; /** @providesModule Late */"), None);
        assert_eq!(provides_module("// @providesModule Line\n"), None);
        assert_eq!(provides_module("/** @providesModuleX */"), None);
        assert_eq!(provides_module(""), None);
    }
}
