//! Platform-suffix conventions.
//!
//! A file named `Button.ios.js` is the `ios` variant of `Button`. Assets add a
//! scale suffix as well: `logo@2x.android.png`. Everything here is a pure
//! function of the file name and the allow-list.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

/// Key used in the name index for files without a platform suffix.
pub const GENERIC_PLATFORM: &str = "generic";

/// Suffix tried between the requested platform and the generic file.
pub const NATIVE_PLATFORM: &str = "native";

/// Infer the platform tag from a file name (`Foo.ios.js` -> `ios`).
///
/// Only the last two dot-separated segments of the file name are considered,
/// and the tag must be in `platforms`.
pub fn platform_extension(path: &Path, platforms: &HashSet<String>) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let last = file_name.rfind('.')?;
    let second_to_last = file_name[..last].rfind('.')?;
    let tag = &file_name[second_to_last + 1..last];
    platforms.contains(tag).then(|| tag.to_string())
}

/// Parsed parts of an asset file name.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetName {
    pub name: String,
    pub resolution: f32,
    pub platform: Option<String>,
    pub ext: String,
}

impl AssetName {
    /// Split `logo@2x.ios.png` into `logo`, `2.0`, `ios`, `png`.
    pub fn parse(path: &Path, platforms: &HashSet<String>) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let (stem, ext) = file_name.rsplit_once('.')?;
        let platform = platform_extension(path, platforms);
        let stem = match &platform {
            Some(tag) => stem.strip_suffix(tag.as_str())?.strip_suffix('.')?,
            None => stem,
        };
        let (name, resolution) = split_scale(stem);

        Some(Self {
            name: name.to_string(),
            resolution,
            platform,
            ext: ext.to_string(),
        })
    }

    /// Regex matching every scale/platform variant of this asset in a directory.
    pub fn variants_pattern(&self, platform: Option<&str>) -> Option<Regex> {
        let mut pattern = format!("^{}(@[\\d\\.]+x)?", regex::escape(&self.name));
        if let Some(platform) = platform {
            pattern.push_str(&format!("(\\.{})?", regex::escape(platform)));
        }
        pattern.push_str(&format!("\\.{}$", regex::escape(&self.ext)));
        Regex::new(&pattern).ok()
    }
}

fn split_scale(stem: &str) -> (&str, f32) {
    if let Some((name, scale)) = stem.rsplit_once('@') {
        if let Some(number) = scale.strip_suffix('x') {
            if let Ok(resolution) = number.parse::<f32>() {
                return (name, resolution);
            }
        }
    }
    (stem, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platforms(tags: &[&str]) -> HashSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_infers_allowed_platform() {
        let allowed = platforms(&["ios", "android"]);
        assert_eq!(
            platform_extension(Path::new("Foo.ios.js"), &allowed),
            Some("ios".to_string())
        );
        assert_eq!(
            platform_extension(Path::new("/app/src/Foo.android.js"), &allowed),
            Some("android".to_string())
        );
    }

    #[test]
    fn test_unknown_suffix_falls_back_to_none() {
        let allowed = platforms(&["ios", "android"]);
        assert_eq!(platform_extension(Path::new("Foo.win.js"), &allowed), None);
        assert_eq!(platform_extension(Path::new("Foo.js"), &allowed), None);
        assert_eq!(platform_extension(Path::new("Foo"), &allowed), None);
    }

    #[test]
    fn test_dotted_directory_is_ignored() {
        let allowed = platforms(&["ios"]);
        assert_eq!(
            platform_extension(Path::new("/app/lib.ios/Foo.js"), &allowed),
            None
        );
    }

    #[test]
    fn test_parse_asset_name() {
        let allowed = platforms(&["ios"]);
        let asset = AssetName::parse(Path::new("/a/logo@2x.ios.png"), &allowed).unwrap();
        assert_eq!(asset.name, "logo");
        assert_eq!(asset.resolution, 2.0);
        assert_eq!(asset.platform.as_deref(), Some("ios"));
        assert_eq!(asset.ext, "png");

        let plain = AssetName::parse(Path::new("icon.png"), &allowed).unwrap();
        assert_eq!(plain.name, "icon");
        assert_eq!(plain.resolution, 1.0);
        assert_eq!(plain.platform, None);
    }

    #[test]
    fn test_variants_pattern() {
        let asset = AssetName::parse(Path::new("logo.png"), &HashSet::new()).unwrap();
        let re = asset.variants_pattern(Some("ios")).unwrap();
        assert!(re.is_match("logo.png"));
        assert!(re.is_match("logo@3x.png"));
        assert!(re.is_match("logo@1.5x.ios.png"));
        assert!(!re.is_match("logo.android.png"));
        assert!(!re.is_match("logos.png"));
    }
}
