use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use anyhow::{Result, Context};
use regex::Regex;

static PATH_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<path(\s[^>]*)?/?>").unwrap());

static D_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sd\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|quot|apos|lt|gt|amp);").unwrap());

/// Drawing commands of the first `<path>` in an SVG document, or `None` when it has none.
/// Attribute values are normalised the way an XML parser reports them: literal
/// tabs and line breaks become spaces, then entity and character references are decoded.
pub fn first_path_data(document: &str) -> Option<String> {
    let attrs = PATH_ELEMENT.captures(document)?.get(1)?.as_str();
    let caps = D_ATTRIBUTE.captures(attrs)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    Some(decode_entities(&normalize_whitespace(raw)))
}

/// Reads an SVG file and returns its first path's `d` attribute, empty if there is no path.
pub fn read_first_path(svg_path: &Path) -> Result<String> {
    let document = fs::read_to_string(svg_path)
        .with_context(|| format!("Failed to read SVG {:?}", svg_path))?;
    Ok(first_path_data(&document).unwrap_or_default())
}

fn normalize_whitespace(raw: &str) -> String {
    // CRLF counts as a single line break.
    raw.replace("\r\n", " ")
        .replace(['\r', '\n', '\t'], " ")
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY
        .replace_all(raw, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "quot" => Some('"'),
                "apos" => Some('\''),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                _ => {
                    let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => name[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POTRACE_SVG: &str = r##"<?xml version="1.0" standalone="no"?>
<svg version="1.0" xmlns="http://www.w3.org/2000/svg"
 width="4800.000000pt" height="3600.000000pt" viewBox="0 0 4800.000000 3600.000000"
 preserveAspectRatio="xMidYMid meet">
<g transform="translate(0.000000,3600.000000) scale(0.100000,-0.100000)"
fill="#000000" stroke="none">
<path d="M0 18000 l0 -18000 24000 0
24000 0 0 18000 0 18000 -24000 0 -24000 0 0 -18000z"/>
<path d="M10 10 l5 5z"/>
</g>
</svg>"##;

    #[test]
    fn test_first_path_only() {
        let d = first_path_data(POTRACE_SVG).unwrap();
        assert_eq!(
            d,
            "M0 18000 l0 -18000 24000 0 24000 0 0 18000 0 18000 -24000 0 -24000 0 0 -18000z"
        );
    }

    #[test]
    fn test_line_breaks_in_path_data_become_spaces() {
        let svg = "<svg><g><path d=\"M0 18000 l0 -18000 24000 0\n24000 0 0 18000z\"/></g></svg>";
        assert_eq!(
            first_path_data(svg).as_deref(),
            Some("M0 18000 l0 -18000 24000 0 24000 0 0 18000z")
        );
        let svg = "<path d=\"M1 1\r\nl2 2\tz\"/>";
        assert_eq!(first_path_data(svg).as_deref(), Some("M1 1 l2 2 z"));
    }

    #[test]
    fn test_decodes_character_references() {
        let svg = "<path d=\"M1&#10;2&#x41;&#X42; &#xZZ; &bogus;\"/>";
        assert_eq!(first_path_data(svg).as_deref(), Some("M1\n2AB &#xZZ; &bogus;"));
    }

    #[test]
    fn test_document_without_path() {
        assert_eq!(first_path_data("<svg><g></g></svg>"), None);
    }

    #[test]
    fn test_ignores_similar_attributes() {
        let svg = r#"<svg><path id="a" fill-rule="evenodd" data-d="x" d='M1 1L2 2'/></svg>"#;
        assert_eq!(first_path_data(svg).as_deref(), Some("M1 1L2 2"));
    }

    #[test]
    fn test_ignores_pathlike_elements() {
        let svg = r#"<svg><pathology d="X"/><path d="M3 3"/></svg>"#;
        assert_eq!(first_path_data(svg).as_deref(), Some("M3 3"));
    }

    #[test]
    fn test_decodes_entities() {
        let svg = r#"<path d="M0 0 &quot;q&quot; &amp;"/>"#;
        assert_eq!(first_path_data(svg).as_deref(), Some(r#"M0 0 "q" &"#));
    }

    #[test]
    fn test_read_first_path_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame_0000.svg");
        fs::write(&path, "<svg></svg>")?;
        assert_eq!(read_first_path(&path)?, "");
        assert!(read_first_path(&dir.path().join("missing.svg")).is_err());
        Ok(())
    }
}
