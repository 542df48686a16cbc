//! Document normalization: heterogeneous upload formats to plain text.
//!
//! Dispatch is by declared file extension. PDF content is extracted
//! page-wise; markdown and HTML are reduced to readable text in document
//! order; JSON is pretty-printed as a single unit; plain text passes
//! through. Anything else is rejected with
//! [`PipelineError::UnsupportedFormat`] before any store I/O happens.
//!
//! Every emitted unit carries the originating filename — downstream
//! stages cite it in generated test cases.

use anyhow::{anyhow, Context, Result};

use crate::error::PipelineError;
use crate::models::NormalizedUnit;

/// Extensions accepted by [`normalize`].
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["pdf", "md", "json", "html", "txt"];

/// Convert an uploaded file into provenance-tagged text units.
pub fn normalize(filename: &str, bytes: &[u8]) -> Result<Vec<NormalizedUnit>> {
    let ext = extension_of(filename);
    match ext.as_str() {
        "pdf" => normalize_pdf(filename, bytes),
        "md" => Ok(vec![NormalizedUnit::new(
            flatten_markdown(&String::from_utf8_lossy(bytes)),
            filename,
        )]),
        "json" => normalize_json(filename, bytes),
        "html" => normalize_html(filename, bytes),
        "txt" => Ok(vec![NormalizedUnit::new(
            String::from_utf8_lossy(bytes).into_owned(),
            filename,
        )]),
        _ => Err(PipelineError::UnsupportedFormat(ext).into()),
    }
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// One unit per page; pages whose extracted text is blank are skipped.
fn normalize_pdf(filename: &str, bytes: &[u8]) -> Result<Vec<NormalizedUnit>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| anyhow!("PDF extraction failed for {}: {}", filename, e))?;
    Ok(pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .map(|page| NormalizedUnit::new(page, filename))
        .collect())
}

/// Pretty-print the document so nested structure survives chunking as
/// indented lines. Treated as one unit.
fn normalize_json(filename: &str, bytes: &[u8]) -> Result<Vec<NormalizedUnit>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .with_context(|| format!("Invalid JSON in {}", filename))?;
    let text = serde_json::to_string_pretty(&value)?;
    Ok(vec![NormalizedUnit::new(text, filename)])
}

/// Walk the markup as an event stream and keep text content in document
/// order, skipping `<script>` and `<style>` bodies. Tag-nesting checks
/// are relaxed because real-world HTML rarely closes everything.
fn normalize_html(filename: &str, bytes: &[u8]) -> Result<Vec<NormalizedUnit>> {
    let mut reader = quick_xml::Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    let mut segments: Vec<String> = Vec::new();
    let mut skip_depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if is_non_content(e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if is_non_content(e.local_name().as_ref()) {
                    skip_depth = skip_depth.saturating_sub(1);
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if skip_depth == 0 => {
                let text = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()).into_owned());
                if !text.trim().is_empty() {
                    segments.push(text.trim().to_string());
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!("HTML extraction failed for {}: {}", filename, e));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(vec![NormalizedUnit::new(segments.join("\n"), filename)])
}

fn is_non_content(tag: &[u8]) -> bool {
    matches!(tag, b"script" | b"style")
}

/// Strip markdown syntax down to its readable text: heading markers,
/// list bullets, blockquote markers, fence delimiters, emphasis, and
/// link/image wrappers.
fn flatten_markdown(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            continue;
        }
        let stripped = strip_line_marker(trimmed);
        out.push(strip_inline_markup(stripped));
    }
    out.join("\n")
}

fn strip_line_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix('#') {
        let rest = rest.trim_start_matches('#');
        return rest.strip_prefix(' ').unwrap_or(rest);
    }
    for marker in ["- ", "* ", "+ ", "> "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest;
        }
    }
    line
}

/// Remove emphasis characters and unwrap `[text](url)` / `![alt](url)`.
fn strip_inline_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' | '`' => i += 1,
            '!' if chars.get(i + 1) == Some(&'[') => i += 1,
            '[' => {
                // Unwrap the link text and skip the (url) part if present.
                if let Some(close) = find_from(&chars, i + 1, ']') {
                    let inner: String = chars[i + 1..close].iter().collect();
                    out.push_str(&strip_inline_markup(&inner));
                    if chars.get(close + 1) == Some(&'(') {
                        if let Some(paren) = find_from(&chars, close + 2, ')') {
                            i = paren + 1;
                            continue;
                        }
                    }
                    i = close + 1;
                } else {
                    out.push('[');
                    i += 1;
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn find_from(chars: &[char], start: usize, needle: char) -> Option<usize> {
    chars[start..].iter().position(|&c| c == needle).map(|p| p + start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = normalize("report.xyz", b"anything").unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::UnsupportedFormat(ext)) => assert_eq!(ext, "xyz"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn extensionless_filename_is_rejected() {
        let err = normalize("Makefile", b"all:").unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
    }

    #[test]
    fn txt_passes_through_with_provenance() {
        let units = normalize("notes.txt", b"plain text body").unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "plain text body");
        assert_eq!(units[0].source, "notes.txt");
    }

    #[test]
    fn json_is_pretty_printed_as_one_unit() {
        let units = normalize("config.json", br#"{"a":{"b":1}}"#).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].text.contains("\"b\": 1"));
    }

    #[test]
    fn invalid_json_fails_with_filename_context() {
        let err = normalize("broken.json", b"{not json").unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }

    #[test]
    fn html_keeps_text_and_drops_scripts() {
        let html = br#"<html><head><script>var x = 1;</script><style>.a{}</style></head>
<body><h1>Checkout</h1><p>Enter a discount code.</p></body></html>"#;
        let units = normalize("checkout.html", html).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].text.contains("Checkout"));
        assert!(units[0].text.contains("Enter a discount code."));
        assert!(!units[0].text.contains("var x"));
    }

    #[test]
    fn markdown_is_flattened_to_readable_text() {
        let md = b"# Title\n\n- item one\n- item two\n\nSee [the spec](spec.md) for *details*.";
        let units = normalize("readme.md", md).unwrap();
        let text = &units[0].text;
        assert!(text.contains("Title"));
        assert!(!text.contains('#'));
        assert!(text.contains("item one"));
        assert!(!text.contains("- item"));
        assert!(text.contains("See the spec for details."));
    }

    #[test]
    fn invalid_pdf_fails() {
        assert!(normalize("doc.pdf", b"not a pdf").is_err());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let units = normalize("NOTES.TXT", b"upper").unwrap();
        assert_eq!(units[0].source, "NOTES.TXT");
    }
}
