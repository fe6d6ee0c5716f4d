// ============================================================
// ROW SANITIZER
// ============================================================
// Trim, HTML-escape and script-filter recognized cells

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::csv::{CsvField, FieldRecord, HeaderRow, RawRow};

static ENTITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]{1,31}|#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6});").unwrap()
});

static DANGEROUS_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|iframe|object|embed)\b[^>]*>.*?</(?:script|style|iframe|object|embed)\s*>")
        .unwrap()
});

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<\s*(/?)\s*([A-Za-z][A-Za-z0-9]*)[^>]*>").unwrap());

static UNCLOSED_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*$").unwrap());

/// Inline tags the filter lets through, without attributes
const ALLOWED_TAGS: &[&str] = &[
    "a", "em", "strong", "cite", "blockquote", "code", "ul", "ol", "li", "dl", "dt", "dd",
];

/// Escape HTML special characters, leaving well-formed entities as they are
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (idx, ch) in value.char_indices() {
        match ch {
            '&' if ENTITY_PATTERN.is_match(&value[idx..]) => escaped.push('&'),
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Strip executable markup while keeping benign text
pub fn filter_xss(value: &str) -> String {
    let mut cleaned: String = value.chars().filter(|c| *c != '\0').collect();

    // Removing one construct can expose another, so repeat until stable
    loop {
        let mut next = DANGEROUS_BLOCK_PATTERN.replace_all(&cleaned, "").to_string();

        next = TAG_PATTERN
            .replace_all(&next, |caps: &regex::Captures| {
                let tag = caps[2].to_ascii_lowercase();
                if ALLOWED_TAGS.contains(&tag.as_str()) {
                    format!("<{}{}>", &caps[1], tag)
                } else {
                    String::new()
                }
            })
            .to_string();

        next = UNCLOSED_TAG_PATTERN.replace_all(&next, "").to_string();

        if next == cleaned {
            return cleaned;
        }
        cleaned = next;
    }
}

/// Full cell transform applied before a value is trusted as storage input
pub fn sanitize_value(value: &str) -> String {
    let escaped = escape_html(value.trim());
    filter_xss(&escaped).trim().to_string()
}

/// Maps raw rows onto the recognized fields
pub struct RowSanitizer {
    recognized: HashSet<String>,
}

impl RowSanitizer {
    pub fn new<I, S>(recognized_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recognized: recognized_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_recognized(&self, name: &str) -> bool {
        self.recognized.contains(name)
    }

    /// Build the record for one row; unrecognized columns are not even sanitized
    pub fn sanitize(&self, header: &HeaderRow, row: &RawRow) -> FieldRecord {
        let mut record = FieldRecord::new(row.line);

        for (position, name) in header.names().iter().enumerate() {
            if !self.is_recognized(name) {
                continue;
            }

            let Some(cell) = row.cell(position) else {
                continue;
            };

            let value = sanitize_value(cell);
            if value.is_empty() {
                continue;
            }

            record.insert(CsvField::new(name.clone(), value));
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> HeaderRow {
        HeaderRow::new(["first_name", "email", "last_name"])
    }

    fn sanitizer() -> RowSanitizer {
        RowSanitizer::new(["first_name", "last_name"])
    }

    fn row(cells: &[&str]) -> RawRow {
        RawRow::new(2, cells.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_escape_html_special_characters() {
        assert_eq!(
            escape_html(r#"Tom & "Jerry" <b>'s"#),
            "Tom &amp; &quot;Jerry&quot; &lt;b&gt;&#039;s"
        );
    }

    #[test]
    fn test_escape_keeps_existing_entities() {
        assert_eq!(escape_html("Fish &amp; Chips &#039;"), "Fish &amp; Chips &#039;");
        assert_eq!(escape_html("AT&T"), "AT&amp;T");
    }

    #[test]
    fn test_filter_removes_script_blocks() {
        assert_eq!(filter_xss("Ann<script>alert(1)</script> Lee"), "Ann Lee");
        assert_eq!(filter_xss("<img src=x onerror=alert(1)>Bo"), "Bo");
        assert_eq!(filter_xss("<scr<script></script>ipt>alert(1)"), "alert(1)");
    }

    #[test]
    fn test_filter_keeps_allowed_tags_without_attributes() {
        assert_eq!(
            filter_xss(r#"<em onclick="x()">hi</em>"#),
            "<em>hi</em>"
        );
        assert_eq!(filter_xss("plain text"), "plain text");
        assert_eq!(filter_xss("a\0b"), "ab");
    }

    #[test]
    fn test_sanitize_value_pipeline() {
        assert_eq!(sanitize_value("  Ann  "), "Ann");
        assert_eq!(
            sanitize_value("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#039;x&#039;)&lt;/script&gt;"
        );
        assert_eq!(sanitize_value("   "), "");
    }

    #[test]
    fn test_sanitize_value_is_idempotent() {
        let inputs = [
            "  Ann & Lee ",
            "<b>bold</b>",
            "O'Neil \"quoted\"",
            "x \0",
            "&amp; already",
            "<script>alert(1)</script>",
            "5 > 3 && 2 < 4",
        ];
        for input in inputs {
            let once = sanitize_value(input);
            assert_eq!(sanitize_value(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_unrecognized_columns_are_dropped() {
        let record = sanitizer().sanitize(&header(), &row(&["Ann", "ann@example.com", "Lee"]));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("first_name"), Some("Ann"));
        assert_eq!(record.get("email"), None);
        assert_eq!(record.get("last_name"), Some("Lee"));
    }

    #[test]
    fn test_short_row_maps_missing_cells_to_absent() {
        let record = sanitizer().sanitize(&header(), &row(&["Ann"]));
        assert_eq!(record.get("first_name"), Some("Ann"));
        assert_eq!(record.get("last_name"), None);
    }

    #[test]
    fn test_blank_values_produce_empty_record() {
        let record = sanitizer().sanitize(&header(), &row(&["   ", "ann@example.com", ""]));
        assert!(record.is_empty());
    }
}
