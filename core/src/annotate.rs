//! Source annotator
//!
//! Merges type samples back onto the source text. Every sampled position
//! gets one highlighted label per observed type, placed just before the
//! source character at that position. Source text is copied exactly once,
//! in order, and HTML-escaped on the way out.

use tracing::warn;

use crate::config::AnnotateConfig;
use crate::profile::{ScriptTypeProfile, TypeSample};

/// Substitutions applied by [`escape_html`], in order.
///
/// `&` has to go first, otherwise the entities produced by later rules
/// would be escaped again.
const ESCAPES: [(&str, &str); 7] = [
    ("&", "&amp;"),
    (" ", "&nbsp;"),
    ("<", "&lt;"),
    (">", "&gt;"),
    ("\r\n", "<br/>"),
    ("\n", "<br/>"),
    ("\"", "&quot;"),
];

/// Escape source text for display inside an HTML page
pub fn escape_html(text: &str) -> String {
    let mut escaped = text.to_string();
    for (pattern, replacement) in ESCAPES {
        escaped = escaped.replace(pattern, replacement);
    }
    escaped
}

/// Renders type markers over source text
#[derive(Debug, Clone)]
pub struct Annotator {
    marker_color: String,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::from_config(&AnnotateConfig::default())
    }
}

impl Annotator {
    pub fn new(marker_color: impl Into<String>) -> Self {
        Self {
            marker_color: marker_color.into(),
        }
    }

    pub fn from_config(config: &AnnotateConfig) -> Self {
        Self::new(config.marker_color.clone())
    }

    /// Produce the annotated HTML fragment for `source`
    pub fn annotate(&self, profiles: &[ScriptTypeProfile], source: &str) -> String {
        let mut samples: Vec<&TypeSample> = profiles.iter().flat_map(|p| p.entries.iter()).collect();
        // Stable: samples sharing an offset keep their input order
        samples.sort_by_key(|sample| sample.offset);

        let mut out = String::with_capacity(source.len() * 2);
        let mut cursor = SourceCursor::new(source);

        for sample in samples {
            out.push_str(&escape_html(cursor.advance_to(sample.offset)));
            if cursor.position() < sample.offset {
                warn!(
                    "[Annotator] Sample offset {} is past the end of the source ({}), clamping",
                    sample.offset,
                    cursor.position()
                );
            }
            for ty in &sample.types {
                out.push_str(&self.marker(&ty.name));
            }
        }

        out.push_str(&escape_html(cursor.rest()));
        out
    }

    fn marker(&self, name: &str) -> String {
        format!(
            r#"<span class="type-marker" style="background-color:{}">{}</span>"#,
            html_escape::encode_double_quoted_attribute(&self.marker_color),
            html_escape::encode_text(name)
        )
    }
}

/// Annotate with the default marker style
pub fn annotate(profiles: &[ScriptTypeProfile], source: &str) -> String {
    Annotator::default().annotate(profiles, source)
}

/// Forward-only cursor over source text, addressed in UTF-16 code units
/// (the unit V8 reports offsets in)
struct SourceCursor<'a> {
    source: &'a str,
    byte: usize,
    unit: usize,
}

impl<'a> SourceCursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            byte: 0,
            unit: 0,
        }
    }

    fn position(&self) -> usize {
        self.unit
    }

    /// Move up to `offset` and return the text passed over.
    /// Never moves backwards; stops at the end of the source.
    fn advance_to(&mut self, offset: usize) -> &'a str {
        let source = self.source;
        let start = self.byte;
        for ch in source[start..].chars() {
            if self.unit >= offset {
                break;
            }
            self.unit += ch.len_utf16();
            self.byte += ch.len_utf8();
        }
        &source[start..self.byte]
    }

    fn rest(&mut self) -> &'a str {
        let source = self.source;
        let start = self.byte;
        self.byte = source.len();
        self.unit += source[start..].encode_utf16().count();
        &source[start..]
    }
}
