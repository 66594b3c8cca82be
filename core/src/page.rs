//! Page rendering
//!
//! Embeds an annotation (or the error that replaced it) and the console
//! log into an HTML page template. Placeholders look like `{{name}}`.

use std::path::Path;

use crate::annotate::escape_html;
use crate::config::ServerConfig;
use crate::error::{Result, TypelensError};
use crate::pipeline::Annotation;
use crate::profile::LogMessage;

const BUILTIN_TEMPLATE: &str = include_str!("../templates/page.html");

/// Source annotated when the caller supplies none
pub const DEFAULT_EXAMPLE: &str = include_str!("../templates/example.js");

/// A page template with `{{name}}` placeholders
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Default for Template {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Template {
    pub fn builtin() -> Self {
        Self::from_text(BUILTIN_TEMPLATE)
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| TypelensError::InvalidConfig {
            message: format!("cannot read template {}: {}", path.as_ref().display(), e),
        })?;
        Ok(Self::from_text(text))
    }

    /// Configured template, or the built-in one
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        match &config.template {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Substitute placeholders in one pass over the template
    ///
    /// Values are looked up in `vars` in order; inserted text is never
    /// scanned again, so values may safely contain `{{...}}`. Unknown
    /// placeholders are left as they are.
    pub fn render(&self, vars: &[(&str, String)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                out.push_str(&rest[open..]);
                return out;
            };

            let name = after_open[..close].trim();
            match vars.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after_open[close + 2..];
        }

        out.push_str(rest);
        out
    }
}

/// Render console output as an HTML list
pub fn render_logs(logs: &[LogMessage]) -> String {
    let mut out = String::from("<ul class=\"logs\">");
    for log in logs {
        out.push_str(&format!(
            "<li class=\"log log-{}\"><span class=\"level\">{}</span>&nbsp;{}</li>",
            html_escape::encode_double_quoted_attribute(&log.level),
            escape_html(&log.level),
            escape_html(&log.value)
        ));
    }
    out.push_str("</ul>");
    out
}

/// Render a full page for one request's outcome
pub fn render_page(
    template: &Template,
    source: &str,
    outcome: std::result::Result<&Annotation, &TypelensError>,
) -> String {
    let (annotated, logs) = match outcome {
        Ok(annotation) => (annotation.annotated.clone(), render_logs(&annotation.logs)),
        Err(e) => (
            format!("<div class=\"error\">{}</div>", escape_html(&e.user_message())),
            render_logs(&[]),
        ),
    };

    template.render(&[
        ("version", env!("CARGO_PKG_VERSION").to_string()),
        ("annotated", annotated),
        ("logs", logs),
        ("source", escape_html(source)),
        ("source_raw", html_escape::encode_text(source).into_owned()),
    ])
}
