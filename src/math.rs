//! Math rendering backends used when Markdown math events are turned into HTML.

use tracing::debug;

use crate::error::{Error, Result};

/// Classes a client-side math engine is configured to process.
pub const MARKER_CLASSES: &str = "mjx-process mjx-formula";

/// Turns one formula into HTML.
pub trait MathRenderer {
    /// `latex` is the formula body without its delimiters.
    fn render(&self, latex: &str, display: bool) -> Result<String>;
}

/// Wraps raw LaTeX (delimiters included) in a marker element for the
/// client-side engine. The LaTeX goes in as-is.
pub fn deferred_markup(latex: &str, display: bool) -> String {
    let tag = if display { "div" } else { "span" };
    format!("<{tag} class=\"{MARKER_CLASSES}\">{latex}</{tag}>")
}

/// Leaves typesetting to the browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredRenderer;

impl MathRenderer for DeferredRenderer {
    fn render(&self, latex: &str, display: bool) -> Result<String> {
        let escaped = htmlescape::encode_minimal(latex);
        let delimited = if display {
            format!("$${escaped}$$")
        } else {
            format!("${escaped}$")
        };
        Ok(deferred_markup(&delimited, display))
    }
}

/// Server-side KaTeX.
#[derive(Debug, Clone)]
pub struct KatexRenderer {
    macros: Vec<(String, String)>,
    error_color: String,
}

impl Default for KatexRenderer {
    fn default() -> Self {
        Self {
            macros: vec![(String::from("\\RR"), String::from("\\mathbb{R}"))],
            error_color: String::from("#cc0000"),
        }
    }
}

impl KatexRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a macro on top of the defaults.
    pub fn with_macro(mut self, name: impl Into<String>, expansion: impl Into<String>) -> Self {
        self.macros.push((name.into(), expansion.into()));
        self
    }

    fn opts(&self, display_mode: bool) -> Result<katex::Opts> {
        let mut opts = katex::Opts::builder();
        opts.display_mode(display_mode)
            .throw_on_error(false)
            .error_color(self.error_color.clone());
        for (name, expansion) in &self.macros {
            opts = opts.add_macro(name.clone(), expansion.clone());
        }
        opts.build().map_err(|err| Error::Math(err.to_string()))
    }
}

impl MathRenderer for KatexRenderer {
    fn render(&self, latex: &str, display: bool) -> Result<String> {
        let opts = self.opts(display)?;
        match katex::render_with_opts(latex, opts) {
            Ok(html) => Ok(html),
            Err(katex::Error::JsExecError(message)) => {
                debug!(%message, "KaTeX rejected formula, emitting source");
                Ok(fallback_math_html(latex, display))
            }
            Err(err) => Err(Error::Math(err.to_string())),
        }
    }
}

fn fallback_math_html(source: &str, display_mode: bool) -> String {
    let class_name = if display_mode { "math math-display" } else { "math math-inline" };
    format!(
        "<span class=\"{class_name}\">{}</span>",
        htmlescape::encode_minimal(source)
    )
}
