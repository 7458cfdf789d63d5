//! Entry points that never fail: whatever goes wrong, the reader gets
//! something on the page.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Deserialize;
use tracing::error;

use crate::error::{Error, Result};
use crate::latex::{LatexTransformer, TransformOptions};
use crate::markdown::render_with_math;
use crate::math::{KatexRenderer, MathRenderer};
use crate::smart_clean::smart_clean;

/// Which pipeline a source goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Latex,
    #[default]
    Markdown,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "tex" | "latex" => Some(Self::Latex),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Cleans and renders Markdown with server-side KaTeX.
pub fn render_markdown(content: &str) -> String {
    render_markdown_with(content, &KatexRenderer::default())
}

/// Like [`render_markdown`] with a caller-chosen math backend.
///
/// Errors and panics are logged and the raw content is shown, escaped, in a
/// `<pre>` block instead.
pub fn render_markdown_with(content: &str, renderer: &dyn MathRenderer) -> String {
    if content.is_empty() {
        return String::new();
    }

    let rendered = catch_unwind(AssertUnwindSafe(|| try_render_markdown(content, renderer)))
        .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));

    match rendered {
        Ok(html) => html,
        Err(err) => {
            error!(%err, "markdown render failed, showing raw content");
            format!("<pre>{}</pre>", htmlescape::encode_minimal(content))
        }
    }
}

/// The fallible core of [`render_markdown_with`].
pub fn try_render_markdown(content: &str, renderer: &dyn MathRenderer) -> Result<String> {
    render_with_math(&smart_clean(content), renderer)
}

/// Renders `source` with the pipeline `format` selects.
pub fn render_source(source: &str, format: SourceFormat, options: &TransformOptions) -> String {
    match format {
        SourceFormat::Latex => LatexTransformer::new(options.clone()).transform(source),
        SourceFormat::Markdown => render_markdown(source),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DeferredRenderer;

    struct Failing;

    impl MathRenderer for Failing {
        fn render(&self, _: &str, _: bool) -> Result<String> {
            Err(Error::Math(String::from("engine unavailable")))
        }
    }

    struct Panicking;

    impl MathRenderer for Panicking {
        fn render(&self, _: &str, _: bool) -> Result<String> {
            panic!("engine crashed")
        }
    }

    #[test]
    fn formats_from_extensions() {
        assert_eq!(SourceFormat::from_extension("TEX"), Some(SourceFormat::Latex));
        assert_eq!(SourceFormat::from_extension("md"), Some(SourceFormat::Markdown));
        assert_eq!(SourceFormat::from_extension("txt"), None);
    }

    #[test]
    fn empty_content_renders_nothing() {
        assert_eq!(render_markdown(""), "");
    }

    #[test]
    fn cleaned_math_reaches_the_renderer() {
        let html = render_markdown_with("Let \\(x\\) be", &DeferredRenderer);
        assert_eq!(
            html,
            "<p>Let <span class=\"mjx-process mjx-formula\">$x$</span> be</p>\n"
        );
    }

    #[test]
    fn renderer_errors_fall_back_to_escaped_source() {
        let html = render_markdown_with("<b> $x$", &Failing);
        assert_eq!(html, "<pre>&lt;b&gt; $x$</pre>");
    }

    #[test]
    fn renderer_panics_fall_back_to_escaped_source() {
        let html = render_markdown_with("$x$", &Panicking);
        assert_eq!(html, "<pre>$x$</pre>");
    }

    #[test]
    fn render_source_dispatches_on_format() {
        let options = TransformOptions::default();
        let latex = render_source("\\section{A}", SourceFormat::Latex, &options);
        let markdown = render_source("# A", SourceFormat::Markdown, &options);
        assert_eq!(latex, "<h2>A</h2>\n");
        assert_eq!(markdown, "<h1>A</h1>\n");
    }

    #[test]
    fn format_deserializes_lowercase() {
        let format: SourceFormat = serde_json::from_str("\"latex\"").unwrap();
        assert_eq!(format, SourceFormat::Latex);
    }
}
