use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::error::Result;
use crate::highlight::highlight_code;
use crate::math::MathRenderer;

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_GFM);
    options
}

/// Renders GitHub-flavoured Markdown where every newline inside a paragraph
/// is a line break. Math syntax is not recognised: the LaTeX pipeline hands
/// math over as tokens.
pub fn render_markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options()).map(line_break);

    let mut html_out = String::new();
    html::push_html(&mut html_out, HighlightCode::new(parser));
    html_out
}

/// Renders Markdown with `$…$`/`$$…$$` math passed to `renderer`.
pub(crate) fn render_with_math(markdown: &str, renderer: &dyn MathRenderer) -> Result<String> {
    let mut options = markdown_options();
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let parser = Parser::new_ext(markdown, options).map(line_break);
    let events = HighlightCode::new(parser)
        .map(|event| match event {
            Event::InlineMath(math) => renderer
                .render(&math, false)
                .map(|html| Event::InlineHtml(html.into())),
            Event::DisplayMath(math) => renderer
                .render(&math, true)
                .map(|html| Event::Html(html.into())),
            other => Ok(other),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut html_out = String::new();
    html::push_html(&mut html_out, events.into_iter());
    Ok(html_out)
}

fn line_break(event: Event<'_>) -> Event<'_> {
    match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    }
}

/// Replaces each code block with highlighted HTML.
struct HighlightCode<I> {
    inner: I,
}

impl<I> HighlightCode<I> {
    fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<'a, I> Iterator for HighlightCode<I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = match self.inner.next()? {
            Event::Start(Tag::CodeBlock(kind)) => kind,
            other => return Some(other),
        };
        let lang = match &kind {
            CodeBlockKind::Fenced(info) if !info.trim().is_empty() => Some(info.to_string()),
            _ => None,
        };

        let mut code = String::new();
        for event in self.inner.by_ref() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => break,
                _ => {}
            }
        }
        Some(Event::Html(highlight_code(&code, lang.as_deref()).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{DeferredRenderer, KatexRenderer};

    #[test]
    fn newlines_inside_paragraphs_are_breaks() {
        assert_eq!(render_markdown_to_html("a\nb"), "<p>a<br />\nb</p>\n");
    }

    #[test]
    fn gfm_tables_and_strikethrough() {
        let html = render_markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn fenced_code_is_highlighted() {
        let html = render_markdown_to_html("```rust\nlet x = 1;\n```\n");
        assert!(html.starts_with("<pre class=\"hljs\"><code class=\"language-rust\">"));
    }

    #[test]
    fn indented_code_is_plain() {
        let html = render_markdown_to_html("    a < b\n");
        assert_eq!(html, "<pre class=\"hljs\"><code>a &lt; b\n</code></pre>\n");
    }

    #[test]
    fn dollars_are_text_without_math() {
        assert_eq!(render_markdown_to_html("$x$"), "<p>$x$</p>\n");
    }

    #[test]
    fn renders_math_with_katex() {
        let output = render_with_math("$x^2$ and\n\n$$\ny^2\n$$", &KatexRenderer::new()).unwrap();
        assert!(output.contains("katex"));
        assert!(output.contains("katex-display"));
    }

    #[test]
    fn math_can_be_deferred() {
        let output = render_with_math("where $a<b$", &DeferredRenderer).unwrap();
        assert_eq!(
            output,
            "<p>where <span class=\"mjx-process mjx-formula\">$a&lt;b$</span></p>\n"
        );
    }

    #[test]
    fn code_spans_keep_their_dollars() {
        let output = render_with_math("`$x$`", &DeferredRenderer).unwrap();
        assert_eq!(output, "<p><code>$x$</code></p>\n");
    }
}
