//! Fenced code block highlighting.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

use crate::error::Result;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Maps a fence info string to the token syntect knows it by.
pub fn normalize_language(lang: &str) -> Option<String> {
    let lang = lang.split_whitespace().next()?.to_lowercase();
    match lang.as_str() {
        "latex" | "tex" => Some(String::from("tex")),
        _ => Some(lang),
    }
}

/// Highlights `code` as `lang`, falling back to an escaped plain block when
/// the language is unknown or the highlighter fails.
pub fn highlight_code(code: &str, lang: Option<&str>) -> String {
    let lang = lang.and_then(normalize_language);
    if let Some(lang) = lang.as_deref() {
        match try_highlight(code, lang) {
            Ok(Some(html)) => {
                return format!("<pre class=\"hljs\"><code class=\"language-{lang}\">{html}</code></pre>\n");
            }
            Ok(None) => debug!(lang, "no syntax for language hint"),
            Err(err) => debug!(lang, %err, "highlighting failed"),
        }
    }
    plain_code_block(code)
}

fn try_highlight(code: &str, lang: &str) -> Result<Option<String>> {
    let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang) else {
        return Ok(None);
    };
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(Some(generator.finalize()))
}

pub fn plain_code_block(code: &str) -> String {
    format!(
        "<pre class=\"hljs\"><code>{}</code></pre>\n",
        htmlescape::encode_minimal(code)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latex_hints_map_to_tex() {
        assert_eq!(normalize_language("LaTeX").as_deref(), Some("tex"));
        assert_eq!(normalize_language("tex").as_deref(), Some("tex"));
        assert_eq!(normalize_language("rust ignore").as_deref(), Some("rust"));
        assert_eq!(normalize_language("   "), None);
    }

    #[test]
    fn known_language_gets_classed_spans() {
        let html = highlight_code("fn main() {}\n", Some("rust"));
        assert!(html.starts_with("<pre class=\"hljs\"><code class=\"language-rust\">"));
        assert!(html.contains("<span class=\""));
    }

    #[test]
    fn unknown_language_is_escaped_plain_text() {
        let html = highlight_code("a < b && c\n", Some("no-such-language"));
        assert_eq!(html, "<pre class=\"hljs\"><code>a &lt; b &amp;&amp; c\n</code></pre>\n");
    }

    #[test]
    fn missing_hint_is_plain_text() {
        let html = highlight_code("$x$ % 100\n", None);
        assert!(html.contains("$x$ % 100"));
    }
}
