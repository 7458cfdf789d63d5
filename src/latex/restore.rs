use regex::{NoExpand, Regex};

use super::{TokenTables, TransformOptions};
use crate::math::deferred_markup;

/// Puts raw code back before Markdown parsing so the engine sees real fences.
pub(super) fn restore_code(text: &str, tables: &mut TokenTables, _: &TransformOptions) -> String {
    tables.code.restore(text, |code| code.clone())
}

pub(super) fn restore_header(html: &str, tables: &mut TokenTables, _: &TransformOptions) -> String {
    tables.header.iter().fold(html.to_owned(), |html, (token, header)| {
        replace_block(&html, token, &header.to_html())
    })
}

pub(super) fn restore_math(html: &str, tables: &mut TokenTables, _: &TransformOptions) -> String {
    tables.math.iter().fold(html.to_owned(), |html, (token, math)| {
        let markup = deferred_markup(&math.latex, math.is_display);
        if math.is_display {
            replace_block(&html, token, &markup)
        } else {
            html.replace(token, &markup)
        }
    })
}

/// Replaces a block token, dropping the paragraph the Markdown engine wrapped
/// around it when it stands alone.
fn replace_block(html: &str, token: &str, markup: &str) -> String {
    let wrapped = Regex::new(&format!(r"<p>\s*{}\s*</p>", regex::escape(token)));
    match wrapped {
        Ok(wrapped) if wrapped.is_match(html) => {
            wrapped.replace_all(html, NoExpand(markup)).into_owned()
        }
        _ => html.replace(token, markup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latex::{DocumentHeader, MathToken};

    fn display(tables: &mut TokenTables, latex: &str) -> String {
        tables.math.insert(MathToken {
            latex: latex.to_owned(),
            is_display: true,
        })
    }

    #[test]
    fn lone_display_token_loses_its_paragraph() {
        let mut tables = TokenTables::default();
        let token = display(&mut tables, "$$x^2$$");
        let html = format!("<p>a</p>\n<p>{token}</p>\n<p>b</p>\n");

        let out = restore_math(&html, &mut tables, &TransformOptions::default());

        assert_eq!(
            out,
            "<p>a</p>\n<div class=\"mjx-process mjx-formula\">$$x^2$$</div>\n<p>b</p>\n"
        );
    }

    #[test]
    fn dollar_signs_in_latex_are_not_expanded() {
        let mut tables = TokenTables::default();
        let token = display(&mut tables, "$$ $1 $$");
        let out = restore_math(&format!("<p>{token}</p>"), &mut tables, &TransformOptions::default());
        assert!(out.contains("$$ $1 $$"));
    }

    #[test]
    fn embedded_display_token_is_replaced_in_place() {
        let mut tables = TokenTables::default();
        let token = display(&mut tables, "\\[y\\]");
        let html = format!("<li>{token}</li>");

        let out = restore_math(&html, &mut tables, &TransformOptions::default());

        assert_eq!(out, "<li><div class=\"mjx-process mjx-formula\">\\[y\\]</div></li>");
    }

    #[test]
    fn inline_tokens_are_spans() {
        let mut tables = TokenTables::default();
        let token = tables.math.insert(MathToken {
            latex: "$a<b$".to_owned(),
            is_display: false,
        });
        let out = restore_math(&format!("<p>x {token} y</p>"), &mut tables, &TransformOptions::default());
        assert_eq!(out, "<p>x <span class=\"mjx-process mjx-formula\">$a<b$</span> y</p>");
    }

    #[test]
    fn header_is_unwrapped() {
        let mut tables = TokenTables::default();
        let token = tables.header.insert(DocumentHeader {
            title: "T".into(),
            author: None,
            date: None,
        });
        let out = restore_header(&format!("<p>{token}</p>\n<p>body</p>\n"), &mut tables, &TransformOptions::default());
        assert!(out.starts_with("<div class=\"doc-header\">"));
        assert!(out.ends_with("</div>\n\n<p>body</p>\n"));
    }
}
