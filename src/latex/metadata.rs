use std::sync::LazyLock;

use htmlescape::encode_minimal;
use regex::Regex;

use super::{TokenTables, TransformOptions};
use crate::protect::Placement;

/// Title block built from `\title`, `\author` and `\date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub title: String,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl Placement for DocumentHeader {
    fn is_block(&self) -> bool {
        true
    }
}

impl DocumentHeader {
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"doc-header\">\n");
        html.push_str(&format!(
            "<h1 class=\"doc-title\">{}</h1>\n",
            encode_minimal(&self.title)
        ));
        if self.author.is_some() || self.date.is_some() {
            html.push_str("<div class=\"doc-meta\">");
            if let Some(author) = &self.author {
                html.push_str(&format!(
                    "<span class=\"doc-author\">Author: {}</span>",
                    encode_minimal(author)
                ));
            }
            if let Some(date) = &self.date {
                html.push_str(&format!("<span class=\"doc-date\">{}</span>", encode_minimal(date)));
            }
            html.push_str("</div>\n");
        }
        html.push_str("</div>\n");
        html
    }
}

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\title\{([^}]+)\}").expect("valid title regex"));
static AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\author\{([^}]+)\}").expect("valid author regex"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\date\{([^}]+)\}").expect("valid date regex"));

static DOCUMENT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[^\S\n]*\\(?:(?:begin|end)\{document\}[^\S\n]*|documentclass.*|usepackage.*)$",
    )
    .expect("valid document directive regex")
});

const MAKETITLE: &str = "\\maketitle";

/// Pulls the title block out of the leading window and places it at
/// `\maketitle`, or at the top when there is none. Preamble directives are
/// blanked.
pub(super) fn extract(text: &str, tables: &mut TokenTables, options: &TransformOptions) -> String {
    let (window, remainder) = text.split_at(window_end(text, options.header_window));
    let mut window = window.to_owned();

    let header = take_command(&mut window, &TITLE).map(|title| {
        let author = take_command(&mut window, &AUTHOR);
        let date = take_command(&mut window, &DATE).filter(|date| date.trim() != "\\today");
        DocumentHeader {
            title: resolve_tokens(&title, tables),
            author: author.map(|author| resolve_tokens(&author, tables)),
            date: date.map(|date| resolve_tokens(&date, tables)),
        }
    });

    let mut text = window + remainder;
    if let Some(header) = header {
        let placed = tables.header.insert_placed(header);
        match text.find(MAKETITLE) {
            Some(at) => text.replace_range(at..at + MAKETITLE.len(), &placed),
            None => text.insert_str(0, &placed),
        }
    }

    let text = DOCUMENT_DIRECTIVE.replace_all(&text, "").into_owned();
    tables.math.retain_present(&text);
    tables.code.retain_present(&text);
    text
}

fn window_end(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(at, _)| at)
}

fn take_command(window: &mut String, pattern: &Regex) -> Option<String> {
    let (range, value) = {
        let caps = pattern.captures(window)?;
        (caps.get(0)?.range(), caps[1].to_owned())
    };
    window.replace_range(range, "");
    Some(value)
}

/// Header values leave the text, so the code and math tokens inside them go
/// back to their source form right away.
fn resolve_tokens(value: &str, tables: &TokenTables) -> String {
    let value = tables.code.restore(value, |code| code.clone());
    tables.math.restore(&value, |math| math.latex.clone())
}
