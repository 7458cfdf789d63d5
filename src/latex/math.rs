use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::{TokenTables, TransformOptions};
use crate::protect::{contains_token, Placement, TokenMap, TOKEN_OPEN};

/// A protected formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathToken {
    /// Source text including its delimiters.
    pub latex: String,
    pub is_display: bool,
}

impl MathToken {
    fn display(latex: &str) -> Self {
        Self {
            latex: latex.to_owned(),
            is_display: true,
        }
    }

    fn inline(latex: &str) -> Self {
        Self {
            latex: latex.to_owned(),
            is_display: false,
        }
    }
}

impl Placement for MathToken {
    fn is_block(&self) -> bool {
        self.is_display
    }
}

const MATH_ENVIRONMENTS: &[&str] = &[
    "equation", "align", "gather", "matrix", "pmatrix", "bmatrix", "cases", "split", "multline",
];

static DISPLAY_DELIMITED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\$\$.*?\$\$|\\\[.*?\\\]").expect("valid display math regex")
});

static ENVIRONMENT_BEGIN: LazyLock<Regex> = LazyLock::new(|| {
    let names = MATH_ENVIRONMENTS.join("|");
    Regex::new(&format!(r"\\begin\{{({names})\*?\}}")).expect("valid environment regex")
});

static PAREN_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\(.*?\\\)").expect("valid inline math regex"));

/// Tokenizes math in precedence order: display delimiters, environments,
/// `$…$`, `\(…\)`.
///
/// Multi-line spans that open inside a `%` comment are left for the comment
/// stage, and so is any opener whose backslash is itself escaped.
pub(super) fn protect(text: &str, tables: &mut TokenTables, _: &TransformOptions) -> String {
    let math = &mut tables.math;
    let text = protect_uncommented(text, &DISPLAY_DELIMITED, math, |span| {
        let body = &span[2..span.len() - 2];
        (!body.trim().is_empty()).then(|| MathToken::display(span))
    });
    let text = protect_environments(&text, math);
    let text = protect_dollar_inline(&text, math);
    protect_uncommented(&text, &PAREN_INLINE, math, |span| Some(MathToken::inline(span)))
}

fn protect_uncommented<F>(
    text: &str,
    pattern: &Regex,
    math: &mut TokenMap<MathToken>,
    mut classify: F,
) -> String
where
    F: FnMut(&str) -> Option<MathToken>,
{
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut at = 0;

    while let Some(found) = pattern.find_at(text, at) {
        if is_escaped(text, found.start()) {
            at = found.start() + 1;
            continue;
        }
        if in_comment(text, found.start()) {
            at = line_end(text, found.start());
            continue;
        }
        at = found.end();
        if contains_token(found.as_str()) {
            continue;
        }
        if let Some(token) = classify(found.as_str()) {
            out.push_str(&text[copied..found.start()]);
            out.push_str(&math.insert_placed(token));
            copied = found.end();
        }
    }

    out.push_str(&text[copied..]);
    out
}

fn protect_environments(text: &str, math: &mut TokenMap<MathToken>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(caps) = ENVIRONMENT_BEGIN.captures(rest) {
        let Some(begin) = caps.get(0) else { break };
        let offset = text.len() - rest.len();
        if in_comment(text, offset + begin.start()) {
            let skip = line_end(text, offset + begin.start()) - offset;
            out.push_str(&rest[..skip]);
            rest = &rest[skip..];
            continue;
        }
        let after_begin = &rest[begin.end()..];

        match find_environment_end(after_begin, &caps[1]) {
            Some(end) if !after_begin[..end.start].contains(TOKEN_OPEN) => {
                let span_end = begin.end() + end.end;
                out.push_str(&rest[..begin.start()]);
                out.push_str(&math.insert_placed(MathToken::display(&rest[begin.start()..span_end])));
                rest = &rest[span_end..];
            }
            _ => {
                out.push_str(&rest[..begin.end()]);
                rest = after_begin;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Whether the byte at `at` is preceded by an odd run of backslashes.
fn is_escaped(text: &str, at: usize) -> bool {
    let run = text.as_bytes()[..at]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

fn line_end(text: &str, at: usize) -> usize {
    text[at..].find('\n').map_or(text.len(), |end| at + end)
}

/// Whether `at` lies after a comment `%` on its line. A comment `%` starts
/// the line or follows whitespace, and is not inside math opened earlier on
/// the same line.
fn in_comment(text: &str, at: usize) -> bool {
    let line_start = text[..at].rfind('\n').map_or(0, |nl| nl + 1);
    let line = text[line_start..at].as_bytes();
    let (mut display, mut inline, mut bracketed) = (false, false, false);
    let mut i = 0;

    while i < line.len() {
        match line[i] {
            b'\\' => {
                match line.get(i + 1) {
                    Some(b'[' | b'(') => bracketed = true,
                    Some(b']' | b')') => bracketed = false,
                    _ => {}
                }
                i += 2;
                continue;
            }
            b'$' if line.get(i + 1) == Some(&b'$') => {
                display = !display;
                i += 2;
                continue;
            }
            b'$' => inline = !inline,
            b'%' if !(display || inline || bracketed)
                && (i == 0 || line[i - 1].is_ascii_whitespace()) =>
            {
                return true;
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Finds the first `\end{name}` or `\end{name*}` in `text`.
pub(crate) fn find_environment_end(text: &str, name: &str) -> Option<Range<usize>> {
    let plain = format!("\\end{{{name}}}");
    let starred = format!("\\end{{{name}*}}");
    let plain = text.find(&plain).map(|at| at..at + plain.len());
    let starred = text.find(&starred).map(|at| at..at + starred.len());

    match (plain, starred) {
        (Some(plain), Some(starred)) => Some(if plain.start <= starred.start { plain } else { starred }),
        (plain, starred) => plain.or(starred),
    }
}

/// `$…$` on a single line. The opener must not be escaped or touch another
/// `$`; the first `$` after it closes the span, and only if it is not
/// escaped and not doubled. Whitespace-only spans are kept as text.
fn protect_dollar_inline(text: &str, math: &mut TokenMap<MathToken>) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut at = 0;

    while at < bytes.len() {
        if bytes[at] == b'$' && opens_inline(bytes, at) {
            if let Some(close) = inline_close(text, at) {
                let span = &text[at..=close];
                out.push_str(&text[copied..at]);
                if span[1..span.len() - 1].trim().is_empty() {
                    out.push_str(span);
                } else {
                    out.push_str(&math.insert_placed(MathToken::inline(span)));
                }
                at = close + 1;
                copied = at;
                continue;
            }
        }
        at += 1;
    }

    out.push_str(&text[copied..]);
    out
}

fn opens_inline(bytes: &[u8], at: usize) -> bool {
    let escaped_or_doubled = at > 0 && matches!(bytes[at - 1], b'\\' | b'$');
    !escaped_or_doubled && bytes.get(at + 1) != Some(&b'$')
}

fn inline_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    for (offset, ch) in text[open + 1..].char_indices() {
        match ch {
            '\n' | '\r' => return None,
            c if c == TOKEN_OPEN => return None,
            '$' => {
                let close = open + 1 + offset;
                let closes = offset > 0
                    && bytes[close - 1] != b'\\'
                    && bytes.get(close + 1) != Some(&b'$');
                return closes.then_some(close);
            }
            _ => {}
        }
    }
    None
}
