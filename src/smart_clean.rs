//! Repairs math delimiters in Markdown before it is rendered.
//!
//! Markdown written by hand or produced by a language model often mixes
//! `\(…\)` with dollars, leaves `$` alone on a line where `$$` was meant, or
//! drops a bare `\begin{align}` into the text. [`smart_clean`] normalises all
//! of that to `$$` blocks the math extension of the Markdown engine accepts.

use std::sync::LazyLock;

use regex::{Captures, NoExpand, Regex};

use crate::latex::find_environment_end;
use crate::protect::{strip_sentinels, TokenMap};

static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```|`[^`\n]+`").expect("valid code regex"));

static LONE_DOLLAR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[^\S\n]*\$[^\S\n]*$").expect("valid lone dollar regex"));

static BARE_ENVIRONMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\begin\{(equation|align|gather|split|aligned|gathered|multline)\*?\}")
        .expect("valid environment regex")
});

static DISPLAY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$(.*?)\$\$").expect("valid display block regex"));

/// A block as the cleaning stage writes it back.
static CLEANED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$\n.+?\n\$\$").expect("valid cleaned block regex"));

static MULTLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(begin|end)\{multline(\*?)\}").expect("valid multline regex")
});

static DOLLAR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\${3,}").expect("valid dollar run regex"));
static EMPTY_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$\s*\$\$").expect("valid empty pair regex"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid blank run regex"));

/// Normalises math delimiters in `content`, leaving code untouched.
pub fn smart_clean(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let mut code = TokenMap::<String>::new("FENCE");
    let text = strip_sentinels(content);
    let text = code.protect(&text, &CODE, |caps| Some(caps[0].to_owned()));

    let text = normalize_latex_delimiters(&text);
    let text = LONE_DOLLAR_LINE.replace_all(&text, NoExpand("$$"));
    let text = map_outside(&text, &DISPLAY_BLOCK, wrap_bare_environments);
    let text = DISPLAY_BLOCK.replace_all(&text, |caps: &Captures<'_>| {
        let block = clean_block(&caps[1]);
        if block.is_empty() {
            String::new()
        } else {
            format!("\n$$\n{block}\n$$\n")
        }
    });
    let text = map_outside(&text, &CLEANED_BLOCK, |outside| {
        let outside = DOLLAR_RUN.replace_all(outside, NoExpand("$$"));
        EMPTY_PAIR.replace_all(&outside, "").into_owned()
    });
    let text = BLANK_RUN.replace_all(&text, "\n\n\n");

    code.restore(&text, |code| code.clone()).trim().to_owned()
}

/// Rewrites `\(…\)` as `$…$` (or `$$…$$` when it spans lines) and `\[…\]` as
/// `$$…$$`. Escaped backslashes are skipped so `\\[2pt]` is left alone.
fn normalize_latex_delimiters(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i..].starts_with("\\\\") {
            out.push_str("\\\\");
            i += 2;
            continue;
        }

        if let Some((open, close, display_mode)) = delimiter_at(input, i) {
            let content_start = i + open.len();
            if let Some(close_at) = input[content_start..].find(close) {
                let content_end = content_start + close_at;
                let content = &input[content_start..content_end];
                if display_mode || content.contains('\n') {
                    out.push_str("$$");
                    out.push_str(content);
                    out.push_str("$$");
                } else {
                    out.push('$');
                    out.push_str(content);
                    out.push('$');
                }
                i = content_end + close.len();
                continue;
            }
        }

        if let Some(ch) = input[i..].chars().next() {
            out.push(ch);
            i += ch.len_utf8();
        } else {
            break;
        }
    }

    out
}

fn delimiter_at(input: &str, index: usize) -> Option<(&'static str, &'static str, bool)> {
    let tail = &input[index..];
    if tail.starts_with("\\(") {
        Some(("\\(", "\\)", false))
    } else if tail.starts_with("\\[") {
        Some(("\\[", "\\]", true))
    } else {
        None
    }
}

/// Applies `f` to the text between matches of `blocks`, copying the matches
/// themselves unchanged.
fn map_outside<F>(text: &str, blocks: &Regex, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for block in blocks.find_iter(text) {
        out.push_str(&f(&text[last..block.start()]));
        out.push_str(block.as_str());
        last = block.end();
    }
    out.push_str(&f(&text[last..]));
    out
}

fn wrap_bare_environments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(caps) = BARE_ENVIRONMENT.captures(rest) {
        let Some(begin) = caps.get(0) else { break };
        match find_environment_end(&rest[begin.end()..], &caps[1]) {
            Some(end) => {
                let span_end = begin.end() + end.end;
                out.push_str(&rest[..begin.start()]);
                out.push_str("\n$$\n");
                out.push_str(rest[begin.start()..span_end].trim());
                out.push_str("\n$$\n");
                rest = &rest[span_end..];
            }
            None => {
                out.push_str(&rest[..begin.end()]);
                rest = &rest[begin.end()..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Drops comment-only and blank lines and swaps `multline` for `gather`,
/// which the math engine supports.
fn clean_block(inner: &str) -> String {
    let kept: Vec<&str> = inner
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            let comment_only = trimmed.starts_with('%') && !trimmed.contains('\\');
            !trimmed.is_empty() && !comment_only
        })
        .collect();
    let joined = kept.join("\n");
    MULTLINE
        .replace_all(&joined, "\\${1}{gather${2}}")
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_stays_empty() {
        assert_eq!(smart_clean(""), "");
    }

    #[test]
    fn paren_and_bracket_delimiters_become_dollars() {
        assert_eq!(smart_clean("Let \\(x\\) be"), "Let $x$ be");
        assert_eq!(smart_clean("\\[y^2\\]"), "$$\ny^2\n$$");
        assert_eq!(smart_clean("\\(a\nb\\)"), "$$\na\nb\n$$");
    }

    #[test]
    fn escaped_backslash_is_not_a_delimiter() {
        assert_eq!(smart_clean("$$a \\\\[2pt] b$$"), "$$\na \\\\[2pt] b\n$$");
    }

    #[test]
    fn lone_dollar_lines_are_doubled() {
        assert_eq!(smart_clean("$\nx = 1\n$"), "$$\nx = 1\n$$");
    }

    #[test]
    fn bare_environments_are_wrapped() {
        assert_eq!(
            smart_clean("Text\n\\begin{align}\na &= b\n\\end{align}\nMore"),
            "Text\n\n\n$$\n\\begin{align}\na &= b\n\\end{align}\n$$\n\n\nMore"
        );
    }

    #[test]
    fn environments_inside_blocks_are_not_wrapped_again() {
        assert_eq!(
            smart_clean("$$\n\\begin{aligned}x\\end{aligned}\n$$"),
            "$$\n\\begin{aligned}x\\end{aligned}\n$$"
        );
    }

    #[test]
    fn comment_lines_go_and_multline_becomes_gather() {
        assert_eq!(
            smart_clean("$$\n% note\n\\begin{multline*}\na\n\n% \\label{x}\n\\end{multline*}\n$$"),
            "$$\n\\begin{gather*}\na\n% \\label{x}\n\\end{gather*}\n$$"
        );
    }

    #[test]
    fn blocks_left_empty_are_removed() {
        assert_eq!(smart_clean("a\n$$\n% only a comment\n$$\nb"), "a\n\nb");
    }

    #[test]
    fn adjacent_blocks_are_not_merged() {
        assert_eq!(smart_clean("$$a$$\n\n$$b$$"), "$$\na\n$$\n\n\n$$\nb\n$$");
    }

    #[test]
    fn code_is_never_touched() {
        let source = "```latex\n$\n\\[x\\]\n\\begin{align}a\\end{align}\n```\nand `\\(y\\)`";
        assert_eq!(smart_clean(source), source);
    }

    #[test]
    fn unterminated_environment_is_left_alone() {
        assert_eq!(smart_clean("\\begin{equation} x"), "\\begin{equation} x");
    }
}
