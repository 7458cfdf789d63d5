use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{TokenTables, TransformOptions};

/// Markup rewrites, applied in order over the whole text.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?m)^\s*\\section\*?\{([^}]*)\}", "\n## ${1}\n"),
        (r"(?m)^\s*\\subsection\*?\{([^}]*)\}", "\n### ${1}\n"),
        (r"(?m)^\s*\\subsubsection\*?\{([^}]*)\}", "\n#### ${1}\n"),
        (r"\\textbf\{([^}]+)\}", "**${1}**"),
        (r"\\textit\{([^}]+)\}", "*${1}*"),
        (r"\\texttt\{([^}]+)\}", "`${1}`"),
        (r"(?m)^\s*\\newpage", "\n---\n"),
        (r"\\\\", "  \n"),
        (r"\\includegraphics(?:\[[^\]]*\])?\{([^}]+)\}", "![${1}](${1})"),
        (r"(?m)^\s*\\item\[([^\]]*)\]", "- **${1}**: "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("valid structure rule"), replacement)
    })
    .collect()
});

static ENUMERATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\\begin\{enumerate\}(?:\[[^\]]*\])?((?s:.*?))\\end\{enumerate\}")
        .expect("valid enumerate regex")
});
static ITEMIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\\begin\{itemize\}(?:\[[^\]]*\])?((?s:.*?))\\end\{itemize\}")
        .expect("valid itemize regex")
});
static ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\\item\s+").expect("valid item regex"));
static STRAY_LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\\(?:begin|end)\{(?:itemize|enumerate)\}").expect("valid list marker regex")
});

pub(super) fn rewrite(text: &str, _: &mut TokenTables, _: &TransformOptions) -> String {
    let mut output = RULES.iter().fold(text.to_owned(), |text, (pattern, replacement)| {
        pattern.replace_all(&text, *replacement).into_owned()
    });

    output = ENUMERATE
        .replace_all(&output, |caps: &Captures<'_>| {
            let mut counter = 0;
            let items = ITEM.replace_all(&caps[1], |_: &Captures<'_>| {
                counter += 1;
                format!("{counter}. ")
            });
            format!("\n{items}\n")
        })
        .into_owned();

    output = ITEMIZE
        .replace_all(&output, |caps: &Captures<'_>| {
            format!("\n{}\n", ITEM.replace_all(&caps[1], "- "))
        })
        .into_owned();

    let output = ITEM.replace_all(&output, "- ");
    STRAY_LIST_MARKER.replace_all(&output, "").into_owned()
}

/// Doubles every backslash that does not start a command name, so the
/// Markdown engine does not read LaTeX punctuation as its own escapes.
pub(super) fn escape_backslashes(text: &str, _: &mut TokenTables, _: &TransformOptions) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        out.push(ch);
        if ch == '\\' && !chars.peek().is_some_and(char::is_ascii_alphanumeric) {
            out.push('\\');
        }
    }
    out
}
