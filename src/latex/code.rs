use std::sync::LazyLock;

use regex::Regex;

use super::{TokenTables, TransformOptions};

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```|`[^`\n]+`").expect("valid code span regex"));

/// Replaces fenced blocks and inline code spans with tokens, verbatim.
pub(super) fn protect(text: &str, tables: &mut TokenTables, _: &TransformOptions) -> String {
    tables
        .code
        .protect(text, &CODE_SPAN, |caps| Some(caps[0].to_owned()))
}
