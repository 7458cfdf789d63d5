use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{TokenTables, TransformOptions};

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|\s)%.*$").expect("valid comment regex"));

/// Drops `%` comments that start a line or follow whitespace, keeping that
/// whitespace. Tokens that vanish with a comment are forgotten.
pub(super) fn strip(text: &str, tables: &mut TokenTables, _: &TransformOptions) -> String {
    let stripped = COMMENT.replace_all(text, "${1}").into_owned();

    let dropped = tables.math.retain_present(&stripped) + tables.code.retain_present(&stripped);
    if dropped > 0 {
        debug!(dropped, "discarded tokens inside comments");
    }
    stripped
}
