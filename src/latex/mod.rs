//! LaTeX-flavoured text to HTML.
//!
//! The transformation is an ordered list of named stages. Each stage is a
//! pure function over the text plus the token tables of the current call, and
//! the order is load-bearing:
//!
//! 1. `protect_code`: fenced and inline code become tokens, so nothing below
//!    ever looks inside code.
//! 2. `protect_math`: display delimiters, math environments, `$…$`, `\(…\)`.
//!    Spans that open inside a `%` comment are not tokenized.
//! 3. `strip_comments`: `%` comments. Math is already tokenized, so a `%`
//!    inside a formula is never taken for a comment.
//! 4. `extract_header`: `\title`/`\author`/`\date` and document directives.
//! 5. `rewrite_structure` and `escape_backslashes`: LaTeX markup to Markdown.
//! 6. `restore_code`: code goes back in before Markdown so the engine can
//!    highlight it.
//!
//! The Markdown engine then renders the text and the header and math tokens
//! are expanded in the HTML.

mod code;
mod comments;
mod math;
mod metadata;
mod restore;
mod structure;

pub use self::math::MathToken;
pub use self::metadata::DocumentHeader;

pub(crate) use self::math::find_environment_end;

use tracing::{debug, warn};

use crate::protect::{contains_token, strip_sentinels, TokenMap};

/// Knobs for [`LatexTransformer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// How many leading characters are searched for `\title`, `\author` and
    /// `\date`.
    pub header_window: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            header_window: 1500,
        }
    }
}

/// Side tables of one transformation call.
#[derive(Debug, Clone)]
pub struct TokenTables {
    pub code: TokenMap<String>,
    pub math: TokenMap<MathToken>,
    pub header: TokenMap<DocumentHeader>,
}

impl Default for TokenTables {
    fn default() -> Self {
        Self {
            code: TokenMap::new("CODE"),
            math: TokenMap::new("MATH"),
            header: TokenMap::new("HEADER"),
        }
    }
}

type StageFn = fn(&str, &mut TokenTables, &TransformOptions) -> String;

struct Stage {
    name: &'static str,
    run: StageFn,
}

const SOURCE_STAGES: &[Stage] = &[
    Stage { name: "protect_code", run: code::protect },
    Stage { name: "protect_math", run: math::protect },
    Stage { name: "strip_comments", run: comments::strip },
    Stage { name: "extract_header", run: metadata::extract },
    Stage { name: "rewrite_structure", run: structure::rewrite },
    Stage { name: "escape_backslashes", run: structure::escape_backslashes },
    Stage { name: "restore_code", run: restore::restore_code },
];

const HTML_STAGES: &[Stage] = &[
    Stage { name: "restore_header", run: restore::restore_header },
    Stage { name: "restore_math", run: restore::restore_math },
];

/// Rendered HTML whose header and math tokens have not been expanded yet.
#[derive(Debug, Clone)]
pub struct ProtectedHtml {
    pub html: String,
    pub tables: TokenTables,
}

/// Converts LaTeX-flavoured text to HTML.
///
/// The transformer holds no per-document state: every call starts from fresh
/// token tables, so one instance can serve any number of documents.
#[derive(Debug, Clone, Default)]
pub struct LatexTransformer {
    options: TransformOptions,
}

impl LatexTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Runs the whole pipeline.
    pub fn transform(&self, source: &str) -> String {
        if source.is_empty() {
            return String::new();
        }
        self.restore(self.render_protected(source))
    }

    /// Runs the source stages and returns the Markdown handed to the engine
    /// together with the tables filled on the way.
    pub fn to_markdown(&self, source: &str) -> (String, TokenTables) {
        let mut tables = TokenTables::default();
        let source = strip_sentinels(source).into_owned();
        let markdown = run_stages(SOURCE_STAGES, source, &mut tables, &self.options);
        (markdown, tables)
    }

    /// The title block of `source`, if it declares one.
    pub fn header(&self, source: &str) -> Option<DocumentHeader> {
        let (_, tables) = self.to_markdown(source);
        let (_, header) = tables.header.iter().next()?;
        Some(header.clone())
    }

    /// Runs everything up to and including the Markdown engine.
    pub fn render_protected(&self, source: &str) -> ProtectedHtml {
        let (markdown, tables) = self.to_markdown(source);
        ProtectedHtml {
            html: crate::markdown::render_markdown_to_html(&markdown),
            tables,
        }
    }

    /// Expands the header and math tokens of a rendered document.
    pub fn restore(&self, protected: ProtectedHtml) -> String {
        let ProtectedHtml { html, mut tables } = protected;
        let html = run_stages(HTML_STAGES, html, &mut tables, &self.options);
        if contains_token(&html) {
            warn!("unresolved placeholder tokens left in rendered HTML");
        }
        html
    }
}

fn run_stages(
    stages: &[Stage],
    mut text: String,
    tables: &mut TokenTables,
    options: &TransformOptions,
) -> String {
    for stage in stages {
        text = (stage.run)(&text, tables, options);
        debug!(stage = stage.name, len = text.len(), "latex stage done");
    }
    text
}
