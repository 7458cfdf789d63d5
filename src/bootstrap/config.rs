use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;

pub const DEFAULT_CDN_URL: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js";

/// Preamble commands that are defined as no-ops so stray copies in rendered
/// text do not show up as errors.
const NOOP_MACROS: &[&str] = &[
    "ctex",
    "geometry",
    "maketitle",
    "songti",
    "heiti",
    "kaishu",
    "definecolor",
    "lstset",
];

/// The global configuration object the engine reads before its script runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MathJaxConfig {
    pub loader: LoaderConfig,
    pub tex: TexConfig,
    pub options: ProcessingOptions,
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderConfig {
    pub load: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TexConfig {
    pub inline_math: Vec<[String; 2]>,
    pub display_math: Vec<[String; 2]>,
    pub process_escapes: bool,
    pub process_environments: bool,
    pub packages: BTreeMap<String, Vec<String>>,
    pub macros: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOptions {
    pub ignore_html_class: String,
    /// Only elements carrying one of these classes are typeset.
    pub process_html_class: String,
    pub skip_html_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupConfig {
    /// Off: containers are typeset explicitly after their HTML is injected.
    pub typeset: bool,
}

fn pair(open: &str, close: &str) -> [String; 2] {
    [open.to_owned(), close.to_owned()]
}

impl Default for MathJaxConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig {
                load: vec![String::from("[tex]/ams"), String::from("[tex]/bm")],
            },
            tex: TexConfig {
                inline_math: vec![pair("$", "$"), pair("\\(", "\\)")],
                display_math: vec![pair("$$", "$$"), pair("\\[", "\\]")],
                process_escapes: true,
                process_environments: true,
                packages: BTreeMap::from([(String::from("[+]"), vec![String::from("ams")])]),
                macros: NOOP_MACROS
                    .iter()
                    .map(|name| ((*name).to_owned(), vec![String::new()]))
                    .collect(),
            },
            options: ProcessingOptions {
                ignore_html_class: String::from("tex2jax_ignore"),
                process_html_class: String::from("mjx-container|mjx-process"),
                skip_html_tags: ["script", "noscript", "style", "textarea", "pre", "code"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
            startup: StartupConfig { typeset: false },
        }
    }
}

impl MathJaxConfig {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Markup that installs this configuration and loads the engine from
    /// `cdn_url`, for inclusion in a page head.
    pub fn script_tags(&self, cdn_url: &str) -> Result<String> {
        let json = self.to_json()?.replace("</", "<\\/");
        Ok(format!(
            "<script>window.MathJax = {json};</script>\n<script src=\"{}\" async></script>",
            htmlescape::encode_minimal(cdn_url)
        ))
    }
}
