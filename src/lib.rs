//! # texmark
//!
//! Turns LaTeX-flavoured or mixed Markdown/LaTeX text into HTML that is safe
//! to inject into a page, leaving math for a client-side engine (or KaTeX on
//! the server) to typeset.
//!
//! Two pipelines are provided:
//!
//! - [`LatexTransformer`]: protects code and math behind placeholder tokens,
//!   rewrites LaTeX structure (sections, emphasis, lists, images) into
//!   Markdown, renders it, and restores the protected spans. Math comes out as
//!   `mjx-process mjx-formula` marker elements.
//! - [`render_markdown`]: repairs common math-delimiter damage in Markdown
//!   ([`smart_clean`]) and renders it with math typeset by KaTeX. It never
//!   fails; on error the raw content is shown in a `<pre>` block.
//!
//! ```rust
//! use texmark::LatexTransformer;
//!
//! let html = LatexTransformer::default().transform("\\section{Intro}\nLet $x^2$ be given.");
//! assert!(html.contains("<h2>Intro</h2>"));
//! assert!(html.contains("<span class=\"mjx-process mjx-formula\">$x^2$</span>"));
//! ```
//!
//! [`bootstrap::MathBootstrap`] models the browser side: a lazily loaded,
//! shared math engine that typesets containers after the HTML is injected.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod highlight;
pub mod latex;
pub mod markdown;
pub mod math;
pub mod protect;
pub mod render;
pub mod server;
pub mod smart_clean;

pub use config::Config;
pub use error::{Error, Result};
pub use latex::{LatexTransformer, TransformOptions};
pub use render::{render_markdown, render_source, SourceFormat};
pub use smart_clean::smart_clean;
