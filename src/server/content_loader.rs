use std::io::ErrorKind;
use std::path::Path;

use gray_matter::{engine::YAML, Matter};
use tokio::fs;
use tracing::{debug, error, info};

use super::models::{parse_date, Document, FrontMatter};
use super::state::AppState;
use crate::error::Result;
use crate::latex::{LatexTransformer, TransformOptions};
use crate::render::{render_markdown, SourceFormat};

/// Page parts read from the content directory.
#[derive(Debug, Clone)]
pub struct LoadedContent {
    pub banner_html: String,
    pub layout_html: String,
    pub home_html: String,
    pub not_found_html: String,
    pub documents: Vec<Document>,
}

pub async fn load_content(content_dir: &Path, options: &TransformOptions) -> Result<LoadedContent> {
    let banner_html = fs::read_to_string(content_dir.join("banner.html")).await?;
    let layout_html = fs::read_to_string(content_dir.join("layout.html")).await?;
    let not_found_html = fs::read_to_string(content_dir.join("not_found.html")).await?;

    let home_source = fs::read_to_string(content_dir.join("home.md")).await?;
    let (_, home_body) = split_front_matter(&home_source);
    let home_html = render_markdown(&home_body);

    let documents = load_documents(&content_dir.join("docs"), options).await?;

    Ok(LoadedContent {
        banner_html,
        layout_html,
        home_html,
        not_found_html,
        documents,
    })
}

/// Lists `.tex` and `.md` files, newest first, undated ones last by title.
async fn load_documents(docs_dir: &Path, options: &TransformOptions) -> Result<Vec<Document>> {
    let mut entries = match fs::read_dir(docs_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(dir = %docs_dir.display(), "no documents directory");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let transformer = LatexTransformer::new(options.clone());
    let mut documents = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(format) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(SourceFormat::from_extension)
        else {
            continue;
        };
        let (Some(slug), Some(file_name)) = (
            path.file_stem().and_then(|stem| stem.to_str()),
            path.file_name().and_then(|name| name.to_str()),
        ) else {
            continue;
        };

        let source = fs::read_to_string(&path).await?;
        let (title, date) = match format {
            SourceFormat::Markdown => {
                let (front_matter, _) = split_front_matter(&source);
                (front_matter.title, front_matter.date.as_deref().and_then(parse_date))
            }
            SourceFormat::Latex => match transformer.header(&source) {
                Some(header) => (Some(header.title), header.date.as_deref().and_then(parse_date)),
                None => (None, None),
            },
        };

        documents.push(Document {
            title: title.unwrap_or_else(|| slug.to_owned()),
            slug: slug.to_owned(),
            date,
            format,
            file_name: file_name.to_owned(),
        });
    }

    documents.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.title.cmp(&b.title)));
    Ok(documents)
}

/// Reads a listed document and returns its body, front matter removed.
pub async fn read_document(content_dir: &Path, document: &Document) -> Result<String> {
    let source = fs::read_to_string(content_dir.join("docs").join(&document.file_name)).await?;
    Ok(match document.format {
        SourceFormat::Markdown => split_front_matter(&source).1,
        SourceFormat::Latex => source,
    })
}

/// Separates YAML front matter from the body. Unparseable front matter is
/// logged and treated as absent.
pub fn split_front_matter(source: &str) -> (FrontMatter, String) {
    let matter = Matter::<YAML>::new();
    match matter.parse::<FrontMatter>(source) {
        Ok(parsed) => (parsed.data.unwrap_or_default(), parsed.content),
        Err(e) => {
            error!("Failed to parse front matter: {}", e);
            (FrontMatter::default(), source.to_owned())
        }
    }
}

pub async fn reload_content(app_state: &AppState) {
    info!("Reloading application content...");
    match load_content(&app_state.content_dir, &app_state.transform_options).await {
        Ok(content) => {
            *app_state.banner_html.write().await = content.banner_html;
            *app_state.layout_html.write().await = content.layout_html;
            *app_state.home_html.write().await = content.home_html;
            *app_state.not_found_html.write().await = content.not_found_html;
            *app_state.documents.write().await = content.documents;
            info!("Content successfully reloaded.");
        }
        Err(e) => {
            error!("Failed to reload content: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_is_split_off() {
        let (front_matter, body) = split_front_matter("---\ntitle: Notes\ndate: 2024-01-02\n---\n# Body\n");
        assert_eq!(front_matter.title.as_deref(), Some("Notes"));
        assert_eq!(front_matter.date.as_deref(), Some("2024-01-02"));
        assert_eq!(body.trim(), "# Body");
    }

    #[test]
    fn no_front_matter_keeps_the_body() {
        let (front_matter, body) = split_front_matter("# Just text\n");
        assert!(front_matter.title.is_none());
        assert_eq!(body.trim(), "# Just text");
    }
}
