use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use super::content_loader::LoadedContent;
use super::models::Document;
use crate::config::Config;
use crate::error::Result;
use crate::latex::TransformOptions;

pub type RefreshBroadcaster = broadcast::Sender<()>;

pub struct AppState {
    pub banner_html: RwLock<String>,
    pub layout_html: RwLock<String>,
    pub home_html: RwLock<String>,
    pub not_found_html: RwLock<String>, // supports {{slug}} placeholder
    pub documents: RwLock<Vec<Document>>,
    pub content_dir: PathBuf,
    pub transform_options: TransformOptions,
    /// Head markup that configures and loads the client-side math engine.
    pub mathjax_tags: String,
    pub is_development: bool,
}

impl AppState {
    pub fn new(content: LoadedContent, config: &Config) -> Result<Self> {
        Ok(Self {
            banner_html: RwLock::new(content.banner_html),
            layout_html: RwLock::new(content.layout_html),
            home_html: RwLock::new(content.home_html),
            not_found_html: RwLock::new(content.not_found_html),
            documents: RwLock::new(content.documents),
            content_dir: config.server.content_dir.clone(),
            transform_options: config.transform_options(),
            mathjax_tags: config.bootstrap_options().script_tags()?,
            is_development: config.server.development,
        })
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub app_state: Arc<AppState>,
    pub broadcaster: RefreshBroadcaster,
}

impl axum::extract::FromRef<RouterState> for Arc<AppState> {
    fn from_ref(state: &RouterState) -> Self {
        state.app_state.clone()
    }
}

impl axum::extract::FromRef<RouterState> for RefreshBroadcaster {
    fn from_ref(state: &RouterState) -> Self {
        state.broadcaster.clone()
    }
}
