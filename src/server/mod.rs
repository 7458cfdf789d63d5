//! Preview server: renders the documents under a content directory.

mod content_loader;
mod hot_reload;
mod models;
mod state;

pub use self::content_loader::{load_content, read_document, reload_content, split_front_matter, LoadedContent};
pub use self::hot_reload::{start_content_watcher, ws_handler, HOT_RELOAD_SCRIPT};
pub use self::models::{Document, FrontMatter, RenderRequest, RenderResponse};
pub use self::state::{AppState, RefreshBroadcaster, RouterState};

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, get_service, post},
    Json, Router,
};
use htmlescape::encode_minimal;
use tower_http::services::ServeDir;
use tracing::{debug, error};

use crate::render::{render_source, SourceFormat};

pub fn router(router_state: RouterState) -> Router {
    let static_dir = get_service(ServeDir::new(router_state.app_state.content_dir.join("static")));

    let mut app = Router::new()
        .route("/", get(homepage))
        .route("/docs/{slug}", get(render_document))
        .route("/api/render", post(render_api))
        .nest_service("/static", static_dir);
    if router_state.app_state.is_development {
        app = app.route("/ws", get(ws_handler));
    }
    app.with_state(router_state)
}

pub fn render_with_layout(
    layout: &str,
    banner: &str,
    content: &str,
    documents: &[Document],
    mathjax: &str,
    is_development: bool,
) -> String {
    let mut list_items = String::new();
    for document in documents {
        list_items.push_str(&format!(
            "<li><a href=\"/docs/{}\">{}</a>",
            encode_minimal(&document.slug),
            encode_minimal(&document.title)
        ));
        if let Some(date) = document.display_date() {
            list_items.push_str(&format!(" <time>{date}</time>"));
        }
        list_items.push_str("</li>");
    }

    let mut page = layout
        .replace("{{ banner }}", banner)
        .replace("{{ documents }}", &list_items)
        .replace("{{ mathjax }}", mathjax)
        .replace("{{ content }}", content);

    if is_development {
        page = page.replace("</body>", &format!("{}</body>", HOT_RELOAD_SCRIPT));
    }

    page
}

async fn page(state: &AppState, content: &str) -> String {
    render_with_layout(
        &state.layout_html.read().await,
        &state.banner_html.read().await,
        content,
        &state.documents.read().await,
        &state.mathjax_tags,
        state.is_development,
    )
}

async fn homepage(State(state): State<Arc<AppState>>) -> Html<String> {
    let home = state.home_html.read().await.clone();
    Html(page(&state, &home).await)
}

async fn render_document(Path(slug): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let document = state
        .documents
        .read()
        .await
        .iter()
        .find(|document| document.slug == slug)
        .cloned();

    let Some(document) = document else {
        debug!(%slug, "unknown document");
        return not_found(&state, &slug).await;
    };

    let body = match read_document(&state.content_dir, &document).await {
        Ok(body) => body,
        Err(err) => {
            error!(%slug, %err, "failed to read document");
            return not_found(&state, &slug).await;
        }
    };

    let mut content = render_source(&body, document.format, &state.transform_options);
    if document.format == SourceFormat::Markdown {
        // LaTeX sources carry their own title block.
        content = format!("<h1>{}</h1>\n{content}", encode_minimal(&document.title));
    }
    Html(page(&state, &format!("<article>\n{content}</article>")).await).into_response()
}

async fn not_found(state: &AppState, slug: &str) -> Response {
    let message = state
        .not_found_html
        .read()
        .await
        .replace("{{slug}}", &encode_minimal(slug));
    (StatusCode::NOT_FOUND, Html(page(state, &message).await)).into_response()
}

async fn render_api(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenderRequest>,
) -> Json<RenderResponse> {
    debug!(format = ?request.format, len = request.source.len(), "render request");
    Json(RenderResponse {
        html: render_source(&request.source, request.format, &state.transform_options),
    })
}
