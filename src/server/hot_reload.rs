use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use notify_debouncer_full::{
    new_debouncer, DebouncedEvent,
    notify::{RecursiveMode, Watcher, Error as NotifyError},
};
use tracing::{debug, error, info};

use super::content_loader::reload_content;
use super::state::{AppState, RefreshBroadcaster};

pub const HOT_RELOAD_SCRIPT: &str = r#"
<script>
    const socket = new WebSocket("ws://" + window.location.host + "/ws");
    socket.onmessage = (event) => {
        if (event.data === "reload") {
            window.location.reload();
        }
    };
</script>
"#;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(tx): State<RefreshBroadcaster>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, tx))
}

async fn handle_socket(mut socket: WebSocket, tx: RefreshBroadcaster) {
    let mut rx = tx.subscribe();

    if rx.recv().await.is_ok()
        && socket.send(Message::Text("reload".into())).await.is_err()
    {
        debug!("Client disconnected before reload message could be sent");
    }
}

/// Editors leave lock and backup files next to the ones being edited.
fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(".#") || name.ends_with('~') || name.ends_with(".swp"))
}

fn is_relevant(event: &DebouncedEvent) -> bool {
    let kind_matters = event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove();
    kind_matters && !event.event.paths.iter().any(|path| is_temp_file(path))
}

/// Re-reads content and tells connected pages to reload whenever a file under
/// the content directory changes.
pub fn start_content_watcher(tx: RefreshBroadcaster, app_state: Arc<AppState>) {
    info!(dir = %app_state.content_dir.display(), "Starting content watcher for hot-reload...");
    tokio::spawn(async move {
        let (watcher_tx, mut watcher_rx) = tokio::sync::mpsc::channel(1);

        let debouncer = new_debouncer(Duration::from_millis(200), None, move |res: Result<Vec<DebouncedEvent>, Vec<NotifyError>>| {
            match res {
                Ok(events) => {
                    let relevant: Vec<&DebouncedEvent> = events.iter().filter(|event| is_relevant(event)).collect();
                    if !relevant.is_empty() {
                        debug!("Relevant file change detected: {:?}", relevant.iter().flat_map(|e| &e.event.paths).map(|p| p.display()).collect::<Vec<_>>());
                        if let Err(e) = watcher_tx.blocking_send(()) {
                            error!("Failed to send watcher event: {}", e);
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        error!("Watcher error: {}", e);
                    }
                }
            }
        });

        let mut debouncer = match debouncer {
            Ok(debouncer) => debouncer,
            Err(e) => {
                error!("Failed to create debouncer: {}", e);
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(&app_state.content_dir, RecursiveMode::Recursive)
        {
            error!("Failed to start watching content directory: {}", e);
            return;
        }

        while watcher_rx.recv().await.is_some() {
            info!("Content change detected, reloading content and sending signal...");

            reload_content(&app_state).await;

            if let Err(e) = tx.send(()) {
                debug!("No page listening for reload: {}", e);
            }
        }
    });
}
