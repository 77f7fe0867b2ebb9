//! Development server with live reload

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Site;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Options for `serve`
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub ip: String,
    pub port: u16,
    pub watch: bool,
    pub include_drafts: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 8080,
            watch: true,
            include_drafts: false,
        }
    }
}

/// Server state
struct ServerState {
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Serve the public directory, rebuilding on changes when watching
pub async fn start(site: &Site, options: ServeOptions) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir: site.public_dir.clone(),
        reload_tx: reload_tx.clone(),
        live_reload: options.watch,
    });

    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if options.ip == "localhost" {
        "127.0.0.1"
    } else {
        options.ip.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, options.port).parse()?;

    println!("Server running at http://{}:{}", options.ip, options.port);
    if options.watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if options.watch {
        let base_dir = site.base_dir.clone();
        let paths = watched_paths(site);
        let include_drafts = options.include_drafts;

        // The debouncer delivers on a std channel, so the loop owns a blocking thread
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_rebuild(base_dir, paths, include_drafts, reload_tx) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Config file, content, templates, data and passthrough paths
fn watched_paths(site: &Site) -> Vec<(PathBuf, RecursiveMode)> {
    let mut paths = vec![
        (site.config_path(), RecursiveMode::NonRecursive),
        (site.source_dir.clone(), RecursiveMode::Recursive),
        (site.templates_dir.clone(), RecursiveMode::Recursive),
        (site.data_dir.clone(), RecursiveMode::Recursive),
    ];
    for entry in &site.config.passthrough {
        paths.push((
            site.base_dir.join(entry.trim_start_matches('/')),
            RecursiveMode::Recursive,
        ));
    }
    paths
}

/// Watch for file changes, rebuild and trigger reload
fn watch_and_rebuild(
    base_dir: PathBuf,
    paths: Vec<(PathBuf, RecursiveMode)>,
    include_drafts: bool,
    reload_tx: broadcast::Sender<()>,
) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for (path, mode) in &paths {
        if path.exists() {
            debouncer.watcher().watch(path, *mode)?;
            tracing::debug!("Watching: {:?}", path);
        }
    }

    // Handle file change events
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events.iter().filter(|e| is_relevant(&e.path)).collect();
                if relevant.is_empty() {
                    continue;
                }

                println!();
                for event in &relevant {
                    println!("File changed: {}", event.path.display());
                }

                println!("Rebuilding...");
                // Reopen the site so edits to quire.yml take effect
                match Site::new(&base_dir).and_then(|site| site.build(include_drafts)) {
                    Ok(report) => {
                        println!(
                            "Rebuilt {} file(s) in {:.2}s",
                            report.files_written,
                            report.elapsed.as_secs_f64()
                        );
                        // Notify all connected clients to reload
                        let _ = reload_tx.send(());
                    }
                    Err(e) => {
                        println!("Build failed: {}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Editor droppings and VCS files don't trigger a rebuild
fn is_relevant(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains(".git")
        && !path_str.contains(".DS_Store")
        && !path_str.contains("node_modules")
        && !path_str.ends_with('~')
        && !path_str.ends_with(".swp")
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Serve files, injecting the live reload script into HTML
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let Some(file_path) = resolve_file(&state.public_dir, request.uri().path()) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    } else {
        let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Map a request path to a file under the public directory.
/// Paths that would leave the public directory resolve to nothing.
fn resolve_file(public_dir: &Path, path: &str) -> Option<PathBuf> {
    let clean_path = path.trim_start_matches('/');
    if clean_path.is_empty() {
        return Some(public_dir.join("index.html"));
    }

    let escapes = Path::new(clean_path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        tracing::debug!("Rejected request path {:?}", path);
        return None;
    }

    let candidate = public_dir.join(clean_path);
    let resolved = if candidate.is_dir() {
        candidate.join("index.html")
    } else if candidate.exists() {
        candidate
    } else {
        // Try adding .html extension
        let with_html = public_dir.join(format!("{}.html", clean_path));
        if with_html.exists() {
            with_html
        } else {
            candidate
        }
    };
    Some(resolved)
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}
