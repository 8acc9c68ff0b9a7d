//! Live-reload notifications.
//!
//! Tasks that change files a browser may have loaded publish the changed
//! output path through a [`ReloadSink`]. One-shot builds use [`NullSink`];
//! watch mode uses a [`BroadcastSink`] feeding the preview server.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Receives "this output file changed" notifications.
pub trait ReloadSink: Send + Sync + fmt::Debug {
    /// Notify that `path` (an output file) was rewritten.
    fn notify_changed(&self, path: &Path);
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReloadSink for NullSink {
    fn notify_changed(&self, _path: &Path) {}
}

/// How a connected browser should react to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReloadKind {
    /// Swap stylesheets in place
    #[serde(rename = "css")]
    Css,
    /// Full page reload
    #[serde(rename = "reload")]
    Page,
}

impl ReloadKind {
    /// Server-sent event name for this kind.
    pub fn event_name(self) -> &'static str {
        match self {
            ReloadKind::Css => "css",
            ReloadKind::Page => "reload",
        }
    }
}

/// A change notification addressed to browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    pub kind: ReloadKind,
    /// URL path of the changed file, always starting with `/`
    pub url: String,
}

impl ReloadEvent {
    /// Build an event for an output file under `root`.
    ///
    /// Paths outside `root` are reported by file name only.
    pub fn for_output(root: &Path, path: &Path) -> Self {
        let kind = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("css") => ReloadKind::Css,
            _ => ReloadKind::Page,
        };

        let relative = path
            .strip_prefix(root)
            .ok()
            .map(Path::to_path_buf)
            .or_else(|| path.file_name().map(PathBuf::from))
            .unwrap_or_default();

        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        Self { kind, url: format!("/{}", segments.join("/")) }
    }

    /// Encode as a server-sent event frame with a JSON payload.
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_default();
        format!("event: {}\ndata: {}\n\n", self.kind.event_name(), data)
    }
}

/// Sink publishing to every connected preview client.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    root: PathBuf,
    sender: broadcast::Sender<ReloadEvent>,
}

impl BroadcastSink {
    /// Create a sink for outputs under `root` with room for `capacity`
    /// undelivered events per client.
    pub fn new(root: PathBuf, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { root, sender }
    }

    /// The underlying sender, shared with the preview server.
    pub fn sender(&self) -> broadcast::Sender<ReloadEvent> {
        self.sender.clone()
    }
}

impl ReloadSink for BroadcastSink {
    fn notify_changed(&self, path: &Path) {
        let event = ReloadEvent::for_output(&self.root, path);
        tracing::debug!(url = %event.url, kind = event.kind.event_name(), "live reload");
        // No subscribers is not an error: nobody has the page open yet.
        let _ = self.sender.send(event);
    }
}
