use thiserror::Error;

/// Errors surfaced by the display shim.
///
/// Stale redraw, fill and geometry tasks are not errors: they are dropped where
/// they are observed and only show up in `trace` logs.
#[derive(Debug, Error)]
pub enum ShimError {
    /// The configured rendering backend is not available in this build.
    /// Fatal at startup.
    #[error("unsupported rendering backend `{0}`")]
    UnsupportedBackend(String),

    /// The global input-capture hook could not be installed. Full grab
    /// degrades to window-local capture.
    #[error("global input capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// A surface whose pixel buffer size does not fit in memory.
    #[error("surface {width}x{height} is too large")]
    SurfaceTooLarge { width: u32, height: u32 },

    /// The UI loop has exited and no longer drains its queue.
    #[error("UI work queue is closed")]
    QueueClosed,

    /// A blocking round trip was requested from the UI thread itself.
    #[error("blocking dispatch requested from the UI thread")]
    DispatchOnUiThread,
}
