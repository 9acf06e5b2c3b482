//! The scene's per-frame render-id counter.

/// Identifier of a rendered frame.
pub type RenderId = u64;

/// Monotonic frame counter.
///
/// The scene driver advances it exactly once per frame; nodes compare their
/// last computed render-id against it to memoize "already computed this frame".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderClock {
    render_id: RenderId,
}

impl RenderClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of the frame currently being rendered.
    pub fn render_id(&self) -> RenderId {
        self.render_id
    }

    /// Starts a new frame and returns its id.
    pub fn advance(&mut self) -> RenderId {
        self.render_id += 1;
        self.render_id
    }
}
