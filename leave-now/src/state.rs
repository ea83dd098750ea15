//! Display state shared between the poll and render loops.

use std::sync::Arc;

use tokio::sync::RwLock;

/// Text shown while the first snapshot is being fetched.
pub const LOADING_TEXT: &str = "Getting train data...";

/// The summary lines for both directions, from a single poll cycle.
///
/// Immutable once built: updates replace the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub north: String,
    pub south: String,
}

impl DisplayState {
    pub fn new(north: impl Into<String>, south: impl Into<String>) -> Self {
        Self {
            north: north.into(),
            south: south.into(),
        }
    }

    /// State shown before any feed data has arrived.
    pub fn loading() -> Self {
        Self::new(LOADING_TEXT, "")
    }
}

/// Single-writer, single-reader handoff of the current [`DisplayState`].
///
/// The slot holds an `Arc` to an immutable pair, so publishing swaps both
/// directions at once and a reader can never see north text from one
/// cycle next to south text from another.
#[derive(Debug, Clone)]
pub struct SharedDisplayState {
    inner: Arc<RwLock<Arc<DisplayState>>>,
}

impl SharedDisplayState {
    /// Create a shared slot holding `initial`.
    pub fn new(initial: DisplayState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Replace the current state.
    pub async fn publish(&self, state: DisplayState) {
        let state = Arc::new(state);
        let mut guard = self.inner.write().await;
        *guard = state;
    }

    /// Returns the current state.
    pub async fn snapshot(&self) -> Arc<DisplayState> {
        let guard = self.inner.read().await;
        Arc::clone(&guard)
    }
}

impl Default for SharedDisplayState {
    fn default() -> Self {
        Self::new(DisplayState::loading())
    }
}
