//! Display refresh loop.
//!
//! Runs independently of the poll loop, checking every few tens of
//! milliseconds whether the clock minute or the published arrivals have
//! changed, and redrawing all four lines when either has. The shared state
//! has no change notification, so this is a polling interval: it bounds
//! redraw latency without needing an event system for four lines of text.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tracing::{info, warn};

use crate::display::{DisplayDevice, DisplayError, Line};
use crate::state::{DisplayState, SharedDisplayState};

/// Sleep between change checks when nothing needs redrawing.
pub const RENDER_IDLE: Duration = Duration::from_millis(20);

/// Clock format for line 1, e.g. `Mar 07 08:05`.
const CLOCK_FORMAT: &str = "%b %d %H:%M";

/// Format `now` at minute resolution for the clock line.
pub fn format_clock<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(CLOCK_FORMAT).to_string()
}

/// Everything on screen for one render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame {
    pub clock: String,
    pub updated: String,
    pub north: String,
    pub south: String,
}

impl RenderFrame {
    /// The four display lines, top to bottom.
    pub fn lines(&self) -> [String; 4] {
        [
            self.clock.clone(),
            format!("Update: {}", self.updated),
            self.north.clone(),
            self.south.clone(),
        ]
    }
}

/// Redraws a display when its content changes.
pub struct Renderer<D> {
    device: D,
    last_clock: Option<String>,
    last_state: Option<Arc<DisplayState>>,
    updated: String,
}

impl<D: DisplayDevice> Renderer<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            last_clock: None,
            last_state: None,
            updated: String::new(),
        }
    }

    /// Clock text of the last change to the arrival state.
    pub fn updated(&self) -> &str {
        &self.updated
    }

    /// Redraw if `clock` or `state` differ from what was last drawn.
    ///
    /// Returns whether a redraw was attempted. The new content is recorded
    /// even if the device fails, so a broken device is retried on the next
    /// change rather than on every pass.
    pub fn render_if_changed(&mut self, clock: &str, state: &Arc<DisplayState>) -> bool {
        let clock_changed = self.last_clock.as_deref() != Some(clock);
        let state_changed = self.last_state.as_deref() != Some(&**state);

        if !clock_changed && !state_changed {
            return false;
        }

        if state_changed {
            self.updated = clock.to_string();
            self.last_state = Some(Arc::clone(state));
        }
        self.last_clock = Some(clock.to_string());

        let frame = RenderFrame {
            clock: clock.to_string(),
            updated: self.updated.clone(),
            north: state.north.clone(),
            south: state.south.clone(),
        };

        if let Err(e) = self.draw(&frame) {
            warn!("display write failed: {e}");
        }

        true
    }

    fn draw(&mut self, frame: &RenderFrame) -> Result<(), DisplayError> {
        self.device.clear()?;
        for (text, line) in frame.lines().iter().zip(Line::ALL) {
            self.device.write_line(text, line)?;
        }
        Ok(())
    }
}

/// Render forever, reading from `shared`.
///
/// Device writes are synchronous and run on the runtime worker that polls
/// this task. A frame is four short lines, so this is fine for a terminal
/// or an I2C LCD; it does rely on the multi-thread runtime so a slow write
/// never holds up the poll loop. A device that can block for long should
/// get its own thread behind a channel instead.
pub async fn run_render_loop<D: DisplayDevice>(renderer: Renderer<D>, shared: SharedDisplayState) {
    render_with_clock(renderer, shared, || format_clock(&Local::now())).await
}

async fn render_with_clock<D, C>(mut renderer: Renderer<D>, shared: SharedDisplayState, clock: C)
where
    D: DisplayDevice,
    C: Fn() -> String,
{
    info!(idle_ms = RENDER_IDLE.as_millis() as u64, "render loop starting");

    loop {
        let clock = clock();
        let state = shared.snapshot().await;

        if !renderer.render_if_changed(&clock, &state) {
            tokio::time::sleep(RENDER_IDLE).await;
        }
    }
}
