use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrollOptions {
    /// Scroll-top increase (px) beyond the last auto-scroll that counts as a user scroll.
    pub epsilon_px: f64,
    /// Scroll tops at or below this (px) count as "back at the top".
    pub top_threshold_px: f64,
    /// Quiet period after the last user scroll before a return to the top re-enables follow.
    pub settle_ms: u64,
}

impl ScrollOptions {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            epsilon_px: 4.0,
            top_threshold_px: 8.0,
            settle_ms: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub scroll: ScrollOptions,
    /// Render the prompt that started the stream in the item header.
    pub show_user_message: bool,
    pub spinner_label: String,
    /// Tail window for previews of unterminated JSON that matches no card kind.
    pub max_unknown_preview_bytes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scroll: ScrollOptions::default(),
            show_user_message: true,
            spinner_label: "Generating…".to_string(),
            max_unknown_preview_bytes: 16 * 1024,
        }
    }
}
