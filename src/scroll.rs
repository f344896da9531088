//! Scroll-follow policy for one streaming item.

use std::time::Instant;

use crate::dom::NodeId;
use crate::options::ScrollOptions;

/// Scroll geometry of the container the items live in.
///
/// Hosts implement this over whatever does layout (a browser, a terminal UI, a test fake).
pub trait Viewport {
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&mut self, top: f64);
    /// Largest reachable scroll top, i.e. "scrolled to the bottom".
    fn max_scroll_top(&self) -> f64;
    /// Distance from the container's visible top edge to the top of `node`. Negative once the
    /// node has scrolled past the top.
    fn offset_top(&self, node: NodeId) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    Follow,
    UserPaused,
    /// The item's header reached the top of the container. Terminal while streaming.
    HeaderReachedTop,
    /// The item was finalised; every event is ignored.
    Released,
}

#[derive(Debug, Clone)]
pub struct ScrollFollow {
    options: ScrollOptions,
    state: FollowState,
    last_observed: Option<f64>,
    settle_deadline: Option<Instant>,
    pending: bool,
}

impl ScrollFollow {
    pub fn new(options: ScrollOptions) -> Self {
        Self {
            options,
            state: FollowState::Follow,
            last_observed: None,
            settle_deadline: None,
            pending: false,
        }
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    pub fn last_observed_scroll_top(&self) -> Option<f64> {
        self.last_observed
    }

    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle_deadline
    }

    fn transition(&mut self, to: FollowState) {
        if self.state != to {
            tracing::debug!(from = ?self.state, to = ?to, "scroll follow transition");
            self.state = to;
        }
    }

    /// A scroll event on the container.
    pub fn on_scroll(&mut self, scroll_top: f64, now: Instant) {
        match self.state {
            FollowState::Follow => {
                // Before the first auto-scroll the first event sets the baseline.
                let base = *self.last_observed.get_or_insert(scroll_top);
                if scroll_top > base + self.options.epsilon_px {
                    self.transition(FollowState::UserPaused);
                    self.pending = false;
                    self.settle_deadline = Some(now + self.options.settle());
                    self.last_observed = Some(scroll_top);
                } else if scroll_top < base {
                    self.last_observed = Some(scroll_top);
                }
            }
            FollowState::UserPaused => {
                self.settle_deadline = Some(now + self.options.settle());
                self.last_observed = Some(scroll_top);
            }
            FollowState::HeaderReachedTop | FollowState::Released => {}
        }
    }

    /// Settle-timer check. Re-enables follow once the user has stopped scrolling near the top.
    pub fn poll(&mut self, now: Instant, scroll_top: f64) {
        if self.state != FollowState::UserPaused {
            return;
        }
        let Some(deadline) = self.settle_deadline else {
            return;
        };
        if now >= deadline && scroll_top <= self.options.top_threshold_px {
            self.settle_deadline = None;
            self.last_observed = Some(scroll_top);
            self.transition(FollowState::Follow);
        }
    }

    /// Called after each append that changed the body. Returns whether a scroll was requested.
    pub fn request_follow(&mut self) -> bool {
        self.pending = self.state == FollowState::Follow;
        self.pending
    }

    pub fn wants_auto_scroll(&self) -> bool {
        self.pending && self.state == FollowState::Follow
    }

    /// Drop a pending request without scrolling (another item took this frame's write).
    pub fn cancel_request(&mut self) {
        self.pending = false;
    }

    /// Record an auto-scroll write to `scroll_top`, after which the header sits at
    /// `header_offset` from the container top.
    pub fn auto_scrolled(&mut self, scroll_top: f64, header_offset: f64) {
        self.pending = false;
        if self.state != FollowState::Follow {
            return;
        }
        self.last_observed = Some(scroll_top);
        if header_offset <= 0.0 {
            self.transition(FollowState::HeaderReachedTop);
        }
    }

    /// Another item moved the shared container to `scroll_top`; its echo is not a user scroll.
    pub fn observe_auto_scroll(&mut self, scroll_top: f64) {
        if self.state == FollowState::Follow {
            self.last_observed = Some(scroll_top);
        }
    }

    /// Stop listening. Cancels the settle timer.
    pub fn release(&mut self) {
        self.pending = false;
        self.settle_deadline = None;
        self.transition(FollowState::Released);
    }
}
