//! Tokio glue for `cardstream`.
//!
//! `cardstream` is runtime-agnostic and single-owner: a `Document` and its streaming items live on
//! one thread. This crate helps async producers feed it:
//!
//! - Coalesce tiny model deltas into larger chunks (newline-gated and/or time-window flush), so
//!   the renderer re-renders the buffer fewer times.
//! - Apply a backpressure policy on the producer side.
//! - Run an actor task that owns a `Document` + `StreamingItem` and emits owned snapshots.

use std::time::Duration;

use cardstream::{Document, Options, StreamHeader, StreamMetadata, StreamingItem, types::ItemId};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct CoalesceOptions {
    /// Flush once a newline is observed in the buffered text.
    pub flush_on_newline: bool,
    /// Flush if no flush happened for this duration (progress guarantee).
    pub max_delay: Duration,
    /// Flush when buffered bytes reach this limit.
    pub max_bytes: usize,
}

impl Default for CoalesceOptions {
    fn default() -> Self {
        Self {
            flush_on_newline: true,
            max_delay: Duration::from_millis(60),
            max_bytes: 8 * 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoalescePreset {
    /// Roughly one re-render per line.
    Balanced,
    /// Lower latency, more re-renders.
    Fast,
    /// Ignore newlines; flush on time and size only. Suits card-heavy output where JSON lines
    /// arrive in bursts.
    TimeOnly,
}

impl CoalescePreset {
    pub fn label(self) -> &'static str {
        match self {
            CoalescePreset::Balanced => "balanced",
            CoalescePreset::Fast => "fast",
            CoalescePreset::TimeOnly => "time-only",
        }
    }

    pub fn options(self) -> CoalesceOptions {
        match self {
            CoalescePreset::Balanced => CoalesceOptions {
                flush_on_newline: true,
                max_delay: Duration::from_millis(80),
                max_bytes: 16 * 1024,
            },
            CoalescePreset::Fast => CoalesceOptions {
                flush_on_newline: true,
                max_delay: Duration::from_millis(30),
                max_bytes: 4 * 1024,
            },
            CoalescePreset::TimeOnly => CoalesceOptions {
                flush_on_newline: false,
                max_delay: Duration::from_millis(60),
                max_bytes: 4 * 1024,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Await capacity. Never drops.
    ///
    /// Trade-off: the producer task may stall when the renderer falls behind.
    Block,
    /// Drop the new delta when the channel is full.
    ///
    /// Only for best-effort text (status lines). Dropping model output corrupts the stream
    /// buffer, including any JSON card payloads in it.
    DropNew,
    /// Buffer locally and flush opportunistically on newline or size.
    ///
    /// Trade-off: memory is bounded by `local_max_bytes`; delivery becomes chunky under load.
    CoalesceLocal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped,
    Buffered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendError {
    Closed,
}

/// Producer-side helper for bounded delta channels.
pub struct DeltaSender {
    tx: mpsc::Sender<String>,
    policy: BackpressurePolicy,
    local_buf: String,
    local_max_bytes: usize,
}

impl DeltaSender {
    pub fn new(tx: mpsc::Sender<String>, policy: BackpressurePolicy) -> Self {
        Self {
            tx,
            policy,
            local_buf: String::new(),
            local_max_bytes: 16 * 1024,
        }
    }

    pub fn set_local_max_bytes(&mut self, max: usize) {
        self.local_max_bytes = max.max(1);
    }

    pub fn policy(&self) -> BackpressurePolicy {
        self.policy
    }

    /// Bytes held back by [`BackpressurePolicy::CoalesceLocal`].
    pub fn buffered_bytes(&self) -> usize {
        self.local_buf.len()
    }

    pub async fn send(&mut self, delta: &str) -> Result<SendOutcome, SendError> {
        if delta.is_empty() {
            return Ok(SendOutcome::Sent);
        }
        match self.policy {
            BackpressurePolicy::Block => {
                self.tx
                    .send(delta.to_string())
                    .await
                    .map_err(|_| SendError::Closed)?;
                Ok(SendOutcome::Sent)
            }
            BackpressurePolicy::DropNew => match self.tx.try_send(delta.to_string()) {
                Ok(()) => Ok(SendOutcome::Sent),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::trace!(bytes = delta.len(), "delta dropped");
                    Ok(SendOutcome::Dropped)
                }
                Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Closed),
            },
            BackpressurePolicy::CoalesceLocal => self.send_coalesce_local(delta),
        }
    }

    /// Send whatever [`BackpressurePolicy::CoalesceLocal`] is holding, awaiting capacity.
    pub async fn flush(&mut self) -> Result<SendOutcome, SendError> {
        if self.local_buf.is_empty() {
            return Ok(SendOutcome::Sent);
        }
        let buf = std::mem::take(&mut self.local_buf);
        self.tx.send(buf).await.map_err(|_| SendError::Closed)?;
        Ok(SendOutcome::Sent)
    }

    fn send_coalesce_local(&mut self, delta: &str) -> Result<SendOutcome, SendError> {
        self.local_buf.push_str(delta);
        if self.local_buf.len() < self.local_max_bytes && !self.local_buf.contains('\n') {
            return Ok(SendOutcome::Buffered);
        }
        match self.tx.try_send(std::mem::take(&mut self.local_buf)) {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(mpsc::error::TrySendError::Full(s)) => {
                self.local_buf = s;
                Ok(SendOutcome::Buffered)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Closed),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushReason {
    Newline,
    MaxDelay,
    MaxBytes,
    ChannelClosed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoalescedChunk {
    pub text: String,
    pub reason: FlushReason,
    /// Number of input messages merged into this output chunk.
    pub merged_messages: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoalesceStats {
    pub total_in_messages: u64,
    pub total_out_chunks: u64,
    pub total_out_bytes: u64,
    pub last_reason: Option<FlushReason>,
}

/// A receiver wrapper that merges high-frequency deltas into fewer, larger chunks.
pub struct CoalescingReceiver {
    rx: mpsc::Receiver<String>,
    opts: CoalesceOptions,
    buf: String,
    deadline: Option<Instant>,
    stats: CoalesceStats,
}

impl CoalescingReceiver {
    pub fn new(rx: mpsc::Receiver<String>, opts: CoalesceOptions) -> Self {
        Self {
            rx,
            opts,
            buf: String::new(),
            deadline: None,
            stats: CoalesceStats::default(),
        }
    }

    pub fn options(&self) -> CoalesceOptions {
        self.opts
    }

    pub fn stats(&self) -> CoalesceStats {
        self.stats
    }

    /// Receive the next coalesced chunk; `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.recv_with_meta().await.map(|c| c.text)
    }

    pub async fn recv_with_meta(&mut self) -> Option<CoalescedChunk> {
        let mut merged_messages = 0usize;

        if self.buf.is_empty() {
            let first = self.rx.recv().await?;
            self.buf.push_str(&first);
            merged_messages += 1;
            self.deadline = Some(Instant::now() + self.opts.max_delay);
        }

        loop {
            if let Some(reason) = self.should_flush_reason() {
                return Some(self.emit(reason, merged_messages));
            }
            let deadline = *self
                .deadline
                .get_or_insert_with(|| Instant::now() + self.opts.max_delay);

            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(s)) => {
                    self.buf.push_str(&s);
                    merged_messages += 1;
                }
                Ok(None) if self.buf.is_empty() => return None,
                Ok(None) => return Some(self.emit(FlushReason::ChannelClosed, merged_messages)),
                Err(_) => return Some(self.emit(FlushReason::MaxDelay, merged_messages)),
            }
        }
    }

    fn should_flush_reason(&self) -> Option<FlushReason> {
        if self.buf.len() >= self.opts.max_bytes {
            return Some(FlushReason::MaxBytes);
        }
        if self.opts.flush_on_newline && self.buf.contains('\n') {
            return Some(FlushReason::Newline);
        }
        None
    }

    fn emit(&mut self, reason: FlushReason, merged_messages: usize) -> CoalescedChunk {
        self.deadline = None;
        let text = std::mem::take(&mut self.buf);
        self.stats.total_in_messages = self
            .stats
            .total_in_messages
            .saturating_add(merged_messages as u64);
        self.stats.total_out_chunks = self.stats.total_out_chunks.saturating_add(1);
        self.stats.total_out_bytes = self.stats.total_out_bytes.saturating_add(text.len() as u64);
        self.stats.last_reason = Some(reason);
        CoalescedChunk {
            text,
            reason,
            merged_messages,
        }
    }
}

/// Owned view of a streaming item after a merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub body_html: String,
    /// Bytes of raw stream text received so far.
    pub raw_len: usize,
    pub finalised: bool,
    /// Full raw text, only on the final snapshot.
    pub raw_text: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ItemActorOptions {
    pub coalesce: CoalesceOptions,
    pub render: Options,
    /// Written into the header when the delta channel closes.
    pub metadata: StreamMetadata,
}

fn snapshot(doc: &Document, item: &StreamingItem, last: bool) -> ItemSnapshot {
    ItemSnapshot {
        body_html: doc.inner_html(item.body_slot()),
        raw_len: item.raw_text().len(),
        finalised: item.is_finalised(),
        raw_text: last.then(|| item.raw_text().to_string()),
    }
}

/// Spawn a task that owns a `Document` and one `StreamingItem`.
///
/// Every coalesced chunk that changes the body yields a snapshot. When `rx` closes the item is
/// finalised and one last snapshot (with the raw text) is sent.
pub fn spawn_item_actor(
    header: StreamHeader,
    rx: mpsc::Receiver<String>,
    options: ItemActorOptions,
) -> mpsc::Receiver<ItemSnapshot> {
    let (tx_out, rx_out) = mpsc::channel::<ItemSnapshot>(64);

    tokio::spawn(async move {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let root = doc.root();
        let item = doc
            .append_child(root, container)
            .and_then(|()| {
                StreamingItem::begin(&mut doc, container, ItemId(1), header, options.render)
            });
        let mut item = match item {
            Ok(item) => item,
            Err(err) => {
                tracing::debug!(error = %err, "item actor could not start");
                return;
            }
        };

        let mut rx = CoalescingReceiver::new(rx, options.coalesce);
        while let Some(chunk) = rx.recv().await {
            if item.append(&mut doc, &chunk).is_none() {
                continue;
            }
            if tx_out.send(snapshot(&doc, &item, false)).await.is_err() {
                return;
            }
        }
        if let Err(err) = item.finalise(&mut doc, &options.metadata) {
            tracing::debug!(error = %err, "item actor finalise failed");
        }
        let _ = tx_out.send(snapshot(&doc, &item, true)).await;
    });

    rx_out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coalesces_until_newline_by_default() {
        let (tx, rx) = mpsc::channel::<String>(8);
        let mut cr = CoalescingReceiver::new(rx, CoalesceOptions::default());

        tx.send("**he".to_string()).await.unwrap();
        tx.send("llo**".to_string()).await.unwrap();
        tx.send("\n".to_string()).await.unwrap();

        let got = cr.recv_with_meta().await.unwrap();
        assert_eq!(got.text, "**hello**\n");
        assert_eq!(got.reason, FlushReason::Newline);
        assert_eq!(got.merged_messages, 3);

        let stats = cr.stats();
        assert_eq!(stats.total_in_messages, 3);
        assert_eq!(stats.total_out_chunks, 1);
        assert_eq!(stats.last_reason, Some(FlushReason::Newline));
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_on_max_delay_without_newline() {
        let (tx, rx) = mpsc::channel::<String>(8);
        let mut cr = CoalescingReceiver::new(rx, CoalescePreset::TimeOnly.options());
        tx.send("{\"headline\":".to_string()).await.unwrap();

        let got = cr.recv_with_meta().await.unwrap();
        assert_eq!(got.text, "{\"headline\":");
        assert_eq!(got.reason, FlushReason::MaxDelay);
    }

    #[tokio::test]
    async fn flushes_remaining_text_when_the_channel_closes() {
        let (tx, rx) = mpsc::channel::<String>(8);
        let mut cr = CoalescingReceiver::new(rx, CoalesceOptions::default());
        tx.send("tail".to_string()).await.unwrap();
        drop(tx);

        let got = cr.recv_with_meta().await.unwrap();
        assert_eq!(got.reason, FlushReason::ChannelClosed);
        assert_eq!(got.text, "tail");
        assert_eq!(cr.recv().await, None);
    }

    #[tokio::test]
    async fn delta_sender_drop_new_drops_when_full() {
        let (tx, mut rx) = mpsc::channel::<String>(1);
        let mut s = DeltaSender::new(tx, BackpressurePolicy::DropNew);

        assert_eq!(s.send("a").await.unwrap(), SendOutcome::Sent);
        assert_eq!(s.send("b").await.unwrap(), SendOutcome::Dropped);

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        drop(s);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn delta_sender_coalesce_local_flushes_eventually() {
        let (tx, mut rx) = mpsc::channel::<String>(1);
        let mut s = DeltaSender::new(tx, BackpressurePolicy::CoalesceLocal);
        s.set_local_max_bytes(4);

        s.tx.try_send("x".to_string()).unwrap();

        assert_eq!(s.send("ab").await.unwrap(), SendOutcome::Buffered);
        assert_eq!(s.send("cd").await.unwrap(), SendOutcome::Buffered);
        assert_eq!(s.buffered_bytes(), 4);

        assert_eq!(rx.recv().await.as_deref(), Some("x"));
        assert_eq!(s.flush().await.unwrap(), SendOutcome::Sent);
        assert_eq!(rx.recv().await.as_deref(), Some("abcd"));
    }
}
