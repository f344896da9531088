//! Host-facing facade: one document, one scroll container, many streaming items.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::item::StreamingItem;
use crate::options::Options;
use crate::reconcile::MergeOutcome;
use crate::scroll::Viewport;
use crate::types::{ItemId, StreamHeader, StreamMetadata};

#[derive(Debug)]
pub struct Console {
    doc: Document,
    container: NodeId,
    options: Options,
    items: BTreeMap<ItemId, StreamingItem>,
    next_id: u64,
    /// Item whose append most recently asked for a scroll; it owns the next frame's write.
    follow_candidate: Option<ItemId>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Console {
    pub fn new(options: Options) -> Self {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let root = doc.root();
        // A fresh element under the root cannot fail to attach.
        let _ = doc.set_attr(container, "class", "stream-console");
        let _ = doc.append_child(root, container);
        Self {
            doc,
            container,
            options,
            items: BTreeMap::new(),
            next_id: 1,
            follow_candidate: None,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The scroll container every item is appended to.
    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn item(&self, id: ItemId) -> Option<&StreamingItem> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &StreamingItem> {
        self.items.values()
    }

    pub fn begin(&mut self, header: StreamHeader) -> Result<ItemId> {
        let id = ItemId(self.next_id);
        let item = StreamingItem::begin(
            &mut self.doc,
            self.container,
            id,
            header,
            self.options.clone(),
        )?;
        self.next_id += 1;
        self.items.insert(id, item);
        Ok(id)
    }

    /// Ids handed out by [`Console::begin`], removed items included.
    fn was_begun(&self, id: ItemId) -> bool {
        (1..self.next_id).contains(&id.0)
    }

    pub fn append(&mut self, id: ItemId, chunk: &str) -> Result<Option<MergeOutcome>> {
        let Some(item) = self.items.get_mut(&id) else {
            return if self.was_begun(id) {
                Ok(None)
            } else {
                Err(Error::UnknownItem(id))
            };
        };
        let outcome = item.append(&mut self.doc, chunk);
        if item.scroll().wants_auto_scroll() {
            self.follow_candidate = Some(id);
        }
        Ok(outcome)
    }

    pub fn finalise(&mut self, id: ItemId, metadata: &StreamMetadata) -> Result<()> {
        let Some(item) = self.items.get_mut(&id) else {
            return if self.was_begun(id) {
                Ok(())
            } else {
                Err(Error::UnknownItem(id))
            };
        };
        item.finalise(&mut self.doc, metadata)?;
        if self.follow_candidate == Some(id) {
            self.follow_candidate = None;
        }
        Ok(())
    }

    pub fn raw_text(&self, id: ItemId) -> Option<&str> {
        self.items.get(&id).map(StreamingItem::raw_text)
    }

    /// Free an item's tree and forget the item. Later calls naming it are no-ops.
    pub fn remove(&mut self, id: ItemId) -> Result<()> {
        let Some(mut item) = self.items.remove(&id) else {
            return if self.was_begun(id) {
                Ok(())
            } else {
                Err(Error::UnknownItem(id))
            };
        };
        item.scroll_mut().release();
        if self.doc.contains(item.root()) {
            self.doc.remove(item.root())?;
        }
        if self.follow_candidate == Some(id) {
            self.follow_candidate = None;
        }
        tracing::debug!(item = %id, "streaming item removed");
        Ok(())
    }

    /// Forward a container scroll event to every item.
    pub fn on_scroll(&mut self, viewport: &impl Viewport, now: Instant) {
        let top = viewport.scroll_top();
        for item in self.items.values_mut() {
            item.scroll_mut().on_scroll(top, now);
        }
    }

    /// Drive settle timers.
    pub fn poll(&mut self, viewport: &impl Viewport, now: Instant) {
        let top = viewport.scroll_top();
        for item in self.items.values_mut() {
            item.scroll_mut().poll(now, top);
        }
    }

    /// Perform at most one auto-scroll write. Returns whether the viewport was written.
    ///
    /// The write goes to the item that appended last, scrolling towards the bottom but never
    /// past the point where its header meets the container top.
    pub fn animation_frame(&mut self, viewport: &mut impl Viewport) -> bool {
        let candidate = self.follow_candidate.take();
        let mut wrote = false;
        if let Some(item) = candidate.and_then(|id| self.items.get_mut(&id)) {
            if item.scroll().wants_auto_scroll() && self.doc.is_attached(item.root()) {
                let current = viewport.scroll_top();
                let header_limit = current + viewport.offset_top(item.header_slot());
                let target = viewport.max_scroll_top().min(header_limit).max(current);
                if target != current {
                    viewport.set_scroll_top(target);
                }
                let header_offset = viewport.offset_top(item.header_slot());
                item.scroll_mut()
                    .auto_scrolled(viewport.scroll_top(), header_offset);
                wrote = target != current;
            }
        }
        let top = viewport.scroll_top();
        for item in self.items.values_mut() {
            let scroll = item.scroll_mut();
            scroll.cancel_request();
            if wrote {
                scroll.observe_auto_scroll(top);
            }
        }
        wrote
    }
}
