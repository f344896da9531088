//! One live generation: its raw text, its subtree and its scroll-follow state.

use crate::cards::SIGNATURE_ATTR;
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::reconcile::{MergeOutcome, merge};
use crate::render::render;
use crate::scroll::ScrollFollow;
use crate::types::{ItemId, StreamHeader, StreamMetadata};

/// Attribute on the body holding the raw stream text once the item is finalised.
pub const RAW_TEXT_ATTR: &str = "data-raw-text";
/// Marker attribute present on live parts of the tree until finalisation.
pub const STREAMING_ATTR: &str = "data-streaming";

const ACTIONS: &[(&str, &str)] = &[
    ("copy", "Copy"),
    ("delete", "Delete"),
    ("prev", "Previous"),
    ("next", "Next"),
];

#[derive(Debug)]
pub struct StreamingItem {
    id: ItemId,
    options: Options,
    header: StreamHeader,
    raw_text: String,
    root: NodeId,
    header_slot: NodeId,
    meta_slot: NodeId,
    status_slot: NodeId,
    spinner: Option<NodeId>,
    body_slot: NodeId,
    scroll: ScrollFollow,
    last_html: Option<String>,
    finalised: bool,
}

fn element(doc: &mut Document, tag: &str, class: &str) -> Result<NodeId> {
    let node = doc.create_element(tag);
    doc.set_attr(node, "class", class)?;
    Ok(node)
}

fn text_element(doc: &mut Document, tag: &str, class: &str, text: &str) -> Result<NodeId> {
    let node = element(doc, tag, class)?;
    let text = doc.create_text(text);
    doc.append_child(node, text)?;
    Ok(node)
}

fn version_label(version: &str) -> String {
    if version.starts_with(['v', 'V']) {
        version.to_string()
    } else {
        format!("v{version}")
    }
}

impl StreamingItem {
    /// Build the item's subtree and attach it as the last child of `container`.
    pub fn begin(
        doc: &mut Document,
        container: NodeId,
        id: ItemId,
        header: StreamHeader,
        options: Options,
    ) -> Result<Self> {
        if !doc.is_element(container) {
            return Err(Error::ContainerMissing(container));
        }

        let root = element(doc, "article", "stream-item")?;
        doc.set_attr(root, "data-item-id", &id.to_string())?;
        doc.set_attr(root, STREAMING_ATTR, "true")?;

        let header_slot = element(doc, "header", "stream-item-header")?;
        doc.append_child(root, header_slot)?;

        let meta_slot = element(doc, "div", "stream-item-meta")?;
        doc.append_child(header_slot, meta_slot)?;
        let name = text_element(doc, "span", "stream-item-name", &header.name)?;
        doc.append_child(meta_slot, name)?;
        if let Some(version) = header.version.as_deref().filter(|v| !v.is_empty()) {
            let version = text_element(doc, "span", "stream-item-version", &version_label(version))?;
            doc.append_child(meta_slot, version)?;
        }

        if options.show_user_message {
            if let Some(message) = header.user_message.as_deref().filter(|m| !m.trim().is_empty()) {
                let message = text_element(doc, "div", "stream-item-user-message", message)?;
                doc.append_child(header_slot, message)?;
            }
        }

        let status_slot = element(doc, "div", "stream-item-status")?;
        doc.append_child(header_slot, status_slot)?;
        let spinner = text_element(doc, "span", "spinner", &options.spinner_label)?;
        doc.set_attr(spinner, "role", "status")?;
        doc.append_child(status_slot, spinner)?;

        let body_slot = element(doc, "div", "stream-item-body")?;
        doc.append_child(root, body_slot)?;
        doc.append_child(container, root)?;

        tracing::debug!(item = %id, name = %header.name, "streaming item started");
        Ok(Self {
            id,
            scroll: ScrollFollow::new(options.scroll.clone()),
            options,
            header,
            raw_text: String::new(),
            root,
            header_slot,
            meta_slot,
            status_slot,
            spinner: Some(spinner),
            body_slot,
            last_html: None,
            finalised: false,
        })
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// Everything received so far, exactly as it arrived.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn header_slot(&self) -> NodeId {
        self.header_slot
    }

    pub fn body_slot(&self) -> NodeId {
        self.body_slot
    }

    pub fn spinner(&self) -> Option<NodeId> {
        self.spinner
    }

    pub fn scroll(&self) -> &ScrollFollow {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollFollow {
        &mut self.scroll
    }

    pub fn is_finalised(&self) -> bool {
        self.finalised
    }

    /// Accumulate `chunk`, re-render and merge into the body.
    ///
    /// Never fails. Returns `None` when nothing was merged: empty chunk, finalised item,
    /// detached root, or a render identical to the previous one.
    pub fn append(&mut self, doc: &mut Document, chunk: &str) -> Option<MergeOutcome> {
        if chunk.is_empty() {
            return None;
        }
        if self.finalised {
            tracing::debug!(item = %self.id, "append after finalise ignored");
            return None;
        }
        if !doc.is_attached(self.root) {
            tracing::debug!(item = %self.id, "append to detached item ignored");
            return None;
        }

        self.raw_text.push_str(chunk);
        tracing::trace!(
            item = %self.id,
            chunk_bytes = chunk.len(),
            total_bytes = self.raw_text.len(),
            "append"
        );

        let rendered = render(&self.raw_text, &self.options);
        if self.last_html.as_deref() == Some(rendered.html.as_str()) {
            return None;
        }
        let outcome = match merge(doc, self.body_slot, &rendered.html) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(item = %self.id, error = %err, "merge skipped");
                return None;
            }
        };
        self.last_html = Some(rendered.html);
        self.scroll.request_follow();
        Some(outcome)
    }

    /// Turn the live item into a finished one.
    ///
    /// A second call leaves the tree untouched and returns [`Error::AlreadyFinalised`].
    pub fn finalise(&mut self, doc: &mut Document, metadata: &StreamMetadata) -> Result<()> {
        if self.finalised {
            tracing::debug!(item = %self.id, "duplicate finalise");
            return Err(Error::AlreadyFinalised(self.id));
        }
        self.finalised = true;
        self.scroll.release();

        if !doc.contains(self.root) {
            tracing::debug!(item = %self.id, "finalised without a tree");
            return Ok(());
        }

        doc.remove_attr(self.root, STREAMING_ATTR)?;
        for node in doc.find_with_attr(self.root, STREAMING_ATTR) {
            doc.remove_attr(node, STREAMING_ATTR)?;
        }
        for card in doc.find_with_attr(self.body_slot, SIGNATURE_ATTR) {
            doc.remove_attr(card, SIGNATURE_ATTR)?;
        }
        doc.set_attr(self.body_slot, RAW_TEXT_ATTR, &self.raw_text)?;

        if let Some(model) = metadata.model.as_deref().filter(|m| !m.is_empty()) {
            let model = text_element(doc, "span", "stream-item-model", model)?;
            doc.append_child(self.meta_slot, model)?;
        }
        if let Some(tokens) = metadata.tokens_used {
            let tokens = text_element(doc, "span", "stream-item-tokens", &format!("{tokens} tokens"))?;
            doc.append_child(self.meta_slot, tokens)?;
        }

        let actions = element(doc, "div", "stream-item-actions")?;
        for (action, label) in ACTIONS {
            let button = text_element(doc, "button", "stream-item-action", label)?;
            doc.set_attr(button, "type", "button")?;
            doc.set_attr(button, "data-action", action)?;
            if matches!(*action, "prev" | "next") {
                doc.set_attr(button, "disabled", "")?;
            }
            doc.append_child(actions, button)?;
        }
        match self.spinner.take() {
            Some(spinner) if doc.contains(spinner) => {
                doc.replace_with(spinner, actions)?;
                doc.remove(spinner)?;
            }
            _ => doc.append_child(self.status_slot, actions)?,
        }

        tracing::debug!(
            item = %self.id,
            raw_bytes = self.raw_text.len(),
            model = ?metadata.model,
            tokens_used = ?metadata.tokens_used,
            "streaming item finalised"
        );
        Ok(())
    }
}
