//! Identity-preserving merge of a freshly rendered fragment into a live body.
//!
//! Cards are matched by their `data-card-signature`. A matched card keeps its node (and so any
//! host state hanging off it) even when its position changes.

use std::collections::{BTreeSet, HashMap};

use crate::cards::SIGNATURE_ATTR;
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePath {
    /// The candidate serialises exactly like the live body; nothing was touched.
    Unchanged,
    /// Same card set: only the tail after the last card (and changed prose before it) moved.
    Fast,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub path: MergePath,
    /// Live card nodes kept across the merge.
    pub preserved: usize,
    /// Card nodes taken from the candidate.
    pub mounted: usize,
    /// Live card nodes freed by the merge.
    pub discarded: usize,
}

impl MergeOutcome {
    fn unchanged() -> Self {
        Self {
            path: MergePath::Unchanged,
            preserved: 0,
            mounted: 0,
            discarded: 0,
        }
    }
}

fn is_card(doc: &Document, id: NodeId) -> bool {
    doc.has_class(id, "card")
}

fn cards_in(doc: &Document, id: NodeId) -> Vec<NodeId> {
    doc.descendants(id)
        .into_iter()
        .filter(|&n| is_card(doc, n))
        .collect()
}

/// Signed cards under `scope`, in document order. The first node wins a duplicate signature.
fn signed_cards(doc: &Document, scope: NodeId) -> (Vec<String>, HashMap<String, NodeId>) {
    let mut order = Vec::new();
    let mut by_signature = HashMap::new();
    for node in doc.find_with_attr(scope, SIGNATURE_ATTR) {
        let Some(sig) = doc.attr(node, SIGNATURE_ATTR) else {
            continue;
        };
        if !by_signature.contains_key(sig) {
            order.push(sig.to_string());
            by_signature.insert(sig.to_string(), node);
        }
    }
    (order, by_signature)
}

/// Child of `scope` that is `node` or holds it.
fn top_level_index(doc: &Document, scope: NodeId, node: NodeId) -> Option<usize> {
    let mut cur = node;
    loop {
        let parent = doc.parent(cur)?;
        if parent == scope {
            return doc.children(scope).iter().position(|&c| c == cur);
        }
        cur = parent;
    }
}

/// Make `live` serialise like `fresh` while keeping the `live` node itself. `fresh` is consumed.
fn sync_node(doc: &mut Document, live: NodeId, fresh: NodeId) -> Result<bool> {
    if doc.outer_html(live) == doc.outer_html(fresh) {
        doc.remove(fresh)?;
        return Ok(false);
    }
    let attrs = doc.attrs(fresh).to_vec();
    doc.replace_attrs(live, attrs)?;
    doc.clear_children(live)?;
    for child in doc.children(fresh).to_vec() {
        doc.append_child(live, child)?;
    }
    doc.remove(fresh)?;
    Ok(true)
}

/// Merge `candidate_html` into the children of `body`.
pub fn merge(doc: &mut Document, body: NodeId, candidate_html: &str) -> Result<MergeOutcome> {
    if !doc.is_element(body) {
        return Err(Error::StaleNode(body));
    }
    let holder = doc.create_element("div");
    let merged = merge_from(doc, body, holder, candidate_html);
    // Whatever is left in the holder is freed with it, on success and on error alike.
    let freed = doc.remove(holder);
    let outcome = merged?;
    freed?;
    Ok(outcome)
}

fn merge_from(
    doc: &mut Document,
    body: NodeId,
    holder: NodeId,
    candidate_html: &str,
) -> Result<MergeOutcome> {
    doc.set_inner_html(holder, candidate_html)?;
    if doc.inner_html(holder) == doc.inner_html(body) {
        return Ok(MergeOutcome::unchanged());
    }

    let (existing_order, existing) = signed_cards(doc, body);
    let (candidate_order, candidate) = signed_cards(doc, holder);
    let existing_keys: BTreeSet<&String> = existing.keys().collect();
    let candidate_keys: BTreeSet<&String> = candidate.keys().collect();

    let outcome = if !existing_keys.is_empty() && existing_keys == candidate_keys {
        match fast_path(doc, body, holder, &existing, &candidate, &candidate_order)? {
            Some(outcome) => outcome,
            None => slow_path(doc, body, holder, &existing, &candidate)?,
        }
    } else {
        slow_path(doc, body, holder, &existing, &candidate)?
    };
    tracing::debug!(
        path = ?outcome.path,
        preserved = outcome.preserved,
        mounted = outcome.mounted,
        discarded = outcome.discarded,
        existing = existing_order.len(),
        "merged render"
    );
    Ok(outcome)
}

/// Returns `None` when the top-level layout around the cards moved, which the slow path handles.
fn fast_path(
    doc: &mut Document,
    body: NodeId,
    holder: NodeId,
    existing: &HashMap<String, NodeId>,
    candidate: &HashMap<String, NodeId>,
    candidate_order: &[String],
) -> Result<Option<MergeOutcome>> {
    let Some(last) = candidate_order.last() else {
        return Ok(None);
    };
    let (Some(&live_last), Some(&fresh_last)) = (existing.get(last), candidate.get(last)) else {
        return Ok(None);
    };
    let (Some(live_idx), Some(fresh_idx)) = (
        top_level_index(doc, body, live_last),
        top_level_index(doc, holder, fresh_last),
    ) else {
        return Ok(None);
    };
    if live_idx != fresh_idx {
        tracing::debug!(live_idx, fresh_idx, "card layout moved; falling back");
        return Ok(None);
    }
    // Every card must sit in the shared prefix at the same top-level slot.
    for (sig, &live) in existing {
        let Some(&fresh) = candidate.get(sig) else {
            return Ok(None);
        };
        let slots = (
            top_level_index(doc, body, live),
            top_level_index(doc, holder, fresh),
        );
        if slots.0.is_none() || slots.0 != slots.1 {
            return Ok(None);
        }
    }

    let live_prefix: Vec<NodeId> = doc.children(body)[..=live_idx].to_vec();
    let fresh_prefix: Vec<NodeId> = doc.children(holder)[..=fresh_idx].to_vec();
    let live_tail: Vec<NodeId> = doc.children(body)[live_idx + 1..].to_vec();
    let fresh_tail: Vec<NodeId> = doc.children(holder)[fresh_idx + 1..].to_vec();
    if live_prefix.len() != fresh_prefix.len() {
        return Ok(None);
    }
    for (&live, &fresh) in live_prefix.iter().zip(&fresh_prefix) {
        let live_sig = doc.attr(live, SIGNATURE_ATTR);
        if live_sig.is_some() && live_sig != doc.attr(fresh, SIGNATURE_ATTR) {
            return Ok(None);
        }
    }

    for (&live, &fresh) in live_prefix.iter().zip(&fresh_prefix) {
        if doc.attr(live, SIGNATURE_ATTR).is_some() {
            doc.detach(fresh)?;
            sync_node(doc, live, fresh)?;
            continue;
        }
        let live_cards = doc.find_with_attr(live, SIGNATURE_ATTR);
        if live_cards.is_empty() && doc.find_with_attr(fresh, SIGNATURE_ATTR).is_empty() {
            if doc.outer_html(live) != doc.outer_html(fresh) {
                doc.replace_with(live, fresh)?;
                doc.remove(live)?;
            }
            continue;
        }
        // A wrapper around cards: refresh each card, keep the wrapper.
        for card in live_cards {
            let fresh_card = doc
                .attr(card, SIGNATURE_ATTR)
                .and_then(|sig| candidate.get(sig))
                .copied();
            if let Some(fresh_card) = fresh_card {
                doc.detach(fresh_card)?;
                sync_node(doc, card, fresh_card)?;
            }
        }
    }

    for node in live_tail {
        doc.remove(node)?;
    }
    let mut mounted = 0;
    for node in fresh_tail {
        mounted += cards_in(doc, node).len() + usize::from(is_card(doc, node));
        doc.append_child(body, node)?;
    }
    Ok(Some(MergeOutcome {
        path: MergePath::Fast,
        preserved: existing.len(),
        mounted,
        discarded: 0,
    }))
}

fn slow_path(
    doc: &mut Document,
    body: NodeId,
    holder: NodeId,
    existing: &HashMap<String, NodeId>,
    candidate: &HashMap<String, NodeId>,
) -> Result<MergeOutcome> {
    let fresh_total = cards_in(doc, holder).len();
    let live_total = cards_in(doc, body).len();

    // Prose that serialises the same at the same top-level slot keeps its node. Cards are
    // matched by signature below.
    let live_top = doc.children(body).to_vec();
    let fresh_top = doc.children(holder).to_vec();
    let mut kept = 0usize;
    for (&live, &fresh) in live_top.iter().zip(&fresh_top) {
        if holds_card(doc, live) || holds_card(doc, fresh) {
            continue;
        }
        if doc.outer_html(live) == doc.outer_html(fresh) {
            doc.replace_with(fresh, live)?;
            doc.remove(fresh)?;
            kept += 1;
        }
    }

    let mut preserved = 0;
    for (sig, &fresh) in candidate {
        let Some(&live) = existing.get(sig) else {
            continue;
        };
        doc.replace_with(fresh, live)?;
        sync_node(doc, live, fresh)?;
        preserved += 1;
    }

    doc.clear_children(body)?;
    for node in doc.children(holder).to_vec() {
        doc.append_child(body, node)?;
    }
    tracing::trace!(kept, "slow path kept unchanged prose");
    Ok(MergeOutcome {
        path: MergePath::Slow,
        preserved,
        mounted: fresh_total.saturating_sub(preserved),
        discarded: live_total.saturating_sub(preserved),
    })
}

/// `node` is a card or contains one.
fn holds_card(doc: &Document, node: NodeId) -> bool {
    is_card(doc, node) || !cards_in(doc, node).is_empty()
}
