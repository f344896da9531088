pub mod cards;
pub mod console;
pub mod dom;
pub mod error;
pub mod escape;
pub mod extract;
pub mod html;
pub mod inline;
pub mod item;
pub mod markdown;
pub mod options;
pub mod reconcile;
pub mod render;
pub mod scroll;
pub mod types;

pub use cards::{CardKind, classify};
pub use console::Console;
pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use item::{RAW_TEXT_ATTR, StreamingItem};
pub use options::*;
pub use reconcile::{MergeOutcome, MergePath};
pub use render::{Rendered, render, render_html};
pub use scroll::{FollowState, ScrollFollow, Viewport};
pub use types::*;
