use crate::dom::NodeId;
use crate::types::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The container handed to `begin` is not a live element.
    #[error("container {0:?} is not a live element")]
    ContainerMissing(NodeId),
    #[error("streaming item {0:?} is already finalised")]
    AlreadyFinalised(ItemId),
    #[error("unknown streaming item {0:?}")]
    UnknownItem(ItemId),
    /// A node handle outlived its node.
    #[error("node {0:?} no longer exists")]
    StaleNode(NodeId),
    /// Inserting the node would make it its own ancestor.
    #[error("node {child:?} cannot be inserted under {parent:?}")]
    Hierarchy { parent: NodeId, child: NodeId },
}

pub type Result<T> = std::result::Result<T, Error>;
