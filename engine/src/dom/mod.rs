mod node;
pub mod serialize;

pub use node::{Ancestors, Dom, DomError, ElementData, Node, NodeId, NodeType};
pub use serialize::{serialize, serialize_node};
