//! `thread_tree` turns a graph of conversation points into an ordered,
//! collapsible list of display nodes.
//!
//! A point whose response carries shards is split into a prompt node and
//! response segments, with forked sub-prompts nested under the segment they
//! were selected from.

pub mod builder;
pub mod expansion;
pub mod flatten;
pub mod node;
pub mod view;

// Re-export the public API
pub use builder::build_tree;
pub use expansion::ExpansionState;
pub use flatten::flatten;
pub use node::{NodeType, TreeNode};
pub use view::{build_flat_tree_list, resolve_root_order, TreeView};
