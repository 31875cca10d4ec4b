//! # Snaptree
//!
//! An immutable, persistent B-Tree for ordered in-memory collections.
//!
//! Every mutation - a bulk [`build`] or a bulk [`update`] - returns a new
//! tree root that structurally shares all unchanged subtrees with its
//! predecessor. Old roots stay valid forever: cloning a tree is a
//! reference-count bump, and a clone is a stable snapshot regardless of what
//! is built from it later.
//!
//! ## Design
//!
//! - Nodes are immutable once reachable from a returned root; an update
//!   copies only the spine its keys touch.
//! - Updates merge a sorted input stream in a single descending traversal,
//!   driven by a stack of per-level scratch buffers that spill upward when
//!   they overflow.
//! - Cursors keep an explicit root-to-leaf path; nodes never point at their
//!   parents, which is what makes subtree sharing possible.
//!
//! ## Concurrency
//!
//! A tree value is freely shareable across threads; reads need no
//! synchronization. Updates against the same base each produce their own
//! tree - publication is the caller's job, or [`SharedTree`]'s.
//!
//! [`build`]: Tree::build
//! [`update`]: Tree::update

mod bound;
pub mod builder;
pub mod config;
pub mod cursor;
mod ksearch;
mod node;
pub mod shared;
mod tracing_helpers;
pub mod tree;

pub use builder::{Builder, KeepIncoming, ReplaceFn, ReplaceWith};
pub use config::DEFAULT_FAN;
pub use cursor::{Cursor, FullCursor};
pub use shared::SharedTree;
pub use tree::Tree;
