/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Errors reported at the boundary between the host and the style engine.
//!
//! The recalculation passes themselves never fail: a missing style or a
//! missing pseudo-element is a valid result. These errors only describe
//! misuse of the document API.

use crate::dom::NodeId;

/// Convenient type alias of Result type for the style engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by document mutations and lifecycle entry points.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The node id does not refer to a live node.
    #[error("no node with id {0:?}")]
    NoSuchNode(NodeId),
    /// The operation requires an element.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// The operation requires a text node.
    #[error("node {0:?} is not a text node")]
    NotATextNode(NodeId),
    /// The node is not reachable from the document.
    #[error("node {0:?} is not connected to the document")]
    NotConnected(NodeId),
    /// The element does not establish a size container.
    #[error("node {0:?} is not a size container")]
    NotASizeContainer(NodeId),
    /// The node has no layout object to report a size for.
    #[error("node {0:?} has no layout object")]
    NoLayoutObject(NodeId),
    /// The insertion would produce an invalid tree.
    #[error("cannot insert {child:?} into {parent:?}")]
    HierarchyRequest {
        /// The would-be parent.
        parent: NodeId,
        /// The node being inserted.
        child: NodeId,
    },
    /// A text offset is past the end of the text or not on a character
    /// boundary.
    #[error("offset {offset} is out of bounds for text node {node:?}")]
    IndexSize {
        /// The text node.
        node: NodeId,
        /// The offending offset.
        offset: usize,
    },
    /// The element already hosts a shadow root.
    #[error("{0:?} already hosts a shadow root")]
    ShadowRootExists(NodeId),
    /// The preferences could not be parsed.
    #[error(transparent)]
    InvalidPreferences(#[from] serde_json::Error),
}
