/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use bitflags::bitflags;

bitflags! {
    /// Dirty bits stored on every node.
    ///
    /// The style bits are consumed by the recalculation pass, the reattach
    /// bits by the layout tree builder.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct NodeFlags: u8 {
        /// The node's own computed style is stale.
        const NEEDS_STYLE_RECALC = 1 << 0;
        /// Some descendant (in the flat tree, pseudo-elements included) has
        /// stale style.
        const CHILD_NEEDS_STYLE_RECALC = 1 << 1;
        /// The node and every descendant must be recomputed regardless of
        /// their own bits.
        const NEEDS_SUBTREE_STYLE_RECALC = 1 << 2;
        /// The node's layout object must be discarded and rebuilt.
        const NEEDS_REATTACH_LAYOUT_TREE = 1 << 3;
        /// Some descendant needs its layout object rebuilt.
        const CHILD_NEEDS_REATTACH_LAYOUT_TREE = 1 << 4;
    }
}

impl NodeFlags {
    /// All the bits that make a node interesting to the style pass.
    pub const STYLE_DIRTY: NodeFlags = NodeFlags::NEEDS_STYLE_RECALC
        .union(NodeFlags::CHILD_NEEDS_STYLE_RECALC)
        .union(NodeFlags::NEEDS_SUBTREE_STYLE_RECALC);

    /// All the bits that make a node interesting to the layout tree builder.
    pub const REATTACH_DIRTY: NodeFlags = NodeFlags::NEEDS_REATTACH_LAYOUT_TREE
        .union(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE);

    /// Whether the node itself must be restyled.
    pub fn needs_style_recalc(self) -> bool {
        self.intersects(NodeFlags::NEEDS_STYLE_RECALC | NodeFlags::NEEDS_SUBTREE_STYLE_RECALC)
    }
}

/// How much of the tree a mutation invalidates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StyleChangeType {
    /// Only the element itself must be restyled; descendants follow the
    /// propagation computed from its diff.
    Local,
    /// The element and all of its descendants must be restyled.
    Subtree,
}

impl StyleChangeType {
    pub(crate) fn flags(self) -> NodeFlags {
        match self {
            StyleChangeType::Local => NodeFlags::NEEDS_STYLE_RECALC,
            StyleChangeType::Subtree => {
                NodeFlags::NEEDS_STYLE_RECALC | NodeFlags::NEEDS_SUBTREE_STYLE_RECALC
            },
        }
    }
}
