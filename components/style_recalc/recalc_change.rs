/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The value passed down the tree describing how far a restyle has to reach.

use bitflags::bitflags;

use crate::element_flags::NodeFlags;
use crate::properties::ComputedValues;

/// How strongly a change must be re-applied below the element that produced
/// it. Variants are ordered from weakest to strongest.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Propagate {
    /// Children keep their styles.
    #[default]
    No,
    /// Only the pseudo-elements of the element need to be revisited.
    UpdatePseudoElements,
    /// Children re-inherit the independently inherited properties.
    IndependentInherit,
    /// Every child is restyled; grandchildren follow their own diffs.
    RecalcChildren,
    /// Everything below is restyled, ignoring dirty bits.
    RecalcDescendants,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct RecalcFlags: u8 {
        /// Every layout object below must be rebuilt.
        const REATTACH = 1 << 0;
        /// Elements whose style depends on the nearest container must be
        /// restyled.
        const RECALC_CONTAINER_QUERY_DEPENDENT = 1 << 1;
        /// The element this change is handed to was already styled; only its
        /// descendants are being resumed.
        const SUPPRESS_RECALC = 1 << 2;
    }
}

/// A propagation level plus modifiers. Immutable: every combinator returns a
/// new value.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct StyleRecalcChange {
    propagate: Propagate,
    flags: RecalcFlags,
}

impl StyleRecalcChange {
    pub const fn new(propagate: Propagate) -> Self {
        StyleRecalcChange {
            propagate,
            flags: RecalcFlags::empty(),
        }
    }

    /// The strongest change there is. Used whenever the engine cannot tell
    /// what to do.
    pub const fn recalc_descendants() -> Self {
        StyleRecalcChange::new(Propagate::RecalcDescendants)
    }

    #[inline]
    pub fn propagate(&self) -> Propagate {
        self.propagate
    }

    #[inline]
    pub fn flags(&self) -> RecalcFlags {
        self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.propagate == Propagate::No && self.flags.is_empty()
    }

    /// The stronger of both changes, with the union of their flags.
    pub fn combine(self, other: StyleRecalcChange) -> Self {
        StyleRecalcChange {
            propagate: self.propagate.max(other.propagate),
            flags: self.flags | other.flags,
        }
    }

    pub fn ensure_at_least(self, propagate: Propagate) -> Self {
        StyleRecalcChange {
            propagate: self.propagate.max(propagate),
            flags: self.flags,
        }
    }

    /// The part of this change that reaches the children of the element it
    /// was handed to. Only a descendant-wide recalc survives a level; the
    /// element's own diff adds anything else.
    pub fn for_children(self) -> Self {
        let propagate = match self.propagate {
            Propagate::RecalcDescendants => Propagate::RecalcDescendants,
            _ => Propagate::No,
        };
        StyleRecalcChange {
            propagate,
            flags: self.flags - RecalcFlags::SUPPRESS_RECALC,
        }
    }

    /// The change used to restyle a pseudo-element from its owner's child
    /// change. An owner asking for its pseudo-elements to be updated means
    /// their own styles are stale.
    pub fn for_pseudo_element(self) -> Self {
        let propagate = match self.propagate {
            Propagate::UpdatePseudoElements => Propagate::RecalcChildren,
            other => other,
        };
        StyleRecalcChange {
            propagate,
            flags: self.flags,
        }
    }

    pub fn force_reattach_layout_tree(self) -> Self {
        StyleRecalcChange {
            propagate: self.propagate,
            flags: self.flags | RecalcFlags::REATTACH,
        }
    }

    pub fn force_recalc_container_dependents(self) -> Self {
        StyleRecalcChange {
            propagate: self.propagate,
            flags: self.flags | RecalcFlags::RECALC_CONTAINER_QUERY_DEPENDENT,
        }
    }

    pub fn suppress_recalc(self) -> Self {
        StyleRecalcChange {
            propagate: self.propagate,
            flags: self.flags | RecalcFlags::SUPPRESS_RECALC,
        }
    }

    /// The change for the children of an element whose own recalc this
    /// change suppressed.
    pub fn unsuppressed(self) -> Self {
        StyleRecalcChange {
            propagate: self.propagate,
            flags: self.flags - RecalcFlags::SUPPRESS_RECALC,
        }
    }

    #[inline]
    pub fn is_suppressed(&self) -> bool {
        self.flags.contains(RecalcFlags::SUPPRESS_RECALC)
    }

    #[inline]
    pub fn reattach_layout_tree(&self) -> bool {
        self.flags.contains(RecalcFlags::REATTACH)
    }

    #[inline]
    pub fn recalc_descendants(&self) -> bool {
        self.propagate == Propagate::RecalcDescendants
    }

    #[inline]
    pub fn recalc_container_query_dependent(&self) -> bool {
        self.flags
            .contains(RecalcFlags::RECALC_CONTAINER_QUERY_DEPENDENT)
    }

    /// Whether a node with the given dirty bits and current style has to go
    /// through own-style recalculation.
    pub fn should_recalc_style_for(&self, flags: NodeFlags, style: Option<&ComputedValues>) -> bool {
        if self.is_suppressed() {
            return false;
        }
        if flags.needs_style_recalc() || self.propagate >= Propagate::IndependentInherit {
            return true;
        }
        // Without a style we cannot know whether the element would match a
        // container condition now.
        self.recalc_container_query_dependent() &&
            style.is_none_or(|style| style.depends_on_container_queries())
    }

    /// Whether an existing or potential pseudo-element with the given dirty
    /// bits must be revisited.
    pub fn should_update_pseudo_element(&self, flags: NodeFlags) -> bool {
        self.propagate >= Propagate::UpdatePseudoElements ||
            self.flags
                .intersects(RecalcFlags::REATTACH | RecalcFlags::RECALC_CONTAINER_QUERY_DEPENDENT) ||
            flags.intersects(NodeFlags::STYLE_DIRTY)
    }

    /// Whether the children of an element with the given dirty bits must be
    /// visited when handed this change.
    pub fn traverse_children(&self, flags: NodeFlags) -> bool {
        self.propagate >= Propagate::IndependentInherit ||
            self.flags
                .intersects(RecalcFlags::REATTACH | RecalcFlags::RECALC_CONTAINER_QUERY_DEPENDENT) ||
            flags.contains(NodeFlags::CHILD_NEEDS_STYLE_RECALC)
    }
}
