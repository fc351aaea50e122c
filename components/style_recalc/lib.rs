/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! Incremental style recalculation.
//!
//! A [`Document`] records which nodes have stale styles with dirty bits.
//! [`Document::update_style`] walks the dirty parts of the flat tree,
//! recomputes styles through a [`StyleResolver`], diffs them against the old
//! ones and decides how far each change has to go. Along the way it keeps
//! pseudo-element nodes, size container state, display locks and highlight
//! styles in sync, and marks the layout objects that
//! [`Document::rebuild_layout_tree`] has to rebuild.

pub mod container_query;
pub mod context;
pub mod display_lock;
pub mod dom;
pub mod element_flags;
pub mod error;
pub mod highlight;
pub mod layout_tree;
pub mod prefs;
pub mod properties;
pub mod pseudo;
pub mod rare_data;
pub mod recalc_change;
pub mod resolver;
pub mod restyle_damage;
pub mod style_adjuster;
pub mod stylist;
pub mod traversal;

pub use crate::context::RecalcStatistics;
pub use crate::display_lock::ActivationReasons;
pub use crate::dom::{Document, NodeId, StyleNotification};
pub use crate::element_flags::{NodeFlags, StyleChangeType};
pub use crate::error::{Error, Result};
pub use crate::prefs::Preferences;
pub use crate::properties::ComputedValues;
pub use crate::pseudo::{PseudoElement, PseudoKey};
pub use crate::recalc_change::{Propagate, StyleRecalcChange};
pub use crate::resolver::{StyleRequest, StyleResolver};
pub use crate::stylist::{Selector, StyleRule, Stylist};
