/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Diffing of computed values.
//!
//! A restyle produces two answers: how far the change has to propagate to
//! descendants ([`StyleChange`]) and what the layout object of the element
//! has to redo ([`RestyleDamage`]).

use std::fmt;

use bitflags::bitflags;

use crate::properties::ComputedValues;
use crate::recalc_change::Propagate;

bitflags! {
    /// Work the layout object of a restyled element has to redo.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct RestyleDamage: u8 {
        /// Repaint the box.
        const REPAINT = 1 << 0;
        /// Lay the box out again.
        const RELAYOUT = 1 << 1;
        /// Throw the box away and build a new one.
        const RECONSTRUCT = 1 << 2;
    }
}

impl RestyleDamage {
    pub fn reconstruct() -> RestyleDamage {
        RestyleDamage::all()
    }
}

impl fmt::Display for RestyleDamage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first_elem = true;
        let to_iter = [
            (RestyleDamage::REPAINT, "Repaint"),
            (RestyleDamage::RELAYOUT, "Relayout"),
            (RestyleDamage::RECONSTRUCT, "Reconstruct"),
        ];
        for &(damage, damage_str) in &to_iter {
            if self.contains(damage) {
                if !first_elem {
                    write!(f, " | ")?;
                }
                write!(f, "{}", damage_str)?;
                first_elem = false;
            }
        }
        if first_elem {
            write!(f, "NoDamage")?;
        }
        Ok(())
    }
}

/// How much of the difference between two styles is visible to descendants.
/// Ordered from weakest to strongest.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StyleChange {
    /// Nothing descendants or pseudo-elements can observe changed.
    Equal,
    /// Only what decides the element's pseudo-elements changed.
    PseudoElementStyle,
    /// Only independently inherited properties changed.
    IndependentInherited,
    /// Other inherited properties changed.
    Inherited,
    /// Something descendants resolve their own values against changed.
    DescendantAffecting,
}

impl StyleChange {
    /// The minimum propagation the element's children need.
    pub fn propagation(self) -> Propagate {
        match self {
            StyleChange::Equal => Propagate::No,
            StyleChange::PseudoElementStyle => Propagate::UpdatePseudoElements,
            StyleChange::IndependentInherited => Propagate::IndependentInherit,
            StyleChange::Inherited => Propagate::RecalcChildren,
            StyleChange::DescendantAffecting => Propagate::RecalcDescendants,
        }
    }
}

/// The result of diffing an old style against a new one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StyleDifference {
    pub change: StyleChange,
    pub damage: RestyleDamage,
}

impl StyleDifference {
    /// Diff two styles, either of which may be absent.
    pub fn compute(old: Option<&ComputedValues>, new: Option<&ComputedValues>) -> Self {
        let (old, new) = match (old, new) {
            (None, None) => {
                return StyleDifference {
                    change: StyleChange::Equal,
                    damage: RestyleDamage::empty(),
                };
            },
            (Some(old), Some(new)) => (old, new),
            _ => {
                return StyleDifference {
                    change: StyleChange::DescendantAffecting,
                    damage: RestyleDamage::reconstruct(),
                };
            },
        };

        StyleDifference {
            change: compute_style_change(old, new),
            damage: compute_damage(old, new),
        }
    }
}

fn compute_style_change(old: &ComputedValues, new: &ComputedValues) -> StyleChange {
    if old.display != new.display ||
        old.container_type != new.container_type ||
        old.content_visibility != new.content_visibility
    {
        return StyleChange::DescendantAffecting;
    }

    if old.color != new.color ||
        old.font_size != new.font_size ||
        old.list_style_type != new.list_style_type ||
        old.applied_text_decorations != new.applied_text_decorations ||
        old.inside_link != new.inside_link ||
        old.highlights != new.highlights
    {
        return StyleChange::Inherited;
    }

    if old.visibility != new.visibility || old.pointer_events != new.pointer_events {
        return StyleChange::IndependentInherited;
    }

    if old.pseudo_rules != new.pseudo_rules ||
        old.custom_highlight_names != new.custom_highlight_names ||
        old.in_top_layer() != new.in_top_layer()
    {
        return StyleChange::PseudoElementStyle;
    }

    StyleChange::Equal
}

fn compute_damage(old: &ComputedValues, new: &ComputedValues) -> RestyleDamage {
    if needs_reattach(Some(old), Some(new)) {
        return RestyleDamage::reconstruct();
    }

    let mut damage = RestyleDamage::empty();
    if old.width != new.width ||
        old.height != new.height ||
        old.font_size != new.font_size ||
        old.position != new.position ||
        old.container_type != new.container_type ||
        old.content_visibility != new.content_visibility ||
        old.list_style_type != new.list_style_type
    {
        damage.insert(RestyleDamage::RELAYOUT | RestyleDamage::REPAINT);
    }
    if old.color != new.color ||
        old.visibility != new.visibility ||
        old.text_decoration_line != new.text_decoration_line ||
        old.applied_text_decorations != new.applied_text_decorations ||
        old.highlights != new.highlights
    {
        damage.insert(RestyleDamage::REPAINT);
    }
    damage
}

/// Whether the layout object for an element going from `old` to `new` has to
/// be rebuilt rather than updated in place.
pub fn needs_reattach(old: Option<&ComputedValues>, new: Option<&ComputedValues>) -> bool {
    let (old, new) = match (old, new) {
        (None, None) => return false,
        (Some(old), Some(new)) => (old, new),
        _ => return true,
    };
    old.display != new.display ||
        old.is_out_of_flow_positioned() != new.is_out_of_flow_positioned() ||
        old.content != new.content
}
