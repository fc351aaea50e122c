/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The layout objects the style pass keeps in sync, and the builder that
//! consumes the reattach bits.
//!
//! Only what the style engine needs is modelled here: which nodes have a
//! box, what kind, with which style, and the size layout last gave it.

use app_units::Au;
use euclid::default::Size2D;
use log::{debug, trace};
use servo_arc::Arc;
use smallvec::SmallVec;

use crate::dom::{Document, NodeData, NodeId};
use crate::element_flags::NodeFlags;
use crate::properties::{ComputedValues, Display};
use crate::pseudo::{FirstLetterFragment, PseudoElement, PseudoKey, marker_text};
use crate::restyle_damage::RestyleDamage;

/// Identifies one layout object. A rebuilt box always gets a new id.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LayoutId(u64);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LayoutObjectKind {
    Block,
    Inline,
    ListItem,
    Flex,
    Grid,
    Text,
    /// The box of a `::before` or `::after`.
    Generated,
    FirstLetter,
    Marker,
}

impl LayoutObjectKind {
    fn for_display(display: Display) -> Self {
        match display {
            Display::Inline => LayoutObjectKind::Inline,
            Display::ListItem => LayoutObjectKind::ListItem,
            Display::Flex => LayoutObjectKind::Flex,
            Display::Grid => LayoutObjectKind::Grid,
            Display::Block | Display::InlineBlock | Display::Contents | Display::None => {
                LayoutObjectKind::Block
            },
        }
    }
}

#[derive(Debug)]
pub struct LayoutObject {
    id: LayoutId,
    kind: LayoutObjectKind,
    style: Arc<ComputedValues>,
    damage: RestyleDamage,
    pub(crate) size: Option<Size2D<Au>>,
    text: Option<String>,
}

impl LayoutObject {
    pub fn id(&self) -> LayoutId {
        self.id
    }

    pub fn kind(&self) -> LayoutObjectKind {
        self.kind
    }

    pub fn style(&self) -> &Arc<ComputedValues> {
        &self.style
    }

    /// Damage accumulated since layout last took it.
    pub fn damage(&self) -> RestyleDamage {
        self.damage
    }

    pub fn take_damage(&mut self) -> RestyleDamage {
        std::mem::take(&mut self.damage)
    }

    /// The size layout gave the box, once it has run.
    pub fn size(&self) -> Option<Size2D<Au>> {
        self.size
    }

    /// The text rendered by text, generated, marker and first-letter boxes.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub(crate) fn set_style(&mut self, style: Arc<ComputedValues>) {
        self.style = style;
    }

    pub(crate) fn add_damage(&mut self, damage: RestyleDamage) {
        self.damage.insert(damage);
    }
}

impl Document {
    /// Rebuild the layout objects of every node marked for reattachment,
    /// along with their whole subtrees.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(servo_profiling = true), level = "trace")
    )]
    pub fn rebuild_layout_tree(&mut self) {
        let document_node = self.root;
        let mut rebuilt = 0;
        let mut stack: Vec<(NodeId, bool)> = self
            .document_element()
            .map(|root| (root, false))
            .into_iter()
            .collect();
        while let Some((id, parent_rebuilt)) = stack.pop() {
            let flags = self.nodes[id.0].flags;
            let rebuild = parent_rebuilt || flags.contains(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE);
            if !rebuild && !flags.contains(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE) {
                continue;
            }
            if rebuild {
                self.build_layout_object(id);
                rebuilt += 1;
            }

            if self.is_display_locked(id) {
                // Leave the inside alone, but remember it is out of date.
                if rebuild {
                    for child in self.layout_children(id) {
                        self.nodes[child.0]
                            .flags
                            .insert(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE);
                    }
                }
                let flags = &mut self.nodes[id.0].flags;
                flags.remove(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE);
                if rebuild || flags.contains(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE) {
                    flags.insert(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE);
                }
                trace!("Layout tree rebuild below {:?} blocked by display lock", id);
                continue;
            }

            self.nodes[id.0].flags.remove(NodeFlags::REATTACH_DIRTY);
            for child in self.layout_children(id).into_iter().rev() {
                stack.push((child, rebuild));
            }
        }
        self.nodes[document_node.0]
            .flags
            .remove(NodeFlags::REATTACH_DIRTY);
        if rebuilt > 0 {
            debug!("Rebuilt {} layout objects", rebuilt);
        }
    }

    /// The nodes whose boxes go inside the box of `id`, in box tree order.
    pub fn layout_children(&self, id: NodeId) -> SmallVec<[NodeId; 8]> {
        let mut children = SmallVec::new();
        let Some(element) = self.element(id) else {
            return children;
        };
        let pseudo = |kind| {
            element
                .rare_data()
                .and_then(|rare_data| rare_data.pseudo_element(&PseudoKey::new(kind)))
        };

        children.extend(pseudo(PseudoElement::Backdrop));
        children.extend(pseudo(PseudoElement::Marker));
        children.extend(pseudo(PseudoElement::Before));
        children.extend(pseudo(PseudoElement::FirstLetter));
        if !element.is_pseudo_element() {
            children.extend(self.flat_tree_children(id));
        }
        children.extend(pseudo(PseudoElement::After));
        if let Some(rare_data) = element.rare_data() {
            children.extend(
                rare_data
                    .pseudo_elements()
                    .filter(|(key, _)| key.kind == PseudoElement::ViewTransitionGroup)
                    .map(|(_, pseudo)| pseudo),
            );
        }
        children
    }

    fn build_layout_object(&mut self, id: NodeId) {
        let built = match self.nodes[id.0].data {
            NodeData::Element(ref element) => element
                .style()
                .filter(|style| style.display.generates_box())
                .and_then(|style| {
                    let (kind, text) = match element.pseudo() {
                        Some(info) => match info.key.kind {
                            PseudoElement::Marker => (
                                LayoutObjectKind::Marker,
                                marker_text(style, self.list_item_ordinal(info.owner)),
                            ),
                            // A stale letter gets no box until the next style
                            // pass has looked at the owner again.
                            PseudoElement::FirstLetter => (
                                LayoutObjectKind::FirstLetter,
                                Some(self.live_first_letter_fragment(id)?.letter.clone()),
                            ),
                            PseudoElement::Before | PseudoElement::After => (
                                LayoutObjectKind::Generated,
                                style.generated_text().map(str::to_owned),
                            ),
                            _ => (LayoutObjectKind::for_display(style.display), None),
                        },
                        None => (LayoutObjectKind::for_display(style.display), None),
                    };
                    Some((kind, style.clone(), text))
                }),
            NodeData::Text(ref text) => self
                .flat_tree_parent(id)
                .and_then(|parent| self.style(parent))
                .map(|style| {
                    let rendered = self
                        .first_letter_fragment_of_text(id)
                        .and_then(|fragment| text.text().get(fragment.end..))
                        .unwrap_or(text.text());
                    (
                        LayoutObjectKind::Text,
                        style.clone(),
                        Some(rendered.to_owned()),
                    )
                }),
            _ => None,
        };

        let layout = built.map(|(kind, style, text)| LayoutObject {
            id: self.next_layout_id(),
            kind,
            style,
            damage: RestyleDamage::reconstruct(),
            size: None,
            text,
        });
        trace!(
            "Built layout object {:?} for {:?}",
            layout.as_ref().map(|layout| (layout.id, layout.kind)),
            id
        );
        self.nodes[id.0].layout = layout;

        // `::first-letter` needs the owner's box to exist before it can be
        // created; get the next style pass to look at it.
        if self.may_gain_first_letter(id) {
            self.nodes[id.0]
                .flags
                .insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
            self.mark_ancestors_for_style_recalc(id);
        }
    }

    fn may_gain_first_letter(&self, id: NodeId) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        if element.is_pseudo_element() || self.nodes[id.0].layout.is_none() {
            return false;
        }
        let has_rules = element.style().is_some_and(|style| {
            style.has_pseudo_rules(PseudoElement::FirstLetter) &&
                style.display.is_block_container()
        });
        has_rules &&
            self.pseudo_element(id, &PseudoKey::new(PseudoElement::FirstLetter))
                .is_none() &&
            self.find_first_letter_text(id).is_some()
    }

    /// The fragment of the `::first-letter` node `pseudo`, as long as it still
    /// matches the text it was cut from.
    fn live_first_letter_fragment(&self, pseudo: NodeId) -> Option<&FirstLetterFragment> {
        let fragment = self.rare_data(pseudo)?.first_letter_fragment()?;
        let text = self.get(fragment.text)?.as_text()?;
        fragment.applies_to(text.text()).then_some(fragment)
    }

    /// The `::first-letter` fragment cut out of the text node `id`, if any.
    fn first_letter_fragment_of_text(&self, id: NodeId) -> Option<&FirstLetterFragment> {
        let key = PseudoKey::new(PseudoElement::FirstLetter);
        let mut current = self.flat_tree_parent(id);
        while let Some(ancestor) = current {
            let fragment = self
                .pseudo_element(ancestor, &key)
                .and_then(|pseudo| self.live_first_letter_fragment(pseudo));
            if fragment.is_some_and(|fragment| fragment.text == id) {
                return fragment;
            }
            current = self.flat_tree_parent(ancestor);
        }
        None
    }

    /// The 1-based position of the list item `id` among its siblings.
    fn list_item_ordinal(&self, id: NodeId) -> usize {
        let Some(parent) = self.flat_tree_parent(id) else {
            return 1;
        };
        if self.element(id).is_some_and(|element| element.is_pseudo_element()) {
            return 1;
        }
        let preceding = self
            .flat_tree_children(parent)
            .into_iter()
            .take_while(|&sibling| sibling != id)
            .filter(|&sibling| {
                self.style(sibling)
                    .is_some_and(|style| style.display.is_list_item())
            })
            .count();
        preceding + 1
    }

    pub(crate) fn next_layout_id(&mut self) -> LayoutId {
        self.next_layout_id += 1;
        LayoutId(self.next_layout_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{PropertyDeclaration, Rgba};
    use crate::stylist::{Selector, StyleRule, Stylist};

    fn document() -> (Document, NodeId, NodeId) {
        let mut document = Document::new();
        let html = document.create_element("html");
        let body = document.create_element("body");
        document.append_child(document.document_node(), html).unwrap();
        document.append_child(html, body).unwrap();
        (document, html, body)
    }

    #[test]
    fn boxes_follow_display() {
        let (mut document, html, body) = document();
        let li = document.create_element("li");
        let span = document.create_element("span");
        let script = document.create_element("script");
        for element in [li, span, script] {
            document.append_child(body, element).unwrap();
        }
        document.update_lifecycle(&Stylist::new());

        let kind = |id| document.layout_object(id).map(LayoutObject::kind);
        assert_eq!(kind(html), Some(LayoutObjectKind::Block));
        assert_eq!(kind(li), Some(LayoutObjectKind::ListItem));
        assert_eq!(kind(span), Some(LayoutObjectKind::Inline));
        assert_eq!(kind(script), None);
        assert_eq!(
            document.layout_object(li).unwrap().damage(),
            RestyleDamage::reconstruct()
        );
    }

    #[test]
    fn rebuilt_boxes_get_new_ids() {
        let (mut document, _, body) = document();
        let div = document.create_element("div");
        let text = document.create_text("abc");
        document.append_child(body, div).unwrap();
        document.append_child(div, text).unwrap();
        document.update_lifecycle(&Stylist::new());

        let div_id = document.layout_object(div).unwrap().id();
        let text_id = document.layout_object(text).unwrap().id();
        document.set_text(text, "abcd").unwrap();
        assert!(document.needs_layout_tree_rebuild());
        assert!(!document.needs_style_recalc());
        document.rebuild_layout_tree();

        assert_eq!(document.layout_object(div).unwrap().id(), div_id);
        let layout = document.layout_object(text).unwrap();
        assert_ne!(layout.id(), text_id);
        assert_eq!(layout.text(), Some("abcd"));
        assert!(!document.needs_layout_tree_rebuild());
    }

    #[test]
    fn edited_text_ignores_a_stale_first_letter() {
        let (mut document, _, body) = document();
        let p = document.create_element("p");
        let text = document.create_text("Hello");
        document.append_child(body, p).unwrap();
        document.append_child(p, text).unwrap();
        let stylist = Stylist::with_rules([StyleRule::new(
            Selector::tag("p").with_pseudo(PseudoElement::FirstLetter),
            vec![PropertyDeclaration::Color(Rgba::new(0, 128, 0, 255))],
        )]);
        document.update_lifecycle(&stylist);
        let first_letter = document
            .pseudo_element(p, &PseudoKey::new(PseudoElement::FirstLetter))
            .unwrap();
        assert_eq!(document.layout_object(text).unwrap().text(), Some("ello"));

        // Byte 1 is inside the new first character.
        document.set_text(text, "\u{e9}llo").unwrap();
        document.rebuild_layout_tree();
        assert_eq!(
            document.layout_object(text).unwrap().text(),
            Some("\u{e9}llo")
        );
        assert!(document.layout_object(first_letter).is_none());

        document.update_lifecycle(&stylist);
        assert_eq!(
            document.layout_object(first_letter).unwrap().text(),
            Some("\u{e9}")
        );
        assert_eq!(document.layout_object(text).unwrap().text(), Some("llo"));
    }

    #[test]
    fn taking_damage_clears_it() {
        let (mut document, _, body) = document();
        document.update_lifecycle(&Stylist::new());
        let layout = document.nodes[body.0].layout.as_mut().unwrap();
        assert!(!layout.take_damage().is_empty());
        assert!(layout.damage().is_empty());
    }
}
