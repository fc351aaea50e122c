/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pseudo-elements, and the synthesis of the nodes backing the ones that
//! generate boxes.
//!
//! Tree-abiding pseudo-elements (`::before`, `::after`, `::marker`), along
//! with `::backdrop`, `::first-letter` and `::view-transition-group()`, are
//! backed by element nodes owned by their originating element. They are
//! created the first time the owner's style says they should exist and
//! destroyed as soon as it says they should not.
//!
//! Highlight pseudo-elements never get nodes, see the `highlight` module.

use std::fmt;

use bitflags::bitflags;
use log::debug;
use servo_arc::Arc;
use smallvec::SmallVec;
use string_cache::DefaultAtom as Atom;
use unicode_segmentation::UnicodeSegmentation;

use crate::context::RecalcContext;
use crate::dom::{Document, NodeData, NodeId, StyleNotification};
use crate::element_flags::NodeFlags;
use crate::properties::{ComputedValues, Content, Display, ListStyleType};
use crate::recalc_change::{Propagate, StyleRecalcChange};
use crate::resolver::StyleRequest;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PseudoElement {
    Backdrop,
    Marker,
    Before,
    After,
    FirstLetter,
    ViewTransitionGroup,
    Selection,
    TargetText,
    SpellingError,
    GrammarError,
    Highlight,
}

bitflags! {
    /// A set of pseudo-elements, one bit per [`PseudoElement`].
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct PseudoElementBits: u16 {
        const BACKDROP = 1 << 0;
        const MARKER = 1 << 1;
        const BEFORE = 1 << 2;
        const AFTER = 1 << 3;
        const FIRST_LETTER = 1 << 4;
        const VIEW_TRANSITION_GROUP = 1 << 5;
        const SELECTION = 1 << 6;
        const TARGET_TEXT = 1 << 7;
        const SPELLING_ERROR = 1 << 8;
        const GRAMMAR_ERROR = 1 << 9;
        const HIGHLIGHT = 1 << 10;
    }
}

impl PseudoElement {
    pub fn bit(self) -> PseudoElementBits {
        match self {
            PseudoElement::Backdrop => PseudoElementBits::BACKDROP,
            PseudoElement::Marker => PseudoElementBits::MARKER,
            PseudoElement::Before => PseudoElementBits::BEFORE,
            PseudoElement::After => PseudoElementBits::AFTER,
            PseudoElement::FirstLetter => PseudoElementBits::FIRST_LETTER,
            PseudoElement::ViewTransitionGroup => PseudoElementBits::VIEW_TRANSITION_GROUP,
            PseudoElement::Selection => PseudoElementBits::SELECTION,
            PseudoElement::TargetText => PseudoElementBits::TARGET_TEXT,
            PseudoElement::SpellingError => PseudoElementBits::SPELLING_ERROR,
            PseudoElement::GrammarError => PseudoElementBits::GRAMMAR_ERROR,
            PseudoElement::Highlight => PseudoElementBits::HIGHLIGHT,
        }
    }

    /// Whether this is a highlight pseudo-element, styled as an attachment
    /// of the originating element's style rather than as a node.
    pub fn is_highlight(self) -> bool {
        matches!(
            self,
            PseudoElement::Selection |
                PseudoElement::TargetText |
                PseudoElement::SpellingError |
                PseudoElement::GrammarError |
                PseudoElement::Highlight
        )
    }

    /// <https://drafts.csswg.org/css-pseudo-4/#treelike>
    pub fn is_tree_abiding(self) -> bool {
        matches!(
            self,
            PseudoElement::Marker | PseudoElement::Before | PseudoElement::After
        )
    }

    /// Whether the pseudo-element generates a box even when no rule targets
    /// it.
    pub fn has_default_style(self) -> bool {
        matches!(
            self,
            PseudoElement::Backdrop | PseudoElement::Marker | PseudoElement::ViewTransitionGroup
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PseudoElement::Backdrop => "::backdrop",
            PseudoElement::Marker => "::marker",
            PseudoElement::Before => "::before",
            PseudoElement::After => "::after",
            PseudoElement::FirstLetter => "::first-letter",
            PseudoElement::ViewTransitionGroup => "::view-transition-group",
            PseudoElement::Selection => "::selection",
            PseudoElement::TargetText => "::target-text",
            PseudoElement::SpellingError => "::spelling-error",
            PseudoElement::GrammarError => "::grammar-error",
            PseudoElement::Highlight => "::highlight",
        }
    }
}

/// Identifies a pseudo-element slot of an element. The tag tells apart
/// same-kind pseudo-elements, like one `::view-transition-group()` per
/// transition name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PseudoKey {
    pub kind: PseudoElement,
    pub tag: Option<Atom>,
}

impl PseudoKey {
    pub fn new(kind: PseudoElement) -> Self {
        PseudoKey { kind, tag: None }
    }

    pub fn with_tag(kind: PseudoElement, tag: Atom) -> Self {
        PseudoKey {
            kind,
            tag: Some(tag),
        }
    }
}

impl fmt::Display for PseudoKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if let Some(ref tag) = self.tag {
            write!(f, "({})", tag)?;
        }
        Ok(())
    }
}

/// The part of a text node a `::first-letter` pseudo-element renders. The
/// text node itself renders from `end` on.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FirstLetterFragment {
    pub text: NodeId,
    pub start: usize,
    pub end: usize,
    pub letter: String,
}

impl FirstLetterFragment {
    /// Whether the fragment still describes `text`. Text edits leave the
    /// fragment stale until the next style pass looks at the owner.
    pub fn applies_to(&self, text: &str) -> bool {
        text.get(self.start..self.end) == Some(self.letter.as_str())
    }
}

fn is_first_letter_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() ||
        matches!(
            c,
            '«' | '»' | '‹' | '›' | '“' | '”' | '„' | '‘' | '’' | '¡' | '¿'
        )
}

/// The byte range of the first letter of `text`: leading white space is
/// skipped, then any punctuation is taken together with the grapheme that
/// follows it.
///
/// <https://drafts.csswg.org/css-pseudo-4/#first-letter-pattern>
pub fn first_letter_range(text: &str) -> Option<(usize, usize)> {
    let start = text.len() - text.trim_start().len();
    let mut end = start;
    for grapheme in text[start..].graphemes(true) {
        if grapheme.chars().all(char::is_whitespace) {
            return None;
        }
        end += grapheme.len();
        if !grapheme.chars().all(is_first_letter_punctuation) {
            return Some((start, end));
        }
    }
    None
}

/// Whether a pseudo-element with this style renders anything.
pub fn pseudo_style_is_rendered(pseudo: PseudoElement, style: &ComputedValues) -> bool {
    if style.is_display_none() {
        return false;
    }
    match pseudo {
        PseudoElement::Before | PseudoElement::After => style.generated_text().is_some(),
        PseudoElement::Marker => match style.content {
            Content::None => false,
            Content::String(..) => true,
            Content::Normal => style.list_style_type != ListStyleType::None,
        },
        _ => true,
    }
}

/// The text of a `::marker` box for the list item at `ordinal`.
pub fn marker_text(style: &ComputedValues, ordinal: usize) -> Option<String> {
    match style.content {
        Content::String(ref text) => Some(text.clone()),
        Content::None => None,
        Content::Normal => match style.list_style_type {
            ListStyleType::None => None,
            ListStyleType::Disc => Some("• ".to_owned()),
            ListStyleType::Decimal => Some(format!("{}. ", ordinal)),
        },
    }
}

impl Document {
    /// Whether `owner` should have the pseudo-element `key` given its
    /// current style.
    pub(crate) fn can_generate_pseudo_element(
        &self,
        context: &RecalcContext,
        owner: NodeId,
        key: &PseudoKey,
    ) -> bool {
        let Some(element) = self.element(owner) else {
            return false;
        };
        let Some(style) = element.style() else {
            return false;
        };
        let owner_pseudo = element.pseudo().map(|info| info.key.kind);
        match key.kind {
            PseudoElement::Before | PseudoElement::After => {
                owner_pseudo.is_none() && style.has_pseudo_rules(key.kind)
            },
            PseudoElement::Marker => {
                style.display.is_list_item() &&
                    matches!(
                        owner_pseudo,
                        None | Some(PseudoElement::Before) | Some(PseudoElement::After)
                    )
            },
            PseudoElement::Backdrop => owner_pseudo.is_none() && style.in_top_layer(),
            PseudoElement::FirstLetter => {
                owner_pseudo.is_none() &&
                    style.has_pseudo_rules(PseudoElement::FirstLetter) &&
                    style.display.is_block_container()
            },
            PseudoElement::ViewTransitionGroup => {
                owner_pseudo.is_none() &&
                    context.prefs.view_transitions_enabled &&
                    self.document_element() == Some(owner) &&
                    key.tag
                        .as_ref()
                        .is_some_and(|name| self.view_transition_names.contains(name))
            },
            _ => false,
        }
    }

    /// Build the request for the pseudo-element `key` of `owner`.
    ///
    /// The pseudo-element inherits from its owner, or from `inherit_from`
    /// when given (`::first-letter` inherits from the element containing the
    /// text). It is laid out in the owner's box, or in the box of the
    /// nearest ancestor generating one when the owner is `display: contents`.
    pub(crate) fn pseudo_style_request(
        &self,
        context: &RecalcContext,
        owner: NodeId,
        key: &PseudoKey,
        inherit_from: Option<NodeId>,
    ) -> Option<StyleRequest> {
        let owner_style = self.style(owner)?.clone();
        let parent_style = inherit_from
            .and_then(|parent| self.style(parent).cloned())
            .unwrap_or_else(|| owner_style.clone());
        Some(StyleRequest {
            pseudo: Some(key.clone()),
            parent_style: Some(parent_style),
            layout_parent_style: self.layout_parent_style(Some(owner)),
            root_font_size: context.root_font_size,
            container: context.query_container(),
            viewport: context.viewport,
            is_root_element: false,
            in_top_layer: false,
        })
    }

    /// Create, restyle or destroy the pseudo-element `key` of `owner`.
    /// `owner_flags` are the dirty bits the owner had when it was visited.
    pub(crate) fn update_pseudo_element(
        &mut self,
        context: &mut RecalcContext,
        owner: NodeId,
        key: PseudoKey,
        change: StyleRecalcChange,
        owner_flags: NodeFlags,
    ) {
        match self.pseudo_element(owner, &key) {
            Some(pseudo) => {
                let flags = owner_flags | self.nodes[pseudo.0].flags;
                if !change.should_update_pseudo_element(flags) {
                    return;
                }
                if !self.can_generate_pseudo_element(context, owner, &key) {
                    self.destroy_pseudo_element(context, owner, &key);
                    return;
                }
                let child_change = self.recalc_self(context, pseudo, change.for_pseudo_element());
                if self.style(pseudo).is_none() {
                    self.destroy_pseudo_element(context, owner, &key);
                    return;
                }
                if matches!(key.kind, PseudoElement::Before | PseudoElement::After) {
                    self.update_pseudo_element(
                        context,
                        pseudo,
                        PseudoKey::new(PseudoElement::Marker),
                        child_change,
                        flags,
                    );
                }
            },
            None => {
                if !change.should_update_pseudo_element(owner_flags) ||
                    !self.can_generate_pseudo_element(context, owner, &key)
                {
                    return;
                }
                let Some(request) = self.pseudo_style_request(context, owner, &key, None) else {
                    return;
                };
                context.statistics.styles_resolved += 1;
                let Some(style) = context.resolver.resolve_style(self, owner, &request) else {
                    return;
                };
                if !pseudo_style_is_rendered(key.kind, &style) {
                    return;
                }
                let kind = key.kind;
                let pseudo = self.create_pseudo_element(owner, key);
                self.set_style(pseudo, Some(Arc::new(style)));
                self.mark_for_reattach(context, pseudo);
                context.statistics.pseudo_elements_created += 1;
                debug!("Created {} for {:?}", kind.as_str(), owner);

                if matches!(kind, PseudoElement::Before | PseudoElement::After) {
                    self.update_pseudo_element(
                        context,
                        pseudo,
                        PseudoKey::new(PseudoElement::Marker),
                        StyleRecalcChange::new(Propagate::UpdatePseudoElements),
                        NodeFlags::empty(),
                    );
                }
            },
        }
    }

    pub(crate) fn destroy_pseudo_element(
        &mut self,
        context: &mut RecalcContext,
        owner: NodeId,
        key: &PseudoKey,
    ) {
        if self.remove_pseudo_element(owner, key) {
            context.statistics.pseudo_elements_removed += 1;
            debug!("Removed {} of {:?}", key, owner);
        }
    }

    /// Find the text `::first-letter` applies to inside `owner`, walking the
    /// flat tree in order. Out-of-flow and unrendered elements are skipped,
    /// and anything that is not a plain block or inline box ends the search.
    pub(crate) fn find_first_letter_text(&self, owner: NodeId) -> Option<FirstLetterFragment> {
        let mut stack: SmallVec<[NodeId; 16]> =
            self.flat_tree_children(owner).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            match self.nodes[id.0].data {
                NodeData::Text(ref text) => {
                    if let Some((start, end)) = first_letter_range(text.text()) {
                        return Some(FirstLetterFragment {
                            text: id,
                            start,
                            end,
                            letter: text.text()[start..end].to_owned(),
                        });
                    }
                },
                NodeData::Element(ref element) => {
                    let Some(style) = element.style() else {
                        continue;
                    };
                    if style.is_out_of_flow_positioned() {
                        continue;
                    }
                    match style.display {
                        Display::Contents | Display::Inline | Display::Block | Display::ListItem => {
                            stack.extend(self.flat_tree_children(id).into_iter().rev());
                        },
                        _ => return None,
                    }
                },
                _ => {},
            }
        }
        None
    }

    /// Update the `::first-letter` of `owner`.
    ///
    /// Creation waits until the owner has a layout object. When the text the
    /// pseudo-element applies to changed shape, both the pseudo-element and
    /// the text nodes involved are reattached.
    pub(crate) fn update_first_letter_pseudo_element(
        &mut self,
        context: &mut RecalcContext,
        owner: NodeId,
        change: StyleRecalcChange,
        owner_flags: NodeFlags,
    ) {
        let key = PseudoKey::new(PseudoElement::FirstLetter);
        let existing = self.pseudo_element(owner, &key);
        let flags = owner_flags | existing.map_or(NodeFlags::empty(), |id| self.nodes[id.0].flags);
        if !change.should_update_pseudo_element(flags) {
            return;
        }

        let target = if self.layout_object(owner).is_some() &&
            self.can_generate_pseudo_element(context, owner, &key)
        {
            self.find_first_letter_text(owner)
        } else {
            None
        };

        match (existing, target) {
            (None, None) => {},
            (Some(_), None) => self.destroy_pseudo_element(context, owner, &key),
            (None, Some(fragment)) => self.create_first_letter(context, owner, fragment),
            (Some(pseudo), Some(fragment)) => {
                let current = self
                    .rare_data(pseudo)
                    .and_then(|rare_data| rare_data.first_letter_fragment())
                    .cloned();
                if current.as_ref() == Some(&fragment) {
                    self.recalc_self(context, pseudo, change.for_pseudo_element());
                    if self.style(pseudo).is_none() {
                        self.destroy_pseudo_element(context, owner, &key);
                    }
                    return;
                }

                debug!(
                    "First letter of {:?} moved from {:?} to {:?}",
                    owner, current, fragment
                );
                if let Some(current) = current {
                    // The old text node may be gone and its slot reused.
                    let still_text = self
                        .get(current.text)
                        .is_some_and(|node| node.as_text().is_some());
                    if still_text && self.is_connected(current.text) {
                        self.mark_for_reattach(context, current.text);
                    }
                }
                self.mark_for_reattach(context, fragment.text);
                if let Some(element) = self.element_mut(pseudo) {
                    element
                        .ensure_rare_data()
                        .set_first_letter_fragment(fragment);
                }
                self.recalc_self(
                    context,
                    pseudo,
                    StyleRecalcChange::recalc_descendants().force_reattach_layout_tree(),
                );
                if self.style(pseudo).is_none() {
                    self.destroy_pseudo_element(context, owner, &key);
                    return;
                }
                self.mark_for_reattach(context, pseudo);
                self.notify(StyleNotification::FirstLetterReattached { owner });
            },
        }
    }

    fn create_first_letter(
        &mut self,
        context: &mut RecalcContext,
        owner: NodeId,
        fragment: FirstLetterFragment,
    ) {
        let key = PseudoKey::new(PseudoElement::FirstLetter);
        let inherit_from = self.flat_tree_parent(fragment.text);
        let Some(request) = self.pseudo_style_request(context, owner, &key, inherit_from) else {
            return;
        };
        context.statistics.styles_resolved += 1;
        let Some(style) = context.resolver.resolve_style(self, owner, &request) else {
            return;
        };
        if !pseudo_style_is_rendered(key.kind, &style) {
            return;
        }
        let text = fragment.text;
        let pseudo = self.create_pseudo_element(owner, key);
        if let Some(element) = self.element_mut(pseudo) {
            element
                .ensure_rare_data()
                .set_first_letter_fragment(fragment);
        }
        self.set_style(pseudo, Some(Arc::new(style)));
        self.mark_for_reattach(context, pseudo);
        self.mark_for_reattach(context, text);
        context.statistics.pseudo_elements_created += 1;
        debug!("Created ::first-letter for {:?}", owner);
    }

    /// Keep one `::view-transition-group()` per active transition name on
    /// the document element.
    pub(crate) fn update_view_transition_pseudo_elements(
        &mut self,
        context: &mut RecalcContext,
        root: NodeId,
        change: StyleRecalcChange,
        owner_flags: NodeFlags,
    ) {
        let mut change = change;
        if self.view_transition_names_changed {
            self.view_transition_names_changed = false;
            change = change.ensure_at_least(Propagate::UpdatePseudoElements);
        }

        let mut names: SmallVec<[Atom; 4]> = self
            .rare_data(root)
            .into_iter()
            .flat_map(|rare_data| rare_data.pseudo_elements())
            .filter(|(key, _)| key.kind == PseudoElement::ViewTransitionGroup)
            .filter_map(|(key, _)| key.tag.clone())
            .collect();
        for name in &self.view_transition_names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }

        for name in names {
            self.update_pseudo_element(
                context,
                root,
                PseudoKey::with_tag(PseudoElement::ViewTransitionGroup, name),
                change,
                owner_flags,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_letter_skips_white_space() {
        assert_eq!(first_letter_range("Hello World"), Some((0, 1)));
        assert_eq!(first_letter_range("  \tabc"), Some((3, 4)));
        assert_eq!(first_letter_range("   "), None);
        assert_eq!(first_letter_range(""), None);
    }

    #[test]
    fn first_letter_takes_leading_punctuation() {
        let text = "\"Quoted\"";
        assert_eq!(first_letter_range(text), Some((0, 2)));
        assert_eq!(first_letter_range("«¡Hola»"), Some((0, "«¡H".len())));
        assert_eq!(first_letter_range("!!"), None);
        assert_eq!(first_letter_range("( x"), None);
    }

    #[test]
    fn first_letter_keeps_graphemes_whole() {
        let text = "e\u{301}tude";
        assert_eq!(first_letter_range(text), Some((0, "e\u{301}".len())));
    }

    #[test]
    fn generated_content_needs_a_string() {
        let mut style = ComputedValues::initial();
        assert!(!pseudo_style_is_rendered(PseudoElement::Before, &style));
        style.content = Content::String("x".into());
        assert!(pseudo_style_is_rendered(PseudoElement::Before, &style));
        style.display = Display::None;
        assert!(!pseudo_style_is_rendered(PseudoElement::Before, &style));
    }

    #[test]
    fn marker_follows_list_style() {
        let mut style = ComputedValues::initial();
        assert_eq!(marker_text(&style, 1).as_deref(), Some("• "));
        style.list_style_type = ListStyleType::Decimal;
        assert_eq!(marker_text(&style, 3).as_deref(), Some("3. "));
        style.list_style_type = ListStyleType::None;
        assert!(!pseudo_style_is_rendered(PseudoElement::Marker, &style));
        style.content = Content::String("-".into());
        assert!(pseudo_style_is_rendered(PseudoElement::Marker, &style));
    }

    #[test]
    fn keys_display_their_tag() {
        let key = PseudoKey::with_tag(PseudoElement::ViewTransitionGroup, Atom::from("hero"));
        assert_eq!(key.to_string(), "::view-transition-group(hero)");
        assert_eq!(PseudoKey::new(PseudoElement::Before).to_string(), "::before");
    }
}
