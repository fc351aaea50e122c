/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Highlight pseudo-elements (`::selection`, `::target-text`,
//! `::spelling-error`, `::grammar-error` and `::highlight(name)`).
//!
//! These never get nodes of their own. Their styles hang off the computed
//! values of the originating element and inherit from the parent element's
//! highlight styles, not from the originating element.

use servo_arc::Arc;
use smallvec::SmallVec;
use string_cache::DefaultAtom as Atom;

use crate::dom::{Document, NodeId};
use crate::properties::ComputedValues;
use crate::pseudo::{PseudoElement, PseudoKey};
use crate::resolver::{StyleRequest, StyleResolver};

const BUILTIN_HIGHLIGHTS: [PseudoElement; 4] = [
    PseudoElement::Selection,
    PseudoElement::TargetText,
    PseudoElement::SpellingError,
    PseudoElement::GrammarError,
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighlightStyles {
    pub selection: Option<Arc<ComputedValues>>,
    pub target_text: Option<Arc<ComputedValues>>,
    pub spelling_error: Option<Arc<ComputedValues>>,
    pub grammar_error: Option<Arc<ComputedValues>>,
    pub custom: SmallVec<[(Atom, Arc<ComputedValues>); 1]>,
}

impl HighlightStyles {
    pub fn get(&self, pseudo: PseudoElement, name: Option<&Atom>) -> Option<&Arc<ComputedValues>> {
        match pseudo {
            PseudoElement::Selection => self.selection.as_ref(),
            PseudoElement::TargetText => self.target_text.as_ref(),
            PseudoElement::SpellingError => self.spelling_error.as_ref(),
            PseudoElement::GrammarError => self.grammar_error.as_ref(),
            PseudoElement::Highlight => {
                let name = name?;
                self.custom
                    .iter()
                    .find(|(custom, _)| custom == name)
                    .map(|(_, style)| style)
            },
            _ => None,
        }
    }

    fn set(&mut self, pseudo: PseudoElement, style: Arc<ComputedValues>) {
        match pseudo {
            PseudoElement::Selection => self.selection = Some(style),
            PseudoElement::TargetText => self.target_text = Some(style),
            PseudoElement::SpellingError => self.spelling_error = Some(style),
            PseudoElement::GrammarError => self.grammar_error = Some(style),
            _ => debug_assert!(false, "{:?} is not a built-in highlight", pseudo),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_none() &&
            self.target_text.is_none() &&
            self.spelling_error.is_none() &&
            self.grammar_error.is_none() &&
            self.custom.is_empty()
    }
}

/// Resolve the highlight styles of `element` whose own values are `style`.
///
/// A highlight with no rules of its own reuses the parent's highlight style
/// as is. One with rules inherits from the parent's highlight style, or
/// from the originating element when no ancestor has one.
pub(crate) fn resolve_highlight_styles(
    resolver: &dyn StyleResolver,
    document: &Document,
    element: NodeId,
    style: &ComputedValues,
    request: &StyleRequest,
    custom_highlights_enabled: bool,
) -> Option<Arc<HighlightStyles>> {
    let parent_highlights = request
        .parent_style
        .as_ref()
        .and_then(|parent| parent.highlights.as_deref());

    let needs_highlights = parent_highlights.is_some() ||
        BUILTIN_HIGHLIGHTS
            .iter()
            .any(|pseudo| style.has_pseudo_rules(*pseudo)) ||
        (custom_highlights_enabled && !style.custom_highlight_names.is_empty());
    if !needs_highlights {
        return None;
    }

    let mut originating: Option<Arc<ComputedValues>> = None;
    let mut resolve = |key: PseudoKey, inherited: Option<&Arc<ComputedValues>>| {
        let parent_style = match inherited {
            Some(inherited) => inherited.clone(),
            None => originating
                .get_or_insert_with(|| Arc::new(style.clone()))
                .clone(),
        };
        let highlight_request = StyleRequest {
            pseudo: Some(key),
            parent_style: Some(parent_style.clone()),
            layout_parent_style: Some(parent_style),
            ..request.clone()
        };
        resolver
            .resolve_style(document, element, &highlight_request)
            .map(Arc::new)
    };

    let mut highlights = HighlightStyles::default();
    for pseudo in BUILTIN_HIGHLIGHTS {
        let inherited = parent_highlights.and_then(|parent| parent.get(pseudo, None));
        let resolved = if style.has_pseudo_rules(pseudo) {
            resolve(PseudoKey::new(pseudo), inherited)
        } else {
            None
        };
        if let Some(resolved) = resolved.or_else(|| inherited.cloned()) {
            highlights.set(pseudo, resolved);
        }
    }

    if custom_highlights_enabled {
        let mut names: SmallVec<[Atom; 2]> =
            style.custom_highlight_names.iter().cloned().collect();
        if let Some(parent) = parent_highlights {
            for (name, _) in &parent.custom {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        for name in names {
            let inherited = parent_highlights
                .and_then(|parent| parent.get(PseudoElement::Highlight, Some(&name)));
            let resolved = if style.custom_highlight_names.contains(&name) {
                resolve(
                    PseudoKey::with_tag(PseudoElement::Highlight, name.clone()),
                    inherited,
                )
            } else {
                None
            };
            if let Some(resolved) = resolved.or_else(|| inherited.cloned()) {
                highlights.custom.push((name, resolved));
            }
        }
    }

    if highlights.is_empty() {
        return None;
    }
    Some(Arc::new(highlights))
}
