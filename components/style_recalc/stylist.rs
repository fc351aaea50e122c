/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A small rule-based style resolver: compound selectors, `@container`
//! conditions and a user agent sheet baked into the cascade.

use app_units::Au;
use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use string_cache::DefaultAtom as Atom;

use crate::container_query::ContainerCondition;
use crate::dom::{Document, ElementData, NodeId};
use crate::properties::{
    ComputedValueFlags, ComputedValues, ContentVisibility, Display, INITIAL_FONT_SIZE_PX,
    InsideLink, LengthContext, ListStyleType, PropertyDeclaration, Rgba, TextDecorationLine,
};
use crate::pseudo::PseudoElement;
use crate::resolver::{StyleRequest, StyleResolver};
use crate::style_adjuster::StyleAdjuster;

/// A compound selector, optionally followed by a pseudo-element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    local_name: Option<Atom>,
    id: Option<Atom>,
    classes: SmallVec<[Atom; 2]>,
    attributes: SmallVec<[(Atom, Option<String>); 1]>,
    link: bool,
    pseudo: Option<PseudoElement>,
    /// The argument of `::highlight()` and `::view-transition-group()`.
    pseudo_tag: Option<Atom>,
}

impl Selector {
    /// `*`
    pub fn universal() -> Self {
        Selector::default()
    }

    pub fn tag(local_name: &str) -> Self {
        Selector {
            local_name: Some(Atom::from(local_name)),
            ..Selector::default()
        }
    }

    pub fn class(class: &str) -> Self {
        Selector::universal().with_class(class)
    }

    pub fn id(id: &str) -> Self {
        Selector::universal().with_id(id)
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(Atom::from(class));
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(Atom::from(id));
        self
    }

    /// `[name]`
    pub fn with_attribute(mut self, name: &str) -> Self {
        self.attributes.push((Atom::from(name), None));
        self
    }

    /// `[name="value"]`
    pub fn with_attribute_value(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push((Atom::from(name), Some(value.to_owned())));
        self
    }

    /// `:link`
    pub fn with_link(mut self) -> Self {
        self.link = true;
        self
    }

    pub fn with_pseudo(mut self, pseudo: PseudoElement) -> Self {
        self.pseudo = Some(pseudo);
        self
    }

    /// `::highlight(name)`
    pub fn with_highlight(self, name: &str) -> Self {
        self.with_tagged_pseudo(PseudoElement::Highlight, name)
    }

    /// A pseudo-element with an argument, like
    /// `::view-transition-group(name)`.
    pub fn with_tagged_pseudo(mut self, pseudo: PseudoElement, tag: &str) -> Self {
        self.pseudo = Some(pseudo);
        self.pseudo_tag = Some(Atom::from(tag));
        self
    }

    pub fn pseudo(&self) -> Option<PseudoElement> {
        self.pseudo
    }

    /// <https://drafts.csswg.org/selectors/#specificity-rules>
    pub fn specificity(&self) -> u32 {
        let ids = self.id.is_some() as u32;
        let classes = (self.classes.len() + self.attributes.len() + self.link as usize) as u32;
        let types = self.local_name.is_some() as u32 + self.pseudo.is_some() as u32;
        ids << 20 | classes << 10 | types
    }

    /// Whether the compound part matches `element`. The pseudo-element part
    /// is checked against the request separately.
    pub fn matches(&self, element: &ElementData) -> bool {
        if element.is_pseudo_element() {
            return false;
        }
        if self
            .local_name
            .as_ref()
            .is_some_and(|name| name != element.local_name())
        {
            return false;
        }
        if self.id.is_some() && self.id.as_ref() != element.id() {
            return false;
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        if self.link && !element.is_link() {
            return false;
        }
        self.attributes.iter().all(|(name, value)| {
            match (element.attribute(name), value) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            }
        })
    }
}

/// A style rule, optionally nested in an `@container` rule.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleRule {
    pub selector: Selector,
    pub condition: Option<ContainerCondition>,
    pub declarations: Vec<PropertyDeclaration>,
}

impl StyleRule {
    pub fn new(selector: Selector, declarations: Vec<PropertyDeclaration>) -> Self {
        StyleRule {
            selector,
            condition: None,
            declarations,
        }
    }

    pub fn with_condition(mut self, condition: ContainerCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// The author rules of a document, bucketed by the most specific part of
/// their selector: id, then class, then local name.
#[derive(Debug, Default)]
pub struct Stylist {
    rules: Vec<StyleRule>,
    id_hash: FxHashMap<Atom, SmallVec<[usize; 1]>>,
    class_hash: FxHashMap<Atom, SmallVec<[usize; 1]>>,
    local_name_hash: FxHashMap<Atom, SmallVec<[usize; 1]>>,
    other: Vec<usize>,
}

impl Stylist {
    pub fn new() -> Self {
        Stylist::default()
    }

    pub fn with_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = StyleRule>,
    {
        let mut stylist = Stylist::new();
        for rule in rules {
            stylist.add_rule(rule);
        }
        stylist
    }

    /// Append a rule. Documents styled by this stylist must be invalidated
    /// with `Document::invalidate_for_rule_change`.
    pub fn add_rule(&mut self, rule: StyleRule) {
        let index = self.rules.len();
        let selector = &rule.selector;
        let bucket = if let Some(ref id) = selector.id {
            self.id_hash.entry(id.clone()).or_default()
        } else if let Some(class) = selector.classes.first() {
            self.class_hash.entry(class.clone()).or_default()
        } else if let Some(ref local_name) = selector.local_name {
            self.local_name_hash
                .entry(local_name.clone())
                .or_default()
        } else {
            self.other.push(index);
            self.rules.push(rule);
            return;
        };
        bucket.push(index);
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Stylist::default();
    }

    /// Indices of the rules that may match `element`, in source order.
    fn candidate_rules(&self, element: &ElementData) -> SmallVec<[usize; 16]> {
        let mut candidates = SmallVec::new();
        if let Some(rules) = element.id().and_then(|id| self.id_hash.get(id)) {
            candidates.extend(rules.iter().copied());
        }
        for class in element.classes() {
            if let Some(rules) = self.class_hash.get(class) {
                candidates.extend(rules.iter().copied());
            }
        }
        if let Some(rules) = self.local_name_hash.get(element.local_name()) {
            candidates.extend(rules.iter().copied());
        }
        candidates.extend(self.other.iter().copied());
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }
}

/// Defaults for elements, applied before any author rule.
fn apply_user_agent_style(values: &mut ComputedValues, element: &ElementData) {
    match &**element.local_name() {
        "html" | "body" | "div" | "p" | "section" | "article" | "header" | "footer" | "nav" |
        "main" | "ul" | "ol" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "dialog" => {
            values.display = Display::Block
        },
        "li" => values.display = Display::ListItem,
        "slot" => values.display = Display::Contents,
        "head" | "script" | "style" | "template" | "title" => values.display = Display::None,
        _ => {},
    }
    if &**element.local_name() == "ol" {
        values.list_style_type = ListStyleType::Decimal;
    }

    match element.attribute("hidden") {
        Some("until-found") => values.content_visibility = ContentVisibility::HiddenMatchable,
        Some(_) => values.display = Display::None,
        None => {},
    }

    if element.is_link() {
        values.inside_link = InsideLink::Unvisited;
        values.color = Rgba::LINK_TEXT;
        values.text_decoration_line = TextDecorationLine::UNDERLINE;
    }
}

impl StyleResolver for Stylist {
    fn resolve_style(
        &self,
        document: &Document,
        element_id: NodeId,
        request: &StyleRequest,
    ) -> Option<ComputedValues> {
        let element = document.element(element_id)?;
        let parent_style = request.parent_style.as_deref();
        let pseudo = request.pseudo.as_ref();
        let pseudo_kind = pseudo.map(|key| key.kind);
        let mut values = ComputedValues::inherit_from(parent_style, pseudo_kind);

        let mut matched: SmallVec<[(u32, usize); 16]> = SmallVec::new();
        for index in self.candidate_rules(element) {
            let rule = &self.rules[index];
            if !rule.selector.matches(element) {
                continue;
            }
            if let Some(ref condition) = rule.condition {
                values
                    .flags
                    .insert(ComputedValueFlags::DEPENDS_ON_CONTAINER_QUERIES);
                let matches = request
                    .container
                    .as_ref()
                    .is_some_and(|container| condition.matches(container));
                if !matches {
                    continue;
                }
            }
            match (pseudo, rule.selector.pseudo) {
                (None, None) => {},
                (None, Some(rule_pseudo)) => {
                    values.pseudo_rules.insert(rule_pseudo.bit());
                    if let (PseudoElement::Highlight, Some(name)) =
                        (rule_pseudo, rule.selector.pseudo_tag.as_ref())
                    {
                        if !values.custom_highlight_names.contains(name) {
                            values.custom_highlight_names.push(name.clone());
                        }
                    }
                    continue;
                },
                (Some(key), Some(rule_pseudo)) => {
                    let tag_matches = rule.selector.pseudo_tag.is_none() ||
                        rule.selector.pseudo_tag == key.tag;
                    if rule_pseudo != key.kind || !tag_matches {
                        continue;
                    }
                },
                (Some(_), None) => continue,
            }
            matched.push((rule.selector.specificity(), index));
        }

        if let Some(key) = pseudo {
            if matched.is_empty() && !key.kind.has_default_style() {
                return None;
            }
        } else {
            apply_user_agent_style(&mut values, element);
        }

        matched.sort_unstable();
        trace!(
            "{:?}{} matched {} rules",
            element_id,
            pseudo.map_or(String::new(), |key| key.to_string()),
            matched.len()
        );

        let parent_font_size =
            parent_style.map_or(Au::from_px(INITIAL_FONT_SIZE_PX), |parent| parent.font_size);
        let context = LengthContext {
            root_font_size: request.root_font_size,
            container: request.container.as_ref(),
            viewport: request.viewport,
        };
        let declarations = || {
            matched
                .iter()
                .flat_map(|&(_, index)| self.rules[index].declarations.iter())
        };
        for declaration in declarations().filter(|declaration| declaration.is_early()) {
            declaration.apply(&mut values, parent_font_size, &context);
        }
        for declaration in declarations().filter(|declaration| !declaration.is_early()) {
            declaration.apply(&mut values, parent_font_size, &context);
        }

        values.applied_text_decorations |= values.text_decoration_line;

        StyleAdjuster::new(&mut values, request.is_root_element).adjust(
            request.layout_parent_style.as_deref(),
            request.in_top_layer,
            pseudo_kind,
        );
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use euclid::default::Size2D;

    use super::*;
    use crate::container_query::ContainerFeatures;
    use crate::properties::{ContainerType, Content, Visibility};
    use crate::pseudo::PseudoKey;

    fn request(parent_style: Option<ComputedValues>) -> StyleRequest {
        StyleRequest {
            pseudo: None,
            parent_style: parent_style.map(servo_arc::Arc::new),
            layout_parent_style: None,
            root_font_size: Au::from_px(16),
            container: None,
            viewport: Size2D::new(Au::from_px(800), Au::from_px(600)),
            is_root_element: false,
            in_top_layer: false,
        }
    }

    fn document_with(local_name: &str) -> (Document, NodeId) {
        let mut document = Document::new();
        let html = document.create_element("html");
        let element = document.create_element(local_name);
        document
            .append_child(document.document_node(), html)
            .unwrap();
        document.append_child(html, element).unwrap();
        (document, element)
    }

    #[test]
    fn specificity_orders_the_cascade() {
        let (mut document, span) = document_with("span");
        document.set_attribute(span, "class", "a").unwrap();
        document.set_attribute(span, "id", "x").unwrap();
        let stylist = Stylist::with_rules([
            StyleRule::new(
                Selector::id("x"),
                vec![PropertyDeclaration::Visibility(Visibility::Hidden)],
            ),
            StyleRule::new(
                Selector::class("a"),
                vec![PropertyDeclaration::Visibility(Visibility::Collapse)],
            ),
            StyleRule::new(
                Selector::tag("span"),
                vec![PropertyDeclaration::Display(Display::Block)],
            ),
        ]);
        let style = stylist
            .resolve_style(&document, span, &request(Some(ComputedValues::initial())))
            .unwrap();
        assert_eq!(style.visibility, Visibility::Hidden);
        assert_eq!(style.display, Display::Block);
    }

    #[test]
    fn pseudo_element_rules_are_recorded_on_the_originating_element() {
        let (document, div) = document_with("div");
        let stylist = Stylist::with_rules([
            StyleRule::new(
                Selector::tag("div").with_pseudo(PseudoElement::Before),
                vec![PropertyDeclaration::Content(Content::String("x".into()))],
            ),
            StyleRule::new(Selector::tag("div").with_highlight("hl"), vec![]),
        ]);
        let parent = ComputedValues::initial();
        let style = stylist
            .resolve_style(&document, div, &request(Some(parent.clone())))
            .unwrap();
        assert!(style.has_pseudo_rules(PseudoElement::Before));
        assert_eq!(style.custom_highlight_names.as_slice(), &[Atom::from("hl")]);
        assert_eq!(style.content, Content::Normal);

        let mut before = request(Some(style));
        before.pseudo = Some(PseudoKey::new(PseudoElement::Before));
        let before = stylist.resolve_style(&document, div, &before).unwrap();
        assert_eq!(before.generated_text(), Some("x"));

        let mut after = request(Some(parent));
        after.pseudo = Some(PseudoKey::new(PseudoElement::After));
        assert!(stylist.resolve_style(&document, div, &after).is_none());
    }

    #[test]
    fn container_conditions_mark_dependency() {
        let (document, div) = document_with("div");
        let stylist = Stylist::with_rules([StyleRule::new(
            Selector::tag("div"),
            vec![PropertyDeclaration::Visibility(Visibility::Hidden)],
        )
        .with_condition(ContainerCondition::min_width(500.))]);

        let unsized_style = stylist
            .resolve_style(&document, div, &request(Some(ComputedValues::initial())))
            .unwrap();
        assert!(unsized_style.depends_on_container_queries());
        assert_eq!(unsized_style.visibility, Visibility::Visible);

        let mut sized = request(Some(ComputedValues::initial()));
        sized.container = Some(ContainerFeatures::new(
            ContainerType::InlineSize,
            Some((Au::from_px(600), Au::from_px(10))),
            Au::from_px(16),
            Au::from_px(16),
        ));
        let sized_style = stylist.resolve_style(&document, div, &sized).unwrap();
        assert_eq!(sized_style.visibility, Visibility::Hidden);
    }

    #[test]
    fn user_agent_defaults() {
        let (mut document, a) = document_with("a");
        let stylist = Stylist::new();
        let parent = ComputedValues::initial();
        let plain = stylist
            .resolve_style(&document, a, &request(Some(parent.clone())))
            .unwrap();
        assert_eq!(plain.inside_link, InsideLink::NotInside);

        document.set_attribute(a, "href", "#").unwrap();
        let link = stylist
            .resolve_style(&document, a, &request(Some(parent.clone())))
            .unwrap();
        assert_eq!(link.inside_link, InsideLink::Unvisited);
        assert!(link.applied_text_decorations.contains(TextDecorationLine::UNDERLINE));

        document.set_attribute(a, "hidden", "").unwrap();
        let hidden = stylist
            .resolve_style(&document, a, &request(Some(parent.clone())))
            .unwrap();
        assert!(hidden.is_display_none());

        document.set_attribute(a, "hidden", "until-found").unwrap();
        let until_found = stylist
            .resolve_style(&document, a, &request(Some(parent)))
            .unwrap();
        assert_eq!(
            until_found.content_visibility,
            ContentVisibility::HiddenMatchable
        );
    }
}
