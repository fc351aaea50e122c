/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Restyling a document step by step must end where styling it from scratch
//! does.

mod common;

use common::{Page, RED, rule};
use quickcheck::{QuickCheck, TestResult};
use style_recalc::properties::{
    Content, Display, PointerEvents, PropertyDeclaration, SpecifiedLength, SpecifiedSize,
    TextDecorationLine, Visibility,
};
use style_recalc::{NodeId, PseudoElement, PseudoKey, Selector, Stylist};

const CLASSES: &[&str] = &["hide", "red", "gen", "flex", "rem", "pe", "u", "vis"];
const ROOT_CLASSES: &[&str] = &["big", "pe", "vis", "red"];

fn stylist() -> Stylist {
    Stylist::with_rules([
        rule(
            Selector::class("hide"),
            vec![PropertyDeclaration::Display(Display::None)],
        ),
        rule(Selector::class("red"), vec![PropertyDeclaration::Color(RED)]),
        rule(
            Selector::class("gen").with_pseudo(PseudoElement::Before),
            vec![PropertyDeclaration::Content(Content::String("+".into()))],
        ),
        rule(
            Selector::class("flex"),
            vec![PropertyDeclaration::Display(Display::Flex)],
        ),
        rule(
            Selector::class("rem"),
            vec![PropertyDeclaration::Width(SpecifiedSize::Length(
                SpecifiedLength::Rem(3.),
            ))],
        ),
        rule(
            Selector::class("pe"),
            vec![PropertyDeclaration::PointerEvents(PointerEvents::None)],
        ),
        rule(
            Selector::class("u"),
            vec![PropertyDeclaration::TextDecorationLine(
                TextDecorationLine::UNDERLINE,
            )],
        ),
        rule(
            Selector::class("vis"),
            vec![PropertyDeclaration::Visibility(Visibility::Hidden)],
        ),
        rule(
            Selector::class("big"),
            vec![PropertyDeclaration::FontSize(SpecifiedLength::Px(24.))],
        ),
        rule(
            Selector::tag("li").with_class("vis"),
            vec![PropertyDeclaration::Visibility(Visibility::Visible)],
        ),
    ])
}

/// The same tree every time, so node ids line up between documents.
fn build() -> (Page, Vec<NodeId>) {
    let mut page = Page::new();
    let (html, body) = (page.html, page.body);
    let div = page.element(body, "div", &[]);
    let span = page.element(div, "span", &[]);
    page.text(span, "span");
    let a = page.element(body, "a", &[]);
    page.document.set_attribute(a, "href", "#").unwrap();
    let inside_link = page.element(a, "b", &[]);
    let ul = page.element(body, "ul", &[]);
    let first = page.element(ul, "li", &[]);
    page.text(first, "first");
    let second = page.element(ul, "li", &[]);
    let p = page.element(second, "p", &[]);
    page.text(p, "paragraph");
    (page, vec![html, body, div, span, a, inside_link, ul, first, second, p])
}

fn class_for(element: usize, class: u8) -> &'static str {
    let classes = if element == 0 { ROOT_CLASSES } else { CLASSES };
    classes[class as usize % classes.len()]
}

fn incremental_matches_from_scratch(toggles: Vec<(u8, u8)>) -> TestResult {
    let stylist = stylist();
    let (mut incremental, elements) = build();
    incremental.document.update_lifecycle(&stylist);

    let toggles: Vec<(usize, &str)> = toggles
        .into_iter()
        .take(12)
        .map(|(element, class)| {
            let element = element as usize % elements.len();
            (element, class_for(element, class))
        })
        .collect();
    for &(element, class) in &toggles {
        incremental
            .document
            .toggle_class(elements[element], class)
            .unwrap();
        incremental.document.update_lifecycle(&stylist);
    }

    let (mut fresh, fresh_elements) = build();
    assert_eq!(elements, fresh_elements);
    for &(element, class) in &toggles {
        fresh
            .document
            .toggle_class(fresh_elements[element], class)
            .unwrap();
    }
    fresh.document.update_lifecycle(&stylist);

    let before = PseudoKey::new(PseudoElement::Before);
    for &id in &elements {
        let incremental_style = incremental.document.style(id);
        let fresh_style = fresh.document.style(id);
        if incremental_style.map(|style| &**style) != fresh_style.map(|style| &**style) {
            return TestResult::error(format!(
                "{} differs after {:?}: {:?} vs {:?}",
                id, toggles, incremental_style, fresh_style
            ));
        }
        let incremental_before = incremental.document.pseudo_element(id, &before);
        let fresh_before = fresh.document.pseudo_element(id, &before);
        if incremental_before.is_some() != fresh_before.is_some() {
            return TestResult::error(format!("::before of {} differs after {:?}", id, toggles));
        }
        if incremental.document.layout_object(id).is_some() !=
            fresh.document.layout_object(id).is_some()
        {
            return TestResult::error(format!("box of {} differs after {:?}", id, toggles));
        }
    }
    if incremental.document.needs_style_recalc() || incremental.document.needs_layout_tree_rebuild()
    {
        return TestResult::error(format!("still dirty after {:?}", toggles));
    }
    TestResult::passed()
}

#[test]
fn incremental_restyle_matches_a_fresh_one() {
    QuickCheck::new()
        .tests(64)
        .quickcheck(incremental_matches_from_scratch as fn(Vec<(u8, u8)>) -> TestResult);
}

#[test]
fn hiding_and_showing_a_flex_parent() {
    let toggles = vec![(2, 3), (3, 0), (2, 0), (3, 0), (2, 0)];
    assert!(!incremental_matches_from_scratch(toggles).is_failure());
}

#[test]
fn root_font_size_with_rem_users() {
    // `rem` on the span, then `big` on the root, then `rem` off and on again.
    let toggles = vec![(3, 4), (0, 0), (3, 4), (3, 4), (0, 0)];
    assert!(!incremental_matches_from_scratch(toggles).is_failure());
}
