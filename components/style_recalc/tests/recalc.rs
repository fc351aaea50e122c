/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use app_units::Au;
use common::{GREEN, Page, RED, rule};
use style_recalc::properties::{
    Display, PointerEvents, PropertyDeclaration, Size, SpecifiedLength, SpecifiedSize, Visibility,
};
use style_recalc::{
    Error, NodeFlags, Preferences, RecalcStatistics, Selector, StyleChangeType, Stylist,
};

fn stylist() -> Stylist {
    Stylist::with_rules([
        rule(
            Selector::class("red"),
            vec![PropertyDeclaration::Color(RED)],
        ),
        rule(
            Selector::class("hide"),
            vec![PropertyDeclaration::Display(Display::None)],
        ),
        rule(
            Selector::class("vis"),
            vec![PropertyDeclaration::Visibility(Visibility::Hidden)],
        ),
        rule(
            Selector::class("shown"),
            vec![PropertyDeclaration::Visibility(Visibility::Visible)],
        ),
        rule(
            Selector::class("pe"),
            vec![PropertyDeclaration::PointerEvents(PointerEvents::None)],
        ),
        rule(
            Selector::class("small"),
            vec![PropertyDeclaration::FontSize(SpecifiedLength::Px(10.))],
        ),
        rule(
            Selector::class("big"),
            vec![PropertyDeclaration::FontSize(SpecifiedLength::Px(20.))],
        ),
        rule(
            Selector::class("rem"),
            vec![PropertyDeclaration::Width(SpecifiedSize::Length(
                SpecifiedLength::Rem(2.),
            ))],
        ),
    ])
}

#[test]
fn first_pass_styles_everything() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &["red"]);
    let span = page.element(div, "span", &[]);
    let text = page.text(span, "hi");

    let stylist = stylist();
    assert!(page.document.needs_style_recalc());
    let statistics = page.document.update_lifecycle(&stylist);
    assert_eq!(statistics.elements_traversed, 4);
    assert!(statistics.styles_resolved >= 4);

    let document = &page.document;
    assert!(!document.needs_style_recalc());
    assert!(!document.needs_layout_tree_rebuild());
    assert_eq!(document.style(div).unwrap().color, RED);
    assert_eq!(document.style(span).unwrap().color, RED);
    assert_eq!(document.style(span).unwrap().display, Display::Inline);
    assert_eq!(document.layout_object(text).unwrap().text(), Some("hi"));
    for id in [page.html, body, div, span, text] {
        assert!(document.layout_object(id).is_some(), "{} has no box", id);
        assert!(document.flags(id).is_empty(), "{} is still dirty", id);
    }
}

#[test]
fn a_clean_document_is_not_traversed() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &[]);
    page.text(div, "text");

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    let style = page.document.style(div).cloned();
    assert_eq!(
        page.document.update_style(&stylist),
        RecalcStatistics::default()
    );
    assert_eq!(
        page.document.update_lifecycle(&stylist),
        RecalcStatistics::default()
    );
    assert!(servo_arc::Arc::ptr_eq(
        page.document.style(div).unwrap(),
        style.as_ref().unwrap()
    ));
}

#[test]
fn only_the_dirty_path_is_visited() {
    let mut page = Page::new();
    let body = page.body;
    let first = page.element(body, "div", &[]);
    let target = page.element(first, "span", &[]);
    page.text(target, "a");
    let second = page.element(body, "div", &[]);
    let untouched = page.element(second, "span", &[]);

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    let untouched_style = page.document.style(untouched).cloned().unwrap();

    page.document.add_class(target, "red").unwrap();
    assert!(
        page.document
            .flags(first)
            .contains(NodeFlags::CHILD_NEEDS_STYLE_RECALC)
    );
    let statistics = page.document.update_style(&stylist);
    assert_eq!(statistics.elements_traversed, 4);
    assert_eq!(statistics.styles_resolved, 1);
    assert_eq!(statistics.reattachments, 0);
    assert_eq!(page.document.style(target).unwrap().color, RED);
    assert!(servo_arc::Arc::ptr_eq(
        page.document.style(untouched).unwrap(),
        &untouched_style
    ));

    // Repaint only, the box survives.
    let layout = page.document.layout_object(target).unwrap();
    assert_eq!(layout.style().color, RED);
}

#[test]
fn unchanged_styles_keep_their_identity() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &[]);
    let stylist = stylist();
    page.document.update_lifecycle(&stylist);

    let before = page.document.style(div).cloned().unwrap();
    page.document
        .set_attribute(div, "data-unstyled", "1")
        .unwrap();
    page.document.update_lifecycle(&stylist);
    assert!(servo_arc::Arc::ptr_eq(
        page.document.style(div).unwrap(),
        &before
    ));
}

#[test]
fn display_none_drops_the_subtree() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &[]);
    let span = page.element(div, "span", &[]);
    let text = page.text(span, "gone");

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    page.document.add_class(div, "hide").unwrap();
    let statistics = page.document.update_lifecycle(&stylist);
    assert!(statistics.reattachments >= 1);
    for id in [div, span] {
        assert!(page.document.style(id).is_none());
        assert!(page.document.layout_object(id).is_none());
    }
    assert!(page.document.layout_object(text).is_none());

    page.document.remove_class(div, "hide").unwrap();
    page.document.update_lifecycle(&stylist);
    assert!(page.document.style(span).is_some());
    assert_eq!(page.document.layout_object(text).unwrap().text(), Some("gone"));
}

#[test]
fn root_font_size_reaches_rem_users() {
    let mut page = Page::new();
    let (html, body) = (page.html, page.body);
    page.document.add_class(body, "small").unwrap();
    let sized = page.element(body, "div", &["rem"]);
    let plain = page.element(body, "div", &[]);

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    assert_eq!(
        page.document.style(sized).unwrap().width,
        Size::Length(Au::from_px(32))
    );
    let plain_style = page.document.style(plain).cloned().unwrap();

    // The body pins its own font size, so only the rem fan-out can get the
    // new root font size down to `sized`.
    page.document.add_class(html, "big").unwrap();
    page.document.update_lifecycle(&stylist);
    assert_eq!(
        page.document.style(sized).unwrap().width,
        Size::Length(Au::from_px(40))
    );
    assert_eq!(page.document.style(body).unwrap().font_size, Au::from_px(10));
    assert_eq!(**page.document.style(plain).unwrap(), *plain_style);
}

#[test]
fn independent_properties_are_reinherited() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &[]);
    let p = page.element(div, "p", &[]);
    let shown = page.element(div, "p", &["shown"]);
    page.text(p, "text");

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    page.document.add_class(body, "vis").unwrap();
    let statistics = page.document.update_lifecycle(&stylist);

    assert_eq!(statistics.independent_inheritance_hits, 3);
    assert_eq!(page.document.style(div).unwrap().visibility, Visibility::Hidden);
    assert_eq!(page.document.style(p).unwrap().visibility, Visibility::Hidden);
    assert_eq!(
        page.document.style(shown).unwrap().visibility,
        Visibility::Visible
    );

    page.document.add_class(body, "pe").unwrap();
    page.document.update_lifecycle(&stylist);
    assert_eq!(
        page.document.style(p).unwrap().pointer_events,
        PointerEvents::None
    );
}

#[test]
fn links_take_the_slow_path() {
    let mut page = Page::new();
    let body = page.body;
    let a = page.element(body, "a", &[]);
    page.document.set_attribute(a, "href", "#top").unwrap();
    let span = page.element(a, "span", &[]);

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    page.document.add_class(body, "vis").unwrap();
    let statistics = page.document.update_lifecycle(&stylist);

    assert_eq!(statistics.independent_inheritance_hits, 0);
    assert_eq!(page.document.style(span).unwrap().visibility, Visibility::Hidden);
    assert_eq!(page.document.style(span).unwrap().color.blue, 238);
}

#[test]
fn independent_inheritance_can_be_turned_off() {
    let mut prefs = Preferences::default();
    prefs.independent_inheritance_enabled = false;
    let mut page = Page::with_preferences(prefs);
    let body = page.body;
    let div = page.element(body, "div", &[]);

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    page.document.add_class(body, "vis").unwrap();
    let statistics = page.document.update_lifecycle(&stylist);
    assert_eq!(statistics.independent_inheritance_hits, 0);
    assert_eq!(page.document.style(div).unwrap().visibility, Visibility::Hidden);
}

#[test]
fn slotted_children_inherit_along_the_flat_tree() {
    let mut page = Page::new();
    let body = page.body;
    let host = page.element(body, "div", &["red"]);
    let shadow_root = page.document.attach_shadow(host).unwrap();
    let wrapper = page.document.create_element("span");
    page.document.add_class(wrapper, "green").unwrap();
    page.document.append_child(shadow_root, wrapper).unwrap();
    let slot = page.document.create_element("slot");
    page.document.append_child(wrapper, slot).unwrap();
    let light = page.element(host, "b", &[]);
    let text = page.text(light, "slotted");

    let stylist = Stylist::with_rules([
        rule(Selector::class("red"), vec![PropertyDeclaration::Color(RED)]),
        rule(
            Selector::class("green"),
            vec![PropertyDeclaration::Color(GREEN)],
        ),
    ]);
    page.document.update_lifecycle(&stylist);

    let document = &page.document;
    assert_eq!(document.flat_tree_parent(light), Some(slot));
    assert_eq!(document.style(slot).unwrap().display, Display::Contents);
    assert_eq!(document.style(light).unwrap().color, GREEN);
    assert!(document.layout_object(slot).is_none());
    assert!(document.layout_object(text).is_some());
    assert_eq!(document.layout_children(wrapper).as_slice(), &[slot]);
}

#[test]
fn unslotted_children_are_not_styled() {
    let mut page = Page::new();
    let body = page.body;
    let host = page.element(body, "div", &[]);
    let shadow_root = page.document.attach_shadow(host).unwrap();
    let inner = page.document.create_element("p");
    page.document.append_child(shadow_root, inner).unwrap();
    let light = page.element(host, "b", &[]);

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    assert!(page.document.style(inner).is_some());
    assert!(page.document.style(light).is_none());
    assert!(page.document.layout_object(light).is_none());
}

#[test]
fn removed_subtrees_forget_their_styles() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &[]);
    let span = page.element(div, "span", &[]);

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    page.document.remove_child(body, div).unwrap();
    assert!(!page.document.is_connected(span));
    assert!(page.document.style(span).is_none());
    assert!(page.document.layout_object(div).is_none());
    assert!(matches!(
        page.document.invalidate_style(span, StyleChangeType::Local),
        Err(Error::NotConnected(id)) if id == span
    ));

    page.document.append_child(body, div).unwrap();
    page.document.update_lifecycle(&stylist);
    assert!(page.document.style(span).is_some());
}

#[test]
fn rule_changes_restyle_everything() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &[]);

    page.document.update_lifecycle(&Stylist::new());
    assert_eq!(page.document.style(div).unwrap().visibility, Visibility::Visible);

    let stylist = Stylist::with_rules([rule(
        Selector::tag("div"),
        vec![PropertyDeclaration::Visibility(Visibility::Hidden)],
    )]);
    page.document.invalidate_for_rule_change();
    page.document.update_lifecycle(&stylist);
    assert_eq!(page.document.style(div).unwrap().visibility, Visibility::Hidden);
}

#[test]
fn container_recalc_rejects_bad_targets() {
    let mut page = Page::new();
    let body = page.body;
    let div = page.element(body, "div", &[]);
    let text = page.text(div, "x");
    let detached = page.document.create_element("div");

    let stylist = stylist();
    page.document.update_lifecycle(&stylist);
    assert!(matches!(
        page.document.update_style_for_container(&stylist, div),
        Err(Error::NotASizeContainer(_))
    ));
    assert!(matches!(
        page.document.update_style_for_container(&stylist, text),
        Err(Error::NotAnElement(_))
    ));
    assert!(matches!(
        page.document.update_style_for_container(&stylist, detached),
        Err(Error::NotConnected(_))
    ));
}

#[test]
fn preferences_load_from_json() {
    let prefs = Preferences::from_json(
        r#"{
            "layout.css.content-visibility.enabled": false,
            "layout.lifecycle.max-iterations": 2
        }"#,
    )
    .unwrap();
    assert!(!prefs.content_visibility_enabled);
    assert!(prefs.container_queries_enabled);
    assert_eq!(prefs.max_lifecycle_iterations, 2);
    assert_eq!(Preferences::from_json(&prefs.to_json().unwrap()).unwrap(), prefs);
    assert!(matches!(
        Preferences::from_json(r#"{ "layout.lifecycle.max-iterations": "four" }"#),
        Err(Error::InvalidPreferences(_))
    ));
}
