/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(dead_code)]

use style_recalc::properties::{PropertyDeclaration, Rgba};
use style_recalc::{Document, NodeId, Preferences, Selector, StyleRule};

pub const RED: Rgba = Rgba::new(255, 0, 0, 255);
pub const GREEN: Rgba = Rgba::new(0, 128, 0, 255);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A connected `<html><body></body></html>` document.
pub struct Page {
    pub document: Document,
    pub html: NodeId,
    pub body: NodeId,
}

impl Page {
    pub fn new() -> Self {
        Page::with_preferences(Preferences::default())
    }

    pub fn with_preferences(prefs: Preferences) -> Self {
        init_logger();
        let mut document = Document::with_preferences(prefs);
        let html = document.create_element("html");
        let body = document.create_element("body");
        let document_node = document.document_node();
        document.append_child(document_node, html).unwrap();
        document.append_child(html, body).unwrap();
        Page {
            document,
            html,
            body,
        }
    }

    pub fn element(&mut self, parent: NodeId, local_name: &str, classes: &[&str]) -> NodeId {
        let element = self.document.create_element(local_name);
        for class in classes {
            self.document.add_class(element, class).unwrap();
        }
        self.document.append_child(parent, element).unwrap();
        element
    }

    pub fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.document.create_text(text);
        self.document.append_child(parent, node).unwrap();
        node
    }
}

pub fn rule(selector: Selector, declarations: Vec<PropertyDeclaration>) -> StyleRule {
    StyleRule::new(selector, declarations)
}
