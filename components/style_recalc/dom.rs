/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The document tree the style engine works on.
//!
//! Nodes live in a slab and refer to each other by [`NodeId`]. A parent owns
//! its children; pseudo-element nodes are owned by the rare data of their
//! originating element and only point back at it.

use std::fmt;

use app_units::Au;
use euclid::default::Size2D;
use log::{debug, trace};
use servo_arc::Arc;
use slab::Slab;
use smallvec::SmallVec;
use string_cache::DefaultAtom as Atom;

use crate::display_lock::{ActivationReasons, DisplayLockContext, LockTransition};
use crate::element_flags::{NodeFlags, StyleChangeType};
use crate::error::{Error, Result};
use crate::layout_tree::LayoutObject;
use crate::prefs::Preferences;
use crate::properties::{ComputedValues, ContentVisibility};
use crate::pseudo::{PseudoElement, PseudoKey};
use crate::rare_data::ElementRareData;

const DEFAULT_VIEWPORT_WIDTH_PX: i32 = 800;
const DEFAULT_VIEWPORT_HEIGHT_PX: i32 = 600;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a pseudo-element node is generated for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PseudoInfo {
    pub key: PseudoKey,
    pub owner: NodeId,
}

#[derive(Debug)]
pub struct ElementData {
    local_name: Atom,
    id: Option<Atom>,
    classes: SmallVec<[Atom; 4]>,
    attributes: Vec<(Atom, String)>,
    pseudo: Option<PseudoInfo>,
    pub(crate) style: Option<Arc<ComputedValues>>,
    pub(crate) rare_data: Option<Box<ElementRareData>>,
    shadow_root: Option<NodeId>,
    in_top_layer: bool,
}

impl ElementData {
    fn new(local_name: Atom) -> Self {
        ElementData {
            local_name,
            id: None,
            classes: SmallVec::new(),
            attributes: Vec::new(),
            pseudo: None,
            style: None,
            rare_data: None,
            shadow_root: None,
            in_top_layer: false,
        }
    }

    pub fn local_name(&self) -> &Atom {
        &self.local_name
    }

    pub fn id(&self) -> Option<&Atom> {
        self.id.as_ref()
    }

    pub fn classes(&self) -> &[Atom] {
        &self.classes
    }

    pub fn has_class(&self, name: &Atom) -> bool {
        self.classes.contains(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| &**attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&Atom, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name, value.as_str()))
    }

    pub fn pseudo(&self) -> Option<&PseudoInfo> {
        self.pseudo.as_ref()
    }

    pub fn is_pseudo_element(&self) -> bool {
        self.pseudo.is_some()
    }

    pub fn style(&self) -> Option<&Arc<ComputedValues>> {
        self.style.as_ref()
    }

    pub fn rare_data(&self) -> Option<&ElementRareData> {
        self.rare_data.as_deref()
    }

    pub(crate) fn rare_data_mut(&mut self) -> Option<&mut ElementRareData> {
        self.rare_data.as_deref_mut()
    }

    pub(crate) fn ensure_rare_data(&mut self) -> &mut ElementRareData {
        self.rare_data.get_or_insert_with(Default::default)
    }

    pub fn display_lock(&self) -> Option<&DisplayLockContext> {
        self.rare_data().and_then(|rare_data| rare_data.display_lock())
    }

    pub fn shadow_root(&self) -> Option<NodeId> {
        self.shadow_root
    }

    pub fn in_top_layer(&self) -> bool {
        self.in_top_layer
    }

    /// <https://html.spec.whatwg.org/multipage/#selector-link>
    pub fn is_link(&self) -> bool {
        matches!(&*self.local_name, "a" | "area") && self.has_attribute("href")
    }

    pub fn is_slot(&self) -> bool {
        &*self.local_name == "slot"
    }

    /// Returns whether the attribute changed.
    fn set_attribute(&mut self, name: &str, value: &str) -> bool {
        match self.attributes.iter_mut().find(|(attr, _)| &**attr == name) {
            Some((_, existing)) if existing == value => return false,
            Some((_, existing)) => *existing = value.to_owned(),
            None => self.attributes.push((Atom::from(name), value.to_owned())),
        }
        self.attribute_changed(name);
        true
    }

    fn remove_attribute(&mut self, name: &str) -> bool {
        let Some(index) = self.attributes.iter().position(|(attr, _)| &**attr == name) else {
            return false;
        };
        self.attributes.remove(index);
        self.attribute_changed(name);
        true
    }

    fn attribute_changed(&mut self, name: &str) {
        match name {
            "id" => self.id = self.attribute("id").filter(|id| !id.is_empty()).map(Atom::from),
            "class" => {
                self.classes = self
                    .attribute("class")
                    .unwrap_or("")
                    .split_ascii_whitespace()
                    .map(Atom::from)
                    .collect()
            },
            _ => {},
        }
    }
}

#[derive(Debug)]
pub struct TextData {
    text: String,
}

impl TextData {
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug)]
pub enum NodeData {
    Document,
    ShadowRoot { host: NodeId },
    Element(ElementData),
    Text(TextData),
}

#[derive(Debug)]
pub struct Node {
    /// The DOM parent. For shadow roots this is the host, for pseudo-element
    /// nodes the originating element.
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) flags: NodeFlags,
    pub(crate) data: NodeData,
    pub(crate) layout: Option<LayoutObject>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Node {
            parent: None,
            children: Vec::new(),
            flags: NodeFlags::empty(),
            data,
            layout: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn layout_object(&self) -> Option<&LayoutObject> {
        self.layout.as_ref()
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match self.data {
            NodeData::Element(ref element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match self.data {
            NodeData::Element(ref mut element) => Some(element),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextData> {
        match self.data {
            NodeData::Text(ref text) => Some(text),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(..))
    }
}

/// Things the style engine did that other parts of the engine may cache
/// state about.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StyleNotification {
    PseudoElementRemoved { owner: NodeId, pseudo: PseudoKey },
    FirstLetterReattached { owner: NodeId },
}

pub struct Document {
    pub(crate) nodes: Slab<Node>,
    pub(crate) root: NodeId,
    pub(crate) prefs: Preferences,
    pub(crate) viewport: Size2D<Au>,
    pub(crate) view_transition_names: SmallVec<[Atom; 2]>,
    pub(crate) view_transition_names_changed: bool,
    /// Whether any style ever stored in this document resolved a `rem`
    /// length.
    pub(crate) uses_rem_units: bool,
    /// Size containers whose descendants must be restyled once layout has
    /// run.
    pub(crate) pending_container_recalcs: Vec<NodeId>,
    pub(crate) notifications: Vec<StyleNotification>,
    pub(crate) next_layout_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl Document {
    pub fn new() -> Self {
        Document::with_preferences(Preferences::default())
    }

    pub fn with_preferences(prefs: Preferences) -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(Node::new(NodeData::Document)));
        Document {
            nodes,
            root,
            prefs,
            viewport: Size2D::new(
                Au::from_px(DEFAULT_VIEWPORT_WIDTH_PX),
                Au::from_px(DEFAULT_VIEWPORT_HEIGHT_PX),
            ),
            view_transition_names: SmallVec::new(),
            view_transition_names_changed: false,
            uses_rem_units: false,
            pending_container_recalcs: Vec::new(),
            notifications: Vec::new(),
            next_layout_id: 0,
        }
    }

    pub fn document_node(&self) -> NodeId {
        self.root
    }

    /// The root element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.nodes[self.root.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].is_element())
    }

    /// The number of live nodes, pseudo-element nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn checked(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::NoSuchNode(id))
    }

    fn checked_element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        self.nodes
            .get_mut(id.0)
            .ok_or(Error::NoSuchNode(id))?
            .as_element_mut()
            .ok_or(Error::NotAnElement(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id.0)?.as_element()
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.nodes.get_mut(id.0)?.as_element_mut()
    }

    pub fn style(&self, id: NodeId) -> Option<&Arc<ComputedValues>> {
        self.element(id)?.style()
    }

    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.nodes.get(id.0).map_or(NodeFlags::empty(), |node| node.flags)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map_or(&[][..], |node| &node.children[..])
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0)?.as_text().map(TextData::text)
    }

    pub fn rare_data(&self, id: NodeId) -> Option<&ElementRareData> {
        self.element(id)?.rare_data()
    }

    pub fn pseudo_element(&self, owner: NodeId, key: &PseudoKey) -> Option<NodeId> {
        self.rare_data(owner)?.pseudo_element(key)
    }

    pub fn layout_object(&self, id: NodeId) -> Option<&LayoutObject> {
        self.nodes.get(id.0)?.layout.as_ref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Replace the preferences. Everything is restyled on the next pass.
    pub fn set_preferences(&mut self, prefs: Preferences) {
        if self.prefs == prefs {
            return;
        }
        self.prefs = prefs;
        self.invalidate_for_rule_change();
    }

    pub fn viewport(&self) -> Size2D<Au> {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size2D<Au>) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.invalidate_for_rule_change();
    }

    pub fn view_transition_names(&self) -> &[Atom] {
        &self.view_transition_names
    }

    /// Set the names of the running view transitions, each of which gets a
    /// `::view-transition-group()` on the document element.
    pub fn set_view_transition_names(&mut self, names: &[&str]) {
        let names: SmallVec<[Atom; 2]> = names.iter().map(|name| Atom::from(*name)).collect();
        if names == self.view_transition_names {
            return;
        }
        self.view_transition_names = names;
        self.view_transition_names_changed = true;
        if let Some(root) = self.document_element() {
            self.nodes[root.0]
                .flags
                .insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
            self.mark_ancestors_for_style_recalc(root);
        }
    }

    pub fn take_notifications(&mut self) -> Vec<StyleNotification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn notify(&mut self, notification: StyleNotification) {
        trace!("Style notification: {:?}", notification);
        self.notifications.push(notification);
    }

    pub fn pending_container_recalcs(&self) -> &[NodeId] {
        &self.pending_container_recalcs
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.nodes.get(node.0).and_then(|node| node.parent);
        }
        false
    }

    /// Whether the next style pass has anything to do.
    pub fn needs_style_recalc(&self) -> bool {
        self.nodes[self.root.0]
            .flags
            .intersects(NodeFlags::STYLE_DIRTY)
    }

    /// Whether the layout tree builder has anything to do.
    pub fn needs_layout_tree_rebuild(&self) -> bool {
        self.nodes[self.root.0]
            .flags
            .intersects(NodeFlags::REATTACH_DIRTY)
    }

    pub fn create_element(&mut self, local_name: &str) -> NodeId {
        let data = ElementData::new(Atom::from(local_name));
        NodeId(self.nodes.insert(Node::new(NodeData::Element(data))))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let data = TextData {
            text: text.to_owned(),
        };
        NodeId(self.nodes.insert(Node::new(NodeData::Text(data))))
    }

    pub(crate) fn create_pseudo_element(&mut self, owner: NodeId, key: PseudoKey) -> NodeId {
        let mut data = ElementData::new(Atom::from(""));
        data.pseudo = Some(PseudoInfo {
            key: key.clone(),
            owner,
        });
        let mut node = Node::new(NodeData::Element(data));
        node.parent = Some(owner);
        let pseudo = NodeId(self.nodes.insert(node));
        if let Some(element) = self.element_mut(owner) {
            element.ensure_rare_data().set_pseudo_element(key, pseudo);
        }
        pseudo
    }

    /// Drop the pseudo-element `key` of `owner` together with any
    /// pseudo-element nested in it. Returns whether there was one.
    pub(crate) fn remove_pseudo_element(&mut self, owner: NodeId, key: &PseudoKey) -> bool {
        let Some(pseudo) = self
            .element_mut(owner)
            .and_then(|element| element.rare_data_mut())
            .and_then(|rare_data| rare_data.remove_pseudo_element(key))
        else {
            return false;
        };
        self.free_pseudo_element(owner, key.clone(), pseudo);
        true
    }

    fn free_pseudo_element(&mut self, owner: NodeId, key: PseudoKey, pseudo: NodeId) {
        let nested = self
            .element_mut(pseudo)
            .and_then(|element| element.rare_data_mut())
            .map(|rare_data| rare_data.take_pseudo_elements())
            .unwrap_or_default();
        for (nested_key, nested_pseudo) in nested {
            self.free_pseudo_element(pseudo, nested_key, nested_pseudo);
        }

        let fragment_text = self
            .rare_data(pseudo)
            .and_then(|rare_data| rare_data.first_letter_fragment())
            .map(|fragment| fragment.text);
        self.nodes.remove(pseudo.0);
        if let Some(text) = fragment_text {
            if self.nodes.contains(text.0) && self.is_connected(text) {
                self.set_needs_reattach(text);
            }
        }
        self.notify(StyleNotification::PseudoElementRemoved { owner, pseudo: key });
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or last. A child
    /// that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.validate_insertion(parent, child, reference)?;
        if let Some(old_parent) = self.nodes[child.0].parent {
            self.remove_child(old_parent, child)?;
        }

        let index = match reference {
            Some(reference) => self.nodes[parent.0]
                .children
                .iter()
                .position(|&id| id == reference)
                .ok_or(Error::HierarchyRequest { parent, child })?,
            None => self.nodes[parent.0].children.len(),
        };
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        debug!("Inserted {:?} into {:?}", child, parent);

        if !self.is_connected(parent) {
            return Ok(());
        }
        if self.nodes[child.0].is_element() {
            self.set_needs_style_recalc(child, StyleChangeType::Subtree);
        } else {
            self.set_needs_reattach(child);
        }
        self.invalidate_slot_assignment(parent, child);
        self.invalidate_first_letter(parent);
        Ok(())
    }

    fn validate_insertion(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        let parent_node = self.checked(parent)?;
        let child_node = self.checked(child)?;
        if let Some(reference) = reference {
            if self.checked(reference)?.parent != Some(parent) {
                return Err(Error::HierarchyRequest { parent, child });
            }
        }

        let valid = match (&parent_node.data, &child_node.data) {
            (_, NodeData::Document) | (_, NodeData::ShadowRoot { .. }) => false,
            (NodeData::Text(..), _) => false,
            (NodeData::Document, NodeData::Text(..)) => false,
            (NodeData::Document, NodeData::Element(..)) => self
                .document_element()
                .is_none_or(|root| root == child),
            (_, NodeData::Element(element)) => !element.is_pseudo_element(),
            _ => true,
        };
        let pseudo_parent = parent_node
            .as_element()
            .is_some_and(ElementData::is_pseudo_element);
        if !valid || pseudo_parent || self.is_inclusive_ancestor(child, parent) {
            return Err(Error::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.checked(parent)?;
        if self.checked(child)?.parent != Some(parent) {
            return Err(Error::HierarchyRequest { parent, child });
        }
        let was_connected = self.is_connected(parent);
        self.nodes[parent.0].children.retain(|&id| id != child);
        self.nodes[child.0].parent = None;
        debug!("Removed {:?} from {:?}", child, parent);

        if was_connected {
            self.clear_subtree_state(child);
            self.invalidate_slot_assignment(parent, child);
            self.invalidate_first_letter(parent);
        }
        Ok(())
    }

    /// Forget everything the style engine and layout know about a subtree
    /// leaving the document.
    fn clear_subtree_state(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let pseudos = self
                .element_mut(id)
                .and_then(|element| element.rare_data_mut())
                .map(|rare_data| rare_data.take_pseudo_elements())
                .unwrap_or_default();
            for (key, pseudo) in pseudos {
                self.free_pseudo_element(id, key, pseudo);
            }

            let node = &mut self.nodes[id.0];
            node.flags = NodeFlags::empty();
            node.layout = None;
            stack.extend(node.children.iter().copied());
            if let Some(element) = node.as_element_mut() {
                element.style = None;
                element.rare_data = None;
                stack.extend(element.shadow_root);
            }
            self.pending_container_recalcs.retain(|&pending| pending != id);
        }
    }

    /// Attach a shadow root to `host`. Its children replace the host's in the
    /// flat tree, and the first `<slot>` in it receives the host's children.
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId> {
        let element = self.checked_element_mut(host)?;
        if element.shadow_root.is_some() {
            return Err(Error::ShadowRootExists(host));
        }
        if element.is_pseudo_element() {
            return Err(Error::NotAnElement(host));
        }
        let mut node = Node::new(NodeData::ShadowRoot { host });
        node.parent = Some(host);
        let shadow_root = NodeId(self.nodes.insert(node));
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(shadow_root);
        }
        if self.is_connected(host) {
            self.set_needs_style_recalc(host, StyleChangeType::Subtree);
            self.set_needs_reattach(host);
        }
        Ok(shadow_root)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        if self.checked_element_mut(id)?.set_attribute(name, value) {
            self.attribute_changed(id);
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<()> {
        if self.checked_element_mut(id)?.remove_attribute(name) {
            self.attribute_changed(id);
        }
        Ok(())
    }

    fn attribute_changed(&mut self, id: NodeId) {
        if self.is_connected(id) {
            self.set_needs_style_recalc(id, StyleChangeType::Local);
        }
    }

    pub fn add_class(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.update_classes(id, |classes| {
            if !classes.iter().any(|class| class == name) {
                classes.push(name.to_owned());
            }
        })
    }

    pub fn remove_class(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.update_classes(id, |classes| classes.retain(|class| class != name))
    }

    pub fn toggle_class(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.update_classes(id, |classes| {
            match classes.iter().position(|class| class == name) {
                Some(index) => {
                    classes.remove(index);
                },
                None => classes.push(name.to_owned()),
            }
        })
    }

    fn update_classes<F>(&mut self, id: NodeId, update: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<String>),
    {
        let element = self.checked_element_mut(id)?;
        let mut classes: Vec<String> = element
            .attribute("class")
            .unwrap_or("")
            .split_ascii_whitespace()
            .map(str::to_owned)
            .collect();
        update(&mut classes);
        let value = classes.join(" ");
        self.set_attribute(id, "class", &value)
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(Error::NoSuchNode(id))?;
        let NodeData::Text(ref mut data) = node.data else {
            return Err(Error::NotATextNode(id));
        };
        if data.text == text {
            return Ok(());
        }
        data.text = text.to_owned();
        if self.is_connected(id) {
            self.set_needs_reattach(id);
            self.invalidate_first_letter(id);
        }
        Ok(())
    }

    /// Split a text node at the byte `offset`, as `Text.splitText()` does.
    /// Returns the new node, holding the text after `offset`.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId> {
        let text = self
            .checked(id)?
            .as_text()
            .ok_or(Error::NotATextNode(id))?
            .text()
            .to_owned();
        if offset > text.len() || !text.is_char_boundary(offset) {
            return Err(Error::IndexSize { node: id, offset });
        }

        let new_node = self.create_text(&text[offset..]);
        if let Some(parent) = self.nodes[id.0].parent {
            let next_sibling = {
                let siblings = &self.nodes[parent.0].children;
                siblings
                    .iter()
                    .position(|&sibling| sibling == id)
                    .and_then(|index| siblings.get(index + 1))
                    .copied()
            };
            self.insert_before(parent, new_node, next_sibling)?;
        }
        self.set_text(id, &text[..offset])?;
        Ok(new_node)
    }

    pub fn set_in_top_layer(&mut self, id: NodeId, in_top_layer: bool) -> Result<()> {
        let element = self.checked_element_mut(id)?;
        if element.in_top_layer == in_top_layer {
            return Ok(());
        }
        element.in_top_layer = in_top_layer;
        self.attribute_changed(id);
        Ok(())
    }

    /// Record the size layout gave the box of `id`. Size containers whose
    /// size changed are queued for their descendants to be restyled.
    pub fn set_layout_size(&mut self, id: NodeId, size: Size2D<Au>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(Error::NoSuchNode(id))?;
        let layout = node.layout.as_mut().ok_or(Error::NoLayoutObject(id))?;
        if layout.size == Some(size) {
            return Ok(());
        }
        layout.size = Some(size);

        let is_size_container = self
            .style(id)
            .is_some_and(|style| style.is_size_container());
        if is_size_container &&
            self.prefs.container_queries_enabled &&
            !self.pending_container_recalcs.contains(&id)
        {
            debug!("Container {:?} resized to {:?}", id, size);
            self.pending_container_recalcs.push(id);
        }
        Ok(())
    }

    /// Report whether the element intersects the viewport, which releases or
    /// takes `content-visibility: auto` locks.
    pub fn set_onscreen(&mut self, id: NodeId, is_onscreen: bool) -> Result<()> {
        let element = self.checked_element_mut(id)?;
        let transition = element
            .rare_data_mut()
            .and_then(|rare_data| rare_data.display_lock_mut())
            .map_or(LockTransition::Unchanged, |lock| lock.set_onscreen(is_onscreen));
        if transition == LockTransition::Unlocked {
            self.display_lock_released(id);
        }
        Ok(())
    }

    /// Ask a locked element to render its contents for `reason`. Returns
    /// whether the lock was released.
    pub fn activate_display_lock(&mut self, id: NodeId, reason: ActivationReasons) -> Result<bool> {
        let element = self.checked_element_mut(id)?;
        let Some(lock) = element
            .rare_data_mut()
            .and_then(|rare_data| rare_data.display_lock_mut())
        else {
            return Ok(false);
        };
        if !lock.is_locked() || !lock.is_activatable(reason) {
            return Ok(false);
        }
        if lock.requested_state() == ContentVisibility::HiddenMatchable {
            // Revealing `hidden=until-found` content removes the attribute,
            // the lock goes away with the restyle.
            self.remove_attribute(id, "hidden")?;
            return Ok(true);
        }
        if lock.activate(reason) != LockTransition::Unlocked {
            return Ok(false);
        }
        self.display_lock_released(id);
        Ok(true)
    }

    /// Make sure the next passes reach the work that was held back while
    /// `id` was locked.
    pub(crate) fn display_lock_released(&mut self, id: NodeId) {
        debug!("Display lock of {:?} released", id);
        let flags = &mut self.nodes[id.0].flags;
        flags.insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
        let needs_reattach = flags.contains(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE);
        self.mark_ancestors_for_style_recalc(id);
        if needs_reattach {
            self.mark_ancestors_for_reattach(id, true);
        }
    }

    /// Invalidate the style of `id` from outside the style engine.
    pub fn invalidate_style(&mut self, id: NodeId, change_type: StyleChangeType) -> Result<()> {
        self.checked_element_mut(id)?;
        if !self.is_connected(id) {
            return Err(Error::NotConnected(id));
        }
        self.set_needs_style_recalc(id, change_type);
        Ok(())
    }

    /// The rules changed; restyle everything.
    pub fn invalidate_for_rule_change(&mut self) {
        if let Some(root) = self.document_element() {
            self.set_needs_style_recalc(root, StyleChangeType::Subtree);
        }
    }

    /// The first `<slot>` in the shadow tree of `host`, in tree order.
    fn assigned_slot(&self, host: NodeId) -> Option<NodeId> {
        let shadow_root = self.element(host)?.shadow_root?;
        let mut stack: SmallVec<[NodeId; 16]> =
            self.nodes[shadow_root.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.as_element().is_some_and(ElementData::is_slot) {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// The host whose children are assigned to `slot`, if any.
    fn slot_host(&self, slot: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[slot.0].parent;
        while let Some(id) = current {
            if let NodeData::ShadowRoot { host } = self.nodes[id.0].data {
                return (self.assigned_slot(host) == Some(slot)).then_some(host);
            }
            current = self.nodes[id.0].parent;
        }
        None
    }

    fn slot_has_assigned_nodes(&self, slot: NodeId) -> bool {
        self.slot_host(slot)
            .is_some_and(|host| !self.nodes[host.0].children.is_empty())
    }

    /// Slot assignment changed when a light child of a host or a slot was
    /// added or removed; restyle the affected part of the flat tree.
    fn invalidate_slot_assignment(&mut self, parent: NodeId, child: NodeId) {
        let parent_is_host = self
            .element(parent)
            .is_some_and(|element| element.shadow_root.is_some());
        if parent_is_host {
            if let Some(slot) = self.assigned_slot(parent) {
                self.set_needs_style_recalc(slot, StyleChangeType::Subtree);
                self.set_needs_reattach(slot);
            }
            return;
        }

        let contains_slot = {
            let mut stack = vec![child];
            let mut found = false;
            while let Some(id) = stack.pop() {
                let node = &self.nodes[id.0];
                if node.as_element().is_some_and(ElementData::is_slot) {
                    found = true;
                    break;
                }
                stack.extend(node.children.iter().copied());
            }
            found
        };
        if !contains_slot {
            return;
        }
        let mut current = Some(parent);
        while let Some(id) = current {
            if let NodeData::ShadowRoot { host } = self.nodes[id.0].data {
                self.set_needs_style_recalc(host, StyleChangeType::Subtree);
                self.set_needs_reattach(host);
                return;
            }
            current = self.nodes[id.0].parent;
        }
    }

    /// The parent of `id` in the flat tree, the tree styles are inherited
    /// along. `None` for nodes that are not rendered because they are not
    /// slotted.
    pub fn flat_tree_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id.0)?;
        if let Some(info) = node.as_element().and_then(ElementData::pseudo) {
            return Some(info.owner);
        }
        let parent = node.parent?;
        match self.nodes[parent.0].data {
            NodeData::ShadowRoot { host } => Some(host),
            NodeData::Element(ref element) if element.shadow_root.is_some() => {
                self.assigned_slot(parent)
            },
            NodeData::Element(ref element)
                if element.is_slot() && self.slot_has_assigned_nodes(parent) =>
            {
                None
            },
            _ => Some(parent),
        }
    }

    /// The children of `id` in the flat tree, pseudo-elements excluded.
    pub fn flat_tree_children(&self, id: NodeId) -> SmallVec<[NodeId; 8]> {
        let Some(node) = self.nodes.get(id.0) else {
            return SmallVec::new();
        };
        if let Some(element) = node.as_element() {
            if let Some(shadow_root) = element.shadow_root {
                return self.nodes[shadow_root.0].children.iter().copied().collect();
            }
            if element.is_slot() {
                if let Some(host) = self.slot_host(id) {
                    let assigned = &self.nodes[host.0].children;
                    if !assigned.is_empty() {
                        return assigned.iter().copied().collect();
                    }
                }
            }
        }
        node.children.iter().copied().collect()
    }

    /// The style of the nearest inclusive flat tree ancestor of `start` that
    /// generates a box, which is what blockification and pseudo-element
    /// boxes look at.
    pub(crate) fn layout_parent_style(&self, start: Option<NodeId>) -> Option<Arc<ComputedValues>> {
        let mut current = start;
        while let Some(id) = current {
            if let Some(element) = self.element(id) {
                let style = element.style()?;
                if !style.display.is_contents() {
                    return Some(style.clone());
                }
            }
            current = self.flat_tree_parent(id);
        }
        None
    }

    /// Mark `id` as needing its style recomputed, and make sure the next
    /// pass gets to it.
    pub(crate) fn set_needs_style_recalc(&mut self, id: NodeId, change_type: StyleChangeType) {
        trace!("{:?} needs style recalc ({:?})", id, change_type);
        self.nodes[id.0].flags.insert(change_type.flags());
        self.mark_ancestors_for_style_recalc(id);
    }

    pub(crate) fn mark_ancestors_for_style_recalc(&mut self, id: NodeId) {
        let mut current = self.flat_tree_parent(id);
        while let Some(ancestor) = current {
            let flags = &mut self.nodes[ancestor.0].flags;
            if flags.contains(NodeFlags::CHILD_NEEDS_STYLE_RECALC) {
                break;
            }
            flags.insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
            current = self.flat_tree_parent(ancestor);
        }
    }

    /// Mark the layout object of `id` for reconstruction. Returns whether
    /// the node was not marked already.
    pub(crate) fn set_needs_reattach(&mut self, id: NodeId) -> bool {
        let flags = &mut self.nodes[id.0].flags;
        if flags.contains(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE) {
            return false;
        }
        flags.insert(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE);
        self.mark_ancestors_for_reattach(id, false);
        true
    }

    /// Set the child reattach bit up the flat tree. Unless `force` is set,
    /// stop at the first ancestor that has it already.
    pub(crate) fn mark_ancestors_for_reattach(&mut self, id: NodeId, force: bool) {
        let mut current = self.flat_tree_parent(id);
        while let Some(ancestor) = current {
            let flags = &mut self.nodes[ancestor.0].flags;
            if !force && flags.contains(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE) {
                break;
            }
            flags.insert(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE);
            current = self.flat_tree_parent(ancestor);
        }
    }

    /// Text around a `::first-letter` changed shape; revisit the elements
    /// that may own one.
    pub(crate) fn invalidate_first_letter(&mut self, id: NodeId) {
        let mut current = if self.nodes[id.0].is_element() {
            Some(id)
        } else {
            self.flat_tree_parent(id)
        };
        while let Some(ancestor) = current {
            let may_own_first_letter = self.element(ancestor).is_some_and(|element| {
                element
                    .style()
                    .is_some_and(|style| style.has_pseudo_rules(PseudoElement::FirstLetter)) ||
                    element.rare_data().is_some_and(|rare_data| {
                        rare_data
                            .pseudo_element(&PseudoKey::new(PseudoElement::FirstLetter))
                            .is_some()
                    })
            });
            if may_own_first_letter {
                self.nodes[ancestor.0]
                    .flags
                    .insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
                self.mark_ancestors_for_style_recalc(ancestor);
                // A letter cut from `id` is out of date as well.
                let cut_from_id = self
                    .pseudo_element(ancestor, &PseudoKey::new(PseudoElement::FirstLetter))
                    .filter(|&pseudo| {
                        self.rare_data(pseudo)
                            .and_then(ElementRareData::first_letter_fragment)
                            .is_some_and(|fragment| fragment.text == id)
                    });
                if let Some(pseudo) = cut_from_id {
                    self.set_needs_reattach(pseudo);
                }
            }
            current = self.flat_tree_parent(ancestor);
        }
    }

    /// Store a new style for `id`. Stored styles never have
    /// `display: none`.
    pub(crate) fn set_style(&mut self, id: NodeId, style: Option<Arc<ComputedValues>>) {
        debug_assert!(style.as_ref().is_none_or(|style| !style.is_display_none()));
        if style.as_ref().is_some_and(|style| style.uses_rem_units()) {
            self.uses_rem_units = true;
        }
        if let Some(element) = self.element_mut(id) {
            element.style = style;
        }
    }

    /// Whether `id` holds a display lock that currently blocks its children.
    pub fn is_display_locked(&self, id: NodeId) -> bool {
        self.element(id)
            .and_then(ElementData::display_lock)
            .is_some_and(DisplayLockContext::is_locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_with_body() -> (Document, NodeId, NodeId) {
        let mut document = Document::new();
        let html = document.create_element("html");
        let body = document.create_element("body");
        document.append_child(document.document_node(), html).unwrap();
        document.append_child(html, body).unwrap();
        (document, html, body)
    }

    #[test]
    fn insertion_marks_ancestors() {
        let (mut document, html, body) = document_with_body();
        let div = document.create_element("div");
        document.append_child(body, div).unwrap();
        assert!(document.flags(div).contains(NodeFlags::NEEDS_SUBTREE_STYLE_RECALC));
        assert!(document.flags(body).contains(NodeFlags::CHILD_NEEDS_STYLE_RECALC));
        assert!(document.flags(html).contains(NodeFlags::CHILD_NEEDS_STYLE_RECALC));
        assert!(document.needs_style_recalc());
    }

    #[test]
    fn hierarchy_is_validated() {
        let (mut document, html, body) = document_with_body();
        assert!(matches!(
            document.append_child(body, html),
            Err(Error::HierarchyRequest { .. })
        ));
        let second_root = document.create_element("html");
        assert!(document
            .append_child(document.document_node(), second_root)
            .is_err());
        let text = document.create_text("x");
        assert!(document.append_child(text, second_root).is_err());
        assert!(matches!(
            document.set_text(body, "x"),
            Err(Error::NotATextNode(_))
        ));
    }

    #[test]
    fn classes_follow_the_class_attribute() {
        let (mut document, _, body) = document_with_body();
        document.set_attribute(body, "class", "a  b").unwrap();
        document.toggle_class(body, "a").unwrap();
        document.add_class(body, "c").unwrap();
        let element = document.element(body).unwrap();
        assert_eq!(element.attribute("class"), Some("b c"));
        assert!(element.has_class(&Atom::from("c")));
        assert!(!element.has_class(&Atom::from("a")));
        document.set_attribute(body, "id", "main").unwrap();
        assert_eq!(document.element(body).unwrap().id(), Some(&Atom::from("main")));
    }

    #[test]
    fn split_text_inserts_the_tail_after() {
        let (mut document, _, body) = document_with_body();
        let text = document.create_text("Hello");
        document.append_child(body, text).unwrap();
        let tail = document.split_text(text, 2).unwrap();
        assert_eq!(document.text(text), Some("He"));
        assert_eq!(document.text(tail), Some("llo"));
        assert_eq!(document.children(body), &[text, tail]);
        assert!(matches!(
            document.split_text(text, 10),
            Err(Error::IndexSize { offset: 10, .. })
        ));
    }

    #[test]
    fn flat_tree_follows_slots() {
        let (mut document, _, body) = document_with_body();
        let host = document.create_element("div");
        let light = document.create_element("b");
        document.append_child(body, host).unwrap();
        document.append_child(host, light).unwrap();
        assert_eq!(document.flat_tree_parent(light), Some(host));

        let shadow_root = document.attach_shadow(host).unwrap();
        assert!(matches!(
            document.attach_shadow(host),
            Err(Error::ShadowRootExists(_))
        ));
        let span = document.create_element("span");
        let slot = document.create_element("slot");
        let fallback = document.create_text("fallback");
        document.append_child(shadow_root, span).unwrap();
        document.append_child(span, slot).unwrap();
        document.append_child(slot, fallback).unwrap();

        assert_eq!(document.flat_tree_children(host).as_slice(), &[span]);
        assert_eq!(document.flat_tree_parent(span), Some(host));
        assert_eq!(document.flat_tree_children(slot).as_slice(), &[light]);
        assert_eq!(document.flat_tree_parent(light), Some(slot));
        assert_eq!(document.flat_tree_parent(fallback), None);

        document.remove_child(host, light).unwrap();
        assert_eq!(document.flat_tree_children(slot).as_slice(), &[fallback]);
        assert_eq!(document.flat_tree_parent(fallback), Some(slot));
    }

    #[test]
    fn layout_size_requires_a_layout_object() {
        let (mut document, _, body) = document_with_body();
        let size = Size2D::new(Au::from_px(10), Au::from_px(10));
        assert!(matches!(
            document.set_layout_size(body, size),
            Err(Error::NoLayoutObject(_))
        ));
    }
}
