/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The incremental style recalculation pass.
//!
//! The traversal walks the flat tree from the root element, carrying a
//! [`StyleRecalcChange`] down from every element to its children. Clean
//! subtrees that nothing reaches are never entered.

use app_units::Au;
use bitflags::bitflags;
use log::{debug, trace, warn};
use servo_arc::Arc;
use smallvec::SmallVec;

use crate::container_query::{ContainerChange, ContainerFeatures};
use crate::context::{RecalcContext, RecalcStatistics};
use crate::display_lock::LockTransition;
use crate::dom::{Document, NodeData, NodeId};
use crate::element_flags::NodeFlags;
use crate::error::{Error, Result};
use crate::highlight::resolve_highlight_styles;
use crate::properties::{ComputedValues, ContentVisibility, INITIAL_FONT_SIZE_PX, InsideLink};
use crate::pseudo::{PseudoElement, PseudoKey, pseudo_style_is_rendered};
use crate::recalc_change::{Propagate, StyleRecalcChange};
use crate::resolver::{StyleRequest, StyleResolver};
use crate::restyle_damage::{RestyleDamage, StyleDifference, needs_reattach};

bitflags! {
    /// Reasons a style cannot be produced by re-inheriting the independent
    /// properties of the old one.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct FastPathBlockers: u8 {
        /// Link colours are resolved outside the cascade.
        const INSIDE_LINK = 1 << 0;
        /// Applied text decorations carry the decorating box's colour.
        const TEXT_DECORATIONS = 1 << 1;
        /// Highlight styles inherit from the parent's highlights.
        const HIGHLIGHTS = 1 << 2;
        const PSEUDO_ELEMENT = 1 << 3;
        /// The old values were computed against a container that may have
        /// changed since.
        const CONTAINER_QUERY_DEPENDENT = 1 << 4;
    }
}

impl FastPathBlockers {
    pub fn for_style(style: &ComputedValues) -> Self {
        let mut blockers = FastPathBlockers::empty();
        if style.inside_link != InsideLink::NotInside {
            blockers.insert(FastPathBlockers::INSIDE_LINK);
        }
        if !style.applied_text_decorations.is_empty() {
            blockers.insert(FastPathBlockers::TEXT_DECORATIONS);
        }
        if style.highlights.is_some() {
            blockers.insert(FastPathBlockers::HIGHLIGHTS);
        }
        if style.pseudo.is_some() {
            blockers.insert(FastPathBlockers::PSEUDO_ELEMENT);
        }
        if style.depends_on_container_queries() {
            blockers.insert(FastPathBlockers::CONTAINER_QUERY_DEPENDENT);
        }
        blockers
    }
}

enum WorkItem {
    Element(NodeId, StyleRecalcChange),
    Text(NodeId, StyleRecalcChange),
    PseudoElement {
        owner: NodeId,
        key: PseudoKey,
        change: StyleRecalcChange,
        owner_flags: NodeFlags,
    },
    FirstLetter {
        owner: NodeId,
        change: StyleRecalcChange,
        owner_flags: NodeFlags,
    },
    ViewTransitions {
        root: NodeId,
        change: StyleRecalcChange,
        owner_flags: NodeFlags,
    },
    /// Runs once everything below `element` was visited.
    Finish {
        element: NodeId,
        pushed_container: bool,
    },
}

impl Document {
    /// Bring the style of every dirty node up to date.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(servo_profiling = true), level = "trace")
    )]
    pub fn update_style(&mut self, resolver: &dyn StyleResolver) -> RecalcStatistics {
        let mut context = RecalcContext::new(resolver, self);
        if let Some(root) = self.document_element() {
            let document_flags = self.nodes[self.root.0].flags;
            if document_flags.intersects(NodeFlags::STYLE_DIRTY) ||
                self.nodes[root.0].flags.intersects(NodeFlags::STYLE_DIRTY)
            {
                debug!("Recalculating style from {:?}", root);
                self.recalc_subtree(&mut context, root, StyleRecalcChange::default());
            }
        }
        self.nodes[self.root.0]
            .flags
            .remove(NodeFlags::STYLE_DIRTY);
        context.finish()
    }

    /// Style the descendants of a size container once layout has sized it.
    pub fn update_style_for_container(
        &mut self,
        resolver: &dyn StyleResolver,
        container: NodeId,
    ) -> Result<RecalcStatistics> {
        let node = self.get(container).ok_or(Error::NoSuchNode(container))?;
        let element = node.as_element().ok_or(Error::NotAnElement(container))?;
        if !self.is_connected(container) {
            return Err(Error::NotConnected(container));
        }
        if !element
            .style()
            .is_some_and(|style| style.is_size_container())
        {
            self.pending_container_recalcs
                .retain(|&pending| pending != container);
            return Err(Error::NotASizeContainer(container));
        }

        let mut context = RecalcContext::new(resolver, self);
        context.resuming_container = Some(container);
        let outer = self.enclosing_container_features(container);
        if let Some(features) = outer {
            context.push_container(features);
        }

        let change = if self.flags(container).needs_style_recalc() {
            StyleRecalcChange::default()
        } else {
            StyleRecalcChange::default().suppress_recalc()
        };
        debug!("Resuming style recalc inside container {:?}", container);
        self.recalc_subtree(&mut context, container, change);

        if outer.is_some() {
            context.pop_container();
        }
        self.pending_container_recalcs
            .retain(|&pending| pending != container);
        context.statistics.containers_resumed += 1;
        Ok(context.finish())
    }

    /// The features the nearest size container around `id` was last
    /// evaluated with.
    fn enclosing_container_features(&self, id: NodeId) -> Option<ContainerFeatures> {
        if !self.prefs.container_queries_enabled {
            return None;
        }
        let mut current = self.flat_tree_parent(id);
        while let Some(ancestor) = current {
            let features = self
                .rare_data(ancestor)
                .and_then(|rare_data| rare_data.container_query_data())
                .and_then(|data| data.evaluator().features());
            if let Some(features) = features {
                return Some(*features);
            }
            current = self.flat_tree_parent(ancestor);
        }
        None
    }

    /// Run style passes and layout tree rebuilds until both are clean,
    /// resuming every size container layout sized in between.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(servo_profiling = true), level = "trace")
    )]
    pub fn update_lifecycle(&mut self, resolver: &dyn StyleResolver) -> RecalcStatistics {
        let mut statistics = RecalcStatistics::default();
        let max_iterations = self.prefs.max_lifecycle_iterations.max(1);
        for iteration in 0..max_iterations {
            if !self.needs_style_recalc() &&
                !self.needs_layout_tree_rebuild() &&
                self.pending_container_recalcs.is_empty()
            {
                break;
            }
            trace!("Lifecycle iteration {}", iteration);
            statistics += self.update_style(resolver);
            self.rebuild_layout_tree();

            while let Some(&container) = self.pending_container_recalcs.first() {
                match self.update_style_for_container(resolver, container) {
                    Ok(container_statistics) => statistics += container_statistics,
                    Err(error) => {
                        debug!("Dropping pending container recalc: {}", error);
                        self.pending_container_recalcs
                            .retain(|&pending| pending != container);
                    },
                }
            }
            self.rebuild_layout_tree();
        }

        if self.needs_style_recalc() || self.needs_layout_tree_rebuild() {
            warn!(
                "Style still dirty after {} lifecycle iterations",
                max_iterations
            );
        }
        statistics
    }

    fn recalc_subtree(
        &mut self,
        context: &mut RecalcContext,
        root: NodeId,
        change: StyleRecalcChange,
    ) {
        let mut stack = vec![WorkItem::Element(root, change)];
        while let Some(item) = stack.pop() {
            match item {
                WorkItem::Element(id, change) => {
                    self.recalc_element(context, id, change, &mut stack)
                },
                WorkItem::Text(id, change) => self.recalc_text(context, id, change),
                WorkItem::PseudoElement {
                    owner,
                    key,
                    change,
                    owner_flags,
                } => self.update_pseudo_element(context, owner, key, change, owner_flags),
                WorkItem::FirstLetter {
                    owner,
                    change,
                    owner_flags,
                } => self.update_first_letter_pseudo_element(context, owner, change, owner_flags),
                WorkItem::ViewTransitions {
                    root,
                    change,
                    owner_flags,
                } => self.update_view_transition_pseudo_elements(context, root, change, owner_flags),
                WorkItem::Finish {
                    element,
                    pushed_container,
                } => {
                    if pushed_container {
                        context.pop_container();
                    }
                    self.nodes[element.0]
                        .flags
                        .remove(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
                },
            }
        }
    }

    fn recalc_element(
        &mut self,
        context: &mut RecalcContext,
        id: NodeId,
        change: StyleRecalcChange,
        stack: &mut Vec<WorkItem>,
    ) {
        context.statistics.elements_traversed += 1;
        let flags = self.nodes[id.0].flags;
        let mut change = change;
        if flags.contains(NodeFlags::NEEDS_SUBTREE_STYLE_RECALC) && !change.is_suppressed() {
            change = change.ensure_at_least(Propagate::RecalcDescendants);
        }

        let mut child_change = self.recalc_self(context, id, change);
        let is_root = self.document_element() == Some(id);
        if is_root {
            if let Some(style) = self.style(id) {
                context.root_font_size = style.font_size;
            }
        }

        let pushed_container = self.update_container(context, id, &mut child_change);

        self.update_pseudo_element(
            context,
            id,
            PseudoKey::new(PseudoElement::Backdrop),
            child_change,
            flags,
        );

        if self.is_display_locked(id) {
            if !child_change.is_empty() {
                if let Some(lock) = self
                    .element_mut(id)
                    .and_then(|element| element.rare_data_mut())
                    .and_then(|rare_data| rare_data.display_lock_mut())
                {
                    lock.notify_child_recalc_blocked(child_change);
                }
                self.nodes[id.0]
                    .flags
                    .insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
            }
            trace!("Style recalc below {:?} blocked by display lock", id);
            context.statistics.blocked_by_display_lock += 1;
            if pushed_container {
                context.pop_container();
            }
            return;
        }
        if let Some(lock) = self
            .element_mut(id)
            .and_then(|element| element.rare_data_mut())
            .and_then(|rare_data| rare_data.display_lock_mut())
        {
            child_change = child_change.combine(lock.take_deferred_change());
        }

        let node_flags = self.nodes[id.0].flags;
        if pushed_container &&
            self.should_skip_container_descendants(context, id, change, child_change, node_flags)
        {
            if let Some(data) = self
                .element_mut(id)
                .and_then(|element| element.rare_data_mut())
                .and_then(|rare_data| rare_data.container_query_data_mut())
            {
                data.defer_change(child_change);
            }
            self.nodes[id.0]
                .flags
                .insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
            if !self.pending_container_recalcs.contains(&id) {
                self.pending_container_recalcs.push(id);
            }
            debug!("Skipping style recalc inside container {:?} until layout", id);
            context.statistics.containers_skipped += 1;
            context.pop_container();
            return;
        }

        if let Some(pending) = self
            .element_mut(id)
            .and_then(|element| element.rare_data_mut())
            .and_then(|rare_data| rare_data.container_query_data_mut())
            .and_then(|data| data.take_pending_change())
        {
            child_change = child_change.combine(pending);
        }
        self.pending_container_recalcs.retain(|&pending| pending != id);

        let flags = flags | self.nodes[id.0].flags;
        stack.push(WorkItem::Finish {
            element: id,
            pushed_container,
        });
        if is_root {
            stack.push(WorkItem::ViewTransitions {
                root: id,
                change: child_change,
                owner_flags: flags,
            });
        }
        stack.push(WorkItem::FirstLetter {
            owner: id,
            change: child_change,
            owner_flags: flags,
        });
        stack.push(WorkItem::PseudoElement {
            owner: id,
            key: PseudoKey::new(PseudoElement::After),
            change: child_change,
            owner_flags: flags,
        });
        if child_change.traverse_children(flags) {
            let children = self.flat_tree_children(id);
            for &child in children.iter().rev() {
                let child_flags = self.nodes[child.0].flags;
                match self.nodes[child.0].data {
                    NodeData::Element(..) => {
                        if !child_change.is_empty() ||
                            child_flags.intersects(NodeFlags::STYLE_DIRTY)
                        {
                            stack.push(WorkItem::Element(child, child_change));
                        }
                    },
                    NodeData::Text(..) => {
                        if !child_change.is_empty() {
                            stack.push(WorkItem::Text(child, child_change));
                        }
                    },
                    _ => {},
                }
            }
        }
        stack.push(WorkItem::PseudoElement {
            owner: id,
            key: PseudoKey::new(PseudoElement::Before),
            change: child_change,
            owner_flags: flags,
        });
        stack.push(WorkItem::PseudoElement {
            owner: id,
            key: PseudoKey::new(PseudoElement::Marker),
            change: child_change,
            owner_flags: flags,
        });
    }

    /// Refresh the container state of `id`. Returns whether its features were
    /// pushed on the context.
    fn update_container(
        &mut self,
        context: &mut RecalcContext,
        id: NodeId,
        child_change: &mut StyleRecalcChange,
    ) -> bool {
        let container_style = self
            .style(id)
            .filter(|style| context.prefs.container_queries_enabled && style.is_size_container())
            .cloned();
        let size = self
            .layout_object(id)
            .and_then(|layout| layout.size())
            .map(|size| (size.width, size.height));
        let root_font_size = context.root_font_size;
        let Some(element) = self.element_mut(id) else {
            return false;
        };

        let Some(style) = container_style else {
            // No longer a container: whatever was set aside for the
            // descendants is done now, against the next container up.
            let data = element
                .rare_data_mut()
                .and_then(|rare_data| rare_data.take_container_query_data());
            if let Some(mut data) = data {
                if let Some(pending) = data.take_pending_change() {
                    *child_change = child_change.combine(pending);
                }
                *child_change = child_change.force_recalc_container_dependents();
                self.pending_container_recalcs.retain(|&pending| pending != id);
            }
            return false;
        };

        let features =
            ContainerFeatures::new(style.container_type, size, style.font_size, root_font_size);
        let data = element.ensure_rare_data().ensure_container_query_data();
        if data.evaluator_mut().update_values_if_needed(features) ==
            ContainerChange::NearestContainer
        {
            trace!("Container {:?} features changed to {:?}", id, features);
            *child_change = child_change.force_recalc_container_dependents();
        }
        context.push_container(features);
        true
    }

    fn should_skip_container_descendants(
        &self,
        context: &RecalcContext,
        id: NodeId,
        change: StyleRecalcChange,
        child_change: StyleRecalcChange,
        flags: NodeFlags,
    ) -> bool {
        context.prefs.skip_container_style_recalc &&
            context.resuming_container != Some(id) &&
            !change.is_suppressed() &&
            !child_change.reattach_layout_tree() &&
            !flags.contains(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE) &&
            self.layout_object(id).is_some() &&
            child_change.traverse_children(flags)
    }

    /// Restyle `id` itself if `change` or its dirty bits ask for it, and
    /// return the change its children must see.
    pub(crate) fn recalc_self(
        &mut self,
        context: &mut RecalcContext,
        id: NodeId,
        change: StyleRecalcChange,
    ) -> StyleRecalcChange {
        if change.is_suppressed() {
            return change.unsuppressed();
        }

        let flags = self.nodes[id.0].flags;
        let has_style = self.style(id).is_some();
        let child_change = if change.should_recalc_style_for(flags, self.style(id).map(|s| &**s)) {
            self.recalc_own_style(context, id, change, flags)
        } else {
            let mut child_change = change.for_children();
            if flags.contains(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE) ||
                change.reattach_layout_tree()
            {
                self.mark_for_reattach(context, id);
                child_change = child_change.force_reattach_layout_tree();
            } else if !has_style && self.layout_object(id).is_some() {
                debug_assert!(false, "{:?} has a layout object but no style", id);
                warn!("{:?} has a layout object but no style", id);
                self.mark_for_reattach(context, id);
                child_change = child_change
                    .force_reattach_layout_tree()
                    .ensure_at_least(Propagate::RecalcDescendants);
            }
            child_change
        };

        self.nodes[id.0]
            .flags
            .remove(NodeFlags::NEEDS_STYLE_RECALC | NodeFlags::NEEDS_SUBTREE_STYLE_RECALC);
        child_change
    }

    /// Compute the style `id` would get now. Returns the element to resolve
    /// against, which is the owner for pseudo-elements, and the request.
    fn style_request_for(
        &self,
        context: &RecalcContext,
        id: NodeId,
    ) -> Option<(NodeId, StyleRequest)> {
        let element = self.element(id)?;
        if let Some(info) = element.pseudo() {
            let inherit_from = match info.key.kind {
                PseudoElement::FirstLetter => element
                    .rare_data()
                    .and_then(|rare_data| rare_data.first_letter_fragment())
                    .and_then(|fragment| self.flat_tree_parent(fragment.text)),
                _ => None,
            };
            return self
                .pseudo_style_request(context, info.owner, &info.key, inherit_from)
                .map(|request| (info.owner, request));
        }

        let is_root_element = self.document_element() == Some(id);
        let parent = self.flat_tree_parent(id);
        let (parent_style, layout_parent_style, root_font_size) = if is_root_element {
            (None, None, Au::from_px(INITIAL_FONT_SIZE_PX))
        } else {
            let parent_style = parent.and_then(|parent| self.style(parent)).cloned()?;
            (
                Some(parent_style),
                self.layout_parent_style(parent),
                context.root_font_size,
            )
        };
        let request = StyleRequest {
            pseudo: None,
            parent_style,
            layout_parent_style,
            root_font_size,
            container: context.query_container(),
            viewport: context.viewport,
            is_root_element,
            in_top_layer: element.in_top_layer(),
        };
        Some((id, request))
    }

    /// Patch the old style with the parent's independently inherited
    /// properties, if nothing else can have changed.
    fn try_independent_inheritance(
        &self,
        context: &RecalcContext,
        change: StyleRecalcChange,
        flags: NodeFlags,
        old_style: Option<&Arc<ComputedValues>>,
        request: &StyleRequest,
    ) -> Option<ComputedValues> {
        if !context.prefs.independent_inheritance_enabled ||
            change.propagate() != Propagate::IndependentInherit ||
            change.recalc_container_query_dependent() ||
            flags.needs_style_recalc()
        {
            return None;
        }
        let old_style = old_style?;
        let parent_style = request.parent_style.as_ref()?;
        let blockers = FastPathBlockers::for_style(old_style);
        if !blockers.is_empty() {
            trace!("Independent inheritance blocked by {:?}", blockers);
            return None;
        }
        Some(old_style.inherit_independent_properties_from(parent_style))
    }

    fn recalc_own_style(
        &mut self,
        context: &mut RecalcContext,
        id: NodeId,
        change: StyleRecalcChange,
        flags: NodeFlags,
    ) -> StyleRecalcChange {
        let old_style = self.style(id).cloned();
        let pseudo = self
            .element(id)
            .and_then(|element| element.pseudo())
            .map(|info| info.key.kind);
        let is_root_element = self.document_element() == Some(id);

        let mut resolved_fully = false;
        let new_style = match self.style_request_for(context, id) {
            None => None,
            Some((element, request)) => {
                let patched = self.try_independent_inheritance(
                    context,
                    change,
                    flags,
                    old_style.as_ref(),
                    &request,
                );
                match patched {
                    Some(patched) => {
                        context.statistics.independent_inheritance_hits += 1;
                        Some(patched)
                    },
                    None => {
                        resolved_fully = true;
                        context.statistics.styles_resolved += 1;
                        context
                            .resolver
                            .resolve_style(self, element, &request)
                            .filter(|values| match pseudo {
                                Some(pseudo) => pseudo_style_is_rendered(pseudo, values),
                                None => !values.is_display_none(),
                            })
                            .map(|mut values| {
                                if pseudo.is_none() {
                                    values.highlights = resolve_highlight_styles(
                                        context.resolver,
                                        self,
                                        id,
                                        &values,
                                        &request,
                                        context.prefs.custom_highlight_api_enabled,
                                    );
                                }
                                values
                            })
                    },
                }
            },
        };

        let new_style = match (old_style.as_ref(), new_style) {
            (Some(old), Some(new)) if **old == new => Some(old.clone()),
            (_, new) => new.map(Arc::new),
        };

        let difference = StyleDifference::compute(old_style.as_deref(), new_style.as_deref());
        trace!(
            "Restyled {:?}: {:?}, damage {}",
            id, difference.change, difference.damage
        );
        let mut child_change = change
            .for_children()
            .ensure_at_least(difference.change.propagation());
        if resolved_fully && new_style.is_some() {
            // Pseudo-element rules may have changed along with the element's.
            child_change = child_change.ensure_at_least(Propagate::UpdatePseudoElements);
        }
        if is_root_element && self.uses_rem_units {
            let old_font_size = old_style.as_ref().map(|style| style.font_size);
            let new_font_size = new_style.as_ref().map(|style| style.font_size);
            if old_font_size != new_font_size {
                debug!("Root font size changed, restyling rem users");
                child_change = child_change.ensure_at_least(Propagate::RecalcDescendants);
            }
        }

        let reattach = needs_reattach(old_style.as_deref(), new_style.as_deref()) ||
            flags.contains(NodeFlags::NEEDS_REATTACH_LAYOUT_TREE) ||
            change.reattach_layout_tree();
        if reattach {
            self.mark_for_reattach(context, id);
            child_change = child_change.force_reattach_layout_tree();
        } else if let (Some(layout), Some(style)) =
            (self.nodes[id.0].layout.as_mut(), new_style.as_ref())
        {
            layout.set_style(style.clone());
            layout.add_damage(difference.damage);
        }
        self.set_style(id, new_style.clone());

        if pseudo.is_none() {
            self.update_display_lock(context, id, new_style.as_deref());
        }
        child_change
    }

    fn update_display_lock(
        &mut self,
        context: &RecalcContext,
        id: NodeId,
        style: Option<&ComputedValues>,
    ) {
        let requested = match style {
            Some(style) if context.prefs.content_visibility_enabled => style.content_visibility,
            _ => ContentVisibility::Visible,
        };
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let transition = if requested == ContentVisibility::Visible {
            element
                .rare_data_mut()
                .and_then(|rare_data| rare_data.display_lock_mut())
                .map_or(LockTransition::Unchanged, |lock| {
                    lock.set_requested_state(requested)
                })
        } else {
            element
                .ensure_rare_data()
                .ensure_display_lock()
                .set_requested_state(requested)
        };

        match transition {
            LockTransition::Unchanged => {},
            LockTransition::Locked => debug!("{:?} locked ({:?})", id, requested),
            LockTransition::Unlocked => {
                debug!("{:?} unlocked", id);
                if self.nodes[id.0]
                    .flags
                    .contains(NodeFlags::CHILD_NEEDS_REATTACH_LAYOUT_TREE)
                {
                    self.mark_ancestors_for_reattach(id, true);
                }
            },
        }
    }

    /// Text nodes have no style of their own; their layout object follows
    /// the parent's.
    fn recalc_text(&mut self, context: &mut RecalcContext, id: NodeId, change: StyleRecalcChange) {
        if change.reattach_layout_tree() {
            self.mark_for_reattach(context, id);
            return;
        }
        let parent_style = self
            .flat_tree_parent(id)
            .and_then(|parent| self.style(parent))
            .cloned();
        let has_layout_object = self.nodes[id.0].layout.is_some();
        match parent_style {
            Some(style) if has_layout_object => {
                if let Some(layout) = self.nodes[id.0].layout.as_mut() {
                    if *layout.style() != style {
                        layout.set_style(style);
                        layout.add_damage(RestyleDamage::REPAINT);
                    }
                }
            },
            None if !has_layout_object => {},
            _ => self.mark_for_reattach(context, id),
        }
    }

    pub(crate) fn mark_for_reattach(&mut self, context: &mut RecalcContext, id: NodeId) {
        if self.set_needs_reattach(id) {
            context.statistics.reattachments += 1;
        }
    }

    /// The size containers the style pass set aside, for debugging.
    pub fn skipped_containers(&self) -> SmallVec<[NodeId; 4]> {
        self.pending_container_recalcs
            .iter()
            .copied()
            .filter(|&id| {
                self.rare_data(id)
                    .and_then(|rare_data| rare_data.container_query_data())
                    .is_some_and(|data| data.has_pending_change())
            })
            .collect()
    }
}
