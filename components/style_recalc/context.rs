/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The context within which style is recalculated.

use std::fmt;
use std::ops::AddAssign;

use app_units::Au;
use euclid::default::Size2D;
use log::info;
use smallvec::SmallVec;

use crate::container_query::ContainerFeatures;
use crate::dom::{Document, NodeId};
use crate::prefs::Preferences;
use crate::properties::INITIAL_FONT_SIZE_PX;
use crate::resolver::StyleResolver;

/// Counters collected over one style pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RecalcStatistics {
    /// Elements visited, dirty or not.
    pub elements_traversed: u32,
    /// Calls into the style resolver for elements and pseudo-elements.
    pub styles_resolved: u32,
    /// Styles produced by re-inheriting independent properties.
    pub independent_inheritance_hits: u32,
    /// Nodes newly marked for layout object reconstruction.
    pub reattachments: u32,
    pub pseudo_elements_created: u32,
    pub pseudo_elements_removed: u32,
    /// Elements whose children were left alone because of a display lock.
    pub blocked_by_display_lock: u32,
    /// Size containers whose descendants were set aside until layout.
    pub containers_skipped: u32,
    /// Size containers whose descendants were restyled after layout.
    pub containers_resumed: u32,
}

impl AddAssign for RecalcStatistics {
    fn add_assign(&mut self, other: Self) {
        self.elements_traversed += other.elements_traversed;
        self.styles_resolved += other.styles_resolved;
        self.independent_inheritance_hits += other.independent_inheritance_hits;
        self.reattachments += other.reattachments;
        self.pseudo_elements_created += other.pseudo_elements_created;
        self.pseudo_elements_removed += other.pseudo_elements_removed;
        self.blocked_by_display_lock += other.blocked_by_display_lock;
        self.containers_skipped += other.containers_skipped;
        self.containers_resumed += other.containers_resumed;
    }
}

impl fmt::Display for RecalcStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[PERF] style recalc block start")?;
        writeln!(f, "[PERF],elements_traversed,{}", self.elements_traversed)?;
        writeln!(f, "[PERF],styles_resolved,{}", self.styles_resolved)?;
        writeln!(
            f,
            "[PERF],independent_inheritance_hits,{}",
            self.independent_inheritance_hits
        )?;
        writeln!(f, "[PERF],reattachments,{}", self.reattachments)?;
        writeln!(
            f,
            "[PERF],pseudo_elements_created,{}",
            self.pseudo_elements_created
        )?;
        writeln!(
            f,
            "[PERF],pseudo_elements_removed,{}",
            self.pseudo_elements_removed
        )?;
        writeln!(
            f,
            "[PERF],blocked_by_display_lock,{}",
            self.blocked_by_display_lock
        )?;
        writeln!(f, "[PERF],containers_skipped,{}", self.containers_skipped)?;
        writeln!(f, "[PERF],containers_resumed,{}", self.containers_resumed)?;
        write!(f, "[PERF] style recalc block end")
    }
}

/// State shared by every step of one style pass.
///
/// Nothing here outlives the pass: the document keeps the results, the
/// context keeps what the traversal needs to know about where it is.
pub struct RecalcContext<'a> {
    pub(crate) resolver: &'a dyn StyleResolver,
    pub(crate) prefs: Preferences,
    pub(crate) viewport: Size2D<Au>,
    /// The root element's font size, updated as soon as the root is
    /// restyled.
    pub(crate) root_font_size: Au,
    /// Features of the size containers enclosing the element being visited,
    /// innermost last.
    containers: SmallVec<[ContainerFeatures; 4]>,
    /// The size container whose descendants this pass resumes, which must
    /// not be skipped again.
    pub(crate) resuming_container: Option<NodeId>,
    pub statistics: RecalcStatistics,
}

impl<'a> RecalcContext<'a> {
    pub fn new(resolver: &'a dyn StyleResolver, document: &Document) -> Self {
        let root_font_size = document
            .document_element()
            .and_then(|root| document.style(root))
            .map_or(Au::from_px(INITIAL_FONT_SIZE_PX), |style| style.font_size);
        RecalcContext {
            resolver,
            prefs: document.preferences().clone(),
            viewport: document.viewport(),
            root_font_size,
            containers: SmallVec::new(),
            resuming_container: None,
            statistics: RecalcStatistics::default(),
        }
    }

    pub fn nearest_container(&self) -> Option<&ContainerFeatures> {
        self.containers.last()
    }

    /// The container a style request should evaluate `@container` rules and
    /// container-relative units against.
    pub(crate) fn query_container(&self) -> Option<ContainerFeatures> {
        if !self.prefs.container_queries_enabled {
            return None;
        }
        self.nearest_container().copied()
    }

    pub(crate) fn push_container(&mut self, features: ContainerFeatures) {
        self.containers.push(features);
    }

    pub(crate) fn pop_container(&mut self) {
        self.containers.pop();
    }

    /// End the pass, returning its statistics.
    pub fn finish(self) -> RecalcStatistics {
        debug_assert!(self.containers.is_empty());
        if self.prefs.dump_style_statistics {
            info!("{}", self.statistics);
        }
        self.statistics
    }
}
