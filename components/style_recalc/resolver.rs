/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The seam between the recalculation engine and whatever turns rules into
//! computed values.

use app_units::Au;
use euclid::default::Size2D;
use servo_arc::Arc;

use crate::container_query::ContainerFeatures;
use crate::dom::{Document, NodeId};
use crate::properties::ComputedValues;
use crate::pseudo::PseudoKey;

/// Everything besides the element itself that resolution depends on.
#[derive(Clone, Debug)]
pub struct StyleRequest {
    /// The pseudo-element to resolve, `None` for the element itself.
    pub pseudo: Option<PseudoKey>,
    /// The style inherited from.
    pub parent_style: Option<Arc<ComputedValues>>,
    /// The style of the box the result will be laid out in, which skips
    /// `display: contents` ancestors.
    pub layout_parent_style: Option<Arc<ComputedValues>>,
    /// What `rem` resolves against.
    pub root_font_size: Au,
    /// The nearest enclosing size container.
    pub container: Option<ContainerFeatures>,
    pub viewport: Size2D<Au>,
    pub is_root_element: bool,
    pub in_top_layer: bool,
}

/// Computes styles for elements and pseudo-elements.
///
/// Implementations must be pure given their inputs: the engine assumes that
/// resolving the same element against the same request twice gives equal
/// values.
pub trait StyleResolver {
    /// Resolve the style of `element`, or of one of its pseudo-elements when
    /// `request.pseudo` is set. Returns `None` when a pseudo-element has
    /// nothing to generate.
    fn resolve_style(
        &self,
        document: &Document,
        element: NodeId,
        request: &StyleRequest,
    ) -> Option<ComputedValues>;
}
