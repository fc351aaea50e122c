/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-element state that most elements never need.

use smallvec::SmallVec;

use crate::container_query::ContainerQueryData;
use crate::display_lock::DisplayLockContext;
use crate::dom::NodeId;
use crate::pseudo::{FirstLetterFragment, PseudoKey};

/// Allocated the first time an element needs any of it. Missing rare data
/// means none of these features are in use.
#[derive(Debug, Default)]
pub struct ElementRareData {
    pseudo_elements: SmallVec<[(PseudoKey, NodeId); 2]>,
    container_query_data: Option<Box<ContainerQueryData>>,
    display_lock: Option<Box<DisplayLockContext>>,
    /// Only set on `::first-letter` pseudo-elements.
    first_letter_fragment: Option<FirstLetterFragment>,
}

impl ElementRareData {
    pub fn pseudo_element(&self, key: &PseudoKey) -> Option<NodeId> {
        self.pseudo_elements
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|&(_, id)| id)
    }

    pub fn pseudo_elements(&self) -> impl Iterator<Item = (&PseudoKey, NodeId)> {
        self.pseudo_elements.iter().map(|(key, id)| (key, *id))
    }

    pub fn pseudo_element_count(&self) -> usize {
        self.pseudo_elements.len()
    }

    pub(crate) fn set_pseudo_element(&mut self, key: PseudoKey, pseudo: NodeId) {
        debug_assert!(self.pseudo_element(&key).is_none());
        self.pseudo_elements.push((key, pseudo));
    }

    pub(crate) fn remove_pseudo_element(&mut self, key: &PseudoKey) -> Option<NodeId> {
        let index = self
            .pseudo_elements
            .iter()
            .position(|(existing, _)| existing == key)?;
        Some(self.pseudo_elements.remove(index).1)
    }

    pub(crate) fn take_pseudo_elements(&mut self) -> SmallVec<[(PseudoKey, NodeId); 2]> {
        std::mem::take(&mut self.pseudo_elements)
    }

    pub fn container_query_data(&self) -> Option<&ContainerQueryData> {
        self.container_query_data.as_deref()
    }

    pub(crate) fn container_query_data_mut(&mut self) -> Option<&mut ContainerQueryData> {
        self.container_query_data.as_deref_mut()
    }

    pub(crate) fn ensure_container_query_data(&mut self) -> &mut ContainerQueryData {
        self.container_query_data.get_or_insert_with(Default::default)
    }

    pub(crate) fn take_container_query_data(&mut self) -> Option<Box<ContainerQueryData>> {
        self.container_query_data.take()
    }

    pub fn display_lock(&self) -> Option<&DisplayLockContext> {
        self.display_lock.as_deref()
    }

    pub(crate) fn display_lock_mut(&mut self) -> Option<&mut DisplayLockContext> {
        self.display_lock.as_deref_mut()
    }

    pub(crate) fn ensure_display_lock(&mut self) -> &mut DisplayLockContext {
        self.display_lock.get_or_insert_with(Default::default)
    }

    pub fn first_letter_fragment(&self) -> Option<&FirstLetterFragment> {
        self.first_letter_fragment.as_ref()
    }

    pub(crate) fn set_first_letter_fragment(&mut self, fragment: FirstLetterFragment) {
        self.first_letter_fragment = Some(fragment);
    }
}
