/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A struct to encapsulate all the style fixups a computed style needs in order
//! for it to adhere to the CSS spec.

use crate::properties::{ComputedValueFlags, ComputedValues, ContainerType, Display, Position};
use crate::pseudo::PseudoElement;

/// An unsized struct that implements all the adjustment methods.
pub struct StyleAdjuster<'a> {
    style: &'a mut ComputedValues,
    is_root_element: bool,
}

impl<'a> StyleAdjuster<'a> {
    /// Trivially constructs a new StyleAdjuster.
    pub fn new(style: &'a mut ComputedValues, is_root_element: bool) -> Self {
        StyleAdjuster {
            style,
            is_root_element,
        }
    }

    /// <https://fullscreen.spec.whatwg.org/#new-stacking-layer>
    ///
    ///    Any position value other than 'absolute' and 'fixed' are
    ///    computed to 'absolute' if the element is in a top layer.
    ///
    fn adjust_for_top_layer(&mut self, in_top_layer: bool) {
        if !in_top_layer {
            return;
        }
        self.style.flags.insert(ComputedValueFlags::IN_TOP_LAYER);
        if !self.style.is_out_of_flow_positioned() {
            self.style.position = Position::Absolute;
        }
    }

    /// Apply the blockification rules based on the table in CSS 2.2 section 9.7.
    /// <https://drafts.csswg.org/css2/visuren.html#dis-pos-flo>
    fn blockify_if_necessary(
        &mut self,
        layout_parent_style: Option<&ComputedValues>,
        pseudo: Option<PseudoElement>,
    ) {
        if matches!(
            pseudo,
            Some(PseudoElement::Marker) | Some(PseudoElement::FirstLetter)
        ) {
            return;
        }

        let mut blockify = false;
        macro_rules! blockify_if {
            ($if_what:expr) => {
                if !blockify {
                    blockify = $if_what;
                }
            };
        }

        blockify_if!(self.is_root_element);
        blockify_if!(layout_parent_style.is_some_and(|parent| parent.display.is_flex_or_grid()));
        blockify_if!(self.style.is_out_of_flow_positioned());

        if !blockify {
            return;
        }

        let display = self.style.display;
        let blockified_display = display.equivalent_block_display(self.is_root_element);
        if display != blockified_display {
            self.style.display = blockified_display;
        }
    }

    /// <https://drafts.csswg.org/css-contain-3/#containment-inline-size>
    ///
    /// Size containment has no effect on non-atomic inline boxes, so they
    /// do not become size containers.
    fn adjust_for_containment(&mut self) {
        if self.style.container_type != ContainerType::Normal &&
            self.style.display.is_inline_flow()
        {
            self.style.container_type = ContainerType::Normal;
        }
    }

    /// Fixed layout of the boxes of the pseudo-elements that have one.
    fn adjust_for_pseudo_element(&mut self, pseudo: Option<PseudoElement>) {
        match pseudo {
            Some(PseudoElement::Backdrop) => {
                // <https://fullscreen.spec.whatwg.org/#user-agent-level-style-sheet-defaults>
                self.style.display = Display::Block;
                self.style.position = Position::Fixed;
            },
            Some(PseudoElement::Marker) | Some(PseudoElement::FirstLetter) => {
                if !self.style.is_display_none() {
                    self.style.display = Display::Inline;
                }
                self.style.position = Position::Static;
            },
            Some(PseudoElement::ViewTransitionGroup) => {
                self.style.display = Display::Block;
                self.style.position = Position::Absolute;
            },
            _ => {},
        }
    }

    /// Adjusts the style to account for various fixups that don't fit
    /// naturally into the cascade.
    pub fn adjust(
        &mut self,
        layout_parent_style: Option<&ComputedValues>,
        in_top_layer: bool,
        pseudo: Option<PseudoElement>,
    ) {
        self.adjust_for_top_layer(in_top_layer);
        self.adjust_for_pseudo_element(pseudo);
        self.blockify_if_necessary(layout_parent_style, pseudo);
        self.adjust_for_containment();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_and_flex_items_are_blockified() {
        let mut style = ComputedValues::initial();
        StyleAdjuster::new(&mut style, true).adjust(None, false, None);
        assert_eq!(style.display, Display::Block);

        let mut flex = ComputedValues::initial();
        flex.display = Display::Flex;
        let mut item = ComputedValues::initial();
        item.display = Display::InlineBlock;
        StyleAdjuster::new(&mut item, false).adjust(Some(&flex), false, None);
        assert_eq!(item.display, Display::Block);

        let mut contents = ComputedValues::initial();
        contents.display = Display::Contents;
        StyleAdjuster::new(&mut contents, false).adjust(Some(&flex), false, None);
        assert_eq!(contents.display, Display::Contents);
    }

    #[test]
    fn top_layer_is_out_of_flow() {
        let mut style = ComputedValues::initial();
        StyleAdjuster::new(&mut style, false).adjust(None, true, None);
        assert!(style.in_top_layer());
        assert_eq!(style.position, Position::Absolute);
        assert_eq!(style.display, Display::Block);
    }

    #[test]
    fn inline_boxes_are_not_size_containers() {
        let mut style = ComputedValues::initial();
        style.container_type = ContainerType::InlineSize;
        StyleAdjuster::new(&mut style, false).adjust(None, false, None);
        assert_eq!(style.container_type, ContainerType::Normal);

        style.display = Display::InlineBlock;
        style.container_type = ContainerType::Size;
        StyleAdjuster::new(&mut style, false).adjust(None, false, None);
        assert!(style.is_size_container());
    }

    #[test]
    fn markers_stay_inline() {
        let mut flex = ComputedValues::initial();
        flex.display = Display::Flex;
        let mut marker = ComputedValues::initial();
        StyleAdjuster::new(&mut marker, false).adjust(Some(&flex), false, Some(PseudoElement::Marker));
        assert_eq!(marker.display, Display::Inline);
    }
}
