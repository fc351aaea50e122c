/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Computed and specified values for the properties the style engine knows
//! about.
//!
//! Properties come in three groups, and the group decides how a change
//! propagates to descendants:
//!
//!  * non-inherited properties only affect the element itself, except for
//!    the descendant-affecting ones (`display`, `container-type`,
//!    `content-visibility`),
//!  * inherited properties are copied into every child that does not declare
//!    them,
//!  * independently inherited properties are inherited too, but nothing else
//!    reads them during the cascade, so a child can be patched in place.

use app_units::Au;
use bitflags::bitflags;
use euclid::default::Size2D;
use servo_arc::Arc;
use smallvec::SmallVec;
use string_cache::DefaultAtom as Atom;

use crate::container_query::ContainerFeatures;
use crate::highlight::HighlightStyles;
use crate::pseudo::{PseudoElement, PseudoElementBits};

/// The initial value of `font-size`, also the root font size used to resolve
/// `rem` on the root element itself.
pub const INITIAL_FONT_SIZE_PX: i32 = 16;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Display {
    None,
    Contents,
    Inline,
    Block,
    InlineBlock,
    ListItem,
    Flex,
    Grid,
}

impl Display {
    #[inline]
    pub fn is_none(self) -> bool {
        self == Display::None
    }

    #[inline]
    pub fn is_contents(self) -> bool {
        self == Display::Contents
    }

    /// Whether an element with this display value gets a layout object.
    pub fn generates_box(self) -> bool {
        !matches!(self, Display::None | Display::Contents)
    }

    pub fn is_list_item(self) -> bool {
        self == Display::ListItem
    }

    /// Whether this is a container whose children are blockified.
    pub fn is_flex_or_grid(self) -> bool {
        matches!(self, Display::Flex | Display::Grid)
    }

    /// Whether boxes of this type contain lines of text directly.
    pub fn is_block_container(self) -> bool {
        matches!(
            self,
            Display::Block | Display::ListItem | Display::InlineBlock
        )
    }

    /// Whether the box is a non-atomic inline.
    pub fn is_inline_flow(self) -> bool {
        self == Display::Inline
    }

    /// The block-level equivalent of this display value.
    ///
    /// <https://drafts.csswg.org/css-display/#blockify>
    pub fn equivalent_block_display(self, is_root_element: bool) -> Display {
        match self {
            Display::Inline | Display::InlineBlock => Display::Block,
            Display::Contents if is_root_element => Display::Block,
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Position {
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    pub fn is_out_of_flow(self) -> bool {
        matches!(self, Position::Absolute | Position::Fixed)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Visibility {
    Visible,
    Hidden,
    Collapse,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PointerEvents {
    Auto,
    None,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContainerType {
    Normal,
    Size,
    InlineSize,
}

impl ContainerType {
    pub fn is_size_container(self) -> bool {
        self != ContainerType::Normal
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContentVisibility {
    Visible,
    Auto,
    Hidden,
    /// The `hidden=until-found` state: hidden, but revealed by find-in-page.
    HiddenMatchable,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct TextDecorationLine: u8 {
        const UNDERLINE = 1 << 0;
        const OVERLINE = 1 << 1;
        const LINE_THROUGH = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ListStyleType {
    None,
    Disc,
    Decimal,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Content {
    Normal,
    None,
    String(String),
}

/// Whether the element is a hyperlink or inside one. Link colouring is
/// resolved outside the per-property pipeline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InsideLink {
    NotInside,
    Unvisited,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const LINK_TEXT: Rgba = Rgba::new(0, 0, 238, 255);

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Rgba {
            red,
            green,
            blue,
            alpha,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Size {
    Auto,
    Length(Au),
    Percentage(f32),
}

bitflags! {
    /// Facts about how a style was computed.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct ComputedValueFlags: u8 {
        /// Some value was resolved against the root font size.
        const USES_REM_UNITS = 1 << 0;
        /// Some value depends on the nearest size container.
        const DEPENDS_ON_CONTAINER_QUERIES = 1 << 1;
        /// The element is rendered in the top layer.
        const IN_TOP_LAYER = 1 << 2;
    }
}

bitflags! {
    /// The independently inherited properties.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct IndependentProperties: u8 {
        const VISIBILITY = 1 << 0;
        const POINTER_EVENTS = 1 << 1;
    }
}

/// The computed values of an element or pseudo-element.
///
/// Once published behind an `Arc` these are never mutated: a restyle always
/// produces a new value which is then diffed against the old one.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedValues {
    pub display: Display,
    pub position: Position,
    pub width: Size,
    pub height: Size,
    pub content: Content,
    pub container_type: ContainerType,
    pub content_visibility: ContentVisibility,
    pub text_decoration_line: TextDecorationLine,

    pub color: Rgba,
    pub font_size: Au,
    pub list_style_type: ListStyleType,
    /// Text decorations in effect, including the ones propagated from
    /// ancestors.
    pub applied_text_decorations: TextDecorationLine,
    pub inside_link: InsideLink,

    pub visibility: Visibility,
    pub pointer_events: PointerEvents,
    /// Independent properties that were declared on this element rather than
    /// inherited.
    pub explicitly_set: IndependentProperties,

    pub flags: ComputedValueFlags,
    /// The pseudo-element these values belong to, if any.
    pub pseudo: Option<PseudoElement>,
    /// Pseudo-elements with rules matching the originating element.
    pub pseudo_rules: PseudoElementBits,
    /// Names of the `::highlight()` rules matching the element.
    pub custom_highlight_names: SmallVec<[Atom; 1]>,
    /// Highlight pseudo-element styles, attached before publication.
    pub highlights: Option<Arc<HighlightStyles>>,
}

impl ComputedValues {
    pub fn initial() -> Self {
        ComputedValues {
            display: Display::Inline,
            position: Position::Static,
            width: Size::Auto,
            height: Size::Auto,
            content: Content::Normal,
            container_type: ContainerType::Normal,
            content_visibility: ContentVisibility::Visible,
            text_decoration_line: TextDecorationLine::empty(),
            color: Rgba::BLACK,
            font_size: Au::from_px(INITIAL_FONT_SIZE_PX),
            list_style_type: ListStyleType::Disc,
            applied_text_decorations: TextDecorationLine::empty(),
            inside_link: InsideLink::NotInside,
            visibility: Visibility::Visible,
            pointer_events: PointerEvents::Auto,
            explicitly_set: IndependentProperties::empty(),
            flags: ComputedValueFlags::empty(),
            pseudo: None,
            pseudo_rules: PseudoElementBits::empty(),
            custom_highlight_names: SmallVec::new(),
            highlights: None,
        }
    }

    /// Initial values for every non-inherited property, inherited values
    /// taken from `parent`.
    pub fn inherit_from(parent: Option<&ComputedValues>, pseudo: Option<PseudoElement>) -> Self {
        let mut values = ComputedValues::initial();
        values.pseudo = pseudo;
        if let Some(parent) = parent {
            values.color = parent.color;
            values.font_size = parent.font_size;
            values.list_style_type = parent.list_style_type;
            values.applied_text_decorations = parent.applied_text_decorations;
            values.inside_link = parent.inside_link;
            values.visibility = parent.visibility;
            values.pointer_events = parent.pointer_events;
        }
        values
    }

    /// Re-inherit the independently inherited properties that were not
    /// declared on this element.
    pub fn inherit_independent_properties_from(&self, parent: &ComputedValues) -> Self {
        let mut values = self.clone();
        if !values
            .explicitly_set
            .contains(IndependentProperties::VISIBILITY)
        {
            values.visibility = parent.visibility;
        }
        if !values
            .explicitly_set
            .contains(IndependentProperties::POINTER_EVENTS)
        {
            values.pointer_events = parent.pointer_events;
        }
        values
    }

    #[inline]
    pub fn is_display_none(&self) -> bool {
        self.display.is_none()
    }

    #[inline]
    pub fn is_size_container(&self) -> bool {
        self.container_type.is_size_container()
    }

    #[inline]
    pub fn is_out_of_flow_positioned(&self) -> bool {
        self.position.is_out_of_flow()
    }

    pub fn uses_rem_units(&self) -> bool {
        self.flags.contains(ComputedValueFlags::USES_REM_UNITS)
    }

    pub fn depends_on_container_queries(&self) -> bool {
        self.flags
            .contains(ComputedValueFlags::DEPENDS_ON_CONTAINER_QUERIES)
    }

    pub fn in_top_layer(&self) -> bool {
        self.flags.contains(ComputedValueFlags::IN_TOP_LAYER)
    }

    pub fn has_pseudo_rules(&self, pseudo: PseudoElement) -> bool {
        self.pseudo_rules.contains(pseudo.bit())
    }

    /// The text a generated box renders from `content`, if any.
    pub fn generated_text(&self) -> Option<&str> {
        match self.content {
            Content::String(ref text) => Some(text),
            _ => None,
        }
    }
}

/// A length as written in a declaration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpecifiedLength {
    Px(f32),
    Em(f32),
    Rem(f32),
    /// Percentage of the nearest size container's width.
    Cqw(f32),
    /// Percentage of the nearest size container's height.
    Cqh(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpecifiedSize {
    Auto,
    Length(SpecifiedLength),
    Percentage(f32),
}

/// What relative units resolve against while cascading one element.
#[derive(Clone, Copy, Debug)]
pub struct LengthContext<'a> {
    pub root_font_size: Au,
    pub container: Option<&'a ContainerFeatures>,
    pub viewport: Size2D<Au>,
}

impl SpecifiedLength {
    /// Resolve to an absolute length. `em_base` is the font size `em`
    /// resolves against, which is the parent's for `font-size` itself.
    pub fn to_computed(
        self,
        em_base: Au,
        context: &LengthContext,
        flags: &mut ComputedValueFlags,
    ) -> Au {
        let scale = |base: Au, factor: f32| Au::from_f32_px(base.to_f32_px() * factor);
        match self {
            SpecifiedLength::Px(px) => Au::from_f32_px(px),
            SpecifiedLength::Em(em) => scale(em_base, em),
            SpecifiedLength::Rem(rem) => {
                flags.insert(ComputedValueFlags::USES_REM_UNITS);
                scale(context.root_font_size, rem)
            },
            SpecifiedLength::Cqw(percent) => {
                flags.insert(ComputedValueFlags::DEPENDS_ON_CONTAINER_QUERIES);
                let width = context
                    .container
                    .and_then(|container| container.width)
                    .unwrap_or(context.viewport.width);
                scale(width, percent / 100.)
            },
            SpecifiedLength::Cqh(percent) => {
                flags.insert(ComputedValueFlags::DEPENDS_ON_CONTAINER_QUERIES);
                let height = context
                    .container
                    .and_then(|container| container.height)
                    .unwrap_or(context.viewport.height);
                scale(height, percent / 100.)
            },
        }
    }
}

impl SpecifiedSize {
    pub fn to_computed(
        self,
        em_base: Au,
        context: &LengthContext,
        flags: &mut ComputedValueFlags,
    ) -> Size {
        match self {
            SpecifiedSize::Auto => Size::Auto,
            SpecifiedSize::Length(length) => {
                Size::Length(length.to_computed(em_base, context, flags))
            },
            SpecifiedSize::Percentage(percentage) => Size::Percentage(percentage),
        }
    }
}

/// A single declaration of a rule.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyDeclaration {
    Display(Display),
    Position(Position),
    Width(SpecifiedSize),
    Height(SpecifiedSize),
    Content(Content),
    ContainerType(ContainerType),
    ContentVisibility(ContentVisibility),
    TextDecorationLine(TextDecorationLine),
    Color(Rgba),
    FontSize(SpecifiedLength),
    ListStyleType(ListStyleType),
    Visibility(Visibility),
    PointerEvents(PointerEvents),
}

impl PropertyDeclaration {
    /// `font-size` is cascaded before everything else since `em` depends on
    /// it.
    pub fn is_early(&self) -> bool {
        matches!(*self, PropertyDeclaration::FontSize(..))
    }

    /// Apply this declaration to `values`. Font-relative units resolve
    /// against `values.font_size`, so early declarations must be applied
    /// first.
    pub fn apply(
        &self,
        values: &mut ComputedValues,
        parent_font_size: Au,
        context: &LengthContext,
    ) {
        let font_size = values.font_size;
        match *self {
            PropertyDeclaration::Display(display) => values.display = display,
            PropertyDeclaration::Position(position) => values.position = position,
            PropertyDeclaration::Width(width) => {
                values.width = width.to_computed(font_size, context, &mut values.flags)
            },
            PropertyDeclaration::Height(height) => {
                values.height = height.to_computed(font_size, context, &mut values.flags)
            },
            PropertyDeclaration::Content(ref content) => values.content = content.clone(),
            PropertyDeclaration::ContainerType(container_type) => {
                values.container_type = container_type
            },
            PropertyDeclaration::ContentVisibility(content_visibility) => {
                values.content_visibility = content_visibility
            },
            PropertyDeclaration::TextDecorationLine(line) => values.text_decoration_line = line,
            PropertyDeclaration::Color(color) => values.color = color,
            PropertyDeclaration::FontSize(length) => {
                values.font_size = length.to_computed(parent_font_size, context, &mut values.flags)
            },
            PropertyDeclaration::ListStyleType(list_style_type) => {
                values.list_style_type = list_style_type
            },
            PropertyDeclaration::Visibility(visibility) => {
                values.visibility = visibility;
                values
                    .explicitly_set
                    .insert(IndependentProperties::VISIBILITY);
            },
            PropertyDeclaration::PointerEvents(pointer_events) => {
                values.pointer_events = pointer_events;
                values
                    .explicitly_set
                    .insert(IndependentProperties::POINTER_EVENTS);
            },
        }
    }
}
