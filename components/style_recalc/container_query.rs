/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Size container queries.
//!
//! Every size container owns a [`ContainerQueryEvaluator`] caching the
//! features its descendants were last styled against. When the features
//! change, descendants whose style depends on a container condition are
//! restyled.

use app_units::Au;

use crate::properties::ContainerType;
use crate::recalc_change::StyleRecalcChange;

/// The values container conditions are evaluated against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerFeatures {
    pub container_type: ContainerType,
    /// Known once layout has sized the container, and only for containers
    /// with inline-size containment.
    pub width: Option<Au>,
    /// Known once layout has sized the container, and only for containers
    /// with size containment in both axes.
    pub height: Option<Au>,
    pub font_size: Au,
    pub root_font_size: Au,
}

impl ContainerFeatures {
    pub fn new(
        container_type: ContainerType,
        size: Option<(Au, Au)>,
        font_size: Au,
        root_font_size: Au,
    ) -> Self {
        let width = match container_type {
            ContainerType::Size | ContainerType::InlineSize => size.map(|size| size.0),
            ContainerType::Normal => None,
        };
        let height = match container_type {
            ContainerType::Size => size.map(|size| size.1),
            _ => None,
        };
        ContainerFeatures {
            container_type,
            width,
            height,
            font_size,
            root_font_size,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeFeature {
    Width,
    Height,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

/// A length inside a container condition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryLength {
    Px(f32),
    /// Relative to the container's font size.
    Em(f32),
    Rem(f32),
}

impl QueryLength {
    fn to_au(self, features: &ContainerFeatures) -> Au {
        match self {
            QueryLength::Px(px) => Au::from_f32_px(px),
            QueryLength::Em(em) => Au::from_f32_px(features.font_size.to_f32_px() * em),
            QueryLength::Rem(rem) => Au::from_f32_px(features.root_font_size.to_f32_px() * rem),
        }
    }
}

/// The condition of an `@container` rule.
#[derive(Clone, Debug, PartialEq)]
pub enum ContainerCondition {
    Feature {
        feature: SizeFeature,
        comparison: Comparison,
        value: QueryLength,
    },
    Not(Box<ContainerCondition>),
    And(Vec<ContainerCondition>),
    Or(Vec<ContainerCondition>),
}

impl ContainerCondition {
    /// `(min-width: <px>)`
    pub fn min_width(px: f32) -> Self {
        ContainerCondition::Feature {
            feature: SizeFeature::Width,
            comparison: Comparison::GreaterOrEqual,
            value: QueryLength::Px(px),
        }
    }

    /// `(max-width: <px>)`
    pub fn max_width(px: f32) -> Self {
        ContainerCondition::Feature {
            feature: SizeFeature::Width,
            comparison: Comparison::LessOrEqual,
            value: QueryLength::Px(px),
        }
    }

    /// `(min-height: <px>)`
    pub fn min_height(px: f32) -> Self {
        ContainerCondition::Feature {
            feature: SizeFeature::Height,
            comparison: Comparison::GreaterOrEqual,
            value: QueryLength::Px(px),
        }
    }

    /// Evaluate the condition. A feature whose value is not known yet never
    /// matches, and neither does its negation.
    pub fn matches(&self, features: &ContainerFeatures) -> bool {
        self.evaluate(features).unwrap_or(false)
    }

    fn evaluate(&self, features: &ContainerFeatures) -> Option<bool> {
        match *self {
            ContainerCondition::Feature {
                feature,
                comparison,
                value,
            } => {
                let actual = match feature {
                    SizeFeature::Width => features.width?,
                    SizeFeature::Height => features.height?,
                };
                let expected = value.to_au(features);
                Some(match comparison {
                    Comparison::Less => actual < expected,
                    Comparison::LessOrEqual => actual <= expected,
                    Comparison::Equal => actual == expected,
                    Comparison::GreaterOrEqual => actual >= expected,
                    Comparison::Greater => actual > expected,
                })
            },
            ContainerCondition::Not(ref inner) => inner.evaluate(features).map(|result| !result),
            ContainerCondition::And(ref conditions) => {
                let mut result = Some(true);
                for condition in conditions {
                    match condition.evaluate(features) {
                        Some(false) => return Some(false),
                        Some(true) => {},
                        None => result = None,
                    }
                }
                result
            },
            ContainerCondition::Or(ref conditions) => {
                let mut result = Some(false);
                for condition in conditions {
                    match condition.evaluate(features) {
                        Some(true) => return Some(true),
                        Some(false) => {},
                        None => result = None,
                    }
                }
                result
            },
        }
    }
}

/// Whether refreshing a container's features invalidated its dependents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContainerChange {
    None,
    NearestContainer,
}

#[derive(Debug, Default)]
pub struct ContainerQueryEvaluator {
    features: Option<ContainerFeatures>,
}

impl ContainerQueryEvaluator {
    /// Store `features`, reporting whether they differ from the ones the
    /// descendants were styled against.
    pub fn update_values_if_needed(&mut self, features: ContainerFeatures) -> ContainerChange {
        if self.features.as_ref() == Some(&features) {
            return ContainerChange::None;
        }
        self.features = Some(features);
        ContainerChange::NearestContainer
    }

    pub fn evaluate(&self, condition: &ContainerCondition) -> bool {
        self.features
            .as_ref()
            .is_some_and(|features| condition.matches(features))
    }

    pub fn features(&self) -> Option<&ContainerFeatures> {
        self.features.as_ref()
    }
}

/// Container state kept in an element's rare data.
#[derive(Debug, Default)]
pub struct ContainerQueryData {
    evaluator: ContainerQueryEvaluator,
    /// Work for the container's descendants set aside until its size is
    /// known.
    pending_change: Option<StyleRecalcChange>,
}

impl ContainerQueryData {
    pub fn evaluator(&self) -> &ContainerQueryEvaluator {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut ContainerQueryEvaluator {
        &mut self.evaluator
    }

    pub fn has_pending_change(&self) -> bool {
        self.pending_change.is_some()
    }

    pub(crate) fn defer_change(&mut self, change: StyleRecalcChange) {
        self.pending_change = Some(match self.pending_change {
            Some(pending) => pending.combine(change),
            None => change,
        });
    }

    pub(crate) fn take_pending_change(&mut self) -> Option<StyleRecalcChange> {
        self.pending_change.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recalc_change::Propagate;

    fn features(width: i32, height: i32) -> ContainerFeatures {
        ContainerFeatures::new(
            ContainerType::Size,
            Some((Au::from_px(width), Au::from_px(height))),
            Au::from_px(10),
            Au::from_px(16),
        )
    }

    #[test]
    fn unknown_size_never_matches() {
        let unsized_container =
            ContainerFeatures::new(ContainerType::InlineSize, None, Au::from_px(16), Au::from_px(16));
        assert!(!ContainerCondition::min_width(0.).matches(&unsized_container));
        assert!(
            !ContainerCondition::Not(Box::new(ContainerCondition::min_width(0.)))
                .matches(&unsized_container)
        );
    }

    #[test]
    fn inline_size_containers_have_no_height() {
        let inline = ContainerFeatures::new(
            ContainerType::InlineSize,
            Some((Au::from_px(300), Au::from_px(200))),
            Au::from_px(16),
            Au::from_px(16),
        );
        assert!(ContainerCondition::min_width(300.).matches(&inline));
        assert!(!ContainerCondition::min_height(1.).matches(&inline));
    }

    #[test]
    fn boolean_combinators() {
        let wide = features(600, 100);
        let condition = ContainerCondition::And(vec![
            ContainerCondition::min_width(500.),
            ContainerCondition::Feature {
                feature: SizeFeature::Height,
                comparison: Comparison::Less,
                value: QueryLength::Em(20.),
            },
        ]);
        assert!(condition.matches(&wide));
        assert!(!condition.matches(&features(400, 100)));
        let either = ContainerCondition::Or(vec![
            ContainerCondition::max_width(100.),
            ContainerCondition::Feature {
                feature: SizeFeature::Width,
                comparison: Comparison::Equal,
                value: QueryLength::Rem(37.5),
            },
        ]);
        assert!(either.matches(&wide));
    }

    #[test]
    fn evaluator_reports_changes_once() {
        let mut evaluator = ContainerQueryEvaluator::default();
        assert!(!evaluator.evaluate(&ContainerCondition::min_width(0.)));
        assert_eq!(
            evaluator.update_values_if_needed(features(100, 100)),
            ContainerChange::NearestContainer
        );
        assert_eq!(
            evaluator.update_values_if_needed(features(100, 100)),
            ContainerChange::None
        );
        assert!(evaluator.evaluate(&ContainerCondition::min_width(100.)));
    }

    #[test]
    fn deferred_changes_accumulate() {
        let mut data = ContainerQueryData::default();
        data.defer_change(StyleRecalcChange::new(Propagate::RecalcChildren));
        data.defer_change(StyleRecalcChange::default().force_reattach_layout_tree());
        let pending = data.take_pending_change().unwrap();
        assert_eq!(pending.propagate(), Propagate::RecalcChildren);
        assert!(pending.reattach_layout_tree());
        assert!(!data.has_pending_change());
    }
}
