/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Preferences that gate optional parts of the style engine.
//!
//! Every document carries its own copy. Keys use the same dotted names as the
//! rest of the engine's preferences so a JSON prefs file can be shared.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CONTAINER_QUERIES_ENABLED: &str = "layout.css.container-queries.enabled";
pub const CONTENT_VISIBILITY_ENABLED: &str = "layout.css.content-visibility.enabled";
pub const SKIP_CONTAINER_STYLE_RECALC: &str = "layout.css.container-queries.skip-style-recalc";
pub const INDEPENDENT_INHERITANCE_ENABLED: &str = "layout.css.independent-inheritance.enabled";
pub const CUSTOM_HIGHLIGHT_API_ENABLED: &str = "dom.customHighlightAPI.enabled";
pub const VIEW_TRANSITIONS_ENABLED: &str = "dom.viewTransitions.enabled";
pub const DUMP_STYLE_STATISTICS: &str = "layout.style.dump-statistics";
pub const MAX_LIFECYCLE_ITERATIONS: &str = "layout.lifecycle.max-iterations";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Preferences {
    /// Evaluate `@container` conditions and track size containers.
    #[serde(rename = "layout.css.container-queries.enabled")]
    pub container_queries_enabled: bool,

    /// Honour `content-visibility` and `hidden=until-found` locks.
    #[serde(rename = "layout.css.content-visibility.enabled")]
    pub content_visibility_enabled: bool,

    /// Defer styling the inside of size containers until their size is known.
    #[serde(rename = "layout.css.container-queries.skip-style-recalc")]
    pub skip_container_style_recalc: bool,

    /// Clone-and-patch styles when a parent only changed independently
    /// inherited properties.
    #[serde(rename = "layout.css.independent-inheritance.enabled")]
    pub independent_inheritance_enabled: bool,

    /// Resolve `::highlight(name)` styles.
    #[serde(rename = "dom.customHighlightAPI.enabled")]
    pub custom_highlight_api_enabled: bool,

    /// Generate `::view-transition-group(name)` pseudo-elements.
    #[serde(rename = "dom.viewTransitions.enabled")]
    pub view_transitions_enabled: bool,

    /// Log the statistics of every style pass at `info` level.
    #[serde(rename = "layout.style.dump-statistics")]
    pub dump_style_statistics: bool,

    /// Upper bound on the style/layout-tree rounds of a single lifecycle
    /// update.
    #[serde(rename = "layout.lifecycle.max-iterations")]
    pub max_lifecycle_iterations: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            container_queries_enabled: true,
            content_visibility_enabled: true,
            skip_container_style_recalc: false,
            independent_inheritance_enabled: true,
            custom_highlight_api_enabled: true,
            view_transitions_enabled: true,
            dump_style_statistics: false,
            max_lifecycle_iterations: 4,
        }
    }
}

impl Preferences {
    /// Parse preferences from a JSON object. Missing keys keep their default
    /// value.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a boolean preference by name. Unknown names read as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        match key {
            CONTAINER_QUERIES_ENABLED => self.container_queries_enabled,
            CONTENT_VISIBILITY_ENABLED => self.content_visibility_enabled,
            SKIP_CONTAINER_STYLE_RECALC => self.skip_container_style_recalc,
            INDEPENDENT_INHERITANCE_ENABLED => self.independent_inheritance_enabled,
            CUSTOM_HIGHLIGHT_API_ENABLED => self.custom_highlight_api_enabled,
            VIEW_TRANSITIONS_ENABLED => self.view_transitions_enabled,
            DUMP_STYLE_STATISTICS => self.dump_style_statistics,
            _ => false,
        }
    }

    /// Set a boolean preference by name. Returns whether the name was known.
    pub fn set_bool(&mut self, key: &str, value: bool) -> bool {
        let pref = match key {
            CONTAINER_QUERIES_ENABLED => &mut self.container_queries_enabled,
            CONTENT_VISIBILITY_ENABLED => &mut self.content_visibility_enabled,
            SKIP_CONTAINER_STYLE_RECALC => &mut self.skip_container_style_recalc,
            INDEPENDENT_INHERITANCE_ENABLED => &mut self.independent_inheritance_enabled,
            CUSTOM_HIGHLIGHT_API_ENABLED => &mut self.custom_highlight_api_enabled,
            VIEW_TRANSITIONS_ENABLED => &mut self.view_transitions_enabled,
            DUMP_STYLE_STATISTICS => &mut self.dump_style_statistics,
            _ => return false,
        };
        *pref = value;
        true
    }
}
