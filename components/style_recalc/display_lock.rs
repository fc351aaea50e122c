/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Display locks, which keep the style engine out of subtrees that are not
//! rendered right now (`content-visibility` and `hidden=until-found`).
//!
//! While a lock blocks, the change that would have been handed to the
//! element's children is recorded and replayed once the lock is released.

use bitflags::bitflags;
use log::debug;

use crate::properties::ContentVisibility;
use crate::recalc_change::StyleRecalcChange;

bitflags! {
    /// Why a locked subtree is being asked to render.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct ActivationReasons: u8 {
        const FIND_IN_PAGE = 1 << 0;
        const SCROLL_INTO_VIEW = 1 << 1;
        const ACCESSIBILITY = 1 << 2;
        const SELECTION = 1 << 3;
        const VIEWPORT = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockState {
    Unlocked,
    Locked,
}

/// The outcome of updating a lock's requested state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockTransition {
    Unchanged,
    Locked,
    Unlocked,
}

#[derive(Debug)]
pub struct DisplayLockContext {
    state: LockState,
    requested: ContentVisibility,
    activatable: ActivationReasons,
    /// Whether the element intersects the viewport, for
    /// `content-visibility: auto`.
    is_onscreen: bool,
    /// An activation keeps an `auto` lock open while offscreen.
    is_activated: bool,
    deferred_change: Option<StyleRecalcChange>,
}

impl Default for DisplayLockContext {
    fn default() -> Self {
        DisplayLockContext {
            state: LockState::Unlocked,
            requested: ContentVisibility::Visible,
            activatable: ActivationReasons::empty(),
            is_onscreen: false,
            is_activated: false,
            deferred_change: None,
        }
    }
}

impl DisplayLockContext {
    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    pub fn requested_state(&self) -> ContentVisibility {
        self.requested
    }

    pub fn should_style_children(&self) -> bool {
        !self.is_locked()
    }

    pub fn is_activatable(&self, reason: ActivationReasons) -> bool {
        self.activatable.intersects(reason)
    }

    pub fn has_deferred_change(&self) -> bool {
        self.deferred_change.is_some()
    }

    /// Record work that could not be done below the locked element.
    pub fn notify_child_recalc_blocked(&mut self, change: StyleRecalcChange) {
        self.deferred_change = Some(match self.deferred_change {
            Some(deferred) => deferred.combine(change),
            None => change,
        });
    }

    /// Hand back everything recorded while the lock was blocking.
    pub fn take_deferred_change(&mut self) -> StyleRecalcChange {
        self.deferred_change.take().unwrap_or_default()
    }

    /// Follow the element's `content-visibility`.
    pub(crate) fn set_requested_state(&mut self, requested: ContentVisibility) -> LockTransition {
        if self.requested != requested {
            self.is_activated = false;
        }
        self.requested = requested;
        self.activatable = match requested {
            ContentVisibility::Visible | ContentVisibility::Hidden => ActivationReasons::empty(),
            ContentVisibility::HiddenMatchable => ActivationReasons::FIND_IN_PAGE,
            ContentVisibility::Auto => ActivationReasons::all(),
        };
        self.update_state()
    }

    pub(crate) fn set_onscreen(&mut self, is_onscreen: bool) -> LockTransition {
        self.is_onscreen = is_onscreen;
        if !is_onscreen {
            self.is_activated = false;
        }
        self.update_state()
    }

    /// Unlock an `auto` lock for `reason`. `hidden=until-found` locks are
    /// released by removing the attribute instead.
    pub(crate) fn activate(&mut self, reason: ActivationReasons) -> LockTransition {
        if !self.is_locked() || !self.is_activatable(reason) {
            return LockTransition::Unchanged;
        }
        if self.requested == ContentVisibility::Auto {
            self.is_activated = true;
        }
        self.update_state()
    }

    fn update_state(&mut self) -> LockTransition {
        let should_lock = match self.requested {
            ContentVisibility::Visible => false,
            ContentVisibility::Hidden | ContentVisibility::HiddenMatchable => true,
            ContentVisibility::Auto => !self.is_onscreen && !self.is_activated,
        };
        let new_state = if should_lock {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        if new_state == self.state {
            return LockTransition::Unchanged;
        }
        debug!("Display lock {:?} -> {:?}", self.state, new_state);
        self.state = new_state;
        match new_state {
            LockState::Locked => LockTransition::Locked,
            LockState::Unlocked => LockTransition::Unlocked,
        }
    }
}
