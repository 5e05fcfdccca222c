//! Address search state machine.
//!
//! `Editing` → `Fetching` → `Suggesting` → `Selected` → back to `Editing`.
//! Every request the core issues is stamped with a [`RequestToken`]; a
//! response is applied only while its token is still the latest one, so a
//! slow answer can never overwrite the state produced by a newer request,
//! selection or dismissal.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geocoding::{ReverseOutcome, SuggestionResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(u64);

impl RequestToken {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the address box currently holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AddressSelection {
    FreeText(String),
    Resolved(SuggestionResult),
}

impl AddressSelection {
    /// Text shown in the input box.
    pub fn display_text(&self) -> &str {
        match self {
            AddressSelection::FreeText(text) => text,
            AddressSelection::Resolved(result) => &result.display_name,
        }
    }

    pub fn resolved(&self) -> Option<&SuggestionResult> {
        match self {
            AddressSelection::FreeText(_) => None,
            AddressSelection::Resolved(result) => Some(result),
        }
    }
}

impl Default for AddressSelection {
    fn default() -> Self {
        AddressSelection::FreeText(String::new())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPhase {
    #[default]
    Editing,
    Fetching(RequestToken),
    Suggesting,
    Selected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Yes,
    Stale,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionState {
    selection: AddressSelection,
    suggestions: Vec<SuggestionResult>,
    phase: SearchPhase,
    latest: RequestToken,
}

impl SuggestionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &AddressSelection {
        &self.selection
    }

    pub fn suggestions(&self) -> &[SuggestionResult] {
        &self.suggestions
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn latest_token(&self) -> RequestToken {
        self.latest
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token == self.latest
    }

    /// Advances the generation. Anything issued earlier becomes stale.
    pub fn issue_token(&mut self) -> RequestToken {
        self.latest = self.latest.next();
        self.latest
    }

    /// User typed. Suggestions of the previous text are discarded; the
    /// returned token stamps the search for `text`, if one is sent.
    pub fn edit(&mut self, text: impl Into<String>) -> RequestToken {
        self.selection = AddressSelection::FreeText(text.into());
        self.suggestions.clear();
        self.phase = SearchPhase::Editing;
        self.issue_token()
    }

    pub fn mark_fetching(&mut self, token: RequestToken) {
        if self.is_current(token) {
            self.phase = SearchPhase::Fetching(token);
        }
    }

    pub fn complete_forward(
        &mut self,
        token: RequestToken,
        suggestions: Vec<SuggestionResult>,
    ) -> Applied {
        if !self.is_current(token) {
            return Applied::Stale;
        }
        self.suggestions = suggestions;
        self.phase = SearchPhase::Suggesting;
        Applied::Yes
    }

    /// Picks entry `index` of the visible list. Returns the chosen result so
    /// the caller can move the camera; `None` leaves everything untouched.
    pub fn select(&mut self, index: usize) -> Option<SuggestionResult> {
        let chosen = self.suggestions.get(index)?.clone();
        self.issue_token();
        self.selection = AddressSelection::Resolved(chosen.clone());
        self.suggestions.clear();
        self.phase = SearchPhase::Selected;
        Some(chosen)
    }

    pub fn apply_reverse(&mut self, token: RequestToken, outcome: &ReverseOutcome) -> Applied {
        if !self.is_current(token) {
            return Applied::Stale;
        }
        if let ReverseOutcome::Resolved {
            selection,
            candidates,
        } = outcome
        {
            self.selection = AddressSelection::Resolved(selection.clone());
            self.suggestions = candidates.clone();
            self.phase = SearchPhase::Selected;
        } else if matches!(self.phase, SearchPhase::Fetching(_)) {
            // the forward search this click superseded will never land
            self.phase = SearchPhase::Editing;
        }
        Applied::Yes
    }

    /// Explicit dismissal: the list goes away, the text stays.
    pub fn dismiss(&mut self) {
        self.issue_token();
        self.suggestions.clear();
        if matches!(self.phase, SearchPhase::Fetching(_) | SearchPhase::Suggesting) {
            self.phase = SearchPhase::Editing;
        }
    }
}
