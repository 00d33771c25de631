//! The fixed intent taxonomy and the action each intent resolves to.

use crate::slots::{extract_facility_type, extract_location};
use serde::{Deserialize, Serialize};

/// Navigation intents recognised by the assistant.
///
/// Variant order is the candidate-label order handed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    NavigateToLocation,
    FindNearestFacility,
    CurrentLocation,
    ChangeDestination,
    StartNavigation,
    CancelNavigation,
    Help,
}

impl Intent {
    /// All intents in candidate-label order.
    pub const ALL: [Intent; 7] = [
        Intent::NavigateToLocation,
        Intent::FindNearestFacility,
        Intent::CurrentLocation,
        Intent::ChangeDestination,
        Intent::StartNavigation,
        Intent::CancelNavigation,
        Intent::Help,
    ];

    /// Returns the natural-language label scored by the classifier.
    pub fn label(self) -> &'static str {
        match self {
            Self::NavigateToLocation => "navigate to location",
            Self::FindNearestFacility => "find nearest facility",
            Self::CurrentLocation => "current location",
            Self::ChangeDestination => "change destination",
            Self::StartNavigation => "start navigation",
            Self::CancelNavigation => "cancel navigation",
            Self::Help => "help",
        }
    }

    /// Attempts to map a classifier label back to an intent.
    ///
    /// Returns `None` for labels outside the taxonomy.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|intent| intent.label() == label)
    }

    /// Candidate labels in taxonomy order.
    pub fn labels() -> Vec<String> {
        Self::ALL.iter().map(|i| i.label().to_string()).collect()
    }

    /// Builds the action for this intent, filling slots from `text`.
    ///
    /// Only navigation and facility lookups carry parameters; every other
    /// intent ignores the text.
    pub fn action_for(self, text: &str) -> Action {
        match self {
            Self::NavigateToLocation => Action::Navigate {
                destination: extract_location(text),
            },
            Self::FindNearestFacility => Action::FindNearest {
                facility_type: extract_facility_type(text),
            },
            Self::CurrentLocation => Action::GetLocation {},
            Self::ChangeDestination => Action::ChangeDestination {},
            Self::StartNavigation => Action::StartNavigation {},
            Self::CancelNavigation => Action::CancelNavigation {},
            Self::Help => Action::ShowHelp {},
        }
    }

    /// The action type name this intent resolves to.
    pub fn action_type(self) -> &'static str {
        self.action_for("").type_name()
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured action returned to the client.
///
/// Serializes as `{"type": "...", "params": {...}}`. Parameterless actions
/// are empty struct variants so `params` is always an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Navigate { destination: String },
    FindNearest { facility_type: String },
    GetLocation {},
    ChangeDestination {},
    StartNavigation {},
    CancelNavigation {},
    ShowHelp {},
    Unknown {},
}

impl Action {
    /// Returns the wire name of the action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "NAVIGATE",
            Self::FindNearest { .. } => "FIND_NEAREST",
            Self::GetLocation {} => "GET_LOCATION",
            Self::ChangeDestination {} => "CHANGE_DESTINATION",
            Self::StartNavigation {} => "START_NAVIGATION",
            Self::CancelNavigation {} => "CANCEL_NAVIGATION",
            Self::ShowHelp {} => "SHOW_HELP",
            Self::Unknown {} => "UNKNOWN",
        }
    }
}
