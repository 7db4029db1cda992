/// Final outcome classification of one input URL
use std::fmt;

/// How the last attempt for an input URL ended
///
/// The two "fetched but nothing selected" cases are kept apart: a page
/// without any JSON-LD is a different finding from a page whose JSON-LD
/// describes something other than the target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultOutcome {
    /// A block of the target type was selected
    EntityFound,

    /// The page was fetched but carried no parseable JSON-LD at all
    NoStructuredData,

    /// JSON-LD was present but none of it matched the target type
    NoMatchingEntity,

    /// The fetch itself failed (network error, timeout, bad status)
    #[default]
    FetchFailed,
}

impl ResultOutcome {
    /// Returns true if this counts as a success in run statistics
    pub fn is_success(&self) -> bool {
        matches!(self, Self::EntityFound)
    }

    /// Returns true if the page was retrieved, regardless of its content
    pub fn was_fetched(&self) -> bool {
        !matches!(self, Self::FetchFailed)
    }

    /// Converts the outcome to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::EntityFound => "entity_found",
            Self::NoStructuredData => "no_structured_data",
            Self::NoMatchingEntity => "no_matching_entity",
            Self::FetchFailed => "fetch_failed",
        }
    }

    /// Parses an outcome from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "entity_found" => Some(Self::EntityFound),
            "no_structured_data" => Some(Self::NoStructuredData),
            "no_matching_entity" => Some(Self::NoMatchingEntity),
            "fetch_failed" => Some(Self::FetchFailed),
            _ => None,
        }
    }

    /// Returns all outcomes
    pub fn all() -> [Self; 4] {
        [
            Self::EntityFound,
            Self::NoStructuredData,
            Self::NoMatchingEntity,
            Self::FetchFailed,
        ]
    }
}

impl fmt::Display for ResultOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
