use std::fmt;

/// Represents errors that can occur when registering a new route.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InsertError {
    /// Attempted to register a second, differently named path parameter at a
    /// node that already has one.
    ///
    /// Allowing this would silently change the capture name of every
    /// previously registered route passing through the node.
    ParamNameConflict {
        /// The full path of the node holding the existing parameter.
        at: String,
        /// The parameter name already registered at this position.
        existing: String,
        /// The conflicting name from the new route.
        offered: String,
    },
    /// Attempted to register segments below a wildcard.
    ///
    /// A wildcard consumes the remainder of the path, so nothing beneath it
    /// could ever match.
    ChildOfWildcard {
        /// The full path of the wildcard node.
        at: String,
    },
    /// Parameter segments must be registered with a non-empty name.
    UnnamedParam,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParamNameConflict {
                at,
                existing,
                offered,
            } => {
                write!(
                    f,
                    "parameter ':{}' conflicts with ':{}' previously registered at '{}'",
                    offered, existing, at
                )
            }
            Self::ChildOfWildcard { at } => {
                write!(f, "cannot register a route below the wildcard at '{}'", at)
            }
            Self::UnnamedParam => write!(f, "parameters must be registered with a name"),
        }
    }
}

impl std::error::Error for InsertError {}

/// A failed match attempt.
///
/// The only fatal condition during matching is a captured parameter value
/// that cannot be percent-decoded to valid UTF-8; the multiplexer front
/// answers such requests with `400 Bad Request`.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MatchError {
    /// A path segment bound to a parameter did not decode to valid UTF-8.
    InvalidParamEncoding {
        /// The raw, still-encoded segment.
        segment: String,
    },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParamEncoding { segment } => {
                write!(
                    f,
                    "path segment '{}' is not valid percent-encoded UTF-8",
                    segment
                )
            }
        }
    }
}

impl std::error::Error for MatchError {}
