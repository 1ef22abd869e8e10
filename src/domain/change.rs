use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A write to one user's `available` flag, as delivered by the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityChange {
    pub uid: String,
    pub before: Value,
    pub after: Value,
}

/// Why a change was or was not acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The value did not change.
    Unchanged,
    /// The value changed, but not to exactly `true`.
    NotAvailable,
    /// The flag became `true`.
    BecameAvailable,
}

impl Transition {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::NotAvailable => "not_available",
            Self::BecameAvailable => "became_available",
        }
    }
}

impl AvailabilityChange {
    #[must_use]
    pub fn new(uid: impl Into<String>, before: Value, after: Value) -> Self {
        Self { uid: uid.into(), before, after }
    }

    /// Classifies the write. Only a real transition to boolean `true` qualifies;
    /// truthy values such as `"true"` or `1` do not.
    #[must_use]
    pub fn transition(&self) -> Transition {
        if self.before == self.after {
            Transition::Unchanged
        } else if self.after != Value::Bool(true) {
            Transition::NotAvailable
        } else {
            Transition::BecameAvailable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A database path pattern such as `/users/{uid}/available`.
///
/// Matching is segment-wise; leading and trailing slashes are ignored and each
/// `{name}` segment captures exactly one path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTemplate {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Template must not be empty")]
    Empty,
    #[error("Invalid template segment: {0}")]
    InvalidSegment(String),
    #[error("Template does not capture a `{0}` parameter")]
    MissingParam(&'static str),
}

impl RefTemplate {
    /// Parses a template.
    ///
    /// # Errors
    /// Returns an error if the template has no segments or a segment has unbalanced braces.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let segments = split_path(raw)
            .map(|segment| {
                if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    if name.is_empty() || name.contains(['{', '}']) {
                        return Err(TemplateError::InvalidSegment(segment.to_string()));
                    }
                    Ok(Segment::Param(name.to_string()))
                } else if segment.contains(['{', '}']) {
                    Err(TemplateError::InvalidSegment(segment.to_string()))
                } else {
                    Ok(Segment::Literal(segment.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if segments.is_empty() {
            return Err(TemplateError::Empty);
        }

        Ok(Self { raw: raw.to_string(), segments })
    }

    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Param(p) if p == name))
    }

    /// Matches a concrete ref path, returning the captured parameters.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(expected) if expected != part => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for RefTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
