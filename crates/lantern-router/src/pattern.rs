//! Route pattern parsing and validation.
//!
//! A pattern is a `/`-separated list of segments:
//!
//! - `users` matches the literal text
//! - `:id` matches exactly one segment and captures it as `id`
//! - `*path` matches the rest of the path (possibly empty) and captures it
//!
//! Empty segments are ignored, so `/users/` and `//users` are both the
//! same pattern as `/users`.

use std::fmt;

use crate::error::{PatternIssue, RouteError};

/// One parsed segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text.
    Static(String),
    /// Named single-segment parameter.
    Param(String),
    /// Named trailing catch-all.
    Wildcard(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.write_str(text),
            Self::Param(name) => write!(f, ":{name}"),
            Self::Wildcard(name) => write!(f, "*{name}"),
        }
    }
}

/// A validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
    normalized: String,
}

impl Pattern {
    /// Parses and validates a pattern.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lantern_router::{Pattern, Segment};
    ///
    /// let pattern = Pattern::parse("/files/:bucket/*key").unwrap();
    /// assert_eq!(pattern.segments()[1], Segment::Param("bucket".to_string()));
    /// assert_eq!(pattern.as_str(), "/files/:bucket/*key");
    ///
    /// assert!(Pattern::parse("/files/*key/meta").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::invalid(raw, PatternIssue::MissingLeadingSlash));
        }

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                Self::check_name(raw, index, name, &names)?;
                names.push(name);
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                Self::check_name(raw, index, name, &names)?;
                if index + 1 != parts.len() {
                    return Err(RouteError::invalid(
                        raw,
                        PatternIssue::WildcardNotLast {
                            name: name.to_string(),
                        },
                    ));
                }
                names.push(name);
                Segment::Wildcard(name.to_string())
            } else {
                Segment::Static((*part).to_string())
            };
            segments.push(segment);
        }

        let normalized = if segments.is_empty() {
            "/".to_string()
        } else {
            segments.iter().fold(String::new(), |mut acc, s| {
                acc.push('/');
                acc.push_str(&s.to_string());
                acc
            })
        };

        Ok(Self {
            segments,
            normalized,
        })
    }

    fn check_name(raw: &str, index: usize, name: &str, seen: &[&str]) -> Result<(), RouteError> {
        if name.is_empty() {
            return Err(RouteError::invalid(raw, PatternIssue::EmptyName { index }));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(RouteError::invalid(
                raw,
                PatternIssue::InvalidName {
                    name: name.to_string(),
                },
            ));
        }
        if seen.contains(&name) {
            return Err(RouteError::invalid(
                raw,
                PatternIssue::DuplicateName {
                    name: name.to_string(),
                },
            ));
        }
        Ok(())
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the pattern with empty segments removed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Returns the names of all captured parameters, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(raw: &str) -> PatternIssue {
        match Pattern::parse(raw) {
            Err(RouteError::InvalidPattern { issue, .. }) => issue,
            other => panic!("expected invalid pattern for {raw}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_static() {
        let pattern = Pattern::parse("/users/list").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Static("users".to_string()),
                Segment::Static("list".to_string())
            ]
        );
        assert_eq!(pattern.param_names().count(), 0);
    }

    #[test]
    fn test_parse_param_and_wildcard() {
        let pattern = Pattern::parse("/:greeting/*rest").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Param("greeting".to_string()),
                Segment::Wildcard("rest".to_string())
            ]
        );
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), ["greeting", "rest"]);
    }

    #[test]
    fn test_root_and_normalization() {
        assert_eq!(Pattern::parse("/").unwrap().as_str(), "/");
        assert_eq!(Pattern::parse("//users///:id/").unwrap().as_str(), "/users/:id");
    }

    #[test]
    fn test_missing_leading_slash() {
        assert_eq!(issue("users"), PatternIssue::MissingLeadingSlash);
        assert_eq!(issue(""), PatternIssue::MissingLeadingSlash);
    }

    #[test]
    fn test_empty_names() {
        assert_eq!(issue("/users/:"), PatternIssue::EmptyName { index: 1 });
        assert_eq!(issue("/*"), PatternIssue::EmptyName { index: 0 });
    }

    #[test]
    fn test_invalid_name_characters() {
        assert_eq!(
            issue("/users/:id.json"),
            PatternIssue::InvalidName {
                name: "id.json".to_string()
            }
        );
    }

    #[test]
    fn test_wildcard_must_be_last() {
        assert_eq!(
            issue("/files/*path/meta"),
            PatternIssue::WildcardNotLast {
                name: "path".to_string()
            }
        );
        assert!(issue("/*a/*b") == PatternIssue::WildcardNotLast { name: "a".to_string() });
    }

    #[test]
    fn test_duplicate_names() {
        assert_eq!(
            issue("/:id/posts/:id"),
            PatternIssue::DuplicateName {
                name: "id".to_string()
            }
        );
        assert_eq!(
            issue("/:path/*path"),
            PatternIssue::DuplicateName {
                name: "path".to_string()
            }
        );
    }
}
