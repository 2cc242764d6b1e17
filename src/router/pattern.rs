//! Path pattern compilation and matching.
//!
//! A pattern such as `/threads/{id}/posts` is split on `/` into literal and
//! placeholder segments once, at registration. Matching a request path is a
//! segment-by-segment comparison with no backtracking: the segment counts must
//! be equal, literals must be identical, and each placeholder binds exactly one
//! non-empty segment.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use super::core::ParamVec;
use crate::error::ConfigError;

static PLACEHOLDER_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Inline capacity for split request paths.
pub const MAX_INLINE_SEGMENTS: usize = 8;

/// One compiled segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches the path segment verbatim.
    Literal(String),
    /// Matches any single non-empty segment and binds it to the name.
    Param(Arc<str>),
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern.
    ///
    /// The pattern is normalized first (leading slash, collapsed and trailing
    /// slashes), so `/threads/` and `/threads` compile to the same pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedPattern`] when a brace is unmatched, a
    /// placeholder does not span a whole segment, a placeholder name is empty
    /// or not an identifier, or a placeholder name repeats.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(malformed("pattern must start with '/'"));
        }

        let raw = normalize_path(pattern);
        let mut segments = Vec::new();
        for segment in split_segments(&raw) {
            let opens = segment.matches('{').count();
            let closes = segment.matches('}').count();
            if opens == 0 && closes == 0 {
                segments.push(Segment::Literal(segment.to_string()));
                continue;
            }
            if opens != closes {
                return Err(malformed("unmatched '{' or '}'"));
            }
            let name = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| malformed("placeholder must span a whole segment"))?;
            if name.is_empty() {
                return Err(malformed("empty placeholder name"));
            }
            let valid = PLACEHOLDER_NAME
                .as_ref()
                .map(|re| re.is_match(name))
                .unwrap_or(false);
            if !valid {
                return Err(malformed("placeholder name must be an identifier"));
            }
            let duplicate = segments
                .iter()
                .any(|s| matches!(s, Segment::Param(existing) if existing.as_ref() == name));
            if duplicate {
                return Err(malformed("duplicate placeholder name"));
            }
            segments.push(Segment::Param(Arc::from(name)));
        }

        Ok(Self { raw, segments })
    }

    /// The normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Match already split request path segments.
    ///
    /// Returns the bound parameters on success. Placeholder values are
    /// percent-decoded; a value that does not decode to UTF-8 is kept as is.
    #[must_use]
    pub fn matches(&self, path_segments: &[&str]) -> Option<ParamVec> {
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = ParamVec::new();
        for (segment, actual) in self.segments.iter().zip(path_segments) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != actual {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if actual.is_empty() {
                        return None;
                    }
                    let value = urlencoding::decode(actual)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| (*actual).to_string());
                    params.push((Arc::clone(name), value));
                }
            }
        }
        Some(params)
    }

    /// Convenience wrapper normalizing and splitting `path` before matching.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);
        self.matches(&segments)
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Normalize a request path or pattern.
///
/// Ensures a leading slash, collapses repeated slashes and strips the
/// trailing slash of anything but the root.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Split a normalized path into segments; the root has none.
#[must_use]
pub fn split_segments(path: &str) -> SmallVec<[&str; MAX_INLINE_SEGMENTS]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join a group prefix and a route path into one normalized path.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{prefix}/{path}"))
}
