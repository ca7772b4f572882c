//! Path patterns for the route registry
//!
//! Syntax: literal segments, `{name}` for a single-segment parameter and a
//! trailing `{*name}` catch-all that captures the rest of the path (at least
//! one segment). Empty segments and trailing slashes are ignored on both the
//! pattern and the request path.

use crate::core::error::{ApiError, ApiResult};
use crate::core::predicate::validate_identifier;
use std::collections::HashMap;
use std::fmt;

/// Parameters captured while matching a path, already percent-decoded
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// A parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl PathPattern {
    pub fn parse(raw: &str) -> ApiResult<Self> {
        if !raw.starts_with('/') {
            return Err(ApiError::configuration(format!(
                "route pattern '{raw}' must start with '/'"
            )));
        }

        let parts: Vec<&str> = split(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) => match inner.strip_prefix('*') {
                    Some(name) if i + 1 == parts.len() => Segment::CatchAll(param_name(raw, name)?),
                    Some(_) => {
                        return Err(ApiError::configuration(format!(
                            "catch-all must be the last segment of '{raw}'"
                        )));
                    }
                    None => Segment::Param(param_name(raw, inner)?),
                },
                None if part.contains(['{', '}']) => {
                    return Err(ApiError::configuration(format!(
                        "malformed segment '{part}' in '{raw}'"
                    )));
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        let mut names: Vec<&str> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(n) | Segment::CatchAll(n) => Some(n.as_str()),
                Segment::Literal(_) => None,
            })
            .collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(ApiError::configuration(format!(
                "duplicate parameter name in '{raw}'"
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether two patterns accept exactly the same paths
    ///
    /// Parameter names are irrelevant: `/notes/{id}` and `/notes/{note_id}`
    /// collide.
    pub fn collides_with(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    (Segment::CatchAll(_), Segment::CatchAll(_)) => true,
                    _ => false,
                })
    }

    /// Match a request path, returning the captured parameters
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = split(path).collect();
        let mut params = PathParams::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if parts.get(i) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = decode(parts.get(i)?)?;
                    params.insert(name.clone(), value);
                }
                Segment::CatchAll(name) => {
                    let rest = parts.get(i..).filter(|rest| !rest.is_empty())?;
                    let decoded = rest
                        .iter()
                        .map(|part| decode(part))
                        .collect::<Option<Vec<String>>>()?;
                    params.insert(name.clone(), decoded.join("/"));
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Build a concrete path by substituting parameters
    pub fn render(&self, params: &[(&str, &str)]) -> Option<String> {
        let lookup = |name: &str| params.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Param(name) => path.push_str(&urlencoding::encode(lookup(name)?)),
                Segment::CatchAll(name) => {
                    let rest = lookup(name)?;
                    let encoded: Vec<String> = rest
                        .split('/')
                        .map(|part| urlencoding::encode(part).into_owned())
                        .collect();
                    path.push_str(&encoded.join("/"));
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        }
        Some(path)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn param_name(raw: &str, name: &str) -> ApiResult<String> {
    validate_identifier(name).map_err(|_| {
        ApiError::configuration(format!("invalid parameter name '{name}' in '{raw}'"))
    })?;
    Ok(name.to_string())
}

fn decode(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}
