use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Field paths
// ---------------------------------------------------------------------------

/// One segment of a dot-delimited field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named key, e.g. `owner` in `owner.id`.
    Key(String),
    /// The array wildcard `*`. Only valid as the final segment.
    Wildcard,
}

/// A dot-delimited path into a record, e.g. `author.id` or `tags.*`.
///
/// Construction always goes through [`FieldPath::parse`] or
/// [`FieldPath::from_segments`], which enforce the structural invariants:
/// no empty segments, and a wildcard only in final position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            bail!("field path is empty");
        }
        let segments = input
            .split('.')
            .map(|seg| match seg {
                "" => bail!("field path `{input}` contains an empty segment"),
                "*" => Ok(PathSegment::Wildcard),
                key => Ok(PathSegment::Key(key.to_string())),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_segments(segments)
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Result<Self> {
        if segments.is_empty() {
            bail!("field path has no segments");
        }
        if let Some(pos) = segments.iter().position(|s| *s == PathSegment::Wildcard)
            && pos != segments.len() - 1
        {
            bail!("wildcard segment must be the final segment of a field path");
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The leading key name, if the path starts with a named segment.
    pub fn root(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k.as_str()),
            _ => None,
        }
    }

    /// Key names of every named segment, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            PathSegment::Key(k) => Some(k.as_str()),
            PathSegment::Wildcard => None,
        })
    }

    pub fn ends_with_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(PathSegment::Wildcard))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match seg {
                PathSegment::Key(k) => write!(f, "{k}")?,
                PathSegment::Wildcard => write!(f, "*")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// Paths serialize as their source string so policy files stay readable.
impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}
