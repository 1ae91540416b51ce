// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT topic abstraction.
//!
//! A [`Topic`] is an ordered list of `/`-delimited segments. It can be parsed
//! from and rendered back to its string form, checked for publishability, and
//! compiled into a matcher that extracts the segments captured by wildcards.
//!
//! ```text
//! Topic:     hue2mqtt / light / + / set
//!                              ↓
//! Matcher:   ^hue2mqtt/light/([^/]+)/set$
//!                              ↓
//! Candidate: hue2mqtt/light/00:17:88:01/set  →  captures ["00:17:88:01"]
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TopicError;

/// Separator between topic segments.
pub const SEPARATOR: char = '/';

/// Wildcard matching exactly one segment.
pub const SINGLE_LEVEL_WILDCARD: &str = "+";

/// Wildcard matching one or more trailing segments.
pub const MULTI_LEVEL_WILDCARD: &str = "#";

/// An MQTT topic that may be published or subscribed to.
///
/// Equality and hashing consider only the segments, so two topics built from
/// the same segments are interchangeable as map keys.
///
/// # Examples
///
/// ```
/// use hue2mqtt::mqtt::Topic;
///
/// let topic: Topic = "hue2mqtt/light/+/set".parse().unwrap();
/// assert!(!topic.is_publishable());
///
/// let captures = topic.matches("hue2mqtt/light/abc/set").unwrap();
/// assert_eq!(captures.get(0), Some("abc"));
/// ```
pub struct Topic {
    parts: Vec<String>,
    matcher: OnceLock<Result<Regex, String>>,
}

impl Topic {
    /// Creates a topic directly from its segments.
    #[must_use]
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
            matcher: OnceLock::new(),
        }
    }

    /// Parses a topic string into its segments.
    ///
    /// Consecutive separators produce empty segments, which are kept.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Invalid`] if the string is empty, a lone `/`,
    /// or begins or ends with `/`.
    pub fn parse(topic: &str) -> Result<Self, TopicError> {
        if topic.chars().count() > 1 {
            if topic.starts_with(SEPARATOR) || topic.ends_with(SEPARATOR) {
                return Err(TopicError::Invalid {
                    topic: topic.to_string(),
                    reason: "topic cannot begin or end with /",
                });
            }
        } else if topic.is_empty() || topic.starts_with(SEPARATOR) {
            return Err(TopicError::Invalid {
                topic: topic.to_string(),
                reason: "topic must contain at least one segment",
            });
        }

        Ok(Self::new(topic.split(SEPARATOR)))
    }

    /// Returns the segments of this topic.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Returns whether it is valid to publish to this topic.
    ///
    /// Publication to topics containing wildcards is not permitted.
    #[must_use]
    pub fn is_publishable(&self) -> bool {
        !self
            .parts
            .iter()
            .any(|p| p == SINGLE_LEVEL_WILDCARD || p == MULTI_LEVEL_WILDCARD)
    }

    /// Returns the compiled matcher for this topic.
    ///
    /// The matcher is anchored at both ends. Each wildcard becomes a capture
    /// group; literal segments are inserted verbatim, without escaping.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Pattern`] if a literal segment contains regex
    /// syntax that does not compile.
    pub fn regex(&self) -> Result<&Regex, TopicError> {
        self.matcher
            .get_or_init(|| Regex::new(&self.pattern()).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|message| TopicError::Pattern {
                topic: self.to_string(),
                message: message.clone(),
            })
    }

    /// Matches a concrete topic string against this topic.
    ///
    /// Returns the captured wildcard segments in left-to-right order, or
    /// `None` if the candidate does not match.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> Option<Captures> {
        let regex = match self.regex() {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!(error = %e, "Topic has no usable matcher");
                return None;
            }
        };

        let caps = regex.captures(candidate)?;
        let groups = caps
            .iter()
            .skip(1)
            .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();
        Some(Captures(groups))
    }

    /// Builds the regex source for this topic.
    fn pattern(&self) -> String {
        let body = self
            .parts
            .iter()
            .map(|part| match part.as_str() {
                SINGLE_LEVEL_WILDCARD => "([^/]+)",
                MULTI_LEVEL_WILDCARD => "(.+)",
                literal => literal,
            })
            .collect::<Vec<_>>()
            .join("/");
        format!("^{body}$")
    }
}

impl Clone for Topic {
    fn clone(&self) -> Self {
        Self::new(self.parts.iter().cloned())
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("/"))
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({:?})", self.to_string())
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Segments captured by the wildcards of a matching [`Topic`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<String>);

impl Captures {
    /// Returns the capture at `index`, counting wildcards from the left.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Returns the number of captured segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the captures in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the captures as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Captures {
    fn from(groups: Vec<String>) -> Self {
        Self(groups)
    }
}
