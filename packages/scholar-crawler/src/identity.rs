//! Stable profile identity derived from a profile reference URL.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MalformedReference;

/// Query parameter carrying the profile id.
const PROFILE_PARAM: &str = "user";

/// Dedup key for a profile: the raw value of its `user` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileKey(String);

impl ProfileKey {
    /// Derive the key from an absolute or relative profile reference.
    ///
    /// Every `&`-separated pair of the query must contain a `=`; the value is
    /// taken verbatim (no percent-decoding) so that two spellings of the same
    /// reference always agree.
    pub fn from_reference(reference: &str) -> Result<Self, MalformedReference> {
        let malformed = |reason| MalformedReference {
            reference: reference.to_string(),
            reason,
        };

        let query = reference
            .split_once('?')
            .map(|(_, rest)| rest)
            .ok_or_else(|| malformed("no query component"))?;
        let query = query.split_once('#').map_or(query, |(q, _)| q);

        let mut key = None;
        for pair in query.split('&') {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| malformed("query pair without `=`"))?;
            if name == PROFILE_PARAM {
                key = Some(value);
            }
        }

        match key {
            Some(value) if !value.is_empty() => Ok(Self(value.to_string())),
            Some(_) => Err(malformed("empty `user` parameter")),
            None => Err(malformed("missing `user` parameter")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProfileKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
