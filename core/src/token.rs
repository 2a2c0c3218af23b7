//! Session (`sik`) token validation.
//!
//! Tokens look like `/dc1/_T197/54babd3f-72ca-4776-99df-048969f764bc-106149_570492940`:
//! a data center, a temporary id and the token body, each behind a slash.
//! Validation happens where requests are built, so a malformed token becomes a
//! failed `Response` instead of reaching a reducer as a panic.

use crate::error::TokenFormatError;
use serde::{Deserialize, Serialize};

/// A validated session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SikToken {
    data_center: String,
    temp_id: String,
    token: String,
}

impl SikToken {
    /// Parse `/<data center>/<temp id>/<token>`
    ///
    /// # Errors
    ///
    /// Returns [`TokenFormatError::InvalidSikToken`] when the input is missing
    /// the leading slash, has a segment count other than three, or has an
    /// empty segment.
    pub fn parse(raw: &str) -> Result<Self, TokenFormatError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or(TokenFormatError::InvalidSikToken)?;

        let mut segments = rest.split('/');
        let (Some(data_center), Some(temp_id), Some(token), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenFormatError::InvalidSikToken);
        };

        if [data_center, temp_id, token].iter().any(|s| s.is_empty()) {
            return Err(TokenFormatError::InvalidSikToken);
        }

        Ok(Self {
            data_center: data_center.to_string(),
            temp_id: temp_id.to_string(),
            token: token.to_string(),
        })
    }

    /// Data center segment
    #[must_use]
    pub fn data_center(&self) -> &str {
        &self.data_center
    }

    /// Temporary id segment
    #[must_use]
    pub fn temp_id(&self) -> &str {
        &self.temp_id
    }

    /// Token body
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Display for SikToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}/{}", self.data_center, self.temp_id, self.token)
    }
}

impl std::str::FromStr for SikToken {
    type Err = TokenFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
