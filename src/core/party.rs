use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a trading party: buyer, seller, applicant, beneficiary or bank.
///
/// # Examples
///
/// ```
/// use trade_settlement::core::party::PartyId;
///
/// let buyer = PartyId::new("buyer-001");
/// let seller = PartyId::new("seller-042");
/// assert_ne!(buyer, seller);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this party ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// ISO 3166-1 alpha-2 country code, upper-cased on construction.
///
/// # Examples
///
/// ```
/// use trade_settlement::core::party::CountryCode;
///
/// assert_eq!(CountryCode::new("ae").as_str(), "AE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the code appears in `list` (entries compared case-insensitively).
    pub fn is_listed_in(&self, list: &[String]) -> bool {
        list.iter().any(|c| c.eq_ignore_ascii_case(&self.0))
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CountryCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
