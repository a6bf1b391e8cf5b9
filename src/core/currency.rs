use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217-style currency code.
///
/// Codes are normalised to upper case so that `"usd"` and `"USD"`
/// refer to the same currency.
///
/// # Examples
///
/// ```
/// use trade_settlement::core::currency::CurrencyCode;
///
/// let usd = CurrencyCode::new("usd");
/// let aed = CurrencyCode::new("AED");
/// assert_eq!(usd.as_str(), "USD");
/// assert_ne!(usd, aed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An ordered pair of currencies: 1 unit of `base` = `rate` units of `quote`.
///
/// # Examples
///
/// ```
/// use trade_settlement::core::currency::CurrencyPair;
///
/// let pair = CurrencyPair::from_codes("USD", "AED");
/// assert_eq!(pair.to_string(), "USD/AED");
/// assert!(!pair.is_identity());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: CurrencyCode,
    pub quote: CurrencyCode,
}

impl CurrencyPair {
    pub fn new(base: CurrencyCode, quote: CurrencyCode) -> Self {
        Self { base, quote }
    }

    pub fn from_codes(base: &str, quote: &str) -> Self {
        Self::new(CurrencyCode::new(base), CurrencyCode::new(quote))
    }

    /// Both legs are the same currency; conversion is the identity.
    pub fn is_identity(&self) -> bool {
        self.base == self.quote
    }

    pub fn involves(&self, currency: &CurrencyCode) -> bool {
        &self.base == currency || &self.quote == currency
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_normalised() {
        assert_eq!(CurrencyCode::new(" aed "), CurrencyCode::new("AED"));
    }

    #[test]
    fn test_pair_identity() {
        assert!(CurrencyPair::from_codes("USD", "usd").is_identity());
        assert!(!CurrencyPair::from_codes("USD", "EUR").is_identity());
    }

    #[test]
    fn test_pair_involves() {
        let pair = CurrencyPair::from_codes("EUR", "AED");
        assert!(pair.involves(&CurrencyCode::new("AED")));
        assert!(!pair.involves(&CurrencyCode::new("USD")));
    }
}
