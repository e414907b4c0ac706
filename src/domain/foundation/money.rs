//! Currency codes understood by the ledger.
//!
//! Amounts are whole units of the purchase currency (`i64`); no
//! conversion between currencies ever happens here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Rub,
    Usd,
    Eur,
    /// Chat-platform stars
    Xtr,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Xtr => "XTR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUB" => Ok(Currency::Rub),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "XTR" => Ok(Currency::Xtr),
            other => Err(ValidationError::invalid_format(
                "currency",
                format!("unsupported currency '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("rub".parse::<Currency>().unwrap(), Currency::Rub);
        assert_eq!(" Xtr ".parse::<Currency>().unwrap(), Currency::Xtr);
    }

    #[test]
    fn rejects_unknown_codes() {
        assert!("BTC".parse::<Currency>().is_err());
    }

    #[test]
    fn displays_iso_code() {
        assert_eq!(Currency::Eur.to_string(), "EUR");
    }
}
