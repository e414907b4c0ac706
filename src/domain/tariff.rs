//! Tariff table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tariff {
    pub name: String,
    /// Price in roubles for the whole period
    pub price: i64,
    /// Price in chat-native stars, when sold that way
    pub stars_price: Option<i64>,
    pub devices: u32,
    pub months: u32,
}

/// Immutable tariff table, looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TariffCatalog {
    tariffs: Vec<Tariff>,
}

impl TariffCatalog {
    pub fn new(tariffs: Vec<Tariff>) -> Self {
        Self { tariffs }
    }

    pub fn find(&self, name: &str) -> Option<&Tariff> {
        self.tariffs.iter().find(|t| t.name == name)
    }

    pub fn all(&self) -> &[Tariff] {
        &self.tariffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_exact_name() {
        let catalog = TariffCatalog::new(vec![Tariff {
            name: "basic".to_string(),
            price: 150,
            stars_price: None,
            devices: 3,
            months: 1,
        }]);
        assert_eq!(catalog.find("basic").map(|t| t.devices), Some(3));
        assert!(catalog.find("BASIC").is_none());
        assert!(catalog.find("premium").is_none());
    }
}
