use alloy::primitives::U256;
use rust_decimal::Decimal;

use super::amounts::from_base_units;

/// Format base units with a symbol, e.g. "2487.5 USDC"
pub fn format_token_amount(amount: U256, decimals: u8, symbol: &str) -> String {
    match from_base_units(amount, decimals) {
        Ok(human) => format!("{} {}", human, symbol),
        Err(_) => format!("{} (base units) {}", amount, symbol),
    }
}

/// Format a fraction as a percentage (0.0123 -> "1.23%")
pub fn format_percentage(value: Decimal) -> String {
    format!("{:.2}%", value * Decimal::ONE_HUNDRED)
}

/// Format basis points as a percentage (50 -> "0.50%")
pub fn format_bps(bps: u32) -> String {
    format!("{:.2}%", Decimal::new(bps as i64, 2))
}

/// U256 as a decimal string in serde
pub mod u256_dec {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}

/// Option<U256> as a decimal string in serde
pub mod opt_u256_dec {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom))
            .transpose()
    }
}
