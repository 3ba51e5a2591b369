use alloy::primitives::Address;

use crate::constants::BPS_DENOMINATOR;

/// Validate Ethereum address format
pub fn is_valid_address(address: &str) -> bool {
    if !address.starts_with("0x") {
        return false;
    }

    if address.len() != 42 {
        return false;
    }

    let hex_part = &address[2..];
    hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse an address regardless of checksum casing
pub fn parse_address(address: &str) -> Result<Address, String> {
    let trimmed = address.trim();
    if !is_valid_address(trimmed) {
        return Err(format!("invalid address: {}", address));
    }
    trimmed.to_lowercase().parse::<Address>().map_err(|e| format!("invalid address {}: {}", address, e))
}

/// Slippage must be within 0..=100%
pub fn is_valid_slippage_bps(bps: u32) -> bool {
    (bps as u64) <= BPS_DENOMINATOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("0x742d35Cc6634C0532925a3b8D4C9db96C4b4d8b6"));
        assert!(!is_valid_address("invalid"));
        assert!(!is_valid_address("0x742d35"));
    }

    #[test]
    fn test_parse_address_ignores_checksum() {
        let a = parse_address("0x833589FCD6EDB6E08F4C7C32D4F71B54BDA02913").unwrap();
        let b = parse_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        assert_eq!(a, b);
        assert!(parse_address("0xzz").is_err());
    }

    #[test]
    fn test_slippage_bounds() {
        assert!(is_valid_slippage_bps(50));
        assert!(is_valid_slippage_bps(10_000));
        assert!(!is_valid_slippage_bps(10_001));
    }
}
