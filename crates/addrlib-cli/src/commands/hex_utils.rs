//! Hex address parsing and formatting utilities.

use addrlib_core::database::parse_number;
use anyhow::Result;

/// Parse a hex address string (with or without 0x prefix).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}

/// Parse an id, decimal or with a 0x prefix.
pub fn parse_id(s: &str) -> Result<u64> {
    parse_number(s.trim()).ok_or_else(|| anyhow::anyhow!("Invalid id: {}", s))
}

/// Format an address as a hex string with 0x prefix.
pub fn format_hex_address(addr: u64) -> String {
    format!("0x{:X}", addr)
}
