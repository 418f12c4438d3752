//! Shared helpers for addressing peripherals across platforms.

use btleplug::platform::PeripheralId;

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they may be
/// MAC addresses or other formats. This function extracts the useful
/// identifier string.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Compare two device addresses, tolerating case and separator differences.
pub fn address_eq(a: &str, b: &str) -> bool {
    let normalize = |s: &str| s.to_lowercase().replace(':', "");
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_eq() {
        assert!(address_eq("AA:BB:CC:DD:EE:FF", "aa:bb:cc:dd:ee:ff"));
        assert!(address_eq("AA:BB:CC:DD:EE:FF", "aabbccddeeff"));
        assert!(!address_eq("AA:BB:CC:DD:EE:FF", "AA:BB:CC:DD:EE:00"));
    }
}
