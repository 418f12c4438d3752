//! Output formatting.

use lifebase_core::Error;
use lifebase_types::{Measurement, Service, decode_text};

/// Render a walked attribute tree as an indented listing.
pub fn format_tree(services: &[Service]) -> String {
    let mut out = String::new();

    for service in services {
        out.push_str(&format!(
            "\t{} (0x{:04x}): {}\n",
            service.uuid,
            service.handle,
            service.description.as_deref().unwrap_or("")
        ));
        for characteristic in &service.characteristics {
            let properties: Vec<&str> = characteristic
                .properties
                .iter()
                .map(|p| p.label())
                .collect();
            out.push_str(&format!(
                "\t\t{} (0x{:04x}): [{}]; Name: {}; Value: {}\n",
                characteristic.uuid,
                characteristic.handle,
                properties.join("|"),
                characteristic.description.as_deref().unwrap_or(""),
                display_value(characteristic.value.as_deref()),
            ));
            for descriptor in &characteristic.descriptors {
                out.push_str(&format!(
                    "\t\t\t{} (0x{:04x}): Value: {}\n",
                    descriptor.uuid,
                    descriptor.handle,
                    display_value(descriptor.value.as_deref()),
                ));
            }
        }
    }

    out
}

/// Render measurements as one JSON object per line.
pub fn format_measurements(measurements: &[Measurement]) -> String {
    measurements
        .iter()
        .filter_map(|m| serde_json::to_string(m).ok())
        .map(|line| line + "\n")
        .collect()
}

/// Render a raw value for display: text when it decodes, hex otherwise.
fn display_value(value: Option<&[u8]>) -> String {
    match value {
        None => "None".to_string(),
        Some(bytes) => match decode_text(bytes) {
            Ok(text) => format!("'{}'", text),
            Err(_) => format!(
                "0x{}",
                bytes
                    .iter()
                    .map(|b| format!("{:02x}", b))
                    .collect::<String>()
            ),
        },
    }
}

/// The stable per-class message shown for a device- or scan-level failure.
pub fn fatal_message(error: &Error) -> String {
    match error {
        Error::DiscoveryTimeout { .. } => {
            "Error: the timeout was reached; you may want to raise it with --timeout".to_string()
        }
        Error::Transport(_) | Error::AdapterUnavailable => {
            "Error: there was a problem with the BLE transport; please try again later".to_string()
        }
        Error::Connection { address, .. } => {
            format!("BLE connection error for device: {}", address)
        }
        Error::SessionTimeout { .. } => "Timeout error for device".to_string(),
        other => format!("Error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use lifebase_core::{ConnectReason, Error};
    use lifebase_types::{CharProperty, Characteristic, Descriptor};
    use time::OffsetDateTime;
    use uuid::uuid;

    use super::*;

    fn tree() -> Vec<Service> {
        vec![Service {
            uuid: uuid!("54010000-e337-46ca-9690-cdd6d309e7b1"),
            handle: 1,
            description: Some("Environment".to_string()),
            characteristics: vec![Characteristic {
                uuid: uuid!("54010001-e337-46ca-9690-cdd6d309e7b1"),
                handle: 2,
                properties: vec![CharProperty::Read, CharProperty::Notify],
                description: Some("Soil moisture".to_string()),
                value: Some(b"42.5".to_vec()),
                descriptors: vec![Descriptor {
                    uuid: uuid!("00002901-0000-1000-8000-00805f9b34fb"),
                    handle: 3,
                    value: None,
                }],
            }],
        }]
    }

    #[test]
    fn test_format_tree() {
        let rendered = format_tree(&tree());
        assert!(rendered.contains("\t54010000-e337-46ca-9690-cdd6d309e7b1 (0x0001): Environment"));
        assert!(rendered.contains("[read|notify]"));
        assert!(rendered.contains("Value: '42.5'"));
        assert!(rendered.contains("\t\t\t00002901-0000-1000-8000-00805f9b34fb (0x0003): Value: None"));
    }

    #[test]
    fn test_format_tree_hex_fallback() {
        let mut services = tree();
        services[0].characteristics[0].value = Some(vec![0xff, 0x01]);
        let rendered = format_tree(&services);
        assert!(rendered.contains("Value: 0xff01"));
    }

    #[test]
    fn test_format_measurements_json_lines() {
        let measurement = Measurement {
            characteristic: uuid!("54010001-e337-46ca-9690-cdd6d309e7b1"),
            service: uuid!("54010000-e337-46ca-9690-cdd6d309e7b1"),
            subject_id: None,
            subject_name: Some("Basil".to_string()),
            subject_type_id: None,
            subject_type_name: None,
            captured_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            value: Some(42.5),
        };

        let rendered = format_measurements(&[measurement.clone(), measurement]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: Measurement = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.subject_name.as_deref(), Some("Basil"));
        }
    }

    #[test]
    fn test_fatal_messages_are_stable_per_class() {
        let timeout = Error::DiscoveryTimeout {
            duration: std::time::Duration::from_secs(5),
        };
        assert!(fatal_message(&timeout).contains("--timeout"));

        let connection = Error::connection("AA:01", ConnectReason::Rejected);
        assert_eq!(
            fatal_message(&connection),
            "BLE connection error for device: AA:01"
        );

        let session = Error::session_timeout("walk", std::time::Duration::from_secs(5));
        assert_eq!(fatal_message(&session), "Timeout error for device");
    }
}
