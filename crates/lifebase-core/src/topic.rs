//! Publish-topic derivation.
//!
//! Topics have three fixed segments: device label, subject type name,
//! subject name. Each segment is stripped to alphanumerics so the path is
//! broker-safe regardless of what a device's identity fields contain; a
//! missing or empty-after-sanitizing segment becomes [`UNKNOWN_SEGMENT`].

use lifebase_types::Measurement;

/// Placeholder for a missing or unusable topic segment.
pub const UNKNOWN_SEGMENT: &str = "Unknown";

/// Strip every character that is not a letter or digit.
pub fn sanitize_segment(raw: &str) -> String {
    raw.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn segment(field: Option<&str>) -> String {
    match field {
        Some(raw) => {
            let cleaned = sanitize_segment(raw);
            if cleaned.is_empty() {
                UNKNOWN_SEGMENT.to_string()
            } else {
                cleaned
            }
        }
        None => UNKNOWN_SEGMENT.to_string(),
    }
}

/// Derive the three topic segments, in fixed order.
pub fn topic_segments(
    device_label: Option<&str>,
    subject_type_name: Option<&str>,
    subject_name: Option<&str>,
) -> [String; 3] {
    [
        segment(device_label),
        segment(subject_type_name),
        segment(subject_name),
    ]
}

/// Derive the full topic path, segments joined with `/`.
pub fn build_topic(
    device_label: Option<&str>,
    subject_type_name: Option<&str>,
    subject_name: Option<&str>,
) -> String {
    topic_segments(device_label, subject_type_name, subject_name).join("/")
}

/// Derive the topic path for one measurement.
pub fn measurement_topic(device_label: &str, measurement: &Measurement) -> String {
    build_topic(
        Some(device_label),
        measurement.subject_type_name.as_deref(),
        measurement.subject_name.as_deref(),
    )
}
