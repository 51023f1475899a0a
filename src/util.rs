use std::time::{SystemTime, UNIX_EPOCH};

/// Bytes of a dropped frame shown in log lines.
const PREVIEW_BYTES: usize = 32;

/// Milliseconds since the unix epoch.
pub fn epoch_millis() -> u64 {
    system_time_to_epoch_millis(SystemTime::now())
}

pub fn system_time_to_epoch_millis(system_time: SystemTime) -> u64 {
    system_time
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

pub fn slice_to_hex_string(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Hex dump of the start of a buffer, for log lines.
pub fn hex_preview(bytes: &[u8]) -> String {
    if bytes.len() > PREVIEW_BYTES {
        format!(
            "{}.. ({} bytes)",
            slice_to_hex_string(&bytes[..PREVIEW_BYTES]),
            bytes.len()
        )
    } else {
        slice_to_hex_string(bytes)
    }
}
