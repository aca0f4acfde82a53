//! Common helpers shared by the configuration, the engine and device listings

use num_format::{Locale, ToFormattedString};

/// Size of the blocks the kernel reports device sizes in
pub const SECTOR_SIZE: u64 = 512;

/// Convert bytes to human-readable format (e.g., "1.50 GB")
pub fn bytes_to_pretty(bytes: u64, add_bytes: bool) -> String {
    let mut steps = 0;
    let mut val: f64 = bytes as f64;

    while val > 1024. && steps <= 8 {
        val /= 1024.;
        steps += 1;
    }

    let unit = match steps {
        0 => "B",
        1 => "KB",
        2 => "MB",
        3 => "GB",
        4 => "TB",
        5 => "PB",
        6 => "EB",
        7 => "ZB",
        8 => "YB",
        _ => "Not Supported",
    };

    if add_bytes {
        let bytes_str = bytes.to_formatted_string(&Locale::en);
        format!("{:.2} {} ({} bytes)", val, unit, bytes_str)
    } else {
        format!("{:.2} {}", val, unit)
    }
}

/// Path of the first partition on a whole-disk device.
///
/// Kernel naming inserts a `p` when the disk name ends in a digit
/// (`/dev/mmcblk0` → `/dev/mmcblk0p1`), udev by-id/by-path links use `-part1`.
pub fn partition_path(device: &str) -> String {
    if device.starts_with("/dev/disk/by-") {
        return format!("{device}-part1");
    }

    if device.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{device}p1")
    } else {
        format!("{device}1")
    }
}

/// Short kernel name for a device path (`/dev/sda1` → `sda1`)
pub fn device_name(device: &str) -> &str {
    device
        .strip_prefix("/dev/")
        .unwrap_or(device)
        .rsplit('/')
        .next()
        .unwrap_or(device)
}
