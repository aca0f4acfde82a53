// SPDX-License-Identifier: GPL-3.0-only

use tracing::{info, warn};

use crate::cmd;
use crate::error::Result;

/// sfdisk script for a GPT label with one Linux partition spanning the disk
const SINGLE_PARTITION_LAYOUT: &str = "label: gpt\n,,L\n";

/// Replace the partition table on `device` with a single full-size partition.
///
/// Destroys whatever was on the device. The new partition node shows up
/// asynchronously; callers must wait for it to settle.
pub fn partition_device(device: &str) -> Result<()> {
    cmd::require_tool("sfdisk")?;
    info!("Writing new partition table to {}", device);

    cmd::run_with_input_unchecked(
        "sfdisk",
        &["--wipe", "always", "--wipe-partitions", "always", device],
        SINGLE_PARTITION_LAYOUT.as_bytes(),
    )?
    .checked()?;

    // sfdisk has already asked the kernel to re-read, failure here is not fatal
    if cmd::require_tool("blockdev").is_ok() {
        match cmd::run_unchecked("blockdev", &["--rereadpt", device]) {
            Ok(outcome) if !outcome.success() => {
                warn!(
                    "blockdev --rereadpt {} failed: {}",
                    device, outcome.stderr.trim()
                );
            }
            Err(e) => warn!("blockdev --rereadpt {} failed: {}", device, e),
            Ok(_) => {}
        }
    }

    Ok(())
}
