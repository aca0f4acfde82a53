//! Canonical names used when provisioning storage

/// Volume label written to every freshly formatted storage filesystem
pub const VOLUME_LABEL: &str = "KGP";

/// Default LVM volume group
pub const DEFAULT_VG: &str = "pool";

/// Default LVM logical volume
pub const DEFAULT_LV: &str = "data";

/// Default LVM device, i.e. /dev/<vg>/<lv>
pub const DEFAULT_LVM_DEVICE: &str = "/dev/pool/data";

/// Default mapped LUKS device
pub const DEFAULT_LUKS_DEVICE: &str = "/dev/mapper/opi";

/// Mapper name of [`DEFAULT_LUKS_DEVICE`]
pub const DEFAULT_LUKS_NAME: &str = "opi";

/// Filesystem created on the top-level storage device
pub const STORAGE_FILESYSTEM: &str = "ext4";
