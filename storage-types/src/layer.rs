// SPDX-License-Identifier: GPL-3.0-only

//! Storage layer taxonomy
//!
//! The storage stack is described by four independent selections:
//!
//! - [`Model`] → whether the layout is fixed by the hardware or user configurable
//! - [`Physical`] → what backs the data (OS root, a partition, whole block devices)
//! - [`Logical`] → optional volume management on top of the physical layer
//! - [`Encryption`] → optional encryption of the top-most block device
//!
//! Every variant has exactly one canonical machine name, which is what gets
//! persisted. Lookups in both directions go through a static table per type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A machine name that does not belong to the looked up layer type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} type name '{name}'")]
pub struct UnknownTypeName {
    pub kind: &'static str,
    pub name: String,
}

/// One row of a layer type table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeEntry<T: 'static> {
    pub name: &'static str,
    pub description: &'static str,
    pub value: T,
}

/// Shared behaviour of the layer enumerations, backed by [`LayerType::ENTRIES`].
pub trait LayerType: Copy + Eq + 'static {
    /// Layer name used in error messages
    const KIND: &'static str;

    /// The complete table of defined variants
    const ENTRIES: &'static [TypeEntry<Self>];

    fn entry(self) -> &'static TypeEntry<Self> {
        Self::ENTRIES
            .iter()
            .find(|entry| entry.value == self)
            .expect("every variant is listed in its type table")
    }

    /// Canonical machine name, as persisted
    fn name(self) -> &'static str {
        self.entry().name
    }

    /// Human readable description
    fn description(self) -> &'static str {
        self.entry().description
    }

    fn from_name(name: &str) -> Result<Self, UnknownTypeName> {
        Self::ENTRIES
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
            .ok_or_else(|| UnknownTypeName {
                kind: Self::KIND,
                name: name.to_string(),
            })
    }
}

/// How the storage layout of the device is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    #[default]
    Undefined,
    /// Fixed, non configurable backing store
    Static,
    /// User configurable storage
    Dynamic,
    Unknown,
}

impl LayerType for Model {
    const KIND: &'static str = "model";
    const ENTRIES: &'static [TypeEntry<Self>] = &[
        TypeEntry {
            name: "undefined",
            description: "Undefined",
            value: Model::Undefined,
        },
        TypeEntry {
            name: "static",
            description: "Static",
            value: Model::Static,
        },
        TypeEntry {
            name: "dynamic",
            description: "Dynamic",
            value: Model::Dynamic,
        },
        TypeEntry {
            name: "unknown",
            description: "Unknown",
            value: Model::Unknown,
        },
    ];
}

/// What physically backs the storage area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Physical {
    #[default]
    Undefined,
    /// No separate storage, the OS root filesystem is used
    None,
    /// One pre-existing partition
    Partition,
    /// One or more whole block devices
    Block,
    Unknown,
}

impl LayerType for Physical {
    const KIND: &'static str = "physical";
    const ENTRIES: &'static [TypeEntry<Self>] = &[
        TypeEntry {
            name: "undefined",
            description: "Undefined",
            value: Physical::Undefined,
        },
        TypeEntry {
            name: "none",
            description: "Use local OS partition",
            value: Physical::None,
        },
        TypeEntry {
            name: "partition",
            description: "Use partition(s) on OS disk",
            value: Physical::Partition,
        },
        TypeEntry {
            name: "block",
            description: "Use block device(s)",
            value: Physical::Block,
        },
        TypeEntry {
            name: "unknown",
            description: "Unknown",
            value: Physical::Unknown,
        },
    ];
}

impl Physical {
    /// Partition or Block, i.e. something that can carry LVM or LUKS
    pub fn is_block_backed(self) -> bool {
        matches!(self, Physical::Partition | Physical::Block)
    }
}

/// Volume management above the physical layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logical {
    #[default]
    Undefined,
    None,
    /// Single volume group with a single logical volume
    #[serde(rename = "lvm")]
    Lvm,
    Unknown,
}

impl LayerType for Logical {
    const KIND: &'static str = "logical";
    const ENTRIES: &'static [TypeEntry<Self>] = &[
        TypeEntry {
            name: "undefined",
            description: "Undefined",
            value: Logical::Undefined,
        },
        TypeEntry {
            name: "none",
            description: "Don't use logical volume storage",
            value: Logical::None,
        },
        TypeEntry {
            name: "lvm",
            description: "Use logical volume to group storage",
            value: Logical::Lvm,
        },
        TypeEntry {
            name: "unknown",
            description: "Unknown",
            value: Logical::Unknown,
        },
    ];
}

/// Encryption of the top-most block device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    #[default]
    Undefined,
    None,
    #[serde(rename = "luks")]
    Luks,
    Unknown,
}

impl LayerType for Encryption {
    const KIND: &'static str = "encryption";
    const ENTRIES: &'static [TypeEntry<Self>] = &[
        TypeEntry {
            name: "undefined",
            description: "Undefined",
            value: Encryption::Undefined,
        },
        TypeEntry {
            name: "none",
            description: "Don't use encryption",
            value: Encryption::None,
        },
        TypeEntry {
            name: "luks",
            description: "Use LUKS encryption on storage",
            value: Encryption::Luks,
        },
        TypeEntry {
            name: "unknown",
            description: "Unknown",
            value: Encryption::Unknown,
        },
    ];
}

macro_rules! impl_name_traits {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }

            impl FromStr for $ty {
                type Err = UnknownTypeName;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    <$ty as LayerType>::from_name(s)
                }
            }
        )*
    };
}

impl_name_traits!(Model, Physical, Logical, Encryption);

/// The (physical, logical, encryption) selection used to pick a setup scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct StorageType {
    pub physical: Physical,
    pub logical: Logical,
    pub encryption: Encryption,
}

impl StorageType {
    pub fn new(physical: Physical, logical: Logical, encryption: Encryption) -> Self {
        Self {
            physical,
            logical,
            encryption,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.physical, self.logical, self.encryption)
    }
}
