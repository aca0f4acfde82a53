// SPDX-License-Identifier: GPL-3.0-only

//! Setup scenarios
//!
//! Eight layouts can be provisioned: {partition, block} × {none, lvm} ×
//! {none, luks}. Each maps to a fixed sequence of [`Step`]s.

use std::fmt;

use storage_types::{Encryption, Logical, Physical, StorageType};

use crate::error::{ProvisionError, Result};

/// One stage of provisioning, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Write a partition table to every block device
    PartitionDisks,
    /// Create the volume group and logical volume
    CreateLvm,
    /// Format (when needed) and unlock the LUKS container
    SetupLuks,
    /// Create the labelled filesystem on the top device
    FormatFilesystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    PartitionPlain,
    PartitionLvm,
    PartitionLuks,
    PartitionLvmLuks,
    BlockPlain,
    BlockLvm,
    BlockLuks,
    BlockLvmLuks,
}

impl Scenario {
    /// Pick the scenario for `layout`.
    ///
    /// Layouts without separate physical storage, or with an undefined or
    /// unknown layer, have no scenario.
    pub fn for_layout(layout: StorageType) -> Result<Self> {
        use Encryption as E;
        use Logical as L;
        use Physical as P;

        let scenario = match (layout.physical, layout.logical, layout.encryption) {
            (P::Partition, L::None, E::None) => Scenario::PartitionPlain,
            (P::Partition, L::Lvm, E::None) => Scenario::PartitionLvm,
            (P::Partition, L::None, E::Luks) => Scenario::PartitionLuks,
            (P::Partition, L::Lvm, E::Luks) => Scenario::PartitionLvmLuks,
            (P::Block, L::None, E::None) => Scenario::BlockPlain,
            (P::Block, L::Lvm, E::None) => Scenario::BlockLvm,
            (P::Block, L::None, E::Luks) => Scenario::BlockLuks,
            (P::Block, L::Lvm, E::Luks) => Scenario::BlockLvmLuks,
            _ => return Err(ProvisionError::UnsupportedLayout(layout)),
        };
        Ok(scenario)
    }

    pub fn physical(self) -> Physical {
        match self {
            Scenario::PartitionPlain
            | Scenario::PartitionLvm
            | Scenario::PartitionLuks
            | Scenario::PartitionLvmLuks => Physical::Partition,
            _ => Physical::Block,
        }
    }

    pub fn uses_lvm(self) -> bool {
        matches!(
            self,
            Scenario::PartitionLvm
                | Scenario::PartitionLvmLuks
                | Scenario::BlockLvm
                | Scenario::BlockLvmLuks
        )
    }

    pub fn uses_luks(self) -> bool {
        matches!(
            self,
            Scenario::PartitionLuks
                | Scenario::PartitionLvmLuks
                | Scenario::BlockLuks
                | Scenario::BlockLvmLuks
        )
    }

    pub fn layout(self) -> StorageType {
        StorageType::new(
            self.physical(),
            if self.uses_lvm() { Logical::Lvm } else { Logical::None },
            if self.uses_luks() {
                Encryption::Luks
            } else {
                Encryption::None
            },
        )
    }

    pub fn steps(self) -> Vec<Step> {
        let mut steps = Vec::with_capacity(4);
        if self.physical() == Physical::Block {
            steps.push(Step::PartitionDisks);
        }
        if self.uses_lvm() {
            steps.push(Step::CreateLvm);
        }
        if self.uses_luks() {
            steps.push(Step::SetupLuks);
        }
        steps.push(Step::FormatFilesystem);
        steps
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.layout())
    }
}
