// SPDX-License-Identifier: GPL-3.0-only

pub mod system;

pub use system::{SystemDisks, build_default_adapter};
