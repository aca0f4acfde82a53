// SPDX-License-Identifier: GPL-3.0-only

//! Test support for the appliance storage core
//!
//! [`FakeDisks`] implements the disk-operations contract in memory and keeps
//! a journal of every call as [`Op`] entries, so provisioning can be driven
//! end to end without touching real block devices.

pub mod fake;
pub mod journal;

pub use fake::FakeDisks;
pub use journal::Op;
