// SPDX-License-Identifier: GPL-3.0-only

pub mod mount;
pub mod open;
pub mod teardown;
