// SPDX-License-Identifier: GPL-3.0-only

pub mod access;
pub mod common;
pub mod provision;
