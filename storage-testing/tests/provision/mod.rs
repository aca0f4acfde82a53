// SPDX-License-Identifier: GPL-3.0-only

pub mod failures;
pub mod fresh;
pub mod reattach;
