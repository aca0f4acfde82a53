// SPDX-License-Identifier: GPL-3.0-only

//! Waiting for device nodes to settle
//!
//! Rewriting a partition table makes udev remove and re-add the partition
//! nodes a few times. A node is only trusted once it has been seen on every
//! check of a round; a round where it was never seen means it is absent.
//! Anything in between starts another round.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::settings::SettlePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Present,
    Absent,
    Inconclusive,
}

/// Verdict for a round in which the device was seen on `seen` of `checks`
pub fn classify(seen: u32, checks: u32) -> Verdict {
    if seen == 0 {
        Verdict::Absent
    } else if seen >= checks {
        Verdict::Present
    } else {
        Verdict::Inconclusive
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// One check: probe until the device is seen or the attempts run out
pub fn check_once(policy: &SettlePolicy, probe: &mut impl FnMut() -> bool) -> bool {
    let attempts = policy.probe_attempts.max(1);
    for attempt in 1..=attempts {
        if probe() {
            return true;
        }
        if attempt < attempts {
            pause(policy.probe_delay());
        }
    }
    false
}

/// Run check rounds until the device is known present or absent.
///
/// Returns true only for a settled, present device. An inconclusive last
/// round counts as not present.
pub fn wait_for_device(policy: &SettlePolicy, mut probe: impl FnMut() -> bool) -> bool {
    let checks = policy.checks_per_round.max(1);
    let rounds = policy.max_rounds.max(1);

    for round in 1..=rounds {
        let mut seen = 0;
        for check in 1..=checks {
            if check_once(policy, &mut probe) {
                seen += 1;
            }
            if check < checks {
                pause(policy.check_interval());
            }
        }

        let verdict = classify(seen, checks);
        debug!(
            "Settle round {}: seen {}/{} -> {:?}",
            round, seen, checks, verdict
        );
        match verdict {
            Verdict::Present => return true,
            Verdict::Absent => return false,
            Verdict::Inconclusive if round < rounds => pause(policy.check_interval()),
            Verdict::Inconclusive => {}
        }
    }

    debug!("Device did not settle after {} rounds", rounds);
    false
}
