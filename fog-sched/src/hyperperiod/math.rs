/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Integer helpers for hyperperiod computation.
//!
//! Free functions so they can be tested without building a task graph.

use super::HyperperiodError;

/// Euclid's algorithm, iterative.  `gcd(0, n) == n`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple with overflow detection.
///
/// Divides before multiplying (`a / gcd(a, b) * b`), and the multiplication
/// itself is checked.  Either operand being zero yields `Ok(0)`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// LCM of every non-zero period yielded by `periods`.
///
/// Zero periods are skipped; an empty set yields `1`.
pub fn lcm_of_periods<I>(periods: I) -> Result<u64, HyperperiodError>
where
    I: IntoIterator<Item = u64>,
{
    periods.into_iter().filter(|&p| p > 0).try_fold(1, lcm)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
