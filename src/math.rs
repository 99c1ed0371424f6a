// Freezer: stake locking and yield calculation for Cardano
//
// SPDX-License-Identifier: Apache-2.0
//
// Designed in 2023-2025 by Freezer Contributors <dev@freezer.finance>
// Written in 2023-2025 by Freezer Contributors <dev@freezer.finance>
//
// Copyright (C) 2023-2025 Freezer Contributors.
// All rights under the above copyrights are reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

//! Widened integer helpers. Every proportional split in the reward engines rounds down.

/// `a * b / c` computed in 128 bits, saturating at `u64::MAX`. Division by zero yields zero.
pub(crate) fn mul_div(a: u64, b: u64, c: u64) -> u64 {
    if c == 0 {
        return 0;
    }
    let res = a as u128 * b as u128 / c as u128;
    u64::try_from(res).unwrap_or(u64::MAX)
}

/// Checks that `portion` is at least `percent` percent of `total`, comparing integer percents.
pub fn at_least_integer_percent(portion: u64, total: u64, percent: u64) -> bool {
    if percent == 0 {
        return true;
    }
    if portion == 0 || total == 0 {
        return false;
    }
    100 * portion as u128 / total as u128 >= percent as u128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widened_division() {
        assert_eq!(mul_div(u64::MAX, 2, 4), u64::MAX / 2);
        assert_eq!(mul_div(100_000, 1, 3), 33_333);
        assert_eq!(mul_div(5, 5, 0), 0);
        assert_eq!(mul_div(u64::MAX, 3, 1), u64::MAX);
    }

    #[test]
    fn integer_percent() {
        assert!(!at_least_integer_percent(0, 15000, 1));
        assert!(!at_least_integer_percent(1, 15000, 1));
        assert!(!at_least_integer_percent(149, 15000, 1));
        assert!(!at_least_integer_percent(1499, 150000, 1));
        assert!(!at_least_integer_percent(1234, 15000, 9));
        assert!(!at_least_integer_percent(33698506090921, 42448490781434, 80));
        assert!(at_least_integer_percent(0, 15000, 0));
        assert!(at_least_integer_percent(150, 15000, 1));
        assert!(at_least_integer_percent(151, 15000, 1));
        assert!(at_least_integer_percent(9000, 15000, 1));
        assert!(at_least_integer_percent(15000, 15000, 1));
        assert!(at_least_integer_percent(1234, 15000, 8));
        assert!(!at_least_integer_percent(10, 0, 1));
    }
}
