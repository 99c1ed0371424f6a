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

use env_logger::fmt::TimestampPrecision;
use env_logger::{Builder, Env};

/// Crates whose log records follow the verbosity flags. Records of other crates are capped at
/// `warn`.
const WORKSPACE_CRATES: [&str; 2] = ["freezer", "frztx"];

/// Verbosity of the log output printed to `stderr`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Display)]
pub enum LogLevel {
    /// Only errors; the command output still goes to `stdout`. No verbosity flags.
    #[display("error")]
    Error = 0,

    /// `-v`
    #[display("warn")]
    Warn,

    /// Progress of the operation and calculation summaries. `-vv`
    #[display("info")]
    Info,

    /// Coin selection, balancing rounds and requests to the chain provider. `-vvv`
    #[display("debug")]
    Debug,

    /// Everything, including provider polling. `-vvvv` and above.
    #[display("trace")]
    Trace,
}

impl From<u8> for LogLevel {
    fn from(val: u8) -> Self { Self::from_verbosity_flag_count(val) }
}

impl LogLevel {
    pub fn from_verbosity_flag_count(level: u8) -> Self {
        match level {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Filter directives in `RUST_LOG` syntax for this verbosity.
    pub fn directives(self) -> String {
        let dependencies = self.min(LogLevel::Warn);
        WORKSPACE_CRATES
            .iter()
            .fold(dependencies.to_string(), |acc, krate| format!("{acc},{krate}={self}"))
    }

    /// Installs the logger. Directives from `RUST_LOG` are applied after the verbosity ones and
    /// override them.
    pub fn apply(self) {
        let mut builder = Builder::new();
        builder
            .parse_filters(&self.directives())
            .parse_env(Env::default())
            .format_target(self >= LogLevel::Debug)
            .format_timestamp(match self {
                LogLevel::Trace => Some(TimestampPrecision::Millis),
                _ => None,
            });
        if builder.try_init().is_err() {
            warn!("logger is already installed, keeping its configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, LogLevel::Error, "error,freezer=error,frztx=error")]
    #[case(1, LogLevel::Warn, "warn,freezer=warn,frztx=warn")]
    #[case(2, LogLevel::Info, "warn,freezer=info,frztx=info")]
    #[case(3, LogLevel::Debug, "warn,freezer=debug,frztx=debug")]
    #[case(4, LogLevel::Trace, "warn,freezer=trace,frztx=trace")]
    #[case(9, LogLevel::Trace, "warn,freezer=trace,frztx=trace")]
    fn verbosity_flags(#[case] flags: u8, #[case] level: LogLevel, #[case] directives: &str) {
        assert_eq!(LogLevel::from(flags), level);
        assert_eq!(level.directives(), directives);
    }
}
