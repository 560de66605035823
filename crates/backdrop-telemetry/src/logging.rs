// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging bootstrap for binaries and tests.

use env_logger::{Builder, Env};

/// Installs the global logger, honouring `RUST_LOG` and falling back to
/// `default_filter`.
///
/// Returns `false` if a logger was already installed, which makes repeated calls
/// harmless.
pub fn init(default_filter: &str) -> bool {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Installs a logger that writes through the test harness capture.
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn repeated_initialization_is_harmless() {
        super::init_for_tests();
        assert!(!super::init("info"));
    }
}
