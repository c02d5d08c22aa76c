// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Clock flags in precedence order. The first one enabled wins.
const CLOCK_FEATURES: [&str; 4] = ["BOOT_SDRAM", "CPU_384MHZ", "CPU_528MHZ", "CPU_396MHZ"];

// Signals with alternate pin candidates.
const REMAP_SIGNALS: [&str; 3] = ["PCK0", "PCK1", "PCK2"];

fn main() {
    let enabled: Vec<String> = std::env::vars()
        .filter_map(|(name, _)| name.strip_prefix("CARGO_FEATURE_").map(str::to_string))
        .collect();

    check_clock(&enabled);
    check_remaps(&enabled);
}

/// Multiple clock flags are legal, since precedence resolves them, but silently
/// picking a clock tree the user did not expect is how boards end up unbootable.
/// Say which one won.
fn check_clock(enabled: &[String]) {
    let chosen: Vec<&str> = CLOCK_FEATURES
        .iter()
        .copied()
        .filter(|f| enabled.iter().any(|e| e == f))
        .collect();

    if let [winner, losers @ ..] = chosen.as_slice() {
        for loser in losers {
            println!(
                "cargo:warning=clock feature {} overrides {}",
                show_feature(winner),
                show_feature(loser)
            );
        }
    }
}

/// Two candidates for the same signal cannot be resolved by any precedence, so
/// this is fatal.
fn check_remaps(enabled: &[String]) {
    for signal in REMAP_SIGNALS {
        let prefix = format!("{signal}_PIN_");
        let mut candidate: Option<&str> = None;

        for name in enabled {
            if let Some(suffix) = name.strip_prefix(&prefix) {
                if let Some(previous) = candidate {
                    panic!(
                        "configuration conflict: multiple pin candidates for {} \
                         (at least {} and {})",
                        signal.to_ascii_lowercase(),
                        show_feature(&format!("{prefix}{previous}")),
                        show_feature(name)
                    );
                }
                candidate = Some(suffix);
            }
        }
    }
}

fn show_feature(envvar: &str) -> String {
    envvar.to_ascii_lowercase().replace('_', "-")
}
