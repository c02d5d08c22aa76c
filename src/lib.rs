// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board support for the SAMA5D2 Xplained Ultra.
//!
//! This covers the decisions that have to be made about this particular board
//! before anything else runs: which clock setup to use, and which LEDs
//! applications get. Both are made at build time from Cargo features; see
//! `config` for what the features resolve to.

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod config;
pub mod error;
pub mod leds;
pub mod pinmap;
pub mod pio;
pub mod pmc;

use core::cell::Cell;

use critical_section::Mutex;

use crate::clock::{ClockProfile, ClockSetup};
use crate::pmc::Pmc;

pub use crate::error::{ConfigurationConflict, InvalidIndex};

/// Set exactly once, by `board_initialize`.
static CLOCK_PROFILE: Mutex<Cell<Option<ClockProfile>>> = Mutex::new(Cell::new(None));

/// Early board setup. Call this once, after memory has been configured and
/// mapped but before any devices are initialized.
///
/// Applies the clock setup selected at build time and records the result. A
/// second call does not touch the hardware again; it just hands back what the
/// first one recorded.
pub fn board_initialize(pmc: &impl Pmc) -> ClockProfile {
    critical_section::with(|cs| {
        let recorded = CLOCK_PROFILE.borrow(cs);
        if let Some(profile) = recorded.get() {
            log::warn!("board_initialize called again; clocks left alone");
            return profile;
        }

        let profile = config::ActiveClock::apply(pmc);
        recorded.set(Some(profile));

        log::info!(
            "{:?} clocks: PCK {} Hz, MCK {} Hz, USB {} Hz",
            profile.boot_mode,
            profile.frequencies.pck_hz,
            profile.frequencies.mck_hz,
            profile.frequencies.usb_hz,
        );
        profile
    })
}

/// The clock profile recorded by `board_initialize`, or `None` if it hasn't
/// run yet.
pub fn clock_profile() -> Option<ClockProfile> {
    critical_section::with(|cs| CLOCK_PROFILE.borrow(cs).get())
}
