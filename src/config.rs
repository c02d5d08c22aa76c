// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The configuration this image was built with, resolved from Cargo features.
//!
//! Everything here is a constant. Anything that can't be resolved fails to
//! compile; nothing is left to be checked at run time.

use static_assertions::{const_assert, const_assert_eq};

use crate::clock::{ClockFlag, ClockIntent, ClockSetup, ClockStrategy};
use crate::leds::{LedLayout, LedSlot};
use crate::pinmap::{self, PinCandidate, Signal};

/// Clock flags as declared by features, before precedence is applied.
pub const CLOCK_INTENT: ClockIntent = ClockIntent::NONE
    .with_if(ClockFlag::BootFromPreinitializedSdram, cfg!(feature = "boot-sdram"))
    .with_if(ClockFlag::Target384Mhz, cfg!(feature = "cpu-384mhz"))
    .with_if(ClockFlag::Target396Mhz, cfg!(feature = "cpu-396mhz"))
    .with_if(ClockFlag::Target528Mhz, cfg!(feature = "cpu-528mhz"));

pub const CLOCK_STRATEGY: ClockStrategy = CLOCK_INTENT.resolve();

// Select the clock setup type as `ActiveClock`. The branch order here is the
// precedence order.
cfg_if::cfg_if! {
    if #[cfg(feature = "boot-sdram")] {
        pub use crate::clock::sdram::Setup as ActiveClock;
    } else if #[cfg(feature = "cpu-384mhz")] {
        pub use crate::clock::mhz384::Setup as ActiveClock;
    } else if #[cfg(feature = "cpu-528mhz")] {
        pub use crate::clock::mhz528::Setup as ActiveClock;
    } else {
        pub use crate::clock::mhz396::Setup as ActiveClock;
    }
}

const_assert_eq!(CLOCK_STRATEGY as u8, <ActiveClock as ClockSetup>::STRATEGY as u8);

/// Whether the OS keeps an LED for status reporting.
pub const OS_LEDS: bool = cfg!(feature = "os-leds");

/// LEDs available to applications.
pub const LED_LAYOUT: LedLayout = LedLayout::for_reservation(OS_LEDS);

/// The LED the OS reports status on, in builds that reserve one.
pub const STATUS_LED: Option<LedSlot> = LED_LAYOUT.reserved();

const_assert!(LED_LAYOUT.validate().is_ok());
const_assert!(LED_LAYOUT.reserved_for_os() == OS_LEDS);

pub const PCK0_PIN: PinCandidate = match pinmap::select(
    Signal::Pck0,
    &[cfg!(feature = "pck0-pin-1"), cfg!(feature = "pck0-pin-2")],
) {
    Ok(pin) => pin,
    Err(e) => panic!("{}", e.describe()),
};

pub const PCK1_PIN: PinCandidate = match pinmap::select(
    Signal::Pck1,
    &[cfg!(feature = "pck1-pin-1"), cfg!(feature = "pck1-pin-2")],
) {
    Ok(pin) => pin,
    Err(e) => panic!("{}", e.describe()),
};

pub const PCK2_PIN: PinCandidate = match pinmap::select(
    Signal::Pck2,
    &[cfg!(feature = "pck2-pin-1"), cfg!(feature = "pck2-pin-2")],
) {
    Ok(pin) => pin,
    Err(e) => panic!("{}", e.describe()),
};

/// The selected pin for `signal`.
pub const fn pin_for(signal: Signal) -> PinCandidate {
    match signal {
        Signal::Pck0 => PCK0_PIN,
        Signal::Pck1 => PCK1_PIN,
        Signal::Pck2 => PCK2_PIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_clock_agrees_with_resolver() {
        assert_eq!(ActiveClock::STRATEGY, CLOCK_STRATEGY);
    }

    #[test]
    fn status_led_only_when_reserved() {
        assert_eq!(STATUS_LED.is_some(), OS_LEDS);
        if let Some(slot) = STATUS_LED {
            assert_eq!(LED_LAYOUT.index_of(slot), None);
        }
    }

    #[test]
    fn every_signal_has_a_pin() {
        for signal in Signal::ALL {
            assert!(signal.candidates().contains(&pin_for(signal)));
        }
    }
}
