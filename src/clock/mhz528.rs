// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 528 MHz. PLLA runs at the CPU frequency with no PLLADIV2, and MCK needs the
//! /4 divider to stay under its limit. UPLL feeds USB.

use static_assertions::const_assert;

use super::{program, ClockProfile, ClockSetup, ClockStrategy, PllSettings, UsbClock};
use crate::pmc::{MasterDivider, Pmc, Prescaler};

pub const SETTINGS: PllSettings = PllSettings {
    mula: 43,
    diva: 1,
    count: 0x3F,
    plladiv2: false,
    pres: Prescaler::Div1,
    mdiv: MasterDivider::Div4,
    h32mxdiv2: true,
    usb: UsbClock::Upll { usbdiv: 9 },
};

const_assert!(SETTINGS.validate().is_ok());

pub struct Setup;

impl ClockSetup for Setup {
    const STRATEGY: ClockStrategy = ClockStrategy::Mhz528;

    fn apply(pmc: &impl Pmc) -> ClockProfile {
        log::debug!("programming clocks for 528 MHz");
        program(pmc, &SETTINGS)
    }
}
