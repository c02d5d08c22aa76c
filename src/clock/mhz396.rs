// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 396 MHz, as set up by the vendor's example code. This is the default.
//!
//! - PLLA: 12 MHz * 66 = 792 MHz
//! - PCK: PLLA / 2 = 396 MHz
//! - MCK: PCK / 3 = 132 MHz, H32MX: MCK / 2 = 66 MHz
//! - USB: UPLL / 10 = 48 MHz

use static_assertions::const_assert;

use super::{program, ClockProfile, ClockSetup, ClockStrategy, PllSettings, UsbClock};
use crate::pmc::{MasterDivider, Pmc, Prescaler};

pub const SETTINGS: PllSettings = PllSettings {
    mula: 65,
    diva: 1,
    count: 0x3F,
    plladiv2: true,
    pres: Prescaler::Div1,
    mdiv: MasterDivider::Div3,
    h32mxdiv2: true,
    usb: UsbClock::Upll { usbdiv: 9 },
};

const_assert!(SETTINGS.validate().is_ok());

pub struct Setup;

impl ClockSetup for Setup {
    const STRATEGY: ClockStrategy = ClockStrategy::Mhz396;

    fn apply(pmc: &impl Pmc) -> ClockProfile {
        log::debug!("programming clocks for 396 MHz");
        program(pmc, &SETTINGS)
    }
}
