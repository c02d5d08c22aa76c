// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 384 MHz, for OHCI only.
//!
//! When PLLA clocks the USB host, PLLA has to be an exact multiple of 48 MHz.
//! 768 MHz / 16 gives 48 MHz with the accuracy OHCI needs, at the cost of a
//! slightly slower CPU. EHCI can't use this; it wants UPLL. This is mostly of
//! interest for experimentation.

use static_assertions::const_assert;

use super::{program, ClockProfile, ClockSetup, ClockStrategy, PllSettings, UsbClock, USB_HZ};
use crate::pmc::{MasterDivider, Pmc, Prescaler};

pub const SETTINGS: PllSettings = PllSettings {
    mula: 63,
    diva: 1,
    count: 0x3F,
    plladiv2: true,
    pres: Prescaler::Div1,
    mdiv: MasterDivider::Div3,
    h32mxdiv2: true,
    usb: UsbClock::Plla { usbdiv: 15 },
};

const_assert!(SETTINGS.validate().is_ok());
const_assert!(SETTINGS.frequencies().plla_hz % USB_HZ == 0);

pub struct Setup;

impl ClockSetup for Setup {
    const STRATEGY: ClockStrategy = ClockStrategy::Mhz384;

    fn apply(pmc: &impl Pmc) -> ClockProfile {
        log::debug!("programming clocks for 384 MHz, USB from PLLA");
        program(pmc, &SETTINGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pmc::fake::FakePmc;
    use crate::pmc::{PmcRegister, USB_USBS_UPLL};

    #[test]
    fn usb_runs_from_plla_and_upll_stays_off() {
        let pmc = FakePmc::default();
        let profile = Setup::apply(&pmc);

        assert_eq!(profile.frequencies.plla_hz, 768_000_000);
        assert_eq!(profile.frequencies.mck_hz, 128_000_000);
        assert_eq!(pmc.value(PmcRegister::PmcUsb) & USB_USBS_UPLL, 0);
        assert_eq!(pmc.first_write(PmcRegister::CkgrUckr), None);
    }
}
