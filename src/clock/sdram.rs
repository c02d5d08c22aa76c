// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Booting from SDRAM.
//!
//! We were loaded into SDRAM by an intermediate bootloader, which had to have
//! configured the PLL and SDRAM already. Reprogramming the clocks underneath a
//! running SDRAM controller is a bad idea, so we don't touch anything. We read
//! the registers back and work out what the frequencies are instead.
//!
//! This assumes that MAINCK is the on-board 12 MHz crystal. Nothing in the
//! registers tells us otherwise, and if a loader used the internal RC or a
//! bypassed external clock, the profile reported here will be wrong.

use num_traits::FromPrimitive;

use super::{
    BootMode, ClockFrequencies, ClockProfile, ClockSetup, ClockStrategy, MAIN_OSCILLATOR_HZ,
    SLOW_CLOCK_HZ, UPLL_HZ,
};
use crate::pmc::*;

pub struct Setup;

impl ClockSetup for Setup {
    const STRATEGY: ClockStrategy = ClockStrategy::PreinitializedSdram;

    fn apply(pmc: &impl Pmc) -> ClockProfile {
        let frequencies = read_back(pmc);
        log::debug!("clock tree inherited from loader: {:?}", frequencies);
        ClockProfile::new(BootMode::FromPreinitializedSdram, frequencies)
    }
}

/// Reconstructs the clock frequencies from live register state. Reads only.
pub fn read_back(pmc: &impl Pmc) -> ClockFrequencies {
    let pllar = pmc.read(PmcRegister::CkgrPllar);
    let mckr = pmc.read(PmcRegister::PmcMckr);
    let usb = pmc.read(PmcRegister::PmcUsb);
    let uckr = pmc.read(PmcRegister::CkgrUckr);

    let mula = (pllar & PLLAR_MULA_MASK) >> PLLAR_MULA_SHIFT;
    let diva = pllar & PLLAR_DIVA_MASK;
    // MULA or DIVA of zero means PLLA is off.
    let plla_hz = if mula == 0 || diva == 0 {
        0
    } else {
        MAIN_OSCILLATOR_HZ * (mula + 1) / diva
    };
    let upll_hz = if uckr & UCKR_UPLLEN != 0 { UPLL_HZ } else { 0 };

    // Every CSS value decodes, the field is two bits.
    let source_hz = match ClockSource::from_u32(mckr & MCKR_CSS_MASK) {
        Some(ClockSource::Slow) => SLOW_CLOCK_HZ,
        Some(ClockSource::Main) | None => MAIN_OSCILLATOR_HZ,
        Some(ClockSource::Plla) if mckr & MCKR_PLLADIV2 != 0 => plla_hz / 2,
        Some(ClockSource::Plla) => plla_hz,
        Some(ClockSource::Upll) => upll_hz,
    };

    let pres_field = (mckr & MCKR_PRES_MASK) >> MCKR_PRES_SHIFT;
    let pres = Prescaler::from_u32(pres_field).unwrap_or_else(|| {
        log::warn!("loader left reserved PRES value {}, assuming /1", pres_field);
        Prescaler::Div1
    });
    let mdiv = MasterDivider::from_u32((mckr & MCKR_MDIV_MASK) >> MCKR_MDIV_SHIFT)
        .unwrap_or(MasterDivider::Div1);

    let pck_hz = source_hz / pres.divisor();
    let mck_hz = pck_hz / mdiv.divisor();
    let h32mx_hz = if mckr & MCKR_H32MXDIV2 != 0 { mck_hz / 2 } else { mck_hz };

    let usbdiv = (usb & USB_USBDIV_MASK) >> USB_USBDIV_SHIFT;
    let usb_input_hz = if usb & USB_USBS_UPLL != 0 { upll_hz } else { plla_hz };

    ClockFrequencies {
        plla_hz,
        pck_hz,
        mck_hz,
        h32mx_hz,
        usb_hz: usb_input_hz / (usbdiv + 1),
    }
}
