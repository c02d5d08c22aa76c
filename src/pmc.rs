// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register-level access to the SAMA5D2 Power Management Controller.
//!
//! The clock setups only ever talk to the PMC through the `Pmc` trait, so that
//! they can be exercised against a fake register file on the host. On the
//! board, `MmioPmc` is the real thing.

use num_derive::FromPrimitive;

/// PMC registers we touch, by offset from the PMC base.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum PmcRegister {
    CkgrUckr = 0x1C,
    CkgrMor = 0x20,
    CkgrPllar = 0x28,
    PmcMckr = 0x30,
    PmcUsb = 0x38,
    PmcSr = 0x68,
}

/// Narrow interface onto the clock tree. Implementations must perform each
/// access exactly once and in program order.
pub trait Pmc {
    fn read(&self, reg: PmcRegister) -> u32;
    fn write(&self, reg: PmcRegister, value: u32);

    /// Spins until every bit in `mask` is set in PMC_SR.
    fn wait_for(&self, mask: u32) {
        while self.read(PmcRegister::PmcSr) & mask != mask {
            // spin.
        }
    }
}

/// The PMC as mapped on the SAMA5D2.
pub struct MmioPmc;

impl MmioPmc {
    pub const BASE: usize = 0xF001_4000;
}

impl Pmc for MmioPmc {
    fn read(&self, reg: PmcRegister) -> u32 {
        // Safety: the PMC is always mapped at BASE on this part and reading its
        // registers has no side effects.
        unsafe { core::ptr::read_volatile((Self::BASE + reg as usize) as *const u32) }
    }

    fn write(&self, reg: PmcRegister, value: u32) {
        // Safety: the offsets in `PmcRegister` are all writable PMC registers.
        // Whether the value is sensible is the caller's problem, not a memory
        // safety one.
        unsafe { core::ptr::write_volatile((Self::BASE + reg as usize) as *mut u32, value) }
    }
}

// CKGR_MOR
pub const MOR_MOSCXTEN: u32 = 1 << 0;
pub const MOR_MOSCRCEN: u32 = 1 << 3;
pub const MOR_MOSCXTST_SHIFT: u32 = 8;
pub const MOR_KEY: u32 = 0x37 << 16;
pub const MOR_MOSCSEL: u32 = 1 << 24;

// CKGR_PLLAR
pub const PLLAR_DIVA_MASK: u32 = 0xFF;
pub const PLLAR_COUNT_SHIFT: u32 = 8;
pub const PLLAR_MULA_SHIFT: u32 = 18;
pub const PLLAR_MULA_MASK: u32 = 0x7F << PLLAR_MULA_SHIFT;
pub const PLLAR_ONE: u32 = 1 << 29;

// CKGR_UCKR
pub const UCKR_UPLLEN: u32 = 1 << 16;
pub const UCKR_UPLLCOUNT_SHIFT: u32 = 20;

// PMC_MCKR
pub const MCKR_CSS_MASK: u32 = 0b11;
pub const MCKR_PRES_SHIFT: u32 = 4;
pub const MCKR_PRES_MASK: u32 = 0b111 << MCKR_PRES_SHIFT;
pub const MCKR_MDIV_SHIFT: u32 = 8;
pub const MCKR_MDIV_MASK: u32 = 0b11 << MCKR_MDIV_SHIFT;
pub const MCKR_PLLADIV2: u32 = 1 << 12;
pub const MCKR_H32MXDIV2: u32 = 1 << 24;

// PMC_USB
pub const USB_USBS_UPLL: u32 = 1 << 0;
pub const USB_USBDIV_SHIFT: u32 = 8;
pub const USB_USBDIV_MASK: u32 = 0xF << USB_USBDIV_SHIFT;

// PMC_SR
pub const SR_MOSCXTS: u32 = 1 << 0;
pub const SR_LOCKA: u32 = 1 << 1;
pub const SR_MCKRDY: u32 = 1 << 3;
pub const SR_LOCKU: u32 = 1 << 6;
pub const SR_MOSCSELS: u32 = 1 << 16;

/// Master clock source selection, MCKR.CSS.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum ClockSource {
    Slow = 0,
    Main = 1,
    Plla = 2,
    Upll = 3,
}

/// Processor clock prescaler, MCKR.PRES. Value 7 is reserved.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum Prescaler {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
}

impl Prescaler {
    pub const fn divisor(self) -> u32 {
        1 << self as u32
    }
}

/// Master clock divider, MCKR.MDIV. Note that the encoding is not monotonic.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum MasterDivider {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div3 = 3,
}

impl MasterDivider {
    pub const fn divisor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div3 => 3,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn mdiv_encoding_is_not_monotonic() {
        assert_eq!(MasterDivider::from_u32(2).map(MasterDivider::divisor), Some(4));
        assert_eq!(MasterDivider::from_u32(3).map(MasterDivider::divisor), Some(3));
    }

    #[test]
    fn reserved_prescaler_does_not_decode() {
        assert_eq!(Prescaler::from_u32(7), None);
        assert_eq!(Prescaler::from_u32(6).map(Prescaler::divisor), Some(64));
    }
}
