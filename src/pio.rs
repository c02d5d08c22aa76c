// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pin naming and the GPIO drive interface.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Port {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pin {
    pub port: Port,
    pub number: u8,
}

impl Pin {
    pub const fn new(port: Port, number: u8) -> Self {
        assert!(number < 32);
        Self { port, number }
    }

    pub const fn bit(self) -> u32 {
        1 << self.number
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    Low,
    High,
}

/// Narrow interface onto the GPIO block.
///
/// `drive` must change the pin in a single store, without reading back and
/// rewriting other pins in the bank. On this part that's SODR/CODR, which only
/// affect the bits written as 1.
pub trait Pio {
    /// Make `pin` a GPIO output, driving `initial` from the moment it becomes
    /// one.
    fn configure_output(&self, pin: Pin, initial: Level);

    fn drive(&self, pin: Pin, level: Level);
}

/// The (non-secure) PIO controller as mapped on the SAMA5D2.
pub struct MmioPio;

impl MmioPio {
    pub const BASE: usize = 0xFC03_8000;

    const BANK_STRIDE: usize = 0x40;
    const MSKR: usize = 0x00;
    const CFGR: usize = 0x04;
    const SODR: usize = 0x10;
    const CODR: usize = 0x14;

    const CFGR_DIR_OUTPUT: u32 = 1 << 8;

    fn reg(port: Port, offset: usize) -> *mut u32 {
        (Self::BASE + port as usize * Self::BANK_STRIDE + offset) as *mut u32
    }
}

impl Pio for MmioPio {
    fn configure_output(&self, pin: Pin, initial: Level) {
        // Set the output latch before flipping the direction so the pin never
        // glitches to the other level.
        self.drive(pin, initial);
        // Safety: these are the PIO bank registers for `pin.port`. MSKR selects
        // which pins a CFGR write applies to, so other pins are untouched.
        // FUNC = 0 is plain GPIO.
        unsafe {
            core::ptr::write_volatile(Self::reg(pin.port, Self::MSKR), pin.bit());
            core::ptr::write_volatile(Self::reg(pin.port, Self::CFGR), Self::CFGR_DIR_OUTPUT);
        }
    }

    fn drive(&self, pin: Pin, level: Level) {
        let offset = match level {
            Level::High => Self::SODR,
            Level::Low => Self::CODR,
        };
        // Safety: SODR/CODR are write-one-to-act, so this can't disturb any
        // other pin.
        unsafe { core::ptr::write_volatile(Self::reg(pin.port, offset), pin.bit()) }
    }
}
