// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clock strategy selection and the clock setups it chooses between.
//!
//! There are four mutually exclusive ways to get the clock tree into shape,
//! each in its own module and each implementing `ClockSetup`:
//!
//! - `sdram`: an earlier-stage loader already programmed the clocks (it had
//!   to, to get SDRAM going and load us into it). We read the registers back.
//! - `mhz384`: PLLA at a multiple of 48 MHz so OHCI can run from PLLA alone.
//! - `mhz396`: the configuration from the vendor's example code.
//! - `mhz528`: fastest.
//!
//! The selection is made from build-time intent flags. If more than one is
//! asserted, the order of precedence is
//!
//! ```text
//! BootFromPreinitializedSdram > Target384Mhz > Target528Mhz > Target396Mhz
//! ```
//!
//! and with nothing asserted we get `Target396Mhz`. This order is also the
//! order of the `cfg_if` in `config`, and the two are checked against each
//! other at compile time.

// As with board support, every setup is always compiled, whichever one is
// selected. They're small and this keeps all of them building.
pub mod mhz384;
pub mod mhz396;
pub mod mhz528;
pub mod sdram;

use crate::error::ConfigurationConflict;
use crate::pmc::{ClockSource, MasterDivider, Pmc, PmcRegister, Prescaler};

/// On-board 12 MHz crystal.
pub const MAIN_OSCILLATOR_HZ: u32 = 12_000_000;
/// On-board 32.768 kHz crystal.
pub const SLOW_CLOCK_HZ: u32 = 32_768;
/// UPLL output. Fixed by hardware given a 12 MHz main clock.
pub const UPLL_HZ: u32 = 480_000_000;
/// Both USB hosts need exactly this.
pub const USB_HZ: u32 = 48_000_000;

const MCK_MAX_HZ: u32 = 166_000_000;
const H32MX_MAX_HZ: u32 = 83_000_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootMode {
    /// We programmed the clock tree from reset defaults.
    Direct,
    /// A loader programmed it and we only read it back.
    FromPreinitializedSdram,
}

/// The CPU frequencies this board knows how to reach.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CpuTarget {
    Mhz384,
    Mhz396,
    Mhz528,
}

impl CpuTarget {
    pub const fn hz(self) -> u32 {
        match self {
            Self::Mhz384 => 384_000_000,
            Self::Mhz396 => 396_000_000,
            Self::Mhz528 => 528_000_000,
        }
    }

    /// Exact match only; anything else is not one of ours.
    pub const fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            384_000_000 => Some(Self::Mhz384),
            396_000_000 => Some(Self::Mhz396),
            528_000_000 => Some(Self::Mhz528),
            _ => None,
        }
    }
}

/// Frequencies of the clocks the rest of the system cares about. Zero means
/// the clock is not running.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ClockFrequencies {
    /// PLLA output, before PLLADIV2.
    pub plla_hz: u32,
    /// Processor clock.
    pub pck_hz: u32,
    /// Master clock.
    pub mck_hz: u32,
    /// H32MX bus clock.
    pub h32mx_hz: u32,
    /// USB host clock.
    pub usb_hz: u32,
}

/// The clock configuration the board is running with.
///
/// One of these is produced by `board_initialize` and never changes after.
/// The oscillator fields are the same for every profile; only the derived
/// frequencies differ.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ClockProfile {
    pub main_oscillator_hz: u32,
    pub slow_clock_hz: u32,
    pub boot_mode: BootMode,
    /// `None` only when reading back a loader's setup that isn't one of ours.
    pub target_cpu: Option<CpuTarget>,
    pub frequencies: ClockFrequencies,
}

impl ClockProfile {
    pub const fn new(boot_mode: BootMode, frequencies: ClockFrequencies) -> Self {
        Self {
            main_oscillator_hz: MAIN_OSCILLATOR_HZ,
            slow_clock_hz: SLOW_CLOCK_HZ,
            boot_mode,
            target_cpu: CpuTarget::from_hz(frequencies.pck_hz),
            frequencies,
        }
    }
}

/// Build-time clock intent flags.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockFlag {
    BootFromPreinitializedSdram = 1 << 0,
    Target384Mhz = 1 << 1,
    Target396Mhz = 1 << 2,
    Target528Mhz = 1 << 3,
}

/// A set of asserted `ClockFlag`s.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ClockIntent {
    bits: u8,
}

impl ClockIntent {
    const ALL: u8 = ClockFlag::BootFromPreinitializedSdram as u8
        | ClockFlag::Target384Mhz as u8
        | ClockFlag::Target396Mhz as u8
        | ClockFlag::Target528Mhz as u8;

    pub const NONE: Self = Self { bits: 0 };

    pub const fn from_bits(bits: u8) -> Result<Self, ConfigurationConflict> {
        if bits & !Self::ALL != 0 {
            Err(ConfigurationConflict::UnknownClockFlags(bits & !Self::ALL))
        } else {
            Ok(Self { bits })
        }
    }

    pub const fn bits(self) -> u8 {
        self.bits
    }

    pub const fn with(self, flag: ClockFlag) -> Self {
        Self { bits: self.bits | flag as u8 }
    }

    /// Adds `flag` only if `asserted`, for building intents out of `cfg!`.
    pub const fn with_if(self, flag: ClockFlag, asserted: bool) -> Self {
        if asserted {
            self.with(flag)
        } else {
            self
        }
    }

    pub const fn contains(self, flag: ClockFlag) -> bool {
        self.bits & flag as u8 != 0
    }

    /// Applies the precedence order described in the module docs. Always picks
    /// exactly one strategy.
    pub const fn resolve(self) -> ClockStrategy {
        if self.contains(ClockFlag::BootFromPreinitializedSdram) {
            ClockStrategy::PreinitializedSdram
        } else if self.contains(ClockFlag::Target384Mhz) {
            ClockStrategy::Mhz384
        } else if self.contains(ClockFlag::Target528Mhz) {
            ClockStrategy::Mhz528
        } else {
            ClockStrategy::Mhz396
        }
    }
}

/// The resolved choice among the clock setups.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockStrategy {
    PreinitializedSdram,
    Mhz384,
    Mhz396,
    Mhz528,
}

impl ClockStrategy {
    /// Runs the corresponding setup against `pmc`.
    pub fn apply(self, pmc: &impl Pmc) -> ClockProfile {
        match self {
            Self::PreinitializedSdram => sdram::Setup::apply(pmc),
            Self::Mhz384 => mhz384::Setup::apply(pmc),
            Self::Mhz396 => mhz396::Setup::apply(pmc),
            Self::Mhz528 => mhz528::Setup::apply(pmc),
        }
    }
}

/// Requirements placed upon a clock setup type.
pub trait ClockSetup {
    /// Which strategy this setup implements.
    const STRATEGY: ClockStrategy;

    /// Bring the clock tree to this setup's configuration (or discover what it
    /// is) and report the result.
    fn apply(pmc: &impl Pmc) -> ClockProfile;
}

/// Where the USB host clock comes from, and the USBDIV divider.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsbClock {
    /// PLLA output (before PLLADIV2) divided by `usbdiv + 1`.
    Plla { usbdiv: u32 },
    /// UPLL divided by `usbdiv + 1`.
    Upll { usbdiv: u32 },
}

/// Register-level recipe for a programmed clock setup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PllSettings {
    /// PLLA = MAINCK * (mula + 1) / diva.
    pub mula: u32,
    pub diva: u32,
    /// PLLA lock time in units of 8 slow clock cycles.
    pub count: u32,
    pub plladiv2: bool,
    pub pres: Prescaler,
    pub mdiv: MasterDivider,
    pub h32mxdiv2: bool,
    pub usb: UsbClock,
}

impl PllSettings {
    pub const fn frequencies(&self) -> ClockFrequencies {
        let plla_hz = if self.mula == 0 || self.diva == 0 {
            0
        } else {
            MAIN_OSCILLATOR_HZ * (self.mula + 1) / self.diva
        };
        let pllack_hz = if self.plladiv2 { plla_hz / 2 } else { plla_hz };
        let pck_hz = pllack_hz / self.pres.divisor();
        let mck_hz = pck_hz / self.mdiv.divisor();
        let h32mx_hz = if self.h32mxdiv2 { mck_hz / 2 } else { mck_hz };
        let usb_hz = match self.usb {
            UsbClock::Plla { usbdiv } => plla_hz / (usbdiv + 1),
            UsbClock::Upll { usbdiv } => UPLL_HZ / (usbdiv + 1),
        };
        ClockFrequencies {
            plla_hz,
            pck_hz,
            mck_hz,
            h32mx_hz,
            usb_hz,
        }
    }

    /// Rejects recipes the part can't actually run.
    pub const fn validate(&self) -> Result<(), ConfigurationConflict> {
        use ConfigurationConflict::UnreachableClock;

        if self.mula == 0 || self.mula > 127 {
            return Err(UnreachableClock("PLLA multiplier out of range"));
        }
        if self.diva != 1 {
            return Err(UnreachableClock("PLLA divider must be 1"));
        }
        if self.count > 0x3F {
            return Err(UnreachableClock("PLLA lock count out of range"));
        }
        let f = self.frequencies();
        if f.mck_hz > MCK_MAX_HZ {
            return Err(UnreachableClock("master clock above 166 MHz"));
        }
        if f.h32mx_hz > H32MX_MAX_HZ {
            return Err(UnreachableClock("H32MX clock above 83 MHz"));
        }
        match self.usb {
            UsbClock::Plla { usbdiv } | UsbClock::Upll { usbdiv } if usbdiv > 0xF => {
                return Err(UnreachableClock("USB divider out of range"));
            }
            UsbClock::Plla { .. } if f.plla_hz % USB_HZ != 0 => {
                return Err(UnreachableClock("PLLA is not a multiple of 48 MHz"));
            }
            _ => {}
        }
        if f.usb_hz != USB_HZ {
            return Err(UnreachableClock("USB clock is not 48 MHz"));
        }
        Ok(())
    }
}

/// Programs the clock tree from whatever state it's in to `settings`, running
/// from the main crystal.
///
/// The order matters. MCK must not be running from PLLA while PLLA is being
/// reprogrammed, and the dividers must be in place before MCK is switched over
/// to PLLA, or the master clock will briefly run far above its limit.
pub(crate) fn program(pmc: &impl Pmc, settings: &PllSettings) -> ClockProfile {
    use crate::pmc::*;

    // Main crystal on, with the longest startup time; then make it MAINCK.
    // CKGR_MOR ignores writes without the key, and the key reads as zero.
    let mor = pmc.read(PmcRegister::CkgrMor) & !(0xFF << 16) & !(0xFF << MOR_MOSCXTST_SHIFT);
    let mor = mor | MOR_KEY | MOR_MOSCRCEN | MOR_MOSCXTEN | (0xFF << MOR_MOSCXTST_SHIFT);
    pmc.write(PmcRegister::CkgrMor, mor);
    pmc.wait_for(SR_MOSCXTS);
    pmc.write(PmcRegister::CkgrMor, mor | MOR_MOSCSEL);
    pmc.wait_for(SR_MOSCSELS);
    log::debug!("main clock switched to {} Hz crystal", MAIN_OSCILLATOR_HZ);

    // Get MCK off the PLLs before touching them.
    let mckr = pmc.read(PmcRegister::PmcMckr);
    if mckr & MCKR_CSS_MASK >= ClockSource::Plla as u32 {
        pmc.write(
            PmcRegister::PmcMckr,
            (mckr & !MCKR_CSS_MASK) | ClockSource::Main as u32,
        );
        pmc.wait_for(SR_MCKRDY);
    }

    pmc.write(
        PmcRegister::CkgrPllar,
        PLLAR_ONE
            | (settings.mula << PLLAR_MULA_SHIFT)
            | (settings.count << PLLAR_COUNT_SHIFT)
            | settings.diva,
    );
    pmc.wait_for(SR_LOCKA);

    if let UsbClock::Upll { .. } = settings.usb {
        pmc.write(PmcRegister::CkgrUckr, UCKR_UPLLEN | (0xF << UCKR_UPLLCOUNT_SHIFT));
        pmc.wait_for(SR_LOCKU);
    }

    // Dividers first, still on MAINCK...
    let mut mckr = ClockSource::Main as u32
        | (settings.pres as u32) << MCKR_PRES_SHIFT
        | (settings.mdiv as u32) << MCKR_MDIV_SHIFT;
    if settings.plladiv2 {
        mckr |= MCKR_PLLADIV2;
    }
    if settings.h32mxdiv2 {
        mckr |= MCKR_H32MXDIV2;
    }
    pmc.write(PmcRegister::PmcMckr, mckr);
    pmc.wait_for(SR_MCKRDY);

    // ...then the source.
    mckr = (mckr & !MCKR_CSS_MASK) | ClockSource::Plla as u32;
    pmc.write(PmcRegister::PmcMckr, mckr);
    pmc.wait_for(SR_MCKRDY);

    let usb = match settings.usb {
        UsbClock::Plla { usbdiv } => usbdiv << USB_USBDIV_SHIFT,
        UsbClock::Upll { usbdiv } => USB_USBS_UPLL | usbdiv << USB_USBDIV_SHIFT,
    };
    pmc.write(PmcRegister::PmcUsb, usb);

    let profile = ClockProfile::new(BootMode::Direct, settings.frequencies());
    log::debug!("clock tree programmed: {:?}", profile.frequencies);
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pmc::fake::FakePmc;
    use crate::pmc::{MCKR_CSS_MASK, MOR_KEY, MOR_MOSCSEL};

    const EVERY_FLAG: [ClockFlag; 4] = [
        ClockFlag::BootFromPreinitializedSdram,
        ClockFlag::Target384Mhz,
        ClockFlag::Target396Mhz,
        ClockFlag::Target528Mhz,
    ];

    /// A PMC as the loader would leave it for the 396 MHz setup.
    fn preinitialized_pmc() -> FakePmc {
        let pmc = FakePmc::default();
        mhz396::Setup::apply(&pmc);
        pmc.writes.borrow_mut().clear();
        pmc
    }

    #[test]
    fn every_flag_yields_one_profile_with_fixed_oscillators() {
        for flag in EVERY_FLAG {
            let pmc = preinitialized_pmc();
            let profile = ClockIntent::NONE.with(flag).resolve().apply(&pmc);
            assert_eq!(profile.main_oscillator_hz, 12_000_000);
            assert_eq!(profile.slow_clock_hz, 32_768);
        }
    }

    #[test]
    fn precedence_order() {
        use ClockFlag::*;

        let all = ClockIntent::NONE
            .with(BootFromPreinitializedSdram)
            .with(Target384Mhz)
            .with(Target396Mhz)
            .with(Target528Mhz);
        assert_eq!(all.resolve(), ClockStrategy::PreinitializedSdram);

        let no_sdram = ClockIntent::NONE.with(Target384Mhz).with(Target528Mhz).with(Target396Mhz);
        assert_eq!(no_sdram.resolve(), ClockStrategy::Mhz384);

        let fast = ClockIntent::NONE.with(Target528Mhz).with(Target396Mhz);
        assert_eq!(fast.resolve(), ClockStrategy::Mhz528);
    }

    #[test]
    fn sdram_boot_beats_528_and_does_not_reprogram() {
        let pmc = preinitialized_pmc();
        let strategy = ClockIntent::NONE
            .with(ClockFlag::BootFromPreinitializedSdram)
            .with(ClockFlag::Target528Mhz)
            .resolve();
        assert_eq!(strategy, ClockStrategy::PreinitializedSdram);

        let profile = strategy.apply(&pmc);
        assert!(pmc.writes.borrow().is_empty());
        assert_eq!(profile.boot_mode, BootMode::FromPreinitializedSdram);
        assert_eq!(profile.target_cpu, Some(CpuTarget::Mhz396));
    }

    #[test]
    fn no_flags_means_396() {
        assert_eq!(ClockIntent::NONE.resolve(), ClockStrategy::Mhz396);

        let default = ClockIntent::NONE.resolve().apply(&FakePmc::default());
        let explicit = ClockIntent::NONE
            .with(ClockFlag::Target396Mhz)
            .resolve()
            .apply(&FakePmc::default());
        assert_eq!(default, explicit);
        assert_eq!(default.frequencies.pck_hz, 396_000_000);
    }

    #[test]
    fn unknown_flag_bits_are_a_conflict() {
        assert_eq!(
            ClockIntent::from_bits(0b1_0010),
            Err(ConfigurationConflict::UnknownClockFlags(0b1_0000))
        );
        let intent = ClockIntent::from_bits(0b0110).unwrap();
        assert!(intent.contains(ClockFlag::Target384Mhz));
        assert_eq!(intent.resolve(), ClockStrategy::Mhz384);
    }

    #[test]
    fn programmed_setups_hit_their_targets() {
        for (strategy, target) in [
            (ClockStrategy::Mhz384, CpuTarget::Mhz384),
            (ClockStrategy::Mhz396, CpuTarget::Mhz396),
            (ClockStrategy::Mhz528, CpuTarget::Mhz528),
        ] {
            let profile = strategy.apply(&FakePmc::default());
            assert_eq!(profile.boot_mode, BootMode::Direct);
            assert_eq!(profile.target_cpu, Some(target));
            assert_eq!(profile.frequencies.pck_hz, target.hz());
            assert_eq!(profile.frequencies.usb_hz, USB_HZ);
        }
    }

    #[test]
    fn programming_order() {
        let pmc = FakePmc::default();
        // Pretend something left MCK on PLLA.
        pmc.preset(PmcRegister::PmcMckr, ClockSource::Plla as u32);
        mhz528::Setup::apply(&pmc);

        let writes = pmc.writes.borrow();
        let mckrs: Vec<u32> = writes
            .iter()
            .filter(|(r, _)| *r == PmcRegister::PmcMckr)
            .map(|&(_, v)| v)
            .collect();
        // Off PLLA, dividers on MAINCK, then onto PLLA.
        assert_eq!(mckrs.len(), 3);
        assert_eq!(mckrs[0] & MCKR_CSS_MASK, ClockSource::Main as u32);
        assert_eq!(mckrs[1] & MCKR_CSS_MASK, ClockSource::Main as u32);
        assert_eq!(mckrs[2] & MCKR_CSS_MASK, ClockSource::Plla as u32);
        assert_eq!(mckrs[1] & !MCKR_CSS_MASK, mckrs[2] & !MCKR_CSS_MASK);

        let pllar = pmc.first_write(PmcRegister::CkgrPllar).unwrap();
        let last_mckr = writes.iter().rposition(|(r, _)| *r == PmcRegister::PmcMckr).unwrap();
        assert!(pmc.first_write(PmcRegister::CkgrMor).unwrap() < pllar);
        assert!(pllar < last_mckr);
    }

    #[test]
    fn mor_writes_carry_the_key() {
        let pmc = FakePmc::default();
        mhz396::Setup::apply(&pmc);
        for &(reg, value) in pmc.writes.borrow().iter() {
            if reg == PmcRegister::CkgrMor {
                assert_eq!(value & (0xFF << 16), MOR_KEY);
            }
        }
        assert_ne!(pmc.value(PmcRegister::CkgrMor) & MOR_MOSCSEL, 0);
    }

    #[test]
    fn usb_from_plla_needs_a_multiple_of_48() {
        let bad = PllSettings {
            mula: 65,
            usb: UsbClock::Plla { usbdiv: 15 },
            ..mhz396::SETTINGS
        };
        assert_eq!(
            bad.validate(),
            Err(ConfigurationConflict::UnreachableClock("PLLA is not a multiple of 48 MHz"))
        );
    }

    #[test]
    fn overclocked_master_clock_is_rejected() {
        let bad = PllSettings {
            mdiv: MasterDivider::Div2,
            ..mhz528::SETTINGS
        };
        assert_eq!(
            bad.validate(),
            Err(ConfigurationConflict::UnreachableClock("master clock above 166 MHz"))
        );
    }
}
