// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! LEDs: the ones applications get, and the one the OS may keep for itself.
//!
//! There is an RGB LED on the board. The red component is wired to SDHC_CD
//! (PA13) and is not used. Green is on PB5 and blue on PB0. The LED anode is on
//! VDD_LED, so driving a pin low lights it. Nobody outside this module should
//! have to care about that.
//!
//! If the OS reserves an LED for status reporting (the `os-leds` feature) it
//! takes green, and applications are left with only blue, renumbered to index
//! 0. Otherwise applications get both, green at 0 and blue at 1.

use core::cell::Cell;

use critical_section::Mutex;

use crate::error::{ConfigurationConflict, InvalidIndex};
use crate::pio::{Level, Pin, Pio, Port};

/// Unused; this pin belongs to the SD card detect line.
pub const RED_PIN: Pin = Pin::new(Port::A, 13);

/// A physical LED that can be handed out.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LedSlot {
    Green,
    Blue,
}

impl LedSlot {
    pub const fn pin(self) -> Pin {
        match self {
            Self::Green => Pin::new(Port::B, 5),
            Self::Blue => Pin::new(Port::B, 0),
        }
    }
}

/// The LEDs available to applications, in index order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedLayout {
    slots: &'static [LedSlot],
    reserved: Option<LedSlot>,
}

impl LedLayout {
    pub const GENERAL: Self = Self {
        slots: &[LedSlot::Green, LedSlot::Blue],
        reserved: None,
    };

    pub const OS_RESERVED: Self = Self {
        slots: &[LedSlot::Blue],
        reserved: Some(LedSlot::Green),
    };

    pub const fn for_reservation(reserved_for_os: bool) -> Self {
        if reserved_for_os {
            Self::OS_RESERVED
        } else {
            Self::GENERAL
        }
    }

    pub const fn count(&self) -> usize {
        self.slots.len()
    }

    pub const fn reserved_for_os(&self) -> bool {
        self.reserved.is_some()
    }

    /// The LED the OS keeps, if any.
    pub const fn reserved(&self) -> Option<LedSlot> {
        self.reserved
    }

    pub const fn slot(&self, index: usize) -> Option<LedSlot> {
        if index < self.slots.len() {
            Some(self.slots[index])
        } else {
            None
        }
    }

    pub const fn index_of(&self, slot: LedSlot) -> Option<usize> {
        let mut i = 0;
        while i < self.slots.len() {
            if self.slots[i] as u8 == slot as u8 {
                return Some(i);
            }
            i += 1;
        }
        None
    }

    /// Bits that `set_mask` accepts.
    pub const fn valid_mask(&self) -> u8 {
        ((1u16 << self.slots.len()) - 1) as u8
    }

    pub const fn validate(&self) -> Result<(), ConfigurationConflict> {
        use ConfigurationConflict::InconsistentLayout;

        if self.slots.is_empty() {
            return Err(InconsistentLayout("no LEDs"));
        }
        if self.slots.len() > 8 {
            return Err(InconsistentLayout("more LEDs than mask bits"));
        }
        let mut i = 0;
        while i < self.slots.len() {
            let mut j = i + 1;
            while j < self.slots.len() {
                if self.slots[i] as u8 == self.slots[j] as u8 {
                    return Err(InconsistentLayout("LED listed twice"));
                }
                j += 1;
            }
            i += 1;
        }
        if let Some(reserved) = self.reserved {
            if self.index_of(reserved).is_some() {
                return Err(InconsistentLayout("reserved LED also given to applications"));
            }
        }
        Ok(())
    }
}

const fn level(on: bool) -> Level {
    if on {
        Level::Low
    } else {
        Level::High
    }
}

/// Application-visible LEDs.
///
/// Safe to use from interrupt and task context at once: each call drives its
/// pins and updates the recorded state inside one critical section.
pub struct Indicators<P> {
    pio: P,
    layout: LedLayout,
    lit: Mutex<Cell<u8>>,
}

impl<P: Pio> Indicators<P> {
    pub const fn new(pio: P, layout: LedLayout) -> Self {
        Self {
            pio,
            layout,
            lit: Mutex::new(Cell::new(0)),
        }
    }

    pub fn layout(&self) -> &LedLayout {
        &self.layout
    }

    /// Configures every LED as an output, turned off. Calling this again turns
    /// everything off again and does no other harm.
    pub fn initialize(&self) {
        critical_section::with(|cs| {
            for slot in self.layout.slots {
                self.pio.configure_output(slot.pin(), level(false));
            }
            self.lit.borrow(cs).set(0);
        });
    }

    pub fn set(&self, index: usize, on: bool) -> Result<(), InvalidIndex> {
        let slot = self.layout.slot(index).ok_or_else(|| self.invalid(index))?;

        critical_section::with(|cs| {
            self.pio.drive(slot.pin(), level(on));
            let lit = self.lit.borrow(cs);
            if on {
                lit.set(lit.get() | 1 << index);
            } else {
                lit.set(lit.get() & !(1 << index));
            }
        });
        Ok(())
    }

    /// Sets every LED from `mask`, bit `n` for index `n`. Any bit beyond the
    /// last LED rejects the whole mask and nothing changes.
    pub fn set_mask(&self, mask: u8) -> Result<(), InvalidIndex> {
        let extra = mask & !self.layout.valid_mask();
        if extra != 0 {
            return Err(self.invalid(extra.trailing_zeros() as usize));
        }

        critical_section::with(|cs| {
            for (index, slot) in self.layout.slots.iter().enumerate() {
                self.pio.drive(slot.pin(), level(mask & 1 << index != 0));
            }
            self.lit.borrow(cs).set(mask);
        });
        Ok(())
    }

    /// Which LEDs are lit, one bit per index.
    pub fn mask(&self) -> u8 {
        critical_section::with(|cs| self.lit.borrow(cs).get())
    }

    pub fn is_lit(&self, index: usize) -> Result<bool, InvalidIndex> {
        if index >= self.layout.count() {
            return Err(self.invalid(index));
        }
        Ok(self.mask() & 1 << index != 0)
    }

    fn invalid(&self, index: usize) -> InvalidIndex {
        log::debug!("rejecting LED index {}", index);
        InvalidIndex {
            index,
            count: self.layout.count(),
        }
    }
}

/// Coarse OS lifecycle events that get shown on the status LED.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LifecycleEvent {
    Started,
    HeapAllocated,
    InterruptsEnabled,
    StackCreated,
    InInterrupt,
    InSignalHandler,
    AssertionFailed,
    Panic,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pattern {
    Off,
    On,
    NoChange,
    /// Roughly 2 Hz. Whoever reports the panic alternates `on` and `off`.
    FlashAt2Hz,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 8] = [
        Self::Started,
        Self::HeapAllocated,
        Self::InterruptsEnabled,
        Self::StackCreated,
        Self::InInterrupt,
        Self::InSignalHandler,
        Self::AssertionFailed,
        Self::Panic,
    ];

    /// A steady LED means we booted and are running; a flashing one means we
    /// crashed and halted.
    pub const fn pattern(self) -> Pattern {
        match self {
            Self::Started | Self::HeapAllocated | Self::InterruptsEnabled => Pattern::Off,
            Self::StackCreated => Pattern::On,
            Self::InInterrupt | Self::InSignalHandler | Self::AssertionFailed => {
                Pattern::NoChange
            }
            Self::Panic => Pattern::FlashAt2Hz,
        }
    }
}

/// The OS's own status LED, for builds that reserve one.
///
/// Each call is a single pin store, so there is no shared state to protect.
pub struct StatusLed<P> {
    pio: P,
    slot: LedSlot,
}

impl<P: Pio> StatusLed<P> {
    pub const fn new(pio: P, slot: LedSlot) -> Self {
        Self { pio, slot }
    }

    pub fn initialize(&self) {
        self.pio.configure_output(self.slot.pin(), level(false));
    }

    /// `event` has happened (or, for `Panic`, it's the lit half of a flash).
    pub fn on(&self, event: LifecycleEvent) {
        match event.pattern() {
            Pattern::On | Pattern::FlashAt2Hz => self.pio.drive(self.slot.pin(), level(true)),
            Pattern::Off => self.pio.drive(self.slot.pin(), level(false)),
            Pattern::NoChange => {}
        }
    }

    /// `event` is over. Only flashing events turn anything off.
    pub fn off(&self, event: LifecycleEvent) {
        if event.pattern() == Pattern::FlashAt2Hz {
            self.pio.drive(self.slot.pin(), level(false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pio::fake::FakePio;

    fn indicators(layout: LedLayout) -> Indicators<FakePio> {
        let leds = Indicators::new(FakePio::default(), layout);
        leds.initialize();
        leds
    }

    #[test]
    fn layout_counts_and_contiguous_indices() {
        assert_eq!(LedLayout::for_reservation(true).count(), 1);
        assert_eq!(LedLayout::for_reservation(false).count(), 2);

        for layout in [LedLayout::GENERAL, LedLayout::OS_RESERVED] {
            assert_eq!(layout.validate(), Ok(()));
            for i in 0..layout.count() {
                assert!(layout.slot(i).is_some());
            }
            assert_eq!(layout.slot(layout.count()), None);
        }
    }

    #[test]
    fn reservation_renumbers_blue() {
        assert_eq!(LedLayout::GENERAL.index_of(LedSlot::Green), Some(0));
        assert_eq!(LedLayout::GENERAL.index_of(LedSlot::Blue), Some(1));
        assert_eq!(LedLayout::OS_RESERVED.index_of(LedSlot::Blue), Some(0));
        assert_eq!(LedLayout::OS_RESERVED.index_of(LedSlot::Green), None);
        assert_eq!(LedLayout::OS_RESERVED.reserved(), Some(LedSlot::Green));
    }

    #[test]
    fn inconsistent_layouts() {
        let doubled = LedLayout {
            slots: &[LedSlot::Blue, LedSlot::Blue],
            reserved: None,
        };
        assert!(doubled.validate().is_err());

        let leaky = LedLayout {
            slots: &[LedSlot::Green, LedSlot::Blue],
            reserved: Some(LedSlot::Green),
        };
        assert!(leaky.validate().is_err());
    }

    #[test]
    fn initialize_turns_everything_off() {
        let leds = indicators(LedLayout::GENERAL);
        for slot in [LedSlot::Green, LedSlot::Blue] {
            assert!(leds.pio.is_output(slot.pin()));
            assert_eq!(leds.pio.level(slot.pin()), Level::High);
        }
        assert!(!leds.pio.is_output(RED_PIN));

        leds.set(0, true).unwrap();
        leds.initialize();
        assert_eq!(leds.mask(), 0);
        assert_eq!(leds.pio.level(LedSlot::Green.pin()), Level::High);
    }

    #[test]
    fn on_drives_low() {
        let leds = indicators(LedLayout::OS_RESERVED);
        leds.set(0, true).unwrap();
        assert_eq!(leds.pio.level(LedSlot::Blue.pin()), Level::Low);
        assert_eq!(leds.is_lit(0), Ok(true));
        // The reserved LED isn't ours to touch.
        assert!(!leds.pio.is_output(LedSlot::Green.pin()));
    }

    #[test]
    fn on_then_off_restores_state() {
        let leds = indicators(LedLayout::GENERAL);
        let before = (leds.mask(), leds.pio.level(LedSlot::Blue.pin()));

        leds.set(1, true).unwrap();
        leds.set(1, false).unwrap();

        assert_eq!((leds.mask(), leds.pio.level(LedSlot::Blue.pin())), before);
        assert_eq!(leds.is_lit(1), Ok(false));
    }

    #[test]
    fn one_past_the_end_is_rejected_without_touching_pins() {
        for layout in [LedLayout::GENERAL, LedLayout::OS_RESERVED] {
            let leds = indicators(layout);
            let drives = leds.pio.drive_count();

            assert_eq!(
                leds.set(layout.count(), true),
                Err(InvalidIndex {
                    index: layout.count(),
                    count: layout.count(),
                })
            );
            assert_eq!(leds.pio.drive_count(), drives);
            assert_eq!(leds.mask(), 0);
            assert!(leds.is_lit(layout.count()).is_err());
        }
    }

    #[test]
    fn mask_lights_blue_only() {
        let leds = indicators(LedLayout::GENERAL);
        leds.set_mask(0b10).unwrap();

        assert_eq!(leds.is_lit(1), Ok(true));
        assert_eq!(leds.is_lit(0), Ok(false));
        assert_eq!(leds.pio.level(LedSlot::Blue.pin()), Level::Low);
        assert_eq!(leds.pio.level(LedSlot::Green.pin()), Level::High);
    }

    #[test]
    fn mask_with_bits_past_the_end() {
        let leds = indicators(LedLayout::OS_RESERVED);
        let drives = leds.pio.drive_count();

        assert_eq!(leds.set_mask(0b11), Err(InvalidIndex { index: 1, count: 1 }));
        assert_eq!(leds.pio.drive_count(), drives);
        assert_eq!(leds.pio.level(LedSlot::Blue.pin()), Level::High);
    }

    #[test]
    fn interleaved_callers_on_disjoint_indices() {
        let leds = indicators(LedLayout::GENERAL);

        // One thread stands in for an interrupt handler, the other for a task.
        // Each ends on a known value for its own LED.
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..1000 {
                    leds.set(0, i % 2 == 0).unwrap();
                }
            });
            s.spawn(|| {
                for i in 0..1000 {
                    leds.set(1, i % 3 != 2).unwrap();
                }
            });
        });

        // Last calls: index 0 got i = 999 (off), index 1 got i = 999 (on).
        assert_eq!(leds.mask(), 0b10);
        assert_eq!(leds.pio.level(LedSlot::Green.pin()), Level::High);
        assert_eq!(leds.pio.level(LedSlot::Blue.pin()), Level::Low);
    }

    #[test]
    fn lifecycle_table() {
        use LifecycleEvent::*;

        let expected = [
            (Started, Pattern::Off),
            (HeapAllocated, Pattern::Off),
            (InterruptsEnabled, Pattern::Off),
            (StackCreated, Pattern::On),
            (InInterrupt, Pattern::NoChange),
            (InSignalHandler, Pattern::NoChange),
            (AssertionFailed, Pattern::NoChange),
            (Panic, Pattern::FlashAt2Hz),
        ];
        for (event, pattern) in expected {
            assert_eq!(event.pattern(), pattern);
        }
        assert_eq!(LifecycleEvent::ALL.len(), expected.len());
    }

    #[test]
    fn status_led_through_boot_and_panic() {
        let led = StatusLed::new(FakePio::default(), LedSlot::Green);
        let pin = LedSlot::Green.pin();
        led.initialize();
        assert_eq!(led.pio.level(pin), Level::High);

        for event in [
            LifecycleEvent::Started,
            LifecycleEvent::HeapAllocated,
            LifecycleEvent::InterruptsEnabled,
        ] {
            led.on(event);
            assert_eq!(led.pio.level(pin), Level::High);
        }

        led.on(LifecycleEvent::StackCreated);
        assert_eq!(led.pio.level(pin), Level::Low);

        // Interrupts come and go without disturbing the steady LED.
        led.on(LifecycleEvent::InInterrupt);
        led.off(LifecycleEvent::InInterrupt);
        led.off(LifecycleEvent::StackCreated);
        assert_eq!(led.pio.level(pin), Level::Low);

        led.off(LifecycleEvent::Panic);
        assert_eq!(led.pio.level(pin), Level::High);
        led.on(LifecycleEvent::Panic);
        assert_eq!(led.pio.level(pin), Level::Low);
    }
}
