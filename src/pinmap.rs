// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Alternate pin selections.
//!
//! Some signals can come out on more than one pin; the candidates are
//! numbered from 1. Drivers ask for the signal and get whichever candidate
//! the build selected with a `pckN-pin-M` feature. With no feature, candidate
//! 1 is used. For example, `pck0-pin-1` (the default) puts PCK0 on PB26.

use crate::error::ConfigurationConflict;
use crate::pio::{Pin, Port};

/// Signals with more than one possible pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Signal {
    /// Programmable clock output 0.
    Pck0,
    Pck1,
    Pck2,
}

/// Peripheral function select for a pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Function {
    A = 1,
    B = 2,
    C = 3,
    D = 4,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinCandidate {
    pub pin: Pin,
    pub function: Function,
}

const fn candidate(port: Port, number: u8, function: Function) -> PinCandidate {
    PinCandidate {
        pin: Pin::new(port, number),
        function,
    }
}

const PCK0: [PinCandidate; 2] = [
    candidate(Port::B, 26, Function::C),
    candidate(Port::C, 8, Function::C),
];
const PCK1: [PinCandidate; 2] = [
    candidate(Port::C, 27, Function::C),
    candidate(Port::D, 6, Function::D),
];
const PCK2: [PinCandidate; 2] = [
    candidate(Port::B, 24, Function::B),
    candidate(Port::D, 17, Function::B),
];

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Pck0, Signal::Pck1, Signal::Pck2];

    /// Candidates in order; candidate `n` is at index `n - 1`.
    pub const fn candidates(self) -> &'static [PinCandidate] {
        match self {
            Self::Pck0 => &PCK0,
            Self::Pck1 => &PCK1,
            Self::Pck2 => &PCK2,
        }
    }

    pub const fn default_candidate(self) -> PinCandidate {
        self.candidates()[0]
    }
}

/// Picks the pin for `signal`. `requested[n - 1]` says whether candidate `n`
/// was asked for.
///
/// Nothing requested gives the default. Two requests can't be reconciled, and
/// neither can a request for a candidate that doesn't exist.
pub const fn select(
    signal: Signal,
    requested: &[bool],
) -> Result<PinCandidate, ConfigurationConflict> {
    let candidates = signal.candidates();
    let mut chosen: Option<PinCandidate> = None;

    let mut i = 0;
    while i < requested.len() {
        if requested[i] {
            if i >= candidates.len() {
                return Err(ConfigurationConflict::UnknownPinCandidate(signal, i as u8 + 1));
            }
            if chosen.is_some() {
                return Err(ConfigurationConflict::MultiplePinCandidates(signal));
            }
            chosen = Some(candidates[i]);
        }
        i += 1;
    }

    match chosen {
        Some(c) => Ok(c),
        None => Ok(signal.default_candidate()),
    }
}
