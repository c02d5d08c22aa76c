// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt;

use crate::pinmap::Signal;

/// A build configuration that cannot be turned into a runnable image.
///
/// These are only ever produced while evaluating constants in `config` (where
/// they become compile errors) or by the host-side tooling. Nothing at run time
/// returns one.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigurationConflict {
    /// Raw clock intent contained bits that name no known flag.
    UnknownClockFlags(u8),
    /// A clock recipe asks for frequencies the part can't produce.
    UnreachableClock(&'static str),
    /// An LED layout whose count and slot set disagree.
    InconsistentLayout(&'static str),
    /// More than one alternate pin was requested for one signal.
    MultiplePinCandidates(Signal),
    /// A pin candidate number that the signal doesn't have.
    UnknownPinCandidate(Signal, u8),
}

impl ConfigurationConflict {
    /// Short description usable in const panics, which can't format.
    pub const fn describe(&self) -> &'static str {
        match *self {
            Self::UnknownClockFlags(_) => "unknown clock flag bits",
            Self::UnreachableClock(why) | Self::InconsistentLayout(why) => why,
            Self::MultiplePinCandidates(_) => "multiple pin candidates for one signal",
            Self::UnknownPinCandidate(..) => "unknown pin candidate",
        }
    }
}

impl fmt::Display for ConfigurationConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownClockFlags(bits) => {
                write!(f, "unknown clock flag bits {bits:#04x}")
            }
            Self::UnreachableClock(why) => write!(f, "unreachable clock setup: {why}"),
            Self::InconsistentLayout(why) => write!(f, "inconsistent LED layout: {why}"),
            Self::MultiplePinCandidates(signal) => {
                write!(f, "multiple pin candidates selected for {signal:?}")
            }
            Self::UnknownPinCandidate(signal, n) => {
                write!(f, "{signal:?} has no pin candidate {n}")
            }
        }
    }
}

/// An indicator index outside the active LED layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InvalidIndex {
    pub index: usize,
    pub count: usize,
}

impl fmt::Display for InvalidIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LED index {} out of range (board has {})", self.index, self.count)
    }
}
