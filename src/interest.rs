// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Requested interest and reported readiness masks
use bitflags::bitflags;
use snafu::prelude::*;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// The readiness a caller wants to be told about.
    ///
    /// Only `READABLE`, `WRITABLE` and `PRIORITY` are portable. `EDGE` and
    /// `ONESHOT` are understood by epoll and kqueue only.
    #[derive(Default)]
    pub struct Interest: u8 {
        /// data can be read
        const READABLE = 1;
        /// data can be written
        const WRITABLE = 1 << 1;
        /// urgent / out-of-band data can be read
        const PRIORITY = 1 << 2;
        /// edge-triggered notification
        const EDGE = 1 << 3;
        /// disarm after the first notification
        const ONESHOT = 1 << 4;
    }
}

bitflags! {
    /// The readiness a backend reported for one descriptor.
    #[derive(Default)]
    pub struct Readiness: u8 {
        /// readable
        const READABLE = 1;
        /// writable
        const WRITABLE = 1 << 1;
        /// priority data pending
        const PRIORITY = 1 << 2;
        /// error condition
        const ERROR = 1 << 3;
        /// peer hung up
        const HANGUP = 1 << 4;
        /// descriptor not open
        const INVALID = 1 << 5;
    }
}

impl Interest {
    /// The bits every backend must support.
    pub const PORTABLE: Interest = Interest::from_bits_truncate(
        Interest::READABLE.bits() | Interest::WRITABLE.bits() | Interest::PRIORITY.bits(),
    );

    /// Whether backend-specific trigger bits are requested.
    pub fn is_extended(&self) -> bool {
        self.intersects(Interest::EDGE | Interest::ONESHOT)
    }
}

/// Error returned when an interest string carries an unknown letter.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[non_exhaustive]
pub enum ParseInterestError {
    /// the letter is none of r, w, p, e, o
    #[snafu(display("unknown interest flag '{}'", flag))]
    UnknownFlag {
        /// the offending letter
        flag: char,
    },
}

impl FromStr for Interest {
    type Err = ParseInterestError;

    /// Parse the single-letter form used by scripting bindings, e.g. `"rw"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut interest = Interest::empty();
        for c in s.chars() {
            interest |= match c {
                'r' => Interest::READABLE,
                'w' => Interest::WRITABLE,
                'p' => Interest::PRIORITY,
                'e' => Interest::EDGE,
                'o' => Interest::ONESHOT,
                _ => return UnknownFlagSnafu { flag: c }.fail(),
            };
        }
        Ok(interest)
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, c) in [
            (Interest::READABLE, 'r'),
            (Interest::WRITABLE, 'w'),
            (Interest::PRIORITY, 'p'),
            (Interest::EDGE, 'e'),
            (Interest::ONESHOT, 'o'),
        ] {
            if self.contains(flag) {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, c) in [
            (Readiness::READABLE, 'r'),
            (Readiness::WRITABLE, 'w'),
            (Readiness::PRIORITY, 'p'),
            (Readiness::ERROR, 'e'),
            (Readiness::HANGUP, 'h'),
            (Readiness::INVALID, 'n'),
        ] {
            if self.contains(flag) {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}
