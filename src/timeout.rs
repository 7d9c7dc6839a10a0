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

//! Wait timeout and its conversion into the units each syscall expects.
//!
//! Every conversion truncates; a fraction below the native resolution is
//! dropped, never rounded up.
use std::time::Duration;

/// How long a wait may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// block until something is ready
    Infinite,
    /// check once and return
    Immediate,
    /// block for at most this long
    After(Duration),
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Infinite
    }
}

impl Timeout {
    /// Milliseconds for epoll_wait(2) and poll(2), `-1` meaning forever.
    pub fn as_millis(&self) -> libc::c_int {
        match self {
            Timeout::Infinite => -1,
            Timeout::Immediate => 0,
            Timeout::After(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        }
    }

    /// `timespec` for kevent(2), `None` meaning forever.
    pub fn as_timespec(&self) -> Option<libc::timespec> {
        let d = self.duration()?;
        Some(libc::timespec {
            tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: d.subsec_nanos() as _,
        })
    }

    /// `timeval` for select(2), `None` meaning forever.
    pub fn as_timeval(&self) -> Option<libc::timeval> {
        let d = self.duration()?;
        Some(libc::timeval {
            tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_usec: d.subsec_micros() as _,
        })
    }

    fn duration(&self) -> Option<Duration> {
        match self {
            Timeout::Infinite => None,
            Timeout::Immediate => Some(Duration::ZERO),
            Timeout::After(d) => Some(*d),
        }
    }
}

impl From<f64> for Timeout {
    /// Fractional seconds: negative (or NaN) blocks, zero polls.
    fn from(secs: f64) -> Self {
        if secs.is_nan() || secs < 0.0 {
            return Timeout::Infinite;
        }
        if secs == 0.0 {
            return Timeout::Immediate;
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(d) => Timeout::After(d),
            Err(_) => Timeout::Infinite,
        }
    }
}

impl From<i32> for Timeout {
    fn from(secs: i32) -> Self {
        Timeout::from(secs as f64)
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Timeout::Immediate
        } else {
            Timeout::After(d)
        }
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        match d {
            None => Timeout::Infinite,
            Some(d) => Timeout::from(d),
        }
    }
}
