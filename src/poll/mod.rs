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

//! Encapsulation of the OS readiness facilities
//!
//! Each backend keeps its own registration state and the result of the last
//! wait. The facade walks that result through [`Backend::ready`] with a
//! position it owns, so a dense ready-list (epoll, kqueue) and a sparse scan
//! (poll, select) share one iteration protocol.

use crate::{Error, Interest, Readiness, Result, Timeout};
use std::fmt;
use std::os::unix::io::RawFd;
use std::str::FromStr;

/// syscall
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res < 0 {
            $crate::Result::Err($crate::Error::from_syscall(
                stringify!($fn),
                res as i32,
                nix::errno::Errno::last(),
            ))
        } else {
            $crate::Result::Ok(res)
        }
    }};
}

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) mod epoll;
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub(crate) mod kqueue;
#[allow(clippy::module_inception)]
pub(crate) mod poll;
pub(crate) mod select;

/// The OS facility a pollset waits with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Linux epoll(7)
    Epoll,
    /// BSD kqueue(2)
    Kqueue,
    /// POSIX poll(2)
    Poll,
    /// POSIX select(2)
    Select,
}

impl Kind {
    /// The diagnostic name of the backend.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Epoll => "epoll",
            Kind::Kqueue => "kqueue",
            Kind::Poll => "poll",
            Kind::Select => "select",
        }
    }

    /// Whether the backend is compiled in for this target.
    pub fn is_available(&self) -> bool {
        match self {
            Kind::Epoll => cfg!(any(target_os = "linux", target_os = "android")),
            Kind::Kqueue => cfg!(any(
                target_os = "macos",
                target_os = "ios",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd",
                target_os = "dragonfly"
            )),
            Kind::Poll | Kind::Select => true,
        }
    }

    /// The backend selected at build time.
    ///
    /// Native facility first, then poll, then select; the `force-poll` and
    /// `force-select` features skip ahead in that order.
    pub const fn preferred() -> Kind {
        if cfg!(feature = "force-select") {
            Kind::Select
        } else if cfg!(feature = "force-poll") {
            Kind::Poll
        } else if cfg!(any(target_os = "linux", target_os = "android")) {
            Kind::Epoll
        } else if cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        )) {
            Kind::Kqueue
        } else {
            Kind::Poll
        }
    }

    /// All backends usable on this target, in preference order.
    pub fn available() -> Vec<Kind> {
        [Kind::Epoll, Kind::Kqueue, Kind::Poll, Kind::Select]
            .into_iter()
            .filter(|k| k.is_available())
            .collect()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "epoll" => Ok(Kind::Epoll),
            "kqueue" => Ok(Kind::Kqueue),
            "poll" => Ok(Kind::Poll),
            "select" => Ok(Kind::Select),
            _ => Err(Error::Invalid {
                fd: -1,
                what: "unknown backend name",
            }),
        }
    }
}

/// The contract every OS facility is adapted to.
pub(crate) trait Backend: fmt::Debug {
    /// which facility this is
    fn kind(&self) -> Kind;

    /// the OS handle, if the facility has one
    fn raw_fd(&self) -> Option<RawFd> {
        None
    }

    /// start watching `fd`
    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<()>;

    /// change the interest of a watched `fd`
    fn modify(&mut self, fd: RawFd, interest: Interest) -> Result<()>;

    /// stop watching `fd`
    fn unregister(&mut self, fd: RawFd) -> Result<()>;

    /// block until readiness, timeout or error; returns how many entries
    /// the ready set holds
    fn wait(&mut self, timeout: Timeout) -> Result<usize>;

    /// the next ready entry at or after `*pos`, advancing `*pos` past it
    fn ready(&self, pos: &mut usize) -> Option<(RawFd, Readiness)>;

    /// drop the memory held for the last ready set
    fn release(&mut self) {}
}

/// Open the OS facility of `kind`.
pub(crate) fn open(kind: Kind) -> Result<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = match kind {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        Kind::Epoll => Box::new(epoll::Epoll::new()?),
        #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))]
        Kind::Kqueue => Box::new(kqueue::Kqueue::new()?),
        Kind::Poll => Box::new(poll::Poll::new()),
        Kind::Select => Box::new(select::Select::new()),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::Invalid {
                fd: -1,
                what: "backend not available on this platform",
            })
        }
    };
    Ok(backend)
}

/// Reject trigger bits a level-triggered scanning backend cannot honor.
pub(crate) fn check_portable(fd: RawFd, interest: Interest) -> Result<()> {
    if interest.is_extended() {
        return Err(Error::Invalid {
            fd,
            what: "edge-triggered and one-shot need epoll or kqueue",
        });
    }
    Ok(())
}
