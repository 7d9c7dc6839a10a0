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

//! poll(2) backend
//!
//! The pollfd array is kept sorted by descriptor, so the post-wait scan
//! reports in ascending descriptor order and lookups are a binary search.
//! The array grows by [`POLL_GROW_STEP`] entries at a time and never past the
//! RLIMIT_NOFILE soft limit in force when the growth is attempted.
//! Descriptors at or above that limit are refused when registered.

use super::{check_portable, Backend, Kind};
use crate::rlimit;
use crate::{Error, Interest, Readiness, Result, Timeout};
use libc::pollfd;
use std::os::unix::io::RawFd;

/// entries added to the pollfd array each time it is full
pub const POLL_GROW_STEP: usize = 32;

#[derive(Debug, Default)]
pub(crate) struct Poll {
    fds: Vec<pollfd>,
}

impl Poll {
    pub(crate) fn new() -> Poll {
        Poll { fds: Vec::new() }
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.fds.capacity()
    }

    fn position(&self, fd: RawFd) -> std::result::Result<usize, usize> {
        self.fds.binary_search_by_key(&fd, |p| p.fd)
    }

    /// make room for one more entry, checking the ceiling before allocating
    fn grow(&mut self, limit: usize) -> Result<()> {
        let len = self.fds.len();
        if len < self.fds.capacity() {
            return Ok(());
        }

        let target = len.saturating_add(POLL_GROW_STEP).min(limit);
        if target <= len {
            log::warn!(
                "pollfd array is full at {} entries (RLIMIT_NOFILE={})",
                len,
                limit
            );
            return Err(Error::NoMemory {
                what: "pollfd array reached RLIMIT_NOFILE",
            });
        }

        self.fds
            .try_reserve_exact(target - len)
            .map_err(|_| Error::NoMemory {
                what: "pollfd array allocation",
            })?;
        log::debug!("pollfd array grown to {} entries", self.fds.capacity());
        Ok(())
    }
}

fn poll_mask(interest: Interest) -> libc::c_short {
    let mut mask = 0;
    if interest.contains(Interest::READABLE) {
        mask |= libc::POLLIN;
    }
    if interest.contains(Interest::WRITABLE) {
        mask |= libc::POLLOUT;
    }
    if interest.contains(Interest::PRIORITY) {
        mask |= libc::POLLPRI;
    }
    mask
}

fn readiness(revents: libc::c_short) -> Readiness {
    let mut r = Readiness::empty();
    r.set(Readiness::READABLE, revents & libc::POLLIN != 0);
    r.set(Readiness::WRITABLE, revents & libc::POLLOUT != 0);
    r.set(Readiness::PRIORITY, revents & libc::POLLPRI != 0);
    r.set(Readiness::ERROR, revents & libc::POLLERR != 0);
    r.set(Readiness::HANGUP, revents & libc::POLLHUP != 0);
    r.set(Readiness::INVALID, revents & libc::POLLNVAL != 0);
    r
}

impl Backend for Poll {
    fn kind(&self) -> Kind {
        Kind::Poll
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        check_portable(fd, interest)?;
        if fd < 0 {
            return Err(Error::Invalid {
                fd,
                what: "negative descriptor",
            });
        }
        let limit = rlimit::nofile_soft_limit()?;
        if fd as usize >= limit {
            return Err(Error::Invalid {
                fd,
                what: "descriptor above RLIMIT_NOFILE",
            });
        }
        let index = match self.position(fd) {
            Ok(_) => return Err(Error::Exists { fd }),
            Err(index) => index,
        };

        self.grow(limit)?;
        self.fds.insert(
            index,
            pollfd {
                fd,
                events: poll_mask(interest),
                revents: 0,
            },
        );
        Ok(())
    }

    fn modify(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        check_portable(fd, interest)?;
        let index = self.position(fd).map_err(|_| Error::Invalid {
            fd,
            what: "descriptor is not registered",
        })?;
        self.fds[index].events = poll_mask(interest);
        Ok(())
    }

    fn unregister(&mut self, fd: RawFd) -> Result<()> {
        let index = self.position(fd).map_err(|_| Error::Invalid {
            fd,
            what: "descriptor is not registered",
        })?;
        self.fds.remove(index);
        Ok(())
    }

    fn wait(&mut self, timeout: Timeout) -> Result<usize> {
        let n_ready = syscall!(poll(
            self.fds.as_mut_ptr(),
            self.fds.len() as libc::nfds_t,
            timeout.as_millis(),
        ))?;
        Ok(n_ready as usize)
    }

    fn ready(&self, pos: &mut usize) -> Option<(RawFd, Readiness)> {
        while let Some(p) = self.fds.get(*pos) {
            *pos += 1;
            if p.revents != 0 {
                return Some((p.fd, readiness(p.revents)));
            }
        }
        None
    }
}
