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

//! select(2) backend
//!
//! Descriptors at or above FD_SETSIZE cannot be watched. The scanned range
//! `[min, max]` only ever widens; removing a descriptor leaves it as is.

use super::{check_portable, Backend, Kind};
use crate::{Error, Interest, Readiness, Result, Timeout};
use libc::fd_set;
use std::fmt;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;

const FD_SETSIZE: RawFd = libc::FD_SETSIZE as RawFd;

#[derive(Clone, Copy)]
struct FdSet(fd_set);

impl FdSet {
    fn new() -> FdSet {
        let mut set: fd_set = unsafe { mem::zeroed() };
        unsafe { libc::FD_ZERO(&mut set) };
        FdSet(set)
    }

    fn insert(&mut self, fd: RawFd) {
        unsafe { libc::FD_SET(fd, &mut self.0) };
    }

    fn remove(&mut self, fd: RawFd) {
        unsafe { libc::FD_CLR(fd, &mut self.0) };
    }

    fn contains(&self, fd: RawFd) -> bool {
        unsafe { libc::FD_ISSET(fd, &self.0) }
    }

    fn clear(&mut self) {
        unsafe { libc::FD_ZERO(&mut self.0) };
    }
}

pub(crate) struct Select {
    registered: FdSet,
    read: FdSet,
    write: FdSet,
    except: FdSet,
    ready_read: FdSet,
    ready_write: FdSet,
    ready_except: FdSet,
    min: RawFd,
    max: RawFd,
    n_sources: usize,
}

impl fmt::Debug for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("n_sources", &self.n_sources)
            .finish()
    }
}

impl Select {
    pub(crate) fn new() -> Select {
        Select {
            registered: FdSet::new(),
            read: FdSet::new(),
            write: FdSet::new(),
            except: FdSet::new(),
            ready_read: FdSet::new(),
            ready_write: FdSet::new(),
            ready_except: FdSet::new(),
            min: FD_SETSIZE,
            max: -1,
            n_sources: 0,
        }
    }

    /// the scanned descriptor range, inclusive
    #[cfg(test)]
    pub(crate) fn bounds(&self) -> (RawFd, RawFd) {
        (self.min, self.max)
    }

    fn check_registered(&self, fd: RawFd) -> Result<()> {
        if (0..FD_SETSIZE).contains(&fd) && self.registered.contains(fd) {
            return Ok(());
        }
        Err(Error::Invalid {
            fd,
            what: "descriptor is not registered",
        })
    }

    fn set_interest(&mut self, fd: RawFd, interest: Interest) {
        for (set, flag) in [
            (&mut self.read, Interest::READABLE),
            (&mut self.write, Interest::WRITABLE),
            (&mut self.except, Interest::PRIORITY),
        ] {
            if interest.contains(flag) {
                set.insert(fd);
            } else {
                set.remove(fd);
            }
        }
    }

    fn clear_ready(&mut self) {
        self.ready_read.clear();
        self.ready_write.clear();
        self.ready_except.clear();
    }
}

impl Backend for Select {
    fn kind(&self) -> Kind {
        Kind::Select
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        check_portable(fd, interest)?;
        if !(0..FD_SETSIZE).contains(&fd) {
            return Err(Error::Invalid {
                fd,
                what: "descriptor outside FD_SETSIZE",
            });
        }
        if self.registered.contains(fd) {
            return Err(Error::Exists { fd });
        }

        self.registered.insert(fd);
        self.set_interest(fd, interest);
        self.min = self.min.min(fd);
        self.max = self.max.max(fd);
        self.n_sources += 1;
        Ok(())
    }

    fn modify(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        check_portable(fd, interest)?;
        self.check_registered(fd)?;
        self.set_interest(fd, interest);
        Ok(())
    }

    fn unregister(&mut self, fd: RawFd) -> Result<()> {
        self.check_registered(fd)?;
        self.set_interest(fd, Interest::empty());
        self.registered.remove(fd);
        self.n_sources -= 1;
        Ok(())
    }

    fn wait(&mut self, timeout: Timeout) -> Result<usize> {
        self.ready_read = self.read;
        self.ready_write = self.write;
        self.ready_except = self.except;

        let mut tv = timeout.as_timeval();
        let tv_ptr = match tv.as_mut() {
            Some(tv) => tv as *mut libc::timeval,
            None => ptr::null_mut(),
        };

        let res = syscall!(select(
            self.max + 1,
            &mut self.ready_read.0,
            &mut self.ready_write.0,
            &mut self.ready_except.0,
            tv_ptr,
        ));
        match res {
            Ok(n_ready) => Ok(n_ready as usize),
            Err(e) => {
                self.clear_ready();
                Err(e)
            }
        }
    }

    fn ready(&self, pos: &mut usize) -> Option<(RawFd, Readiness)> {
        loop {
            let fd = self.min.checked_add(*pos as RawFd)?;
            if fd > self.max {
                return None;
            }
            *pos += 1;

            let mut r = Readiness::empty();
            r.set(Readiness::READABLE, self.ready_read.contains(fd));
            r.set(Readiness::WRITABLE, self.ready_write.contains(fd));
            r.set(Readiness::PRIORITY, self.ready_except.contains(fd));
            if !r.is_empty() {
                return Some((fd, r));
            }
        }
    }
}
