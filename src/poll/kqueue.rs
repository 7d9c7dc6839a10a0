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

//! kqueue(2) backend
//!
//! Read and write interest are two independent filters per descriptor.
//! Priority interest rides on the read filter as its out-of-band flag.

use super::{Backend, Kind};
use crate::{Error, Interest, Readiness, Result, Timeout};
use std::cmp::max;
use std::collections::HashMap;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;

#[cfg(any(target_os = "macos", target_os = "ios"))]
const OOB_FLAG: u32 = libc::EV_OOBAND as u32;
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
const OOB_FLAG: u32 = 0;

#[derive(Debug)]
pub(crate) struct Kqueue {
    kq: RawFd,
    sources: HashMap<RawFd, Interest>,
    n_filters: usize,
    events: Vec<libc::kevent>,
}

fn change_entry(fd: RawFd, filter: i64, flags: u32) -> libc::kevent {
    let mut ev: libc::kevent = unsafe { mem::zeroed() };
    ev.ident = fd as _;
    ev.filter = filter as _;
    ev.flags = flags as _;
    ev
}

fn wants_read(interest: Interest) -> bool {
    interest.intersects(Interest::READABLE | Interest::PRIORITY)
}

fn wants_write(interest: Interest) -> bool {
    interest.contains(Interest::WRITABLE)
}

fn filter_count(interest: Interest) -> usize {
    wants_read(interest) as usize + wants_write(interest) as usize
}

fn add_flags(interest: Interest) -> u32 {
    let mut flags = libc::EV_ADD as u32 | libc::EV_ENABLE as u32;
    if interest.contains(Interest::EDGE) {
        flags |= libc::EV_CLEAR as u32;
    }
    if interest.contains(Interest::ONESHOT) {
        flags |= libc::EV_ONESHOT as u32;
    }
    flags
}

/// the change list moving a descriptor from `old` to `new` interest
fn changes(fd: RawFd, old: Interest, new: Interest) -> Vec<libc::kevent> {
    let mut list = Vec::with_capacity(2);
    let flags = add_flags(new);

    if wants_read(new) {
        let mut read_flags = flags;
        if new.contains(Interest::PRIORITY) {
            read_flags |= OOB_FLAG;
        }
        list.push(change_entry(fd, libc::EVFILT_READ as i64, read_flags));
    } else if wants_read(old) {
        list.push(change_entry(fd, libc::EVFILT_READ as i64, libc::EV_DELETE as u32));
    }

    if wants_write(new) {
        list.push(change_entry(fd, libc::EVFILT_WRITE as i64, flags));
    } else if wants_write(old) {
        list.push(change_entry(fd, libc::EVFILT_WRITE as i64, libc::EV_DELETE as u32));
    }
    list
}

fn readiness(event: &libc::kevent) -> Readiness {
    let flags = event.flags as u32;
    let mut r = Readiness::empty();
    if event.filter == libc::EVFILT_READ {
        r |= Readiness::READABLE;
        if OOB_FLAG != 0 && flags & OOB_FLAG != 0 {
            r |= Readiness::PRIORITY;
        }
    } else if event.filter == libc::EVFILT_WRITE {
        r |= Readiness::WRITABLE;
    }
    r.set(Readiness::HANGUP, flags & libc::EV_EOF as u32 != 0);
    r.set(Readiness::ERROR, flags & libc::EV_ERROR as u32 != 0);
    r
}

impl Kqueue {
    pub(crate) fn new() -> Result<Kqueue> {
        let kq = syscall!(kqueue())?;
        if let Err(e) = syscall!(fcntl(kq, libc::F_SETFD, libc::FD_CLOEXEC)) {
            let _ = syscall!(close(kq));
            return Err(e);
        }
        Ok(Kqueue {
            kq,
            sources: HashMap::new(),
            n_filters: 0,
            events: Vec::new(),
        })
    }

    fn apply(&self, list: &[libc::kevent]) -> Result<()> {
        if list.is_empty() {
            return Ok(());
        }
        syscall!(kevent(
            self.kq,
            list.as_ptr(),
            list.len() as _,
            ptr::null_mut(),
            0,
            ptr::null(),
        ))
        .map(|_| ())
    }

    fn not_registered(fd: RawFd) -> Error {
        Error::Invalid {
            fd,
            what: "descriptor is not registered",
        }
    }
}

impl Backend for Kqueue {
    fn kind(&self) -> Kind {
        Kind::Kqueue
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.kq)
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        if self.sources.contains_key(&fd) {
            return Err(Error::Exists { fd });
        }
        let list = changes(fd, Interest::empty(), interest);
        if let Err(e) = self.apply(&list) {
            // a partially applied change list must not leave a filter behind
            for filter in [libc::EVFILT_READ as i64, libc::EVFILT_WRITE as i64] {
                let _ = self.apply(&[change_entry(fd, filter, libc::EV_DELETE as u32)]);
            }
            return Err(e);
        }
        self.sources.insert(fd, interest);
        self.n_filters += filter_count(interest);
        Ok(())
    }

    fn modify(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        let old = *self
            .sources
            .get(&fd)
            .ok_or_else(|| Self::not_registered(fd))?;
        self.apply(&changes(fd, old, interest))?;
        self.sources.insert(fd, interest);
        self.n_filters = self.n_filters - filter_count(old) + filter_count(interest);
        Ok(())
    }

    /// Closing a descriptor already drops its filters, so EBADF and ENOENT
    /// count as removed.
    fn unregister(&mut self, fd: RawFd) -> Result<()> {
        let old = *self
            .sources
            .get(&fd)
            .ok_or_else(|| Self::not_registered(fd))?;
        match self.apply(&changes(fd, old, Interest::empty())) {
            Ok(()) => {}
            Err(e) if matches!(e.get_errno(), libc::EBADF | libc::ENOENT) => {
                log::debug!("kqueue: fd {} was closed before removal", fd);
            }
            Err(e) => return Err(e),
        }
        self.sources.remove(&fd);
        self.n_filters -= filter_count(old);
        Ok(())
    }

    fn wait(&mut self, timeout: Timeout) -> Result<usize> {
        let size = max(self.n_filters, 1);
        let mut events = Vec::<libc::kevent>::new();
        events
            .try_reserve_exact(size)
            .map_err(|_| Error::NoMemory {
                what: "kqueue ready-event buffer",
            })?;
        self.events = events;

        let ts = timeout.as_timespec();
        let ts_ptr = match ts.as_ref() {
            Some(ts) => ts as *const libc::timespec,
            None => ptr::null(),
        };

        let n_ready = syscall!(kevent(
            self.kq,
            ptr::null(),
            0,
            self.events.as_mut_ptr(),
            size as _,
            ts_ptr,
        ))?;

        // the kernel filled exactly n_ready entries
        unsafe {
            self.events.set_len(n_ready as usize);
        }

        Ok(n_ready as usize)
    }

    fn ready(&self, pos: &mut usize) -> Option<(RawFd, Readiness)> {
        let event = self.events.get(*pos)?;
        *pos += 1;
        Some((event.ident as RawFd, readiness(event)))
    }

    fn release(&mut self) {
        self.events = Vec::new();
    }
}

impl Drop for Kqueue {
    fn drop(&mut self) {
        let _ = syscall!(close(self.kq));
    }
}
