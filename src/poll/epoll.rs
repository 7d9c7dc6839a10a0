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

use super::{Backend, Kind};
use crate::{Error, Interest, Readiness, Result, Timeout};
use libc::{epoll_event, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD};
use std::cmp::max;
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr;

#[derive(Debug)]
pub(crate) struct Epoll {
    epoll_fd: RawFd,
    n_sources: usize,
    events: Vec<epoll_event>,
}

impl Epoll {
    pub(crate) fn new() -> Result<Epoll> {
        syscall!(epoll_create1(EPOLL_CLOEXEC)).map(|ep| Epoll {
            epoll_fd: ep,
            n_sources: 0,
            events: Vec::new(),
        })
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, interest: Interest) -> Result<()> {
        let mut event = epoll_event {
            events: epoll_mask(interest),
            u64: fd as u64,
        };
        syscall!(epoll_ctl(self.epoll_fd, op, fd, &mut event)).map(|_| ())
    }
}

fn epoll_mask(interest: Interest) -> u32 {
    let mut mask = 0;
    if interest.contains(Interest::READABLE) {
        mask |= libc::EPOLLIN;
    }
    if interest.contains(Interest::WRITABLE) {
        mask |= libc::EPOLLOUT;
    }
    if interest.contains(Interest::PRIORITY) {
        mask |= libc::EPOLLPRI;
    }
    if interest.contains(Interest::EDGE) {
        mask |= libc::EPOLLET;
    }
    if interest.contains(Interest::ONESHOT) {
        mask |= libc::EPOLLONESHOT;
    }
    mask as u32
}

fn gone(e: &Error) -> bool {
    matches!(e.get_errno(), libc::EBADF | libc::ENOENT)
}

fn readiness(events: u32) -> Readiness {
    let events = events as libc::c_int;
    let mut r = Readiness::empty();
    r.set(Readiness::READABLE, events & libc::EPOLLIN != 0);
    r.set(Readiness::WRITABLE, events & libc::EPOLLOUT != 0);
    r.set(Readiness::PRIORITY, events & libc::EPOLLPRI != 0);
    r.set(Readiness::ERROR, events & libc::EPOLLERR != 0);
    r.set(
        Readiness::HANGUP,
        events & (libc::EPOLLHUP | libc::EPOLLRDHUP) != 0,
    );
    r
}

impl Backend for Epoll {
    fn kind(&self) -> Kind {
        Kind::Epoll
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.epoll_fd)
    }

    fn register(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, interest)?;
        self.n_sources += 1;
        Ok(())
    }

    fn modify(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, interest)
    }

    /// Closing a descriptor already takes it off the interest list, so
    /// EBADF and ENOENT count as removed.
    fn unregister(&mut self, fd: RawFd) -> Result<()> {
        match syscall!(epoll_ctl(self.epoll_fd, EPOLL_CTL_DEL, fd, ptr::null_mut())) {
            Ok(_) => {}
            Err(e) if gone(&e) => {
                log::debug!("epoll: fd {} was closed before removal", fd);
            }
            Err(e) => return Err(e),
        }
        self.n_sources = self.n_sources.saturating_sub(1);
        Ok(())
    }

    /// epoll_wait(2) takes milliseconds, so the timeout is truncated to
    /// whole milliseconds; a sub-millisecond timeout does not block.
    fn wait(&mut self, timeout: Timeout) -> Result<usize> {
        let size = max(self.n_sources, 1);
        let mut events = Vec::<epoll_event>::new();
        events
            .try_reserve_exact(size)
            .map_err(|_| Error::NoMemory {
                what: "epoll ready-event buffer",
            })?;
        self.events = events;

        let n_ready = syscall!(epoll_wait(
            self.epoll_fd,
            self.events.as_mut_ptr(),
            size as libc::c_int,
            timeout.as_millis(),
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
        Some((event.u64 as RawFd, readiness(event.events)))
    }

    fn release(&mut self) {
        self.events = Vec::new();
    }
}

impl Drop for Epoll {
    fn drop(&mut self) {
        let _ = syscall!(close(self.epoll_fd));
    }
}

impl AsRawFd for Epoll {
    fn as_raw_fd(&self) -> RawFd {
        self.epoll_fd
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use libtests::Pipe;

    #[test]
    fn epoll_new() {
        let epoll = Epoll::new().unwrap();
        assert!(epoll.as_raw_fd() >= 0);
        assert_eq!(epoll.raw_fd(), Some(epoll.as_raw_fd()));
    }

    #[test]
    fn epoll_mask_bits() {
        let mask = epoll_mask(Interest::READABLE | Interest::PRIORITY | Interest::EDGE);
        assert_eq!(
            mask,
            (libc::EPOLLIN | libc::EPOLLPRI | libc::EPOLLET) as u32
        );
        let r = readiness((libc::EPOLLOUT | libc::EPOLLHUP) as u32);
        assert_eq!(r, Readiness::WRITABLE | Readiness::HANGUP);
    }

    #[test]
    fn epoll_add_wait_del() {
        let mut epoll = Epoll::new().unwrap();
        let pipe = Pipe::new().unwrap();

        epoll.register(pipe.rx(), Interest::READABLE).unwrap();
        assert_eq!(epoll.wait(Timeout::Immediate).unwrap(), 0);

        pipe.write(b"x").unwrap();
        assert_eq!(epoll.wait(Timeout::from(1.0)).unwrap(), 1);
        let mut pos = 0;
        assert_eq!(
            epoll.ready(&mut pos),
            Some((pipe.rx(), Readiness::READABLE))
        );
        assert_eq!(epoll.ready(&mut pos), None);
        epoll.release();
        assert_eq!(epoll.ready(&mut 0), None);

        epoll.modify(pipe.rx(), Interest::PRIORITY).unwrap();
        assert_eq!(epoll.wait(Timeout::Immediate).unwrap(), 0);

        epoll.unregister(pipe.rx()).unwrap();
        assert_eq!(epoll.n_sources, 0);
    }

    #[test]
    fn epoll_register_twice() {
        let mut epoll = Epoll::new().unwrap();
        let pipe = Pipe::new().unwrap();
        epoll.register(pipe.rx(), Interest::READABLE).unwrap();
        let err = epoll.register(pipe.rx(), Interest::READABLE).unwrap_err();
        assert_eq!(err.get_errno(), libc::EEXIST);
        assert_eq!(epoll.n_sources, 1);
    }

    #[test]
    fn epoll_modify_unknown() {
        let mut epoll = Epoll::new().unwrap();
        let pipe = Pipe::new().unwrap();
        let err = epoll.modify(pipe.rx(), Interest::READABLE).unwrap_err();
        assert_eq!(err.get_errno(), libc::ENOENT);
        assert_eq!(epoll.n_sources, 0);
    }

    #[test]
    fn epoll_unregister_closed() {
        let mut epoll = Epoll::new().unwrap();
        let pipe = Pipe::new().unwrap();
        let rx = pipe.rx();
        epoll.register(rx, Interest::READABLE).unwrap();
        epoll.register(pipe.tx(), Interest::WRITABLE).unwrap();
        drop(pipe);

        epoll.unregister(rx).unwrap();
        assert_eq!(epoll.n_sources, 1);
        assert!(!gone(&Error::Exists { fd: rx }));
    }
}
