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

//! A set of watched descriptors and the wait over them
use crate::association::{Association, Associations};
use crate::cursor::Events;
use crate::error::*;
use crate::poll::{self, Backend, Kind};
use crate::{Interest, Timeout};
use std::os::unix::io::RawFd;

/// Readiness multiplexer over one OS facility.
///
/// `T` is the type of the values descriptors can be associated with. The
/// pollset is not synchronized; share it between threads only behind a lock.
#[derive(Debug)]
pub struct Pollset<T = RawFd> {
    backend: Box<dyn Backend>,
    associations: Associations<T>,
}

impl<T> Pollset<T> {
    /// create a pollset on the backend selected at build time
    pub fn new() -> Result<Pollset<T>> {
        Self::with_backend(Kind::preferred())
    }

    /// create a pollset on a specific backend
    pub fn with_backend(kind: Kind) -> Result<Pollset<T>> {
        let backend = poll::open(kind)?;
        log::debug!("pollset created on {}", kind);
        Ok(Pollset {
            backend,
            associations: Associations::new(),
        })
    }

    /// The backend [`Pollset::new`] uses.
    pub const fn default_kind() -> Kind {
        Kind::preferred()
    }

    /// the active backend
    pub fn kind(&self) -> Kind {
        self.backend.kind()
    }

    /// the active backend name: "epoll", "kqueue", "poll" or "select"
    pub fn backend(&self) -> &'static str {
        self.backend.kind().name()
    }

    /// the epoll/kqueue descriptor, `None` for poll and select
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.backend.raw_fd()
    }

    /// number of registered descriptors
    pub fn len(&self) -> usize {
        self.associations.len()
    }

    /// whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// whether `fd` is registered
    pub fn contains(&self, fd: RawFd) -> bool {
        self.associations.contains(fd)
    }

    /// the association of a registered `fd`
    pub fn get(&self, fd: RawFd) -> Option<&Association<T>> {
        self.associations.get(fd)
    }

    /// Watch `fd` for `interest`; its events carry the descriptor itself.
    pub fn insert(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        self.register(fd, interest, None)
    }

    /// Watch `fd` for `interest`; its events carry `value`.
    pub fn insert_with(&mut self, fd: RawFd, interest: Interest, value: T) -> Result<()> {
        self.register(fd, interest, Some(value))
    }

    fn register(&mut self, fd: RawFd, interest: Interest, value: Option<T>) -> Result<()> {
        if self.associations.contains(fd) {
            return Err(Error::Exists { fd });
        }

        // the association is recorded only once the backend accepted fd
        self.backend.register(fd, interest)?;
        self.associations.set(fd, value);
        log::debug!("{}: watching fd {} for '{}'", self.backend(), fd, interest);
        Ok(())
    }

    /// Change the interest of a registered `fd`, keeping its association.
    pub fn update(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        if !self.associations.contains(fd) {
            return Err(Error::Invalid {
                fd,
                what: "descriptor is not registered",
            });
        }

        self.backend.modify(fd, interest)?;
        log::debug!("{}: fd {} now watched for '{}'", self.backend(), fd, interest);
        Ok(())
    }

    /// Stop watching `fd` and forget its association.
    ///
    /// A descriptor closed while still registered can be removed on every
    /// backend. When the backend refuses, both the watch and the association
    /// stay.
    pub fn remove(&mut self, fd: RawFd) -> Result<()> {
        if !self.associations.contains(fd) {
            return Err(Error::Invalid {
                fd,
                what: "descriptor is not registered",
            });
        }

        self.backend.unregister(fd)?;
        self.associations.delete(fd);
        log::debug!("{}: fd {} removed", self.backend(), fd);
        Ok(())
    }

    /// Wait for readiness and return a cursor over what fired.
    ///
    /// A negative timeout blocks, zero polls, anything else is fractional
    /// seconds (or a `Duration`). A signal arriving during the wait yields
    /// [`Error::Interrupted`], never an empty cursor.
    pub fn events(&mut self, timeout: impl Into<Timeout>) -> Result<Events<'_, T>> {
        let timeout = timeout.into();
        let n_ready = self.backend.wait(timeout)?;
        log::trace!(
            "{}: {} ready after waiting {:?}",
            self.backend(),
            n_ready,
            timeout
        );
        Ok(Events::new(self.backend.as_mut(), &self.associations))
    }
}
