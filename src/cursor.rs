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

//! The ready events of one wait
use crate::association::{Association, Associations};
use crate::poll::Backend;
use crate::Readiness;
use std::fmt;
use std::iter::FusedIterator;
use std::os::unix::io::RawFd;

/// The readiness of one descriptor, paired with what it was registered with.
#[derive(Debug)]
pub struct Event<'a, T> {
    /// the ready descriptor
    pub fd: RawFd,
    /// data can be read
    pub readable: bool,
    /// data can be written
    pub writable: bool,
    /// priority data pending
    pub priority: bool,
    /// error condition
    pub error: bool,
    /// peer hung up
    pub hangup: bool,
    /// descriptor not open
    pub invalid: bool,
    /// the value given at insert time
    pub associated: &'a Association<T>,
}

impl<'a, T> Event<'a, T> {
    fn new(fd: RawFd, r: Readiness, associated: &'a Association<T>) -> Self {
        Event {
            fd,
            readable: r.contains(Readiness::READABLE),
            writable: r.contains(Readiness::WRITABLE),
            priority: r.contains(Readiness::PRIORITY),
            error: r.contains(Readiness::ERROR),
            hangup: r.contains(Readiness::HANGUP),
            invalid: r.contains(Readiness::INVALID),
            associated,
        }
    }

    /// the flags as one set
    pub fn readiness(&self) -> Readiness {
        let mut r = Readiness::empty();
        r.set(Readiness::READABLE, self.readable);
        r.set(Readiness::WRITABLE, self.writable);
        r.set(Readiness::PRIORITY, self.priority);
        r.set(Readiness::ERROR, self.error);
        r.set(Readiness::HANGUP, self.hangup);
        r.set(Readiness::INVALID, self.invalid);
        r
    }
}

/// Single-pass cursor over the result of [`crate::Pollset::events`].
///
/// It holds the pollset mutably borrowed, so no registration change or new
/// wait can happen while it is alive. Once drained, the backend's ready
/// buffer is released and every further `next()` returns `None`.
pub struct Events<'a, T> {
    backend: &'a mut dyn Backend,
    associations: &'a Associations<T>,
    pos: usize,
    peeked: Option<(RawFd, Readiness)>,
    exhausted: bool,
}

impl<'a, T> Events<'a, T> {
    pub(crate) fn new(backend: &'a mut dyn Backend, associations: &'a Associations<T>) -> Self {
        Events {
            backend,
            associations,
            pos: 0,
            peeked: None,
            exhausted: false,
        }
    }

    fn advance(&mut self) -> Option<(RawFd, Readiness)> {
        if self.exhausted {
            return None;
        }
        match self.backend.ready(&mut self.pos) {
            Some(ready) => Some(ready),
            None => {
                self.exhausted = true;
                self.backend.release();
                None
            }
        }
    }

    /// Whether another event is waiting, without consuming it.
    pub fn has_next(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        self.peeked.is_some()
    }

    /// Whether the cursor has been drained.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.peeked.is_none()
    }
}

impl<'a, T> Iterator for Events<'a, T> {
    type Item = Event<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (fd, readiness) = match self.peeked.take() {
            Some(ready) => ready,
            None => self.advance()?,
        };

        let associations: &'a Associations<T> = self.associations;
        match associations.get(fd) {
            Some(associated) => Some(Event::new(fd, readiness, associated)),
            None => {
                log::error!(
                    "{} reported descriptor {} which has no association",
                    self.backend.kind(),
                    fd
                );
                panic!("pollset bookkeeping lost descriptor {}", fd);
            }
        }
    }
}

impl<'a, T> FusedIterator for Events<'a, T> {}

impl<'a, T> fmt::Debug for Events<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("backend", &self.backend.kind())
            .field("pos", &self.pos)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::Kind;
    use crate::{Interest, Result, Timeout};

    /// a backend replaying a fixed ready list
    #[derive(Debug, Default)]
    struct Replay {
        ready: Vec<(RawFd, Readiness)>,
        released: usize,
    }

    impl Backend for Replay {
        fn kind(&self) -> Kind {
            Kind::Poll
        }

        fn register(&mut self, _: RawFd, _: Interest) -> Result<()> {
            Ok(())
        }

        fn modify(&mut self, _: RawFd, _: Interest) -> Result<()> {
            Ok(())
        }

        fn unregister(&mut self, _: RawFd) -> Result<()> {
            Ok(())
        }

        fn wait(&mut self, _: Timeout) -> Result<usize> {
            Ok(self.ready.len())
        }

        fn ready(&self, pos: &mut usize) -> Option<(RawFd, Readiness)> {
            let ready = self.ready.get(*pos).copied();
            *pos += 1;
            ready
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    #[test]
    fn test_drain_is_idempotent() {
        let mut backend = Replay {
            ready: vec![(4, Readiness::READABLE), (9, Readiness::WRITABLE)],
            ..Default::default()
        };
        let mut table = Associations::new();
        table.set(4, Some("four"));
        table.set(9, None);

        let mut events = Events::new(&mut backend, &table);
        assert!(events.has_next());
        assert!(events.has_next());

        let first = events.next().unwrap();
        assert_eq!(first.fd, 4);
        assert!(first.readable && !first.writable);
        assert_eq!(first.associated.value(), Some(&"four"));
        assert_eq!(first.readiness(), Readiness::READABLE);

        let second = events.next().unwrap();
        assert_eq!(second.associated, &Association::Descriptor(9));
        assert!(second.writable);

        assert!(!events.has_next());
        assert!(events.is_exhausted());
        for _ in 0..3 {
            assert!(events.next().is_none());
        }
        drop(events);
        assert_eq!(backend.released, 1);
    }

    #[test]
    fn test_empty_cursor() {
        let mut backend = Replay::default();
        let table: Associations<()> = Associations::new();
        let mut events = Events::new(&mut backend, &table);
        assert!(!events.is_exhausted());
        assert!(events.next().is_none());
        assert!(events.is_exhausted());
        assert_eq!(events.count(), 0);
    }

    #[test]
    #[should_panic(expected = "bookkeeping")]
    fn test_missing_association_is_fatal() {
        let mut backend = Replay {
            ready: vec![(12, Readiness::READABLE)],
            ..Default::default()
        };
        let table: Associations<()> = Associations::new();
        let mut events = Events::new(&mut backend, &table);
        let _ = events.next();
    }
}
