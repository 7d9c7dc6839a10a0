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

//! This crate provides common descriptors and limits for unit tests
use nix::sys::resource::{self, Resource};
use nix::unistd;
use std::os::unix::io::RawFd;

/// A pipe whose two ends are closed on drop.
#[derive(Debug)]
pub struct Pipe {
    rx: RawFd,
    tx: RawFd,
}

impl Pipe {
    /// open a new pipe
    pub fn new() -> nix::Result<Pipe> {
        let (rx, tx) = unistd::pipe()?;
        Ok(Pipe { rx, tx })
    }

    /// the read end
    pub fn rx(&self) -> RawFd {
        self.rx
    }

    /// the write end
    pub fn tx(&self) -> RawFd {
        self.tx
    }

    /// write `buf` into the pipe
    pub fn write(&self, buf: &[u8]) -> nix::Result<usize> {
        unistd::write(self.tx, buf)
    }

    /// read what is buffered in the pipe into `buf`
    pub fn read(&self, buf: &mut [u8]) -> nix::Result<usize> {
        unistd::read(self.rx, buf)
    }

    /// close the write end, so the read end sees a hangup
    pub fn close_tx(&mut self) {
        if self.tx >= 0 {
            let _ = unistd::close(self.tx);
            self.tx = -1;
        }
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.close_tx();
        let _ = unistd::close(self.rx);
    }
}

/// Lowers the RLIMIT_NOFILE soft limit until dropped.
#[derive(Debug)]
pub struct NofileLimit {
    soft: libc::rlim_t,
    hard: libc::rlim_t,
}

impl NofileLimit {
    /// set the soft limit to `soft`, keeping the hard limit
    pub fn set(soft: u64) -> nix::Result<NofileLimit> {
        let (old_soft, hard) = resource::getrlimit(Resource::RLIMIT_NOFILE)?;
        resource::setrlimit(Resource::RLIMIT_NOFILE, soft as libc::rlim_t, hard)?;
        Ok(NofileLimit {
            soft: old_soft,
            hard,
        })
    }
}

impl Drop for NofileLimit {
    fn drop(&mut self) {
        let _ = resource::setrlimit(Resource::RLIMIT_NOFILE, self.soft, self.hard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_roundtrip() {
        let pipe = Pipe::new().unwrap();
        assert!(pipe.rx() >= 0 && pipe.tx() >= 0);
        assert_eq!(pipe.write(b"abc").unwrap(), 3);
        let mut buf = [0u8; 8];
        assert_eq!(pipe.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_close_tx_twice() {
        let mut pipe = Pipe::new().unwrap();
        pipe.close_tx();
        pipe.close_tx();
        assert_eq!(pipe.tx(), -1);
        let mut buf = [0u8; 1];
        assert_eq!(pipe.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_after_close_fails() {
        let mut pipe = Pipe::new().unwrap();
        pipe.close_tx();
        assert_eq!(pipe.write(b"x").unwrap_err(), nix::errno::Errno::EBADF);
    }
}
