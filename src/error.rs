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

//! Error define
use nix::errno::Errno;
use snafu::prelude::*;
use std::os::unix::io::RawFd;

/// Pollset Error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Error {
    #[snafu(display(
        "Error(pollset): Got an error: (ret={}, errno={}) for syscall: {}",
        ret,
        errno,
        syscall
    ))]
    Syscall {
        syscall: &'static str,
        ret: i32,
        errno: i32,
    },
    #[snafu(display("Error(pollset): {} was interrupted by a signal.", syscall))]
    Interrupted { syscall: &'static str },
    #[snafu(display("Error(pollset): Invalid descriptor {}: '{}'.", fd, what))]
    Invalid { fd: RawFd, what: &'static str },
    #[snafu(display("Error(pollset): Descriptor {} is already registered.", fd))]
    Exists { fd: RawFd },
    #[snafu(display("Error(pollset): Out of memory: '{}'.", what))]
    NoMemory { what: &'static str },
    #[snafu(display("Error(pollset): Nix error: {}", source))]
    Nix { source: nix::Error },
}

impl Error {
    /// Translate the error to the OS error number it stands for.
    pub fn get_errno(&self) -> i32 {
        match self {
            Error::Syscall { errno, .. } => *errno,
            Error::Interrupted { .. } => Errno::EINTR as i32,
            Error::Invalid { .. } => Errno::EINVAL as i32,
            Error::Exists { .. } => Errno::EEXIST as i32,
            Error::NoMemory { .. } => Errno::ENOMEM as i32,
            Error::Nix { source } => *source as i32,
        }
    }

    /// A wait that returned early because a signal was delivered.
    pub fn is_interrupted(&self) -> bool {
        self.get_errno() == Errno::EINTR as i32
    }

    /// Build the error for a failed raw syscall from the errno it left behind.
    pub(crate) fn from_syscall(syscall: &'static str, ret: i32, errno: Errno) -> Error {
        match errno {
            Errno::EINTR => Error::Interrupted { syscall },
            _ => Error::Syscall {
                syscall,
                ret,
                errno: errno as i32,
            },
        }
    }
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;
