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

//! # A readiness multiplexer over epoll, kqueue, poll and select
//!
//! Register descriptors with the readiness they should be watched for and a
//! value to hand back, then wait for a batch of them to become ready.
//!
//! One backend is compiled in per platform: epoll on Linux, kqueue on the
//! BSDs and Apple targets, poll elsewhere. The `force-poll` and
//! `force-select` features pick the portable backends instead, and
//! [`Pollset::with_backend`] opens any backend available on the host.
//!
//! # Example:
//! ```rust
//! # use nix::unistd::{close, pipe, write};
//! # use pollset::{Interest, Pollset};
//! #
//! let (rx, tx) = pipe().unwrap();
//!
//! /// Create the pollset on the build-time backend
//! let mut set: Pollset<&str> = Pollset::new().unwrap();
//!
//! /// Watch the read end, tagged with a name
//! set.insert_with(rx, Interest::READABLE, "reader").unwrap();
//!
//! /// Make it readable
//! assert_eq!(write(tx, b"x").unwrap(), 1);
//!
//! /// Wait at most one second
//! for event in set.events(1.0).unwrap() {
//!     assert!(event.readable);
//!     assert_eq!(event.associated.value(), Some(&"reader"));
//! }
//!
//! set.remove(rx).unwrap();
//! # close(rx).unwrap();
//! # close(tx).unwrap();
//! ```
//!
pub mod association;
pub mod cursor;
pub mod error;
pub mod interest;
pub mod poll;
pub mod pollset;
pub mod rlimit;
pub mod timeout;

pub use crate::association::Association;
pub use crate::cursor::{Event, Events};
pub use crate::interest::{Interest, ParseInterestError, Readiness};
pub use crate::poll::poll::POLL_GROW_STEP;
pub use crate::poll::Kind;
pub use crate::pollset::Pollset;
pub use crate::timeout::Timeout;
pub use error::*;
