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

//! the utils of the rlimit operation
//!
use crate::error::*;
use nix::sys::resource::{self, Resource};
use snafu::ResultExt;

/// indicate no limit
pub const INFINITY: u64 = libc::RLIM_INFINITY as u64;

/// The current soft limit on open descriptors, clamped to `usize`.
///
/// Queried on every call so a limit lowered or raised at runtime is seen.
pub fn nofile_soft_limit() -> Result<usize> {
    let (soft, _) = resource::getrlimit(Resource::RLIMIT_NOFILE).context(NixSnafu)?;
    let soft = soft as u64;
    if soft == INFINITY || soft > usize::MAX as u64 {
        return Ok(usize::MAX);
    }
    Ok(soft as usize)
}
