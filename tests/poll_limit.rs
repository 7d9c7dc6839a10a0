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

//! Lowers RLIMIT_NOFILE for the whole process, so it is kept in its own
//! test binary and the tests here take turns.

use libtests::{NofileLimit, Pipe};
use pollset::{Interest, Kind, Pollset, POLL_GROW_STEP};
use std::sync::{Mutex, MutexGuard};

static LIMIT_LOCK: Mutex<()> = Mutex::new(());

fn serialize() -> MutexGuard<'static, ()> {
    LIMIT_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn test_descriptor_above_nofile_limit_is_invalid() {
    const CEILING: usize = 16;
    let _serial = serialize();

    // open everything first, the lowered limit only constrains registration
    let pipes: Vec<Pipe> = (0..40).map(|_| Pipe::new().unwrap()).collect();
    let mut set: Pollset<usize> = Pollset::with_backend(Kind::Poll).unwrap();
    let guard = NofileLimit::set(CEILING as u64).unwrap();

    let mut accepted = 0;
    let mut refused = Vec::new();
    for (i, p) in pipes.iter().enumerate() {
        let fd = p.tx();
        match set.insert_with(fd, Interest::WRITABLE, i) {
            Ok(()) => {
                assert!((fd as usize) < CEILING, "fd {} accepted", fd);
                accepted += 1;
            }
            Err(e) => {
                assert!((fd as usize) >= CEILING, "fd {} refused: {}", fd, e);
                assert_eq!(e.get_errno(), libc::EINVAL, "{}", e);
                assert!(!set.contains(fd));
                refused.push(i);
            }
        }
    }
    assert!(accepted > 0);
    assert!(!refused.is_empty());
    assert_eq!(set.len(), accepted);
    assert_eq!(set.events(0).unwrap().count(), accepted);

    // the limit is read on every insert, raising it lets the same fd in
    drop(guard);
    let i = refused[0];
    set.insert_with(pipes[i].tx(), Interest::WRITABLE, i).unwrap();
    assert_eq!(set.len(), accepted + 1);
}

#[test]
fn test_poll_array_stops_at_nofile_limit() {
    const CEILING: usize = POLL_GROW_STEP;
    let _serial = serialize();

    let pipes: Vec<Pipe> = (0..POLL_GROW_STEP + 8)
        .map(|_| Pipe::new().unwrap())
        .collect();
    let low = [pipes[0].rx(), pipes[1].rx()];
    let high = pipes[pipes.len() - 1].rx();
    assert!(low.iter().all(|fd| (*fd as usize) < CEILING));
    assert!(high as usize >= CEILING);

    // fill the first growth step under the default limit
    let mut set: Pollset<usize> = Pollset::with_backend(Kind::Poll).unwrap();
    for (i, p) in pipes.iter().take(POLL_GROW_STEP).enumerate() {
        set.insert_with(p.tx(), Interest::WRITABLE, i).unwrap();
    }
    assert_eq!(set.len(), POLL_GROW_STEP);

    let guard = NofileLimit::set(CEILING as u64).unwrap();

    // a low descriptor fits the limit but the array may not grow
    let err = set.insert_with(low[0], Interest::READABLE, 100).unwrap_err();
    assert_eq!(err.get_errno(), libc::ENOMEM, "{}", err);
    assert!(!set.contains(low[0]));

    let err = set.insert_with(high, Interest::READABLE, 101).unwrap_err();
    assert_eq!(err.get_errno(), libc::EINVAL, "{}", err);

    // removing one frees a slot for the next insert, and only one
    set.remove(pipes[5].tx()).unwrap();
    set.insert_with(low[0], Interest::READABLE, 100).unwrap();
    let err = set.insert_with(low[1], Interest::READABLE, 102).unwrap_err();
    assert_eq!(err.get_errno(), libc::ENOMEM, "{}", err);

    // the registrations that made it are all intact
    let mut reported: Vec<usize> = set
        .events(0)
        .unwrap()
        .map(|e| {
            let i = *e.associated.value().unwrap();
            assert_eq!(e.fd, pipes[i].tx());
            assert!(e.writable);
            i
        })
        .collect();
    reported.sort_unstable();
    let expect: Vec<usize> = (0..POLL_GROW_STEP).filter(|i| *i != 5).collect();
    assert_eq!(reported, expect);

    drop(guard);
}
