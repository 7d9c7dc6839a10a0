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

//! Installs a process-wide SIGUSR1 handler, so it is kept alone in this
//! test binary.

mod common;

use libtests::Pipe;
use pollset::{Error, Interest, Pollset};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

extern "C" fn on_signal(_: libc::c_int) {}

fn install_handler() {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        assert_eq!(libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()), 0);
    }
}

struct Target(libc::pthread_t);

unsafe impl Send for Target {}

#[test]
fn test_signal_interrupts_wait() {
    install_handler();

    common::each_backend(|mut set: Pollset| {
        let pipe = Pipe::new().unwrap();
        set.insert(pipe.rx(), Interest::READABLE).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let target = Target(unsafe { libc::pthread_self() });
        let kicker = {
            let stop = stop.clone();
            thread::spawn(move || {
                let target = target;
                // keep kicking, a signal landing before the wait starts is lost
                while !stop.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                    unsafe { libc::pthread_kill(target.0, libc::SIGUSR1) };
                }
            })
        };

        let err = set.events(-1).unwrap_err();
        stop.store(true, Ordering::SeqCst);
        kicker.join().unwrap();

        assert!(err.is_interrupted());
        assert!(matches!(err, Error::Interrupted { .. }));
        assert_eq!(err.get_errno(), libc::EINTR);

        // still usable afterwards
        assert!(set.contains(pipe.rx()));
        assert_eq!(set.events(0).unwrap().count(), 0);
    });
}
