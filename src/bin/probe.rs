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

//! Watch descriptors of this process and print what becomes ready.

use clap::Parser;
use log::{Level, Log};
use pollset::{Interest, Kind, Pollset};
use std::io::Write;
use std::os::unix::io::RawFd;
use std::process::exit;
use std::str::FromStr;

/// parse program arguments
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Descriptor to watch, may be repeated; stdin when absent
    #[clap(short, long)]
    fd: Vec<RawFd>,

    /// Interest letters: r(ead) w(rite) p(riority) e(dge) o(neshot)
    #[clap(short, long, default_value = "r")]
    interest: Interest,

    /// Seconds to wait, negative blocks
    #[clap(short, long, default_value_t = -1.0, allow_hyphen_values = true)]
    timeout: f64,

    /// Number of waits
    #[clap(short, long, default_value_t = 1)]
    count: u32,

    /// Backend to use instead of the built-in one
    #[clap(short, long)]
    backend: Option<Kind>,

    /// Log level
    #[clap(
        short,
        long,
        default_value = "info",
        possible_values = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let module_path = match record.module_path() {
            None => "unknown",
            Some(v) => v,
        };
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "{} {} {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            module_path,
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn init_log(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::Info);
    if let Err(e) = log::set_logger(&LOGGER) {
        eprintln!("pollset-probe: failed to set global logger: {:?}", e);
        return;
    }
    log::set_max_level(level.to_level_filter());
}

fn run(args: Args) -> pollset::Result<()> {
    let kind = args.backend.unwrap_or_else(Kind::preferred);
    let mut set: Pollset = Pollset::with_backend(kind)?;
    println!("backend: {}", set.backend());

    let fds = if args.fd.is_empty() {
        vec![libc::STDIN_FILENO]
    } else {
        args.fd
    };
    for fd in fds {
        set.insert(fd, args.interest)?;
    }

    for round in 0..args.count {
        let mut ready = 0;
        for event in set.events(args.timeout)? {
            println!("fd={} flags={}", event.fd, event.readiness());
            ready += 1;
        }
        log::info!("wait {}: {} descriptor(s) ready", round, ready);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_log(&args.log_level);

    if let Err(e) = run(args) {
        log::error!("{}", e);
        eprintln!("pollset-probe: {}", e);
        exit(e.get_errno());
    }
}
