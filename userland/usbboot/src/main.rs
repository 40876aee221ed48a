//! Awesom-O usbboot — первый userspace процесс / first userspace process
//!
//! Ждёт USB-накопитель с корнем, делает chroot и exec /bin/start.
//! Waits for the USB root device, chroots into it and execs /bin/start.

use libawesomo::boot;
use libawesomo::config::BootConfig;
use libawesomo::linux::Linux;
use libawesomo::logger::{self, Sink};

fn main() {
    let config = BootConfig::DEFAULT;
    logger::init(Sink::Console(config.console), logger::default_level());
    boot::run(&Linux, &config)
}
