//! Linux — реализация Sys через nix / Sys implemented over nix

use core::convert::Infallible;
use core::time::Duration;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::RawFd;
use std::thread;

use nix::fcntl::{self, OFlag};
use nix::mount;
use nix::sys::reboot::{self, RebootMode};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::stat::Mode;
use nix::sys::termios::{self, SetArg};
use nix::unistd::{self, ForkResult, Pid};

use crate::config::{MountSpec, Program, Serial};
use crate::sys::{Fork, Sys};
use crate::{Error, Result};

/// Настоящее ядро / The real kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct Linux;

fn c_strings(items: &[&str]) -> Result<Vec<CString>> {
    items
        .iter()
        .map(|s| CString::new(*s).map_err(|_| Error::InvalidArg))
        .collect()
}

fn open_device(device: &str, flags: OFlag) -> Result<File> {
    let file = OpenOptions::new()
        .read(flags.contains(OFlag::O_RDWR))
        .write(true)
        .custom_flags(flags.bits())
        .open(device)?;
    Ok(file)
}

impl Sys for Linux {
    fn mount(&self, spec: &MountSpec) -> Result<()> {
        mount::mount(spec.source, spec.target, spec.fstype, spec.flags, spec.data)?;
        Ok(())
    }

    fn unlink(&self, path: &str) -> Result<()> {
        unistd::unlink(path)?;
        Ok(())
    }

    fn chdir(&self, path: &str) -> Result<()> {
        unistd::chdir(path)?;
        Ok(())
    }

    fn chroot(&self, path: &str) -> Result<()> {
        unistd::chroot(path)?;
        Ok(())
    }

    fn sync(&self) {
        unistd::sync();
    }

    fn ignore_child_exits(&self) -> Result<()> {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        // SAFETY: SIG_IGN не запускает никакого кода в контексте сигнала.
        // SAFETY: SIG_IGN runs no code in signal context.
        unsafe { signal::sigaction(Signal::SIGCHLD, &ignore) }?;
        Ok(())
    }

    fn setsid(&self) -> Result<()> {
        unistd::setsid()?;
        Ok(())
    }

    fn fork(&self) -> Result<Fork> {
        // SAFETY: все три стадии однопоточные, ребёнок сразу уходит в execve.
        // SAFETY: all three stages are single-threaded; the child goes straight to execve.
        match unsafe { unistd::fork() }? {
            ForkResult::Parent { child } => Ok(Fork::Parent { child }),
            ForkResult::Child => Ok(Fork::Child),
        }
    }

    fn execve(&self, program: &Program) -> Result<Infallible> {
        let path = CString::new(program.path).map_err(|_| Error::InvalidArg)?;
        let argv = c_strings(program.argv)?;
        let env = c_strings(program.env)?;
        Ok(unistd::execve(&path, &argv, &env)?)
    }

    fn kill_all(&self, sig: Signal) -> Result<()> {
        signal::kill(Pid::from_raw(-1), sig)?;
        Ok(())
    }

    fn power_off(&self) -> Result<Infallible> {
        Ok(reboot::reboot(RebootMode::RB_POWER_OFF)?)
    }

    fn close(&self, fd: RawFd) -> Result<()> {
        unistd::close(fd)?;
        Ok(())
    }

    fn open_tty(&self, path: &str) -> Result<RawFd> {
        Ok(fcntl::open(path, OFlag::O_RDWR | OFlag::O_NONBLOCK, Mode::empty())?)
    }

    fn dup(&self, fd: RawFd) -> Result<RawFd> {
        Ok(unistd::dup(fd)?)
    }

    fn console_write(&self, device: &str, bytes: &[u8]) -> Result<()> {
        let mut console = open_device(device, OFlag::O_WRONLY | OFlag::O_NOCTTY)?;
        console.write_all(bytes)?;
        Ok(())
    }

    fn serial_write(&self, serial: &Serial, bytes: &[u8]) -> Result<()> {
        let mut port = open_device(
            serial.device,
            OFlag::O_RDWR | OFlag::O_NOCTTY | OFlag::O_NONBLOCK,
        )?;
        let mut opts = termios::tcgetattr(&port)?;
        termios::cfsetospeed(&mut opts, serial.baud)?;
        termios::tcsetattr(&port, SetArg::TCSANOW, &opts)?;
        port.write_all(bytes)?;
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn park(&self, interval: Duration) -> ! {
        loop {
            thread::sleep(interval);
        }
    }
}
