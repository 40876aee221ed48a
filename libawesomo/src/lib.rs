//! libawesomo — жизненный цикл userspace Awesom-O / Awesom-O userspace lifecycle
//!
//! Три стадии / Three stages:
//!   boot       — usbboot: ждать USB root, chroot, exec /bin/start
//!   supervisor — /bin/start: PID 1, терминал, один ребёнок, сон навсегда
//!   shutdown   — SIGTERM → SIGKILL → remount ro → sync → power off
//!
//! Все обращения к ядру идут через трейт [`sys::Sys`].
//! All kernel access goes through the [`sys::Sys`] trait.
//!
//! Использование / Usage:
//!   use libawesomo::{boot, config::BootConfig, linux::Linux};
//!   boot::run(&Linux, &BootConfig::DEFAULT);

pub mod boot;
pub mod config;
pub mod diag;
pub mod linux;
pub mod logger;
pub mod shutdown;
pub mod spawn;
pub mod supervisor;
pub mod sys;

#[cfg(test)]
pub mod testing;

use core::fmt;
use std::os::unix::io::RawFd;

use nix::errno::Errno;

/// Ошибки syscall / Syscall errors
#[derive(Debug)]
pub enum Error {
    /// Ядро вернуло errno / The kernel returned an errno.
    Sys(Errno),
    /// Ошибка std I/O (консоль, serial) / std I/O error (console, serial).
    Io(std::io::Error),
    /// open()/dup() выдали не тот дескриптор, который мы ждали.
    /// open()/dup() handed back a different descriptor than expected.
    Descriptor { expected: RawFd, actual: RawFd },
    /// Строка с NUL внутри не может уйти в execve.
    InvalidArg,
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Числовой errno и его описание для строки `errno = <n> (<desc>)`.
    ///
    /// Errors that did not come from the kernel report `0 (Success)`, which is
    /// what `strerror(errno)` prints when no call has set it.
    pub fn errno(&self) -> (i32, &'static str) {
        match self {
            Error::Sys(errno) => (*errno as i32, errno.desc()),
            Error::Io(err) => match err.raw_os_error() {
                Some(raw) => {
                    let errno = Errno::from_raw(raw);
                    (raw, errno.desc())
                }
                None => (0, "Success"),
            },
            Error::Descriptor { .. } | Error::InvalidArg => (0, "Success"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sys(errno) => write!(f, "{}", errno.desc()),
            Error::Io(err) => write!(f, "{}", err),
            Error::Descriptor { expected, actual } => {
                write!(f, "got descriptor {} instead of {}", actual, expected)
            }
            Error::InvalidArg => f.write_str("argument contains an interior NUL byte"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        Error::Sys(errno)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
