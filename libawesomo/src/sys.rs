//! Sys — граница с ядром / The kernel boundary
//!
//! Логика стадий не вызывает nix напрямую: всё идёт через этот трейт.
//! Stage logic never calls nix directly: everything goes through this trait.
//!
//! Реализации / Implementations:
//!   linux::Linux      — настоящие syscall'ы через nix
//!   testing::MockSys  — журнал вызовов и внедряемые ошибки (тесты)

use core::convert::Infallible;
use core::time::Duration;
use std::os::unix::io::RawFd;

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::config::{MountSpec, Program, Serial};
use crate::Result;

/// Результат fork() с точки зрения вызывающего.
/// fork() as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fork {
    Parent { child: Pid },
    Child,
}

pub trait Sys {
    // === Файловая система / Filesystem ===

    fn mount(&self, spec: &MountSpec) -> Result<()>;
    fn unlink(&self, path: &str) -> Result<()>;
    fn chdir(&self, path: &str) -> Result<()>;
    fn chroot(&self, path: &str) -> Result<()>;
    /// Сбросить буферы ФС на диск / Flush filesystem buffers.
    fn sync(&self);

    // === Процессы / Processes ===

    /// SIGCHLD → SIG_IGN: ядро само убирает завершившихся детей.
    /// SIGCHLD → SIG_IGN: the kernel reaps exited children itself.
    fn ignore_child_exits(&self) -> Result<()>;
    fn setsid(&self) -> Result<()>;
    fn fork(&self) -> Result<Fork>;
    /// Заменить образ процесса. Возвращается только при ошибке.
    /// Replace the process image. Returns only on failure.
    fn execve(&self, program: &Program) -> Result<Infallible>;
    /// kill(-1, sig): всем процессам, кроме init и вызывающего.
    fn kill_all(&self, signal: Signal) -> Result<()>;
    /// reboot(RB_POWER_OFF). Возвращается только при ошибке.
    fn power_off(&self) -> Result<Infallible>;

    // === Дескрипторы / Descriptors ===

    fn close(&self, fd: RawFd) -> Result<()>;
    /// open(path, O_RDWR | O_NONBLOCK), без O_NOCTTY, чтобы tty стал управляющим.
    /// Without O_NOCTTY so the tty becomes the controlling terminal.
    fn open_tty(&self, path: &str) -> Result<RawFd>;
    fn dup(&self, fd: RawFd) -> Result<RawFd>;

    // === Вывод / Output ===

    /// Открыть устройство с O_NOCTTY, записать, закрыть.
    /// Open the device with O_NOCTTY, write, close.
    fn console_write(&self, device: &str, bytes: &[u8]) -> Result<()>;
    /// То же, но сперва выставить скорость порта / Same, after setting the baud rate.
    fn serial_write(&self, serial: &Serial, bytes: &[u8]) -> Result<()>;

    // === Время / Time ===

    fn sleep(&self, duration: Duration);
    /// Спать вечно с заданным шагом / Sleep forever in steps of `interval`.
    fn park(&self, interval: Duration) -> !;
}
