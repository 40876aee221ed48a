//! Диагностика для оператора / Operator diagnostics
//!
//! Формат / Format:
//!   <message>\nerrno = <n> (<strerror>)\n   — не длиннее 256 байт
//!   \n                                     — ещё одна строка, чтобы обрезанное
//!                                            сообщение всё равно было видно
//!
//! Запись на консоль best-effort: если /dev/console не открылся, молчим.

use core::fmt;

use crate::sys::Sys;
use crate::Error;

/// Верхняя граница одного сообщения / Upper bound of one message block.
pub const MAX_MESSAGE: usize = 256;

/// Невосстановимая ошибка PID 1: сообщить и уснуть.
/// An unrecoverable PID-1 failure: report it, then sleep.
#[derive(Debug)]
pub struct Fatal {
    pub message: String,
    pub error: Error,
}

impl Fatal {
    pub fn new(message: impl Into<String>, error: Error) -> Self {
        Self { message: message.into(), error }
    }

    pub fn render(&self) -> Vec<u8> {
        render(&self.message, &self.error)
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.error)
    }
}

/// Собрать сообщение в фиксированном формате.
pub fn render(message: &str, error: &Error) -> Vec<u8> {
    let (code, desc) = error.errno();
    let mut out = format!("{}\nerrno = {} ({})\n", message, code, desc).into_bytes();
    out.truncate(MAX_MESSAGE);
    out.push(b'\n');
    out
}

/// Написать на консоль; ошибки открытия и записи игнорируются.
/// Write to the console; open and write errors are ignored.
///
/// Логгер PID 1 пишет на ту же консоль, поэтому здесь только блок diag.
/// The PID-1 logger shares the console, so only the diag block goes out here.
pub fn report<S: Sys>(sys: &S, console: &str, message: &str, error: &Error) {
    if let Err(err) = sys.console_write(console, &render(message, error)) {
        log::debug!("console {} unavailable: {}", console, err);
    }
}

/// Сообщить и уйти в вечный сон. PID 1 не имеет права завершиться.
/// Report and park forever. PID 1 is not allowed to exit.
pub fn fatal<S: Sys>(sys: &S, console: &str, idle: core::time::Duration, fatal: Fatal) -> ! {
    report(sys, console, &fatal.message, &fatal.error);
    sys.park(idle)
}
