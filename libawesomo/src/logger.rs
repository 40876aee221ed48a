//! Логгер — бэкенд для `log` / Backend for the `log` facade
//!
//! PID 1 пишет в /dev/console (открываем на каждую запись с O_NOCTTY:
//! дескрипторы 0/1/2 ещё не привязаны или уже отданы tty1).
//! PID 1 writes to /dev/console, reopened per record with O_NOCTTY.
//! shutdown пишет в stdout голый текст, как обычная утилита.
//! shutdown prints the bare text to stdout, like any other utility.
//!
//! Фиксированная диагностика (diag) идёт отдельно и от уровня не зависит.

use core::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io::{self, Write as _};
use std::os::unix::fs::OpenOptionsExt;

use log::{LevelFilter, Log, Metadata, Record};
use nix::fcntl::OFlag;
use spin::{Mutex, Once};

/// Куда писать / Where records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Console(&'static str),
    Stdout,
}

struct Logger {
    sink: Sink,
}

static LOGGER: Once<Logger> = Once::new();
static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Уровень для PID 1 / PID-1 level.
pub fn default_level() -> LevelFilter {
    LevelFilter::Warn
}

/// Установить логгер. Повторный вызов ничего не меняет.
/// Install the logger. Calling it again changes nothing.
pub fn init(sink: Sink, level: LevelFilter) {
    let logger = LOGGER.call_once(|| Logger { sink });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

/// Console: `[LEVEL target] message\n`; Stdout: `message\n`.
fn format_record(sink: Sink, record: &Record<'_>) -> String {
    let mut line = String::new();
    // Запись в String не падает / Writing into a String cannot fail.
    let _ = match sink {
        Sink::Console(_) => {
            let target = record.target().rsplit("::").next().unwrap_or("");
            writeln!(line, "[{} {}] {}", record.level(), target, record.args())
        }
        Sink::Stdout => writeln!(line, "{}", record.args()),
    };
    line
}

impl Logger {
    fn emit(&self, line: &str) -> io::Result<()> {
        match self.sink {
            Sink::Console(device) => OpenOptions::new()
                .write(true)
                .custom_flags(OFlag::O_NOCTTY.bits())
                .open(device)?
                .write_all(line.as_bytes()),
            Sink::Stdout => io::stdout().lock().write_all(line.as_bytes()),
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(self.sink, record);
        let _guard = WRITE_LOCK.lock();
        // Логи best-effort: без консоли продолжаем молча.
        let _ = self.emit(&line);
    }

    fn flush(&self) {
        if self.sink == Sink::Stdout {
            let _ = io::stdout().flush();
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("sink", &self.sink).finish()
    }
}
