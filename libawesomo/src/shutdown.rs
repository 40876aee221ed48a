//! Shutdown Controller — одноразовое выключение / one-shot power-off
//!
//! Шаги / Steps:
//!   1. kill(-1, SIGTERM)          — попросить всех завершиться
//!   2. sleep(1 s)                 — приложения Awesom-O выходят быстро
//!   3. kill(-1, SIGKILL)          — добить оставшихся
//!   4. mount("/", REMOUNT|RDONLY) — без umount: открытые файлы никто не отпустит
//!   5. sync(); reboot(POWER_OFF)  — при успехе не возвращается
//!
//! Любая ошибка обрывает последовательность; отката нет. Это обычный процесс
//! (не PID 1), так что ему можно завершиться с кодом 1.
//!
//! kill(-1) не щадит ни предков вызывающего, ни скрипт, который нас запустил:
//! если они умрут раньше, чем мы дойдём до reboot, выключение не случится.

use core::convert::Infallible;
use core::fmt;

use nix::sys::signal::Signal;

use crate::config::ShutdownConfig;
use crate::diag;
use crate::sys::Sys;
use crate::Error;

/// Шаг, на котором всё оборвалось / The step that aborted the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Terminate,
    Kill,
    Remount,
    PowerOff,
}

impl Step {
    fn message(self) -> &'static str {
        match self {
            Step::Terminate => "Failed to send SIGTERM to all processes",
            Step::Kill => "Failed to kill processes with SIGKILL",
            Step::Remount => "Failed to remount root read-only",
            Step::PowerOff => "Shutdown failed",
        }
    }

    fn abort(self, error: Error) -> Failure {
        Failure { step: self, error }
    }
}

#[derive(Debug)]
pub struct Failure {
    pub step: Step,
    pub error: Error,
}

impl Failure {
    /// Диагностика в фиксированном формате / Diagnostic in the fixed format.
    pub fn render(&self) -> Vec<u8> {
        diag::render(self.step.message(), &self.error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step.message(), self.error)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Выполнить выключение. При успехе не возвращается.
/// Run the shutdown. Does not return on success.
pub fn run<S: Sys>(sys: &S, config: &ShutdownConfig) -> Result<Infallible, Failure> {
    log::info!("Sending SIGTERM to all processes..");
    sys.kill_all(Signal::SIGTERM)
        .map_err(|err| Step::Terminate.abort(err))?;

    sys.sleep(config.grace_period);

    log::info!("Killing off any remaining processes with SIGKILL..");
    sys.kill_all(Signal::SIGKILL)
        .map_err(|err| Step::Kill.abort(err))?;

    log::info!("Remounting root read-only...");
    sys.mount(&config.root_remount)
        .map_err(|err| Step::Remount.abort(err))?;

    log::info!("Flushing filesystem buffers...");
    sys.sync();

    log::info!("Shutting down...");
    // reboot() при успехе не возвращается / reboot() does not return on success.
    let err = match sys.power_off() {
        Ok(never) => match never {},
        Err(err) => err,
    };
    Err(Step::PowerOff.abort(err))
}
