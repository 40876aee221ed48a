//! Init Supervisor — /bin/start, настоящий PID 1
//!
//! Порядок / Order:
//!   1. SIGCHLD → SIG_IGN (зомби не копятся, wait() не нужен)
//!   2. setsid() — новая сессия, иначе в shell не работает job control
//!   3. close(0,1,2); open(tty) → 0; dup(0) → 1; dup(0) → 2
//!   4. один ребёнок: shell ("ishell") или init-скрипт
//!   5. спать вечно
//!
//! Любая ошибка: сообщение на /dev/console и тот же вечный сон.
//! Остальные сигналы остаются SIG_DFL: случайный SIGTERM убьёт PID 1.

use std::ffi::OsString;

use crate::config::{InitConfig, Program};
use crate::diag::{self, Fatal};
use crate::spawn;
use crate::sys::Sys;
use crate::Error;

/// Что запускать / What to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Интерактивный shell, удобно при разработке.
    InteractiveShell,
    InitScript,
}

impl Mode {
    /// Разобрать argv (включая argv[0]). Ровно один аргумент `token` → shell,
    /// всё остальное → скрипт.
    /// Parse argv, argv[0] included.
    pub fn from_args<I>(args: I, token: &str) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let rest: Vec<OsString> = args.into_iter().skip(1).map(Into::into).collect();
        match rest.as_slice() {
            [only] if only.as_os_str() == token => Mode::InteractiveShell,
            _ => Mode::InitScript,
        }
    }
}

impl InitConfig {
    fn program(&self, mode: Mode) -> &Program {
        match mode {
            Mode::InteractiveShell => &self.shell,
            Mode::InitScript => &self.script,
        }
    }

    fn spawn_failure_message(&self, mode: Mode) -> String {
        match mode {
            Mode::InteractiveShell => "Failed to launch interactive shell".to_string(),
            Mode::InitScript => {
                format!("Failed to run initialization script {}", self.script_path())
            }
        }
    }
}

/// Перепривязать 0/1/2 к `tty`; tty становится управляющим терминалом.
/// Rebind 0/1/2 to `tty`, which also becomes the controlling terminal.
///
/// Relies on the kernel handing out the lowest free descriptor: with 0/1/2
/// closed, open() must yield 0 and the two dup() calls 1 and 2.
pub fn bind_terminal<S: Sys>(sys: &S, tty: &str) -> Result<(), Fatal> {
    // Старые stdin/out/err (скорее всего /dev/console); ошибки не важны.
    for fd in 0..3 {
        let _ = sys.close(fd);
    }

    let stdin_msg = || format!("Could not open {} as stdin", tty);
    match sys.open_tty(tty) {
        Ok(0) => {}
        Ok(actual) => {
            return Err(Fatal::new(stdin_msg(), Error::Descriptor { expected: 0, actual }))
        }
        Err(err) => return Err(Fatal::new(stdin_msg(), err)),
    }

    for (expected, name) in [(1, "stdout"), (2, "stderr")] {
        let msg = || format!("Failed to reassign {} to {}", name, tty);
        match sys.dup(0) {
            Ok(actual) if actual == expected => {}
            Ok(actual) => return Err(Fatal::new(msg(), Error::Descriptor { expected, actual })),
            Err(err) => return Err(Fatal::new(msg(), err)),
        }
    }
    Ok(())
}

/// Всё до вечного сна. Ok значит, что ребёнок запущен.
/// Everything before parking. Ok means the child was launched.
pub fn start<S: Sys>(sys: &S, config: &InitConfig, mode: Mode) -> Result<(), Fatal> {
    sys.ignore_child_exits()
        .map_err(|err| Fatal::new("Could not ignore SIGCHLD", err))?;
    sys.setsid()
        .map_err(|err| Fatal::new("Could not create new session", err))?;
    bind_terminal(sys, config.tty)?;

    let program = config.program(mode);
    let message = config.spawn_failure_message(mode);
    log::info!("{:?}: launching {}", mode, program.argv.join(" "));
    spawn::spawn_and_release(sys, program, config.console, &message, config.idle_interval)
}

/// Точка входа PID 1. Не возвращается никогда.
/// PID-1 entry point. Never returns.
pub fn run<S: Sys>(sys: &S, config: &InitConfig, mode: Mode) -> ! {
    match start(sys, config, mode) {
        // Init не должен умирать и не должен крутиться вхолостую.
        Ok(()) => sys.park(config.idle_interval),
        Err(fatal) => diag::fatal(sys, config.console, config.idle_interval, fatal),
    }
}
