//! Awesom-O Init — /bin/start, настоящий PID 1 / the real PID 1
//!
//! Привязывает tty1, запускает init-скрипт (или shell, если ядру передали
//! `ishell`) и засыпает навсегда.
//! Binds tty1, launches the init script (or a shell when the kernel command
//! line carries `ishell`) and sleeps forever.

use libawesomo::config::InitConfig;
use libawesomo::linux::Linux;
use libawesomo::logger::{self, Sink};
use libawesomo::supervisor::{self, Mode};

fn main() {
    let config = InitConfig::DEFAULT;
    logger::init(Sink::Console(config.console), logger::default_level());

    // args_os: не-UTF-8 в командной строке ядра не должен уронить PID 1.
    let mode = Mode::from_args(std::env::args_os(), config.shell_token);
    supervisor::run(&Linux, &config, mode)
}
