//! Bootstrap — usbboot, временный PID 1 / provisional PID 1
//!
//! Ждём USB-накопитель с корнем, переезжаем в него и превращаемся в
//! настоящий init, оставаясь PID 1.
//! Wait for the USB root device, move into it and become the real init
//! while keeping PID 1.
//!
//! Стадии / Stages:
//!   Bootstrap  — mount с повтором каждые 100 мс, без лимита
//!   Pivoted    — после chdir + chroot; старый корень недостижим
//!   (execve)   — BootStage::Running начинается уже в /bin/start
//!
//! Каждая стадия потребляется по значению: вернуться назад нельзя.

use core::time::Duration;

use crate::config::BootConfig;
use crate::diag::{self, Fatal};
use crate::sys::Sys;

/// Состояние единственного PID 1 / State of the single PID-1 process.
///
/// `Bootstrapping → Running` happens once, by replacing the process image;
/// nothing in this image can observe `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStage {
    Bootstrapping,
    Running,
}

impl BootStage {
    /// Следующая стадия; из Running пути нет.
    /// The next stage; there is no way out of Running.
    pub const fn next(self) -> Option<Self> {
        match self {
            BootStage::Bootstrapping => Some(BootStage::Running),
            BootStage::Running => None,
        }
    }
}

/// Текст для serial-телеметрии: неудачные попытки × интервал.
fn telemetry_line(failed_mounts: u32, retry_interval: Duration) -> String {
    format!(
        "Waited about {} milliseconds for the root to become available\n",
        (retry_interval * failed_mounts).as_millis()
    )
}

pub struct Bootstrap<'a, S: Sys> {
    sys: &'a S,
    config: &'a BootConfig,
}

pub struct Pivoted<'a, S: Sys> {
    sys: &'a S,
    config: &'a BootConfig,
    failed_mounts: u32,
}

impl<'a, S: Sys> Bootstrap<'a, S> {
    pub fn new(sys: &'a S, config: &'a BootConfig) -> Self {
        Self { sys, config }
    }

    /// Монтировать root, пока не получится. Сдаваться нельзя: другого
    /// корня нет, а носитель рано или поздно вставят.
    /// Mount the root until it works; there is no other root to fall back to.
    /// Returns the number of failed attempts.
    pub fn mount_root(&self) -> u32 {
        let root = &self.config.root;
        let interval = self.config.retry_interval;
        let message = format!(
            "Could not mount the root filesystem - retrying in {} milliseconds",
            interval.as_millis()
        );

        let mut failed_mounts: u32 = 0;
        while let Err(err) = self.sys.mount(root) {
            diag::report(self.sys, self.config.console, &message, &err);
            self.sys.sleep(interval);
            failed_mounts = failed_mounts.saturating_add(1);
        }
        log::info!(
            "mounted {} at {} after {} failed attempts",
            root.source.unwrap_or("none"),
            root.target,
            failed_mounts
        );
        failed_mounts
    }

    /// Удалить ненужное из initramfs, чтобы не занимало память.
    /// Drop initramfs files so they stop holding memory.
    pub fn cleanup(&self) {
        for artifact in self.config.artifacts {
            if let Err(err) = self.sys.unlink(artifact) {
                log::debug!("could not remove {}: {}", artifact, err);
            }
        }
    }

    /// chdir + chroot в смонтированный root.
    pub fn pivot(self, failed_mounts: u32) -> Result<Pivoted<'a, S>, Fatal> {
        let new_root = self.config.new_root;
        self.sys
            .chdir(new_root)
            .map_err(|err| Fatal::new("Failed to chdir() into the root filesystem", err))?;
        self.sys
            .chroot(new_root)
            .map_err(|err| Fatal::new("Failed to chroot() into the root filesystem", err))?;
        Ok(Pivoted { sys: self.sys, config: self.config, failed_mounts })
    }
}

impl<'a, S: Sys> Pivoted<'a, S> {
    /// Сообщить время ожидания по serial (best-effort). Путь к устройству
    /// разрешается уже внутри нового корня.
    pub fn report_wait(&self) {
        let Some(serial) = &self.config.telemetry else {
            return;
        };
        let line = telemetry_line(self.failed_mounts, self.config.retry_interval);
        if let Err(err) = self.sys.serial_write(serial, line.as_bytes()) {
            log::debug!("serial telemetry on {} failed: {}", serial.device, err);
        }
    }

    /// execve настоящего init. Возвращается только с ошибкой.
    /// execve the real init. Returns only with an error.
    pub fn hand_off(self) -> Fatal {
        let init = &self.config.init;
        let from = BootStage::Bootstrapping;
        if let Some(to) = from.next() {
            log::info!("{:?} -> {:?}: exec {}", from, to, init.path);
        }
        let err = match self.sys.execve(init) {
            Ok(never) => match never {},
            Err(err) => err,
        };
        Fatal::new(
            format!(
                "Failed to execute the init process {} after chdir()+chroot()'ing into the root filesystem",
                init.path
            ),
            err,
        )
    }
}

/// Весь путь usbboot до exec. Возвращается только с фатальной ошибкой.
/// The whole usbboot path up to exec. Returns only with a fatal error.
pub fn boot<S: Sys>(sys: &S, config: &BootConfig) -> Fatal {
    let bootstrap = Bootstrap::new(sys, config);
    let failed_mounts = bootstrap.mount_root();
    bootstrap.cleanup();
    let pivoted = match bootstrap.pivot(failed_mounts) {
        Ok(pivoted) => pivoted,
        Err(fatal) => return fatal,
    };
    pivoted.report_wait();
    pivoted.hand_off()
}

/// Точка входа usbboot. Никогда не завершается: PID 1 умирать нельзя.
pub fn run<S: Sys>(sys: &S, config: &BootConfig) -> ! {
    let fatal = boot(sys, config);
    diag::fatal(sys, config.console, config.idle_interval, fatal)
}
