//! Конфигурация — фиксирована при сборке / Build-time fixed configuration
//!
//! Каждый бинарник строит свою структуру один раз и дальше только читает.
//! Each binary builds its struct once and only reads it afterwards.
//!
//! Пути / Paths:
//!   /dev/sdb1 → root/   — USB-накопитель с корнем (ext2)
//!   /root               — цель chdir + chroot
//!   /bin/start          — настоящий init (Init Supervisor)
//!   /dev/tty1           — управляющий терминал shell'а
//!   /dev/console        — диагностика PID 1
//!   /dev/ttyS0          — телеметрия ожидания root (115200 baud)

use core::time::Duration;

use nix::mount::MsFlags;
use nix::sys::termios::BaudRate;

/// Пустое окружение для всех execve / Empty environment for every execve.
pub const EMPTY_ENV: &[&str] = &[];

/// Программа для execve: путь, argv и окружение.
/// A program image for execve: path, argv and environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    pub path: &'static str,
    pub argv: &'static [&'static str],
    pub env:  &'static [&'static str],
}

/// Аргументы mount(2) / mount(2) arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountSpec {
    pub source: Option<&'static str>,
    pub target: &'static str,
    pub fstype: Option<&'static str>,
    pub flags:  MsFlags,
    pub data:   Option<&'static str>,
}

/// Последовательный порт для телеметрии / Serial port for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Serial {
    pub device: &'static str,
    pub baud:   BaudRate,
}

const CONSOLE: &str = "/dev/console";

/// PID 1 никогда не busy-wait'ит: спим минутами.
/// PID 1 never busy-waits: it sleeps in minute-long steps.
const IDLE_INTERVAL: Duration = Duration::from_secs(60);

// ── Bootstrap ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct BootConfig {
    /// Корневая ФС на съёмном носителе / Root filesystem on removable media.
    pub root: MountSpec,
    /// Пауза между попытками mount / Pause between mount attempts.
    pub retry_interval: Duration,
    /// Файлы initramfs, которые больше не нужны после монтирования.
    /// Initramfs files that are dead weight once the root is mounted.
    pub artifacts: &'static [&'static str],
    pub new_root: &'static str,
    pub init: Program,
    pub console: &'static str,
    pub telemetry: Option<Serial>,
    pub idle_interval: Duration,
}

impl BootConfig {
    pub const DEFAULT: Self = Self {
        root: MountSpec {
            source: Some("/dev/sdb1"),
            target: "root/",
            fstype: Some("ext2"),
            flags:  MsFlags::empty(),
            data:   None,
        },
        retry_interval: Duration::from_millis(100),
        artifacts: &["usbboot"],
        new_root: "/root",
        init: Program {
            path: "/bin/start",
            argv: &["/bin/start"],
            env:  EMPTY_ENV,
        },
        console: CONSOLE,
        telemetry: if cfg!(feature = "serial-telemetry") {
            Some(Serial { device: "/dev/ttyS0", baud: BaudRate::B115200 })
        } else {
            None
        },
        idle_interval: IDLE_INTERVAL,
    };
}

// ── Init Supervisor ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct InitConfig {
    /// /dev/console не может быть управляющим терминалом, поэтому tty1.
    /// /dev/console cannot be a controlling terminal, hence tty1.
    pub tty: &'static str,
    pub console: &'static str,
    /// Аргумент ядра, выбирающий интерактивный shell.
    pub shell_token: &'static str,
    pub shell: Program,
    pub script: Program,
    pub idle_interval: Duration,
}

impl InitConfig {
    pub const DEFAULT: Self = Self {
        tty: "/dev/tty1",
        console: CONSOLE,
        shell_token: "ishell",
        shell: Program {
            path: "/bin/busybox",
            argv: &["/bin/busybox", "ash"],
            env:  EMPTY_ENV,
        },
        script: Program {
            path: "/bin/busybox",
            argv: &["/bin/busybox", "ash", "/etc/initscript"],
            env:  EMPTY_ENV,
        },
        idle_interval: IDLE_INTERVAL,
    };

    /// Путь к init-скрипту (последний аргумент интерпретатора).
    pub fn script_path(&self) -> &'static str {
        self.script.argv.last().copied().unwrap_or(self.script.path)
    }
}

// ── Shutdown Controller ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct ShutdownConfig {
    /// Приложения Awesom-O завершаются быстро, секунды хватает.
    /// Awesom-O applications exit quickly; one second is enough.
    pub grace_period: Duration,
    pub root_remount: MountSpec,
}

impl ShutdownConfig {
    pub const DEFAULT: Self = Self {
        grace_period: Duration::from_secs(1),
        root_remount: MountSpec {
            source: None,
            target: "/",
            fstype: None,
            flags:  MsFlags::MS_REMOUNT.union(MsFlags::MS_RDONLY),
            data:   None,
        },
    };
}
