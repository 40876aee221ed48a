//! MockSys — Sys в памяти для тестов / In-memory Sys for tests
//!
//! Записывает каждый вызов, умеет проваливать выбранные операции и ведёт
//! таблицу дескрипторов с выдачей наименьшего свободного номера.
//! Records every call, fails selected operations on demand and keeps a
//! descriptor table that hands out the lowest free number.
//!
//! Терминальные события (успешный execve, вечный сон, выключение) не могут
//! вернуться, поэтому мок раскручивает стек с типизированным payload'ом
//! [`Ended`]; [`outcome`] ловит его.

use core::cell::RefCell;
use core::convert::Infallible;
use core::time::Duration;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::os::unix::io::RawFd;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use nix::errno::Errno;
use nix::mount::MsFlags;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::config::{MountSpec, Program, Serial};
use crate::sys::{Fork, Sys};
use crate::{Error, Result};

/// Как закончился прогон / How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ended {
    /// Функция вернулась обычным образом / The function returned normally.
    Returned,
    /// execve заменил образ / execve replaced the image.
    Replaced(String),
    /// Процесс ушёл в вечный сон / The process parked forever.
    Parked,
    PoweredOff,
}

/// Операции, которые можно провалить / Operations that can be failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Mount,
    Unlink,
    Chdir,
    Chroot,
    IgnoreChildExits,
    Setsid,
    Fork,
    Exec,
    KillAll(Signal),
    PowerOff,
    OpenTty,
    Dup,
    Console,
    Serial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Mount { target: String, flags: MsFlags },
    Unlink(String),
    Chdir(String),
    Chroot(String),
    Sync,
    IgnoreChildExits,
    Setsid,
    Fork,
    Exec(String, Vec<String>),
    KillAll(Signal),
    PowerOff,
    Close(RawFd),
    OpenTty(String),
    Dup(RawFd),
    Console(String, String),
    Serial(String, String),
    Sleep(Duration),
    Park(Duration),
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    failures: HashMap<Op, Errno>,
    /// Сколько ещё mount'ов провалить / How many more mounts to fail.
    mount_failures: u32,
    /// fd → устройство / fd → device.
    fds: BTreeMap<RawFd, String>,
    /// Дескрипторы, которые close() не освобождает.
    pinned: BTreeSet<RawFd>,
    fork_child: bool,
    next_pid: i32,
    /// Виртуальные часы / Virtual clock.
    elapsed: Duration,
}

#[derive(Debug)]
pub struct MockSys {
    state: RefCell<State>,
}

impl Default for MockSys {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSys {
    /// Процесс с унаследованными 0/1/2 на /dev/console.
    /// A process with inherited 0/1/2 on /dev/console.
    pub fn new() -> Self {
        let mut state = State { next_pid: 2, ..State::default() };
        for fd in 0..3 {
            state.fds.insert(fd, "/dev/console".into());
        }
        Self { state: RefCell::new(state) }
    }

    /// Всегда проваливать `op` с `errno` / Always fail `op` with `errno`.
    pub fn fail(self, op: Op, errno: Errno) -> Self {
        self.state.borrow_mut().failures.insert(op, errno);
        self
    }

    /// Провалить первые `count` вызовов mount / Fail the first `count` mounts.
    pub fn fail_mounts(self, count: u32) -> Self {
        self.state.borrow_mut().mount_failures = count;
        self
    }

    /// close(fd) будет падать с EIO, а fd останется занят.
    pub fn pin_fd(self, fd: RawFd) -> Self {
        self.state.borrow_mut().pinned.insert(fd);
        self
    }

    /// fork() вернёт Child: проверяем путь ребёнка.
    pub fn as_forked_child(self) -> Self {
        self.state.borrow_mut().fork_child = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Console(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Устройство за дескриптором / The device behind a descriptor.
    pub fn fd_target(&self, fd: RawFd) -> Option<String> {
        self.state.borrow().fds.get(&fd).cloned()
    }

    pub fn elapsed(&self) -> Duration {
        self.state.borrow().elapsed
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn check(&self, op: Op) -> Result<()> {
        match self.state.borrow().failures.get(&op) {
            Some(errno) => Err(Error::Sys(*errno)),
            None => Ok(()),
        }
    }

    fn lowest_free_fd(&self) -> RawFd {
        let state = self.state.borrow();
        (0..RawFd::MAX).find(|fd| !state.fds.contains_key(fd)).unwrap_or(0)
    }

    fn end(&self, ended: Ended) -> ! {
        install_quiet_hook();
        panic::panic_any(ended)
    }
}

impl Sys for MockSys {
    fn mount(&self, spec: &MountSpec) -> Result<()> {
        self.record(Call::Mount { target: spec.target.into(), flags: spec.flags });
        {
            let mut state = self.state.borrow_mut();
            if state.mount_failures > 0 {
                state.mount_failures -= 1;
                return Err(Error::Sys(Errno::ENXIO));
            }
        }
        self.check(Op::Mount)
    }

    fn unlink(&self, path: &str) -> Result<()> {
        self.record(Call::Unlink(path.into()));
        self.check(Op::Unlink)
    }

    fn chdir(&self, path: &str) -> Result<()> {
        self.record(Call::Chdir(path.into()));
        self.check(Op::Chdir)
    }

    fn chroot(&self, path: &str) -> Result<()> {
        self.record(Call::Chroot(path.into()));
        self.check(Op::Chroot)
    }

    fn sync(&self) {
        self.record(Call::Sync);
    }

    fn ignore_child_exits(&self) -> Result<()> {
        self.record(Call::IgnoreChildExits);
        self.check(Op::IgnoreChildExits)
    }

    fn setsid(&self) -> Result<()> {
        self.record(Call::Setsid);
        self.check(Op::Setsid)
    }

    fn fork(&self) -> Result<Fork> {
        self.record(Call::Fork);
        self.check(Op::Fork)?;
        let mut state = self.state.borrow_mut();
        if state.fork_child {
            return Ok(Fork::Child);
        }
        let child = Pid::from_raw(state.next_pid);
        state.next_pid += 1;
        Ok(Fork::Parent { child })
    }

    fn execve(&self, program: &Program) -> Result<Infallible> {
        let argv = program.argv.iter().map(|s| s.to_string()).collect();
        self.record(Call::Exec(program.path.into(), argv));
        self.check(Op::Exec)?;
        self.end(Ended::Replaced(program.path.into()))
    }

    fn kill_all(&self, signal: Signal) -> Result<()> {
        self.record(Call::KillAll(signal));
        self.check(Op::KillAll(signal))
    }

    fn power_off(&self) -> Result<Infallible> {
        self.record(Call::PowerOff);
        self.check(Op::PowerOff)?;
        self.end(Ended::PoweredOff)
    }

    fn close(&self, fd: RawFd) -> Result<()> {
        self.record(Call::Close(fd));
        if self.state.borrow().pinned.contains(&fd) {
            return Err(Error::Sys(Errno::EIO));
        }
        match self.state.borrow_mut().fds.remove(&fd) {
            Some(_) => Ok(()),
            None => Err(Error::Sys(Errno::EBADF)),
        }
    }

    fn open_tty(&self, path: &str) -> Result<RawFd> {
        self.record(Call::OpenTty(path.into()));
        self.check(Op::OpenTty)?;
        let fd = self.lowest_free_fd();
        self.state.borrow_mut().fds.insert(fd, path.into());
        Ok(fd)
    }

    fn dup(&self, fd: RawFd) -> Result<RawFd> {
        self.record(Call::Dup(fd));
        self.check(Op::Dup)?;
        let target = self.fd_target(fd).ok_or(Error::Sys(Errno::EBADF))?;
        let new = self.lowest_free_fd();
        self.state.borrow_mut().fds.insert(new, target);
        Ok(new)
    }

    fn console_write(&self, device: &str, bytes: &[u8]) -> Result<()> {
        self.check(Op::Console)?;
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.record(Call::Console(device.into(), text));
        Ok(())
    }

    fn serial_write(&self, serial: &Serial, bytes: &[u8]) -> Result<()> {
        self.check(Op::Serial)?;
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.record(Call::Serial(serial.device.into(), text));
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        self.record(Call::Sleep(duration));
        self.state.borrow_mut().elapsed += duration;
    }

    fn park(&self, interval: Duration) -> ! {
        self.record(Call::Park(interval));
        self.end(Ended::Parked)
    }
}

/// Не печатать панику для наших собственных [`Ended`].
fn install_quiet_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().downcast_ref::<Ended>().is_none() {
                previous(info);
            }
        }));
    });
}

/// Запустить `f` и узнать, чем всё кончилось.
/// Run `f` and find out how it ended.
///
/// Panics other than the mock's own terminal events are propagated.
pub fn outcome<F: FnOnce()>(f: F) -> Ended {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => Ended::Returned,
        Err(payload) => match payload.downcast::<Ended>() {
            Ok(ended) => *ended,
            Err(other) => panic::resume_unwind(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_reuse_lowest_free_number() {
        let sys = MockSys::new();
        sys.close(1).unwrap();
        assert_eq!(sys.open_tty("/dev/tty1").unwrap(), 1);
        assert_eq!(sys.dup(1).unwrap(), 3);
        assert_eq!(sys.fd_target(3).as_deref(), Some("/dev/tty1"));
    }

    #[test]
    fn closing_an_unknown_descriptor_is_ebadf() {
        let sys = MockSys::new();
        assert!(matches!(sys.close(7), Err(Error::Sys(Errno::EBADF))));
    }

    #[test]
    fn failed_console_leaves_no_record() {
        let sys = MockSys::new().fail(Op::Console, Errno::ENOENT);
        assert!(sys.console_write("/dev/console", b"x").is_err());
        assert!(sys.calls().is_empty());
    }

    #[test]
    fn successful_exec_is_a_terminal_event() {
        let sys = MockSys::new();
        let program = Program { path: "/bin/true", argv: &["/bin/true"], env: &[] };
        let end = outcome(|| {
            let _ = sys.execve(&program);
        });
        assert_eq!(end, Ended::Replaced("/bin/true".into()));
    }

    #[test]
    #[should_panic(expected = "unrelated")]
    fn foreign_panics_propagate() {
        outcome(|| panic!("unrelated"));
    }
}
