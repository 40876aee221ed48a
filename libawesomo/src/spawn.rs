//! Spawn-and-release — запустить ребёнка и забыть про него
//!
//! Это не супервизия: pid ребёнка отбрасывается, wait() не вызывается
//! никогда, код выхода теряется навсегда. Зомби не появляются потому, что
//! SIGCHLD уже стоит в SIG_IGN (см. supervisor).
//! Not supervision: the child's pid is dropped, wait() is never called and
//! the exit status is lost for good.

use core::time::Duration;

use crate::config::Program;
use crate::diag::{self, Fatal};
use crate::sys::{Fork, Sys};

/// fork() + execve() в ребёнке. Возвращается только в родителе.
/// fork() + execve() in the child. Returns only in the parent.
///
/// A child whose execve fails writes `message` to `console` and parks; it
/// never falls back into the parent's code path.
pub fn spawn_and_release<S: Sys>(
    sys: &S,
    program: &Program,
    console: &str,
    message: &str,
    idle: Duration,
) -> Result<(), Fatal> {
    match sys.fork() {
        Ok(Fork::Parent { child }) => {
            log::debug!("spawned {} as pid {}, releasing it", program.path, child);
            Ok(())
        }
        Ok(Fork::Child) => {
            let err = match sys.execve(program) {
                Ok(never) => match never {},
                Err(err) => err,
            };
            diag::fatal(sys, console, idle, Fatal::new(message, err))
        }
        Err(err) => Err(Fatal::new(message, err)),
    }
}
