//! Shared blocking wait used by backends without their own event loop.

use std::io::BufRead;

/// Blocks the calling thread until standard input sees a newline or EOF.
///
/// This is the default behavior behind [`Backend::wait`](crate::Backend::wait)
/// for variants that have no presentation surface to watch. EOF returns
/// immediately, so non-interactive environments (tests, piped runs) never
/// hang here.
pub fn block_until_dismissed() {
    log::debug!("waiting for dismissal on stdin");

    let stdin = std::io::stdin();
    let mut line = String::new();
    // Read errors are treated like EOF: there is nothing further to wait for.
    let _ = stdin.lock().read_line(&mut line);
}
