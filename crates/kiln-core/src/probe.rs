//! Readiness probes.
//!
//! A probe is a check returning `true` once something is ready. [`poll_until`]
//! runs a check a bounded number of times at a fixed interval; the `wait_for_*`
//! helpers specialize it for TCP ports and filesystem paths.

use crate::config::DEFAULT_CONNECT_TIMEOUT;
use crate::error::{KilnError, Result};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Call `check` up to `max_attempts` times until it returns `true`.
///
/// Sleeps `interval` after every failed attempt, the last one included. No
/// sleep follows a successful check.
///
/// # Returns
///
/// The 1-based attempt on which the check succeeded.
///
/// # Errors
///
/// [`KilnError::PollExhausted`] if no attempt succeeded.
pub fn poll_until<F>(max_attempts: u32, interval: Duration, check: F) -> Result<u32>
where
    F: FnMut() -> bool,
{
    poll_with_sleep(max_attempts, interval, check, std::thread::sleep)
}

fn poll_with_sleep<F, S>(
    max_attempts: u32,
    interval: Duration,
    mut check: F,
    mut sleep: S,
) -> Result<u32>
where
    F: FnMut() -> bool,
    S: FnMut(Duration),
{
    for attempt in 1..=max_attempts {
        debug!(attempt, max_attempts, "polling");
        if check() {
            return Ok(attempt);
        }
        sleep(interval);
    }
    Err(KilnError::PollExhausted {
        attempts: max_attempts,
    })
}

/// Check whether a TCP connection to `host:port` can be established.
///
/// Every address `host` resolves to is tried with the given timeout. Refusal,
/// timeout and resolution failure all yield `false`.
pub fn check_port_open(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            debug!(host, port, error = %e, "failed to resolve host");
            return false;
        }
    };

    let open = addrs
        .iter()
        .any(|addr| match TcpStream::connect_timeout(addr, timeout) {
            Ok(_) => true,
            Err(e) => {
                trace!(%addr, error = %e, "connect failed");
                false
            }
        });

    if open {
        debug!(host, port, "port open");
    } else {
        debug!(host, port, "port closed");
    }
    open
}

/// Check whether `path` currently exists.
pub fn check_file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Wait until `host:port` accepts TCP connections.
pub fn wait_for_port(host: &str, port: u16, max_attempts: u32, interval: Duration) -> Result<u32> {
    wait_for_port_with_timeout(host, port, max_attempts, interval, DEFAULT_CONNECT_TIMEOUT)
}

/// Like [`wait_for_port`], with an explicit per-attempt connect timeout.
pub fn wait_for_port_with_timeout(
    host: &str,
    port: u16,
    max_attempts: u32,
    interval: Duration,
    connect_timeout: Duration,
) -> Result<u32> {
    poll_until(max_attempts, interval, || check_port_open(host, port, connect_timeout))
}

/// Wait until `path` exists.
pub fn wait_for_file(
    path: impl AsRef<Path>,
    max_attempts: u32,
    interval: Duration,
) -> Result<u32> {
    let path = path.as_ref();
    poll_until(max_attempts, interval, || check_file_exists(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[test]
    fn test_poll_succeeds_on_nth_attempt() {
        let mut calls = 0;
        let mut sleeps = 0;

        let attempt = poll_with_sleep(
            5,
            Duration::from_secs(1),
            || {
                calls += 1;
                calls == 3
            },
            |_| sleeps += 1,
        )
        .unwrap();

        assert_eq!(attempt, 3);
        assert_eq!(calls, 3);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn test_poll_first_attempt_does_not_sleep() {
        let mut sleeps = 0;
        let attempt = poll_with_sleep(1, Duration::from_secs(1), || true, |_| sleeps += 1).unwrap();
        assert_eq!(attempt, 1);
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn test_poll_exhausted() {
        let mut calls = 0;
        let mut slept = Vec::new();

        let err = poll_with_sleep(
            4,
            Duration::from_millis(250),
            || {
                calls += 1;
                false
            },
            |d| slept.push(d),
        )
        .unwrap_err();

        assert!(matches!(err, KilnError::PollExhausted { attempts: 4 }));
        assert_eq!(calls, 4);
        assert_eq!(slept, vec![Duration::from_millis(250); 4]);
    }

    #[test]
    fn test_poll_zero_attempts() {
        let err = poll_until(0, Duration::ZERO, || true).unwrap_err();
        assert!(matches!(err, KilnError::PollExhausted { attempts: 0 }));
    }

    #[test]
    fn test_poll_real_sleep() {
        let mut calls = 0;
        let attempt = poll_until(3, Duration::from_millis(1), || {
            calls += 1;
            calls > 1
        })
        .unwrap();
        assert_eq!(attempt, 2);
    }

    #[test]
    fn test_check_port_open_with_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(check_port_open("127.0.0.1", port, TIMEOUT));
    }

    #[test]
    fn test_check_port_closed() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!check_port_open("127.0.0.1", port, TIMEOUT));
    }

    #[test]
    fn test_check_port_unresolvable_host() {
        assert!(!check_port_open("kiln.invalid", 80, TIMEOUT));
    }

    #[test]
    fn test_check_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ready");

        assert!(!check_file_exists(&path));
        std::fs::write(&path, b"").unwrap();
        assert!(check_file_exists(&path));
        std::fs::remove_file(&path).unwrap();
        assert!(!check_file_exists(&path));
    }

    #[test]
    fn test_wait_for_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let attempt = wait_for_port("127.0.0.1", port, 1, Duration::from_millis(10)).unwrap();
        assert_eq!(attempt, 1);
    }

    #[test]
    fn test_wait_for_file_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let err = wait_for_file(dir.path().join("never"), 2, Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, KilnError::PollExhausted { attempts: 2 }));
    }

    #[test]
    fn test_wait_for_file_created_later() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late");
        let writer_path = path.clone();

        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            std::fs::write(writer_path, b"ok").unwrap();
        });

        let attempt = wait_for_file(&path, 50, Duration::from_millis(20)).unwrap();
        assert!(attempt > 1);
        writer.join().unwrap();
    }
}
