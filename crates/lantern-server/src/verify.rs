//! Post-bind liveness verification.
//!
//! After binding, start dials its own listener before reporting success.
//! The first dial happens one delay after the accept loop was spawned,
//! and each dial is itself bounded by the same delay, so a failed
//! verification costs at most `2 * VERIFY_ATTEMPTS * VERIFY_DELAY`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{ServerError, ServerResult};

/// Number of dial attempts before start gives up.
pub const VERIFY_ATTEMPTS: u32 = 5;

/// Delay before each attempt, and the time box for each dial.
pub const VERIFY_DELAY: Duration = Duration::from_millis(30);

/// Returns the address a local client should dial to reach `bound`.
///
/// A listener on `0.0.0.0` or `::` is reached through the loopback
/// address of the same family.
#[must_use]
pub fn reachable_addr(bound: SocketAddr) -> SocketAddr {
    match bound.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), bound.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), bound.port())
        }
        _ => bound,
    }
}

/// Dials `addr` until a connection succeeds or the budget runs out.
///
/// Returns the attempt number that succeeded.
pub(crate) async fn verify_listening(addr: SocketAddr) -> ServerResult<u32> {
    for attempt in 1..=VERIFY_ATTEMPTS {
        tokio::time::sleep(VERIFY_DELAY).await;

        match tokio::time::timeout(VERIFY_DELAY, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                tracing::debug!(%addr, attempt, "listener verified");
                return Ok(attempt);
            }
            Ok(Err(e)) => tracing::debug!(%addr, attempt, error = %e, "verification dial failed"),
            Err(_) => tracing::debug!(%addr, attempt, "verification dial timed out"),
        }
    }

    Err(ServerError::StartupVerification {
        addr,
        attempts: VERIFY_ATTEMPTS,
    })
}
