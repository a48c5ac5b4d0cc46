//! The daemon's single-threaded event loop.
//!
//! One `poll(2)` call multiplexes every descriptor the transport needs
//! watched. Each wake serves at most one property request, then drains the
//! store's change queue and emits the matching properties-changed signals.
//! All store access stays on this thread, so no locking is needed anywhere.

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{error, info, warn};

use crate::registry::PropertyRegistry;
use crate::transport::{BusError, PropertyBus};
use prefd_core::ConfigStore;

/// Runs the event loop until the transport reports its connection closed.
///
/// Transient failures (interrupted polls, malformed requests, invariant
/// violations while serving a single access) are logged and the loop keeps
/// going; only a closed transport ends it.
pub fn run(
    store: &mut ConfigStore,
    registry: &PropertyRegistry,
    bus: &mut dyn PropertyBus,
) -> Result<(), BusError> {
    loop {
        let timeout = match bus.poll_timeout() {
            None => PollTimeout::NONE,
            Some(duration) => {
                PollTimeout::from(u16::try_from(duration.as_millis()).unwrap_or(u16::MAX))
            }
        };

        {
            let fds = bus.poll_fds();
            let mut poll_fds: Vec<PollFd> = fds
                .iter()
                .map(|fd| PollFd::new(*fd, PollFlags::POLLIN))
                .collect();

            match poll(&mut poll_fds, timeout) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    warn!("poll failed: {errno}");
                    continue;
                }
            }
        }

        match bus.next_request() {
            Ok(Some(request)) => {
                if let Err(e) = registry.handle_request(store, bus, request) {
                    error!("failed to serve property access: {e}");
                }
            }
            Ok(None) => {}
            Err(BusError::Closed) => {
                info!("transport closed, shutting down");
                return Ok(());
            }
            Err(e) => warn!("transport error, continuing: {e}"),
        }

        // Pushed whether the change came from a remote set or from the user
        // editing the file by hand.
        if store.was_updated() {
            let paths = store.updated_paths();
            if let Err(e) = registry.notify(bus, &paths) {
                error!("failed to emit change notifications: {e}");
            }
        }
    }
}
