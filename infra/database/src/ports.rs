//! Loopback port assignment for local store processes.
//!
//! [`LOCAL_PORTS`] is the only process-wide mutable state in the crate. It is
//! initialised at compile time, only ever moves forward under its lock, and needs
//! no teardown. Two local stores created concurrently in one process therefore
//! never race for the same address.

use parking_lot::Mutex;

/// First port handed out by [`LOCAL_PORTS`].
pub const FIRST_LOCAL_PORT: u16 = 9001;

/// Process-wide allocator used by [`Emulator::start`](crate::Emulator::start).
pub static LOCAL_PORTS: PortAllocator = PortAllocator::new(FIRST_LOCAL_PORT);

/// Monotonic port counter guarded by a mutex.
#[derive(Debug)]
pub struct PortAllocator {
    first: u16,
    next: Mutex<u16>,
}

impl PortAllocator {
    #[must_use]
    pub const fn new(first: u16) -> Self {
        Self { first, next: parking_lot::const_mutex(first) }
    }

    /// Hands out the next port. Wraps back to the first port once `u16::MAX` is used.
    pub fn next_port(&self) -> u16 {
        let mut next = self.next.lock();
        let port = *next;
        *next = next.checked_add(1).unwrap_or(self.first);
        port
    }
}
