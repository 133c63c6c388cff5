//! Seams to the outside world: the byte transport and the clock.

use std::time::{Duration, Instant};

/// Result of one bounded read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRead {
    Byte(u8),
    /// Nothing arrived within the timeout.
    Empty,
    /// The transport has ended and will never yield another byte.
    Closed,
}

/// A non-blocking byte source such as a serial port.
///
/// `read_byte` must return within roughly `timeout`; it is a poll, not a
/// blocking wait.
pub trait ByteSource {
    fn read_byte(&mut self, timeout: Duration) -> ByteRead;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self, timeout: Duration) -> ByteRead {
        (**self).read_byte(timeout)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_byte(&mut self, timeout: Duration) -> ByteRead {
        (**self).read_byte(timeout)
    }
}

/// Monotonic time source, injected so idle timeouts can be tested without
/// sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
