//! Pseudo-random fill for the unused bytes of a packet.
//!
//! The reference agent fills every packet buffer with random bytes before
//! writing the protocol fields, so the padding after the NUL terminator and
//! the two trailing bytes never carry recognisable plaintext inside an
//! encrypted session. The generator is seeded once per process from the wall
//! clock and is deliberately not cryptographically secure.

use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::{rngs::SmallRng, RngCore, SeedableRng};

static PAD_RNG: Lazy<Mutex<SmallRng>> = Lazy::new(|| {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();

    Mutex::new(SmallRng::seed_from_u64(seed))
});

/// Overwrites `buf` with output from the process-wide generator.
///
/// Safe to call from concurrent tasks; callers do not serialise.
pub(crate) fn randomize(buf: &mut [u8]) {
    PAD_RNG.lock().fill_bytes(buf);
}
