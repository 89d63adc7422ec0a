// Path: crates/crypto/src/random.rs
//! Cryptographically secure random values from the operating system.

use crate::error::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;

/// Returns a random integer in `[0, max)`.
pub fn rand_int(max: u64) -> Result<u64> {
    if max == 0 {
        return Err(Error::invalid_argument("rand_int max must be non-zero"));
    }

    Ok(OsRng.next_u64() % max)
}

/// Fills `buffer` with random bytes.
pub fn rand_buffer(buffer: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buffer)
        .map_err(|err| Error::failed(format!("OS RNG failed: {err}")))
}
