//! Random payload generation
//!
//! Every file written during a run carries the same payload, generated once
//! up front. Content is random printable ASCII so that filesystems cannot
//! cheat with sparse-file or zero-page shortcuts; cryptographic quality is
//! not a goal.

use rand::Rng;

/// Lowest printable ASCII byte (space).
const ASCII_LOW: u8 = 32;
/// Highest printable ASCII byte (`~`).
const ASCII_HIGH: u8 = 126;

/// Generate `size` bytes of random printable ASCII.
pub fn random_payload(size: u64) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut buf = Vec::with_capacity(size as usize);
    for _ in 0..size {
        buf.push(rng.gen_range(ASCII_LOW..=ASCII_HIGH));
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_has_requested_length() {
        assert_eq!(random_payload(0).len(), 0);
        assert_eq!(random_payload(1).len(), 1);
        assert_eq!(random_payload(4096).len(), 4096);
    }

    #[test]
    fn test_payload_is_printable_ascii() {
        let buf = random_payload(65_536);
        assert!(buf.iter().all(|&b| (ASCII_LOW..=ASCII_HIGH).contains(&b)));
    }

    #[test]
    fn test_payloads_differ_between_calls() {
        // 256 bytes of independent draws colliding across two calls is
        // vanishingly unlikely; a failure here means the RNG is broken.
        let a = random_payload(256);
        let b = random_payload(256);
        assert_ne!(a, b);
    }

    #[test]
    fn test_payload_uses_more_than_one_byte_value() {
        let buf = random_payload(1024);
        let first = buf[0];
        assert!(buf.iter().any(|&b| b != first));
    }
}
