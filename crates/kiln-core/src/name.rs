//! Random names for throwaway containers and volumes.

use rand::Rng;

/// Default length of [`random_name`] output.
pub const DEFAULT_NAME_LEN: usize = 10;

/// Generate `len` random lowercase ASCII letters.
pub fn random_name(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}
