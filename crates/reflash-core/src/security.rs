//! Security-access key derivation.
//!
//! The handshake contract is fixed (request seed, send key), but the
//! seed-to-key algorithm is ECU specific and supplied by the caller.

/// Computes the security-access key from the ECU's challenge seed.
pub trait SeedKeyAlgorithm: Send + Sync {
    fn compute_key(&self, seed: &[u8]) -> Vec<u8>;
}

impl<F> SeedKeyAlgorithm for F
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync,
{
    fn compute_key(&self, seed: &[u8]) -> Vec<u8> {
        self(seed)
    }
}

/// Fixed key ignoring the seed, for bench ECUs whose key was recorded from
/// a known-good session.
#[derive(Debug, Clone)]
pub struct StaticKey(Vec<u8>);

impl StaticKey {
    pub fn new(key: Vec<u8>) -> Self {
        Self(key)
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(hex_key)?))
    }
}

impl SeedKeyAlgorithm for StaticKey {
    fn compute_key(&self, _seed: &[u8]) -> Vec<u8> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_key_ignores_seed() {
        let algo = StaticKey::from_hex("57E951FD").unwrap();
        assert_eq!(algo.compute_key(&[0xAA, 0xBB]), vec![0x57, 0xE9, 0x51, 0xFD]);
        assert_eq!(algo.compute_key(&[]), vec![0x57, 0xE9, 0x51, 0xFD]);
    }

    #[test]
    fn test_closure_algorithm() {
        let algo = |seed: &[u8]| seed.iter().map(|b| b ^ 0xFF).collect::<Vec<u8>>();
        assert_eq!(algo.compute_key(&[0x00, 0x0F]), vec![0xFF, 0xF0]);
    }
}
