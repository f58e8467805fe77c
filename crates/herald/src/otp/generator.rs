//! One-time passcode generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use herald_common::constants::{OTP_MAX, OTP_MIN};
use rand::Rng;

/// Produces 6-digit numeric codes
#[derive(Debug, Default, Clone, Copy)]
pub struct OtpGenerator;

impl OtpGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Draw a code uniformly from `[100000, 999999]`.
    ///
    /// `rand::rng()` is a CSPRNG reseeded from the OS, so successive codes
    /// are independent and unpredictable.
    pub fn generate(&self) -> String {
        rand::rng().random_range(OTP_MIN..=OTP_MAX).to_string()
    }

    /// Generate a random record identifier
    pub fn record_id(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_common::constants::OTP_LENGTH;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_six_digits_in_range() {
        let generator = OtpGenerator::new();
        for _ in 0..10_000 {
            let code = generator.generate();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));

            let value: u32 = code.parse().unwrap();
            assert!((OTP_MIN..=OTP_MAX).contains(&value));
        }
    }

    #[test]
    fn test_codes_do_not_follow_a_counter() {
        let generator = OtpGenerator::new();
        let codes: Vec<u32> = (0..200).map(|_| generator.generate().parse().unwrap()).collect();

        let sequential = codes.windows(2).filter(|w| w[1] == w[0] + 1).count();
        assert!(sequential < 5);

        let distinct: HashSet<_> = codes.iter().collect();
        assert!(distinct.len() > 190);
    }

    #[test]
    fn test_record_ids_are_unique() {
        let generator = OtpGenerator::new();
        let a = generator.record_id();
        let b = generator.record_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 22);
    }
}
