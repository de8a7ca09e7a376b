//! RFC 6238 time-based one-time passwords for two-factor auth.
//!
//! Codes are 6 digits over 30-second steps, HMAC-SHA256 variant. Secrets are
//! stored base32-encoded (RFC 4648, unpadded) -- the same form authenticator
//! apps consume through the `otpauth://` provisioning URI.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

/// Time step in seconds.
pub const TOTP_PERIOD_SECS: i64 = 30;

/// Number of code digits.
pub const TOTP_DIGITS: u32 = 6;

/// Accepted clock skew, in steps, on either side of "now".
const SKEW_STEPS: i64 = 1;

/// Secret length in raw bytes before encoding.
const SECRET_BYTES: usize = 20;

/// RFC 4648 base32 alphabet.
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    /// The stored secret is not valid unpadded base32.
    #[error("Invalid TOTP secret")]
    InvalidSecret,
}

/// Generate a new random secret, base32-encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base32_encode(&bytes)
}

/// Build the `otpauth://` provisioning URI an authenticator app enrolls from.
pub fn provisioning_uri(secret: &str, account: &str) -> String {
    format!(
        "otpauth://totp/Mixdown:{account}?secret={secret}&issuer=Mixdown\
         &algorithm=SHA256&digits={TOTP_DIGITS}&period={TOTP_PERIOD_SECS}"
    )
}

/// The code valid at the given Unix timestamp.
pub fn code_at(secret: &str, timestamp: i64) -> Result<String, TotpError> {
    let key = base32_decode(secret).ok_or(TotpError::InvalidSecret)?;
    let step = (timestamp / TOTP_PERIOD_SECS) as u64;

    let mut mac =
        Hmac::<Sha256>::new_from_slice(&key).map_err(|_| TotpError::InvalidSecret)?;
    mac.update(&step.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // RFC 4226 dynamic truncation.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);
    let code = binary % 10u32.pow(TOTP_DIGITS);

    Ok(format!("{code:06}"))
}

/// Verify a submitted code against the secret, allowing one step of clock
/// skew in either direction.
pub fn verify_code(secret: &str, code: &str, timestamp: i64) -> Result<bool, TotpError> {
    let submitted = code.trim();
    for step_offset in -SKEW_STEPS..=SKEW_STEPS {
        let at = timestamp + step_offset * TOTP_PERIOD_SECS;
        if code_at(secret, at)? == submitted {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Encode bytes as unpadded RFC 4648 base32.
fn base32_encode(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u64 = 0;
    let mut bits = 0u32;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let index = ((buffer >> bits) & 0x1f) as usize;
            output.push(BASE32_ALPHABET[index] as char);
        }
    }
    if bits > 0 {
        let index = ((buffer << (5 - bits)) & 0x1f) as usize;
        output.push(BASE32_ALPHABET[index] as char);
    }
    output
}

/// Decode unpadded RFC 4648 base32. `None` on any invalid character.
fn base32_decode(input: &str) -> Option<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits = 0u32;

    for ch in input.trim_end_matches('=').bytes() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&c| c == ch.to_ascii_uppercase())? as u64;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            output.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base32_round_trip() {
        let cases: &[&[u8]] = &[b"", b"f", b"fo", b"foo", b"foob", b"fooba", b"foobar"];
        for case in cases {
            let encoded = base32_encode(case);
            assert_eq!(base32_decode(&encoded).unwrap(), case.to_vec());
        }
    }

    #[test]
    fn base32_known_vectors() {
        // RFC 4648 test vectors, padding stripped.
        assert_eq!(base32_encode(b"foo"), "MZXW6");
        assert_eq!(base32_encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn base32_rejects_invalid_characters() {
        assert!(base32_decode("MZXW6!").is_none());
        assert!(base32_decode("mzxw1").is_none()); // '1' not in alphabet
    }

    #[test]
    fn generated_secrets_are_distinct_and_decodable() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
        assert_eq!(base32_decode(&a).unwrap().len(), SECRET_BYTES);
    }

    #[test]
    fn code_is_deterministic_per_step() {
        let secret = generate_secret();
        let code_a = code_at(&secret, 1_000_000_000).unwrap();
        let code_b = code_at(&secret, 1_000_000_029).unwrap(); // same 30s step
        let code_c = code_at(&secret, 1_000_000_030).unwrap(); // next step

        assert_eq!(code_a, code_b);
        assert_ne!(code_a, code_c);
        assert_eq!(code_a.len(), 6);
        assert!(code_a.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn verify_accepts_adjacent_steps() {
        let secret = generate_secret();
        let now = 1_700_000_015;

        let current = code_at(&secret, now).unwrap();
        let previous = code_at(&secret, now - TOTP_PERIOD_SECS).unwrap();
        let next = code_at(&secret, now + TOTP_PERIOD_SECS).unwrap();

        assert!(verify_code(&secret, &current, now).unwrap());
        assert!(verify_code(&secret, &previous, now).unwrap());
        assert!(verify_code(&secret, &next, now).unwrap());
    }

    #[test]
    fn verify_rejects_distant_steps_and_garbage() {
        let secret = generate_secret();
        let now = 1_700_000_015;

        let stale = code_at(&secret, now - 10 * TOTP_PERIOD_SECS).unwrap();
        // A code from 10 steps ago may collide with the current one by
        // chance only; rule that out before asserting.
        if stale != code_at(&secret, now).unwrap()
            && stale != code_at(&secret, now - TOTP_PERIOD_SECS).unwrap()
            && stale != code_at(&secret, now + TOTP_PERIOD_SECS).unwrap()
        {
            assert!(!verify_code(&secret, &stale, now).unwrap());
        }
        assert!(!verify_code(&secret, "000000x", now).unwrap());
    }

    #[test]
    fn invalid_secret_errors() {
        assert!(code_at("not base32!!", 0).is_err());
    }
}
