use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use time::OffsetDateTime;

const RANDOM_BYTES: usize = 16;

/// Opaque, URL-safe email verification token.
///
/// Two independent OS-random draws around a millisecond timestamp: 256 bits
/// of entropy, 54 characters once encoded.
pub fn generate_verification_token() -> String {
    let mut buf = [0u8; RANDOM_BYTES * 2 + 8];
    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;

    OsRng.fill_bytes(&mut buf[..RANDOM_BYTES]);
    buf[RANDOM_BYTES..RANDOM_BYTES + 8].copy_from_slice(&millis.to_be_bytes());
    OsRng.fill_bytes(&mut buf[RANDOM_BYTES + 8..]);

    Base64UrlUnpadded::encode_string(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_url_safe_and_fixed_length() {
        let token = generate_verification_token();
        assert_eq!(token.len(), 54);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_verification_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn embedded_timestamp_is_current() {
        let before = OffsetDateTime::now_utc().unix_timestamp() as u64 * 1000;
        let raw = Base64UrlUnpadded::decode_vec(&generate_verification_token()).unwrap();
        let millis = u64::from_be_bytes(raw[16..24].try_into().unwrap());
        assert!(millis >= before);
    }
}
