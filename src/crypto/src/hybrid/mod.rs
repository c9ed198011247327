//! Hybrid classical + post-quantum keys
//!
//! Composite byte strings (public keys, signatures, ciphertexts) are encoded
//! as a 2-byte big-endian length of the classical part, the classical part,
//! then the post-quantum part.

pub mod kem;
pub mod signatures;

pub use kem::KemKeyPair;
pub use signatures::HybridKeyPair;

use crate::error::{CryptoError, Result};

pub(crate) fn join(classical: &[u8], post_quantum: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + classical.len() + post_quantum.len());
    out.extend_from_slice(&(classical.len() as u16).to_be_bytes());
    out.extend_from_slice(classical);
    out.extend_from_slice(post_quantum);
    out
}

pub(crate) fn split(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    if bytes.len() < 2 {
        return Err(CryptoError::InvalidKey(
            "hybrid encoding shorter than its length prefix".into(),
        ));
    }
    let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let rest = &bytes[2..];
    if rest.len() < len {
        return Err(CryptoError::InvalidKey(format!(
            "classical part claims {} bytes, {} available",
            len,
            rest.len()
        )));
    }
    Ok(rest.split_at(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_rejects_short_input() {
        assert!(split(&[0]).is_err());
        assert!(split(&[0, 5, 1, 2]).is_err());
        let joined = join(b"abc", b"defg");
        assert_eq!(split(&joined).unwrap(), (&b"abc"[..], &b"defg"[..]));
    }
}
