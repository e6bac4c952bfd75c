// AES-256-GCM sealing for the persisted auth cookie.
//
// Layout of a sealed value: base64url(nonce[12] || ciphertext || tag[16]).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use shared_models::error::PortalError;

pub struct CookieCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl CookieCipher {
    pub fn new(secret: &str) -> Result<Self, PortalError> {
        if secret.is_empty() {
            return Err(PortalError::Crypto("cookie secret is not set".to_string()));
        }

        let digest = Sha256::digest(secret.as_bytes());
        let unbound = UnboundKey::new(&AES_256_GCM, digest.as_slice())
            .map_err(|_| PortalError::Crypto("invalid cookie key".to_string()))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<String, PortalError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| PortalError::Crypto("nonce generation failed".to_string()))?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut in_out)
            .map_err(|_| PortalError::Crypto("sealing failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, PortalError> {
        let raw = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| PortalError::Crypto("sealed value is not base64".to_string()))?;
        if raw.len() < NONCE_LEN {
            return Err(PortalError::Crypto("sealed value too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| PortalError::Crypto("bad nonce".to_string()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| PortalError::Crypto("cookie failed authentication".to_string()))?;
        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_seal_then_open() {
        let cipher = CookieCipher::new("secret").unwrap();
        let sealed = cipher.seal(b"{\"patient\":null}").unwrap();

        assert!(!sealed.contains("patient"));
        assert_eq!(cipher.open(&sealed).unwrap(), b"{\"patient\":null}");
    }

    #[test]
    fn test_nonce_differs_per_seal() {
        let cipher = CookieCipher::new("secret").unwrap();
        assert_ne!(cipher.seal(b"same").unwrap(), cipher.seal(b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let sealed = CookieCipher::new("secret").unwrap().seal(b"payload").unwrap();
        let other = CookieCipher::new("another-secret").unwrap();

        assert_matches!(other.open(&sealed), Err(PortalError::Crypto(_)));
        assert_matches!(other.open("%%%"), Err(PortalError::Crypto(_)));
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert_matches!(CookieCipher::new(""), Err(PortalError::Crypto(_)));
    }
}
