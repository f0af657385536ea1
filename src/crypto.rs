use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use des::Des;
use des::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};

use crate::errors::CryptoError;

/// Fixed 8-byte DES key baked into the binary.
///
/// This scheme only obscures the API key so it does not sit in the config file
/// as plaintext. It is not a substitute for a secret store: DES in ECB mode
/// with a compiled-in key can be reversed by anyone holding the binary.
const DES_KEY: &[u8; 8] = b"SVN@2025";

const BLOCK_SIZE: usize = 8;

/// Encrypts an API key for storage in the config file.
///
/// The key is PKCS#5-padded, DES/ECB-encrypted with the fixed key and returned
/// base64-encoded.
pub fn encrypt_api_key(api_key: &str) -> Result<String, CryptoError> {
    if api_key.is_empty() {
        return Err(CryptoError::EmptyInput);
    }

    let cipher = Des::new(GenericArray::from_slice(DES_KEY));
    let mut data = pkcs5_pad(api_key.as_bytes());

    for chunk in data.chunks_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }

    Ok(BASE64.encode(&data))
}

/// Decrypts an API key previously produced by [`encrypt_api_key`].
pub fn decrypt_api_key(encrypted_key: &str) -> Result<String, CryptoError> {
    if encrypted_key.is_empty() {
        return Err(CryptoError::EmptyInput);
    }

    let mut data = BASE64
        .decode(encrypted_key)
        .map_err(CryptoError::Base64Decode)?;

    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidBlockLength(data.len()));
    }

    let cipher = Des::new(GenericArray::from_slice(DES_KEY));
    for chunk in data.chunks_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }

    let data = pkcs5_unpad(&data)?;
    String::from_utf8(data).map_err(|_| CryptoError::InvalidPadding)
}

fn pkcs5_pad(data: &[u8]) -> Vec<u8> {
    let padding = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = data.to_vec();
    padded.extend(std::iter::repeat(padding as u8).take(padding));
    padded
}

fn pkcs5_unpad(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let padding = *data.last().ok_or(CryptoError::InvalidPadding)? as usize;
    if padding == 0 || padding > BLOCK_SIZE || padding > data.len() {
        return Err(CryptoError::InvalidPadding);
    }
    let (body, pad) = data.split_at(data.len() - padding);
    if pad.iter().any(|&b| b as usize != padding) {
        return Err(CryptoError::InvalidPadding);
    }
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = "sk-0123456789abcdef";
        let encrypted = encrypt_api_key(key).unwrap();
        assert_ne!(encrypted, key);
        let decrypted = decrypt_api_key(&encrypted).unwrap();
        assert_eq!(decrypted, key);
    }

    #[test]
    fn test_roundtrip_block_aligned_input() {
        // Exactly one block long; padding must add a full extra block.
        let key = "8bytes!!";
        let encrypted = encrypt_api_key(key).unwrap();
        let ciphertext = BASE64.decode(&encrypted).unwrap();
        assert_eq!(ciphertext.len(), 16);
        assert_eq!(decrypt_api_key(&encrypted).unwrap(), key);
    }

    #[test]
    fn test_encrypt_is_deterministic() {
        // ECB with a fixed key: same input, same ciphertext.
        let a = encrypt_api_key("secret").unwrap();
        let b = encrypt_api_key("secret").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(encrypt_api_key(""), Err(CryptoError::EmptyInput)));
        assert!(matches!(decrypt_api_key(""), Err(CryptoError::EmptyInput)));
    }

    #[test]
    fn test_decrypt_rejects_bad_base64() {
        assert!(matches!(
            decrypt_api_key("not base64 !!!"),
            Err(CryptoError::Base64Decode(_))
        ));
    }

    #[test]
    fn test_decrypt_rejects_partial_block() {
        let partial = BASE64.encode(b"short");
        assert!(matches!(
            decrypt_api_key(&partial),
            Err(CryptoError::InvalidBlockLength(5))
        ));
    }

    #[test]
    fn test_pkcs5_padding() {
        assert_eq!(pkcs5_pad(b"abc"), b"abc\x05\x05\x05\x05\x05".to_vec());
        assert_eq!(pkcs5_pad(b"12345678").len(), 16);
        assert_eq!(pkcs5_unpad(b"abc\x05\x05\x05\x05\x05").unwrap(), b"abc");
        assert!(pkcs5_unpad(b"abc\x05\x05\x05\x05\x09").is_err());
        assert!(pkcs5_unpad(b"\x00").is_err());
    }
}
