use std::path::Path;

use der::Encode;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use x509_cert::Certificate;

use crate::error::CryptoError;

/// Encrypts `data` with the RSA public key embedded in the PEM-encoded
/// X.509 certificate at `public_key_path`, PKCS#1 v1.5 padding.
pub fn encrypt(data: &[u8], public_key_path: impl AsRef<Path>) -> Result<Vec<u8>, CryptoError> {
    let pem = std::fs::read_to_string(public_key_path)?;
    let cert = Certificate::from_pem(pem.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| CryptoError::InvalidKey(format!("invalid public key info: {e}")))?;
    let public_key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| CryptoError::InvalidKey(format!("not an RSA public key: {e}")))?;

    let mut rng = rand::thread_rng();
    public_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, data)
        .map_err(|e| CryptoError::Encrypt(e.to_string()))
}

/// Decrypts `data` with the RSA private key at `private_key_path`
/// (PEM-encoded PKCS#1), PKCS#1 v1.5 padding.
pub fn decrypt(data: &[u8], private_key_path: impl AsRef<Path>) -> Result<Vec<u8>, CryptoError> {
    let pem = std::fs::read_to_string(private_key_path)?;
    let private_key = RsaPrivateKey::from_pkcs1_pem(&pem)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid private key: {e}")))?;

    private_key
        .decrypt(Pkcs1v15Encrypt, data)
        .map_err(|e| CryptoError::Decrypt(e.to_string()))
}

#[cfg(test)]
mod tests {
    // Round-trip coverage for encrypt/decrypt lives in certgen's
    // integration test, which generates a matching cert/key pair first;
    // metrics-core has no fixture key material of its own.
}
