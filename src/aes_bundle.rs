use aes_gcm::{
	Aes256Gcm, Nonce,
	aead::{Aead as _, AeadCore as _, KeyInit as _, OsRng},
};
use secrecy::SecretSlice;
use std::sync::Arc;

use super::{Error, KeyExchange, SymmetricBundle, SymmetricCipher};

/// Wire version of the AES-256-GCM generation.  Frozen: a different key or
/// nonce size means a new version number, never a change here.
pub const AES256_GCM_VERSION: u16 = 1;

/// AES-256-GCM as a [`SymmetricCipher`]: 32-byte keys, 12-byte nonces, and
/// the authentication tag carried at the tail of the ciphertext.
pub struct Aes256;

impl SymmetricCipher for Aes256 {
	const KEY_LEN: usize = 32;
	const IV_LEN: usize = 12;

	fn generate_key() -> SecretSlice<u8> {
		Aes256Gcm::generate_key(OsRng).to_vec().into()
	}

	fn generate_iv() -> Vec<u8> {
		Aes256Gcm::generate_nonce(&mut OsRng).to_vec()
	}

	fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
		if iv.len() != Self::IV_LEN {
			return Err(Error::Encryption);
		}

		let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::Encryption)?;

		cipher
			.encrypt(Nonce::from_slice(iv), plaintext)
			.map_err(|_| Error::Encryption)
	}

	fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
		if iv.len() != Self::IV_LEN {
			return Err(Error::Decryption);
		}

		let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::Decryption)?;

		cipher
			.decrypt(Nonce::from_slice(iv), ciphertext)
			.map_err(|_| Error::Decryption)
	}
}

/// The current modern generation: AES-256-GCM payloads with RSA-protected
/// session keys.
pub type Aes256Bundle = SymmetricBundle<Aes256>;

impl Aes256Bundle {
	/// Create the AES-256-GCM bundle under [`AES256_GCM_VERSION`].
	///
	/// # Errors
	///
	/// Cannot actually fail for this version; the `Result` matches the
	/// construction contract shared by all symmetric bundles.
	pub fn new(key_exchange: Arc<dyn KeyExchange>) -> Result<Self, Error> {
		SymmetricBundle::with_version(AES256_GCM_VERSION, key_exchange)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use secrecy::ExposeSecret as _;

	#[test]
	fn generated_material_has_fixed_sizes() {
		assert_eq!(Aes256::KEY_LEN, Aes256::generate_key().expose_secret().len());
		assert_eq!(Aes256::IV_LEN, Aes256::generate_iv().len());
	}

	#[test]
	fn cipher_round_trip() {
		let key = Aes256::generate_key();
		let iv = Aes256::generate_iv();

		let ciphertext = Aes256::encrypt(key.expose_secret(), &iv, b"hello").unwrap();
		assert_ne!(b"hello".to_vec(), ciphertext);

		let plaintext = Aes256::decrypt(key.expose_secret(), &iv, &ciphertext).unwrap();
		assert_eq!(b"hello".to_vec(), plaintext);
	}

	#[test]
	fn wrong_key_fails() {
		let key = Aes256::generate_key();
		let other = Aes256::generate_key();
		let iv = Aes256::generate_iv();

		let ciphertext = Aes256::encrypt(key.expose_secret(), &iv, b"hello").unwrap();

		let result = Aes256::decrypt(other.expose_secret(), &iv, &ciphertext);
		assert!(matches!(result, Err(Error::Decryption)));
	}

	#[test]
	fn bad_iv_length_is_rejected() {
		let key = Aes256::generate_key();

		let result = Aes256::encrypt(key.expose_secret(), b"short", b"hello");
		assert!(matches!(result, Err(Error::Encryption)));

		let result = Aes256::decrypt(key.expose_secret(), b"short", b"hello");
		assert!(matches!(result, Err(Error::Decryption)));
	}
}
