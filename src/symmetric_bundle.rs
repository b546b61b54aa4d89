use secrecy::{ExposeSecret as _, SecretSlice};
use std::{marker::PhantomData, sync::Arc};

use super::{Bundle, Error, KeyExchange, LATEST_VERSION, LEGACY_VERSION, message};

/// The cipher construction a concrete symmetric generation plugs into
/// [`SymmetricBundle`].
///
/// `KEY_LEN` and `IV_LEN`, once shipped under a version number, must never
/// change for that version -- old ciphertexts embed key exchanges of
/// exactly these sizes.  A stronger cipher means a brand-new version
/// number, not a mutation of an existing one.
pub trait SymmetricCipher: Send + Sync {
	const KEY_LEN: usize;
	const IV_LEN: usize;

	/// A fresh random session key.
	fn generate_key() -> SecretSlice<u8>;

	/// A fresh random initialization vector.
	fn generate_iv() -> Vec<u8>;

	/// Encrypt `plaintext` under `key`/`iv`.
	///
	/// # Errors
	///
	/// Will return [`Error::Encryption`] on any cipher failure.
	fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>;

	/// Invert [`SymmetricCipher::encrypt`].
	///
	/// # Errors
	///
	/// Will return [`Error::Decryption`] on any cipher failure, including
	/// tampered ciphertext.
	fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// A bundle whose payloads are produced by a fast symmetric cipher, with
/// the session key and IV themselves protected by an asymmetric
/// [`KeyExchange`] delegate.
///
/// Every encryption generates a fresh key and IV, encrypts the plaintext,
/// wraps key and IV independently through the delegate, and frames the lot
/// as `[xch_len][vec_len][xch][vec][ciphertext]` (lengths are 4-byte
/// little-endian integers) inside the versioned wire form.  Decryption
/// unwraps the two blobs, reconstructs the cipher, and transforms the
/// remaining bytes back into the plaintext string.
pub struct SymmetricBundle<C: SymmetricCipher> {
	version: u16,
	key_exchange: Arc<dyn KeyExchange>,
	_cipher: PhantomData<C>,
}

impl<C: SymmetricCipher> SymmetricBundle<C> {
	/// Create a symmetric bundle under a brand-new `version`.
	///
	/// # Errors
	///
	/// Will return [`Error::ReservedVersion`] for [`LATEST_VERSION`] or
	/// [`LEGACY_VERSION`]; neither may be assigned to a symmetric bundle.
	#[tracing::instrument(level = "debug", skip(key_exchange))]
	pub fn with_version(version: u16, key_exchange: Arc<dyn KeyExchange>) -> Result<Self, Error> {
		if version == LATEST_VERSION || version == LEGACY_VERSION {
			return Err(Error::ReservedVersion { version });
		}

		Ok(Self {
			version,
			key_exchange,
			_cipher: PhantomData,
		})
	}
}

impl<C: SymmetricCipher> std::fmt::Debug for SymmetricBundle<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		f.debug_struct("SymmetricBundle")
			.field("version", &self.version)
			.field("key_len", &C::KEY_LEN)
			.field("iv_len", &C::IV_LEN)
			.finish()
	}
}

impl<C: SymmetricCipher> Bundle for SymmetricBundle<C> {
	fn version(&self) -> u16 {
		self.version
	}

	#[tracing::instrument(level = "debug", skip(self, plaintext))]
	fn encrypt_value(&self, plaintext: &[u8]) -> Result<String, Error> {
		let key = C::generate_key();
		let iv = C::generate_iv();

		let ciphertext = C::encrypt(key.expose_secret(), &iv, plaintext)?;

		let xch = self.key_exchange.create_key_exchange(key.expose_secret())?;
		let vec = self.key_exchange.create_key_exchange(&iv)?;

		let mut body = Vec::with_capacity(8 + xch.len() + vec.len() + ciphertext.len());
		body.extend_from_slice(&(xch.len() as i32).to_le_bytes());
		body.extend_from_slice(&(vec.len() as i32).to_le_bytes());
		body.extend_from_slice(&xch);
		body.extend_from_slice(&vec);
		body.extend_from_slice(&ciphertext);

		Ok(message::encode_versioned(self.version, &body))
	}

	#[tracing::instrument(level = "debug", skip(self, payload))]
	fn decrypt_value(&self, payload: &[u8], offset: usize) -> Result<String, Error> {
		let body = payload.get(offset..).unwrap_or_default();

		if body.is_empty() {
			return Ok(String::new());
		}

		if body.len() < 8 {
			return Err(Error::invalid_message(
				"payload too short for key exchange lengths",
			));
		}

		let xch_len = i32::from_le_bytes([body[0], body[1], body[2], body[3]]);
		let vec_len = i32::from_le_bytes([body[4], body[5], body[6], body[7]]);

		if xch_len < 0 || vec_len < 0 {
			return Err(Error::invalid_message("negative key exchange length"));
		}

		let xch_len = xch_len as usize;
		let vec_len = vec_len as usize;
		let rest = &body[8..];

		if rest.len() < xch_len + vec_len {
			return Err(Error::invalid_message("truncated key exchange data"));
		}

		let xch = &rest[..xch_len];
		let vec = &rest[xch_len..xch_len + vec_len];
		let ciphertext = &rest[xch_len + vec_len..];

		let key = self.key_exchange.decrypt_key_exchange(xch)?;
		let iv = self.key_exchange.decrypt_key_exchange(vec)?;

		let plaintext = C::decrypt(key.expose_secret(), iv.expose_secret(), ciphertext)?;

		String::from_utf8(plaintext).map_err(|_| Error::Decryption)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::key_provider::test_key_pair;
	use crate::message::decode_message;
	use crate::{Aes256, LegacyBundle};

	fn bundle(version: u16) -> SymmetricBundle<Aes256> {
		let exchanger: Arc<dyn KeyExchange> = Arc::new(LegacyBundle::new(test_key_pair(), true));

		SymmetricBundle::with_version(version, exchanger).unwrap()
	}

	#[test]
	fn reserved_versions_are_rejected() {
		let exchanger: Arc<dyn KeyExchange> = Arc::new(LegacyBundle::new(test_key_pair(), true));

		let result = SymmetricBundle::<Aes256>::with_version(LEGACY_VERSION, exchanger.clone());
		assert!(matches!(result, Err(Error::ReservedVersion { version: 0 })));

		let result = SymmetricBundle::<Aes256>::with_version(LATEST_VERSION, exchanger);
		assert!(matches!(
			result,
			Err(Error::ReservedVersion { version: 0xFFFF })
		));
	}

	#[test]
	fn round_trip() {
		let bundle = bundle(7);

		let message = bundle.encrypt_value("hello, world!".as_bytes()).unwrap();
		let decoded = decode_message(&message).unwrap();

		assert_eq!(7, decoded.version);
		assert_eq!(
			"hello, world!",
			bundle
				.decrypt_value(&decoded.payload.unwrap(), decoded.offset)
				.unwrap()
		);
	}

	#[test]
	fn payload_layout_is_length_prefixed() {
		let bundle = bundle(7);

		let message = bundle.encrypt_value(b"data").unwrap();
		let decoded = decode_message(&message).unwrap();
		let payload = decoded.payload.unwrap();
		let body = &payload[decoded.offset..];

		let xch_len = i32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
		let vec_len = i32::from_le_bytes([body[4], body[5], body[6], body[7]]) as usize;

		// Both blobs are RSA outputs: one modulus width each for a 1024-bit key
		assert_eq!(128, xch_len);
		assert_eq!(128, vec_len);
		// GCM ciphertext: 4 plaintext bytes plus the 16-byte tag
		assert_eq!(8 + xch_len + vec_len + 4 + 16, body.len());
	}

	#[test]
	fn truncated_payloads_are_rejected() {
		let bundle = bundle(7);

		let result = bundle.decrypt_value(&[0u8; 5], 2);
		assert!(matches!(result, Err(Error::InvalidMessage(_))));

		// Lengths claim more data than is present
		let mut body = vec![0u8; 2];
		body.extend_from_slice(&128i32.to_le_bytes());
		body.extend_from_slice(&128i32.to_le_bytes());
		body.extend_from_slice(&[0u8; 10]);
		let result = bundle.decrypt_value(&body, 2);
		assert!(matches!(result, Err(Error::InvalidMessage(_))));
	}

	#[test]
	fn tampered_ciphertext_fails() {
		let bundle = bundle(7);

		let message = bundle.encrypt_value(b"secret").unwrap();
		let decoded = decode_message(&message).unwrap();
		let mut payload = decoded.payload.unwrap();

		let last = payload.len() - 1;
		payload[last] ^= 0xff;

		let result = bundle.decrypt_value(&payload, decoded.offset);
		assert!(matches!(result, Err(Error::Decryption)));
	}

	#[test]
	fn empty_body_decrypts_to_empty_string() {
		let bundle = bundle(7);

		// A payload that is nothing but the version prefix
		assert_eq!("", bundle.decrypt_value(&7u16.to_le_bytes(), 2).unwrap());
	}
}
