use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use secrecy::SecretSlice;
use sha1::Sha1;

use super::{Bundle, Error, KeyPair, LATEST_VERSION, LEGACY_VERSION};

/// Asymmetric wrapping of a symmetric session secret so it can travel
/// alongside the ciphertext it protects.
///
/// Symmetric bundles never hold asymmetric key material themselves; they
/// delegate here, so session-key confidentiality always rests on the key
/// pair no matter which cipher generation did the bulk encryption.
pub trait KeyExchange: Send + Sync {
	/// Wrap `secret` with the public key.
	///
	/// # Errors
	///
	/// Will return [`Error::Encryption`] if `secret` exceeds what the key
	/// size allows, or the underlying encryption fails.
	fn create_key_exchange(&self, secret: &[u8]) -> Result<Vec<u8>, Error>;

	/// Unwrap a blob produced by [`KeyExchange::create_key_exchange`].
	///
	/// # Errors
	///
	/// Will return [`Error::Decryption`] if the blob was wrapped with a
	/// different key pair, or is not a key-exchange blob at all.
	fn decrypt_key_exchange(&self, blob: &[u8]) -> Result<SecretSlice<u8>, Error>;
}

pub(crate) fn wrap_secret(public_key: &RsaPublicKey, secret: &[u8]) -> Result<Vec<u8>, Error> {
	let mut rng = rand::thread_rng();

	public_key
		.encrypt(&mut rng, Oaep::new::<Sha1>(), secret)
		.map_err(|_| Error::Encryption)
}

pub(crate) fn unwrap_secret(
	private_key: &RsaPrivateKey,
	blob: &[u8],
) -> Result<SecretSlice<u8>, Error> {
	private_key
		.decrypt(Oaep::new::<Sha1>(), blob)
		.map(SecretSlice::from)
		.map_err(|_| Error::Decryption)
}

/// A bundle that protects secrets directly with a public/private key pair.
///
/// Asymmetric encryption is slow and hard-capped by key size, so this
/// bundle is reserved for key-exchange use: [`Bundle::can_encrypt`] always
/// declines, and the direct data paths refuse outright.  Only the
/// [`LegacyBundle`](super::LegacyBundle) specialization encrypts payloads
/// asymmetrically, and only for historical compatibility.
pub struct AsymmetricBundle {
	version: u16,
	key_pair: KeyPair,
}

impl AsymmetricBundle {
	/// Create a key-exchange bundle under `version`.
	///
	/// # Errors
	///
	/// Will return [`Error::ReservedVersion`] for [`LATEST_VERSION`] (never
	/// a real bundle) or [`LEGACY_VERSION`] (owned by the legacy bundle
	/// alone).
	#[tracing::instrument(level = "debug", skip(key_pair))]
	pub fn new(version: u16, key_pair: KeyPair) -> Result<Self, Error> {
		if version == LATEST_VERSION || version == LEGACY_VERSION {
			return Err(Error::ReservedVersion { version });
		}

		Ok(Self { version, key_pair })
	}
}

impl std::fmt::Debug for AsymmetricBundle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		f.debug_struct("AsymmetricBundle")
			.field("version", &self.version)
			.field("key_pair", &self.key_pair)
			.finish()
	}
}

impl Bundle for AsymmetricBundle {
	fn version(&self) -> u16 {
		self.version
	}

	// Bulk payloads belong to symmetric bundles; never volunteer for them.
	fn can_encrypt(&self, _input: &str) -> Option<Vec<u8>> {
		None
	}

	fn encrypt_value(&self, _plaintext: &[u8]) -> Result<String, Error> {
		Err(Error::unsupported("direct data encryption"))
	}

	fn decrypt_value(&self, _payload: &[u8], _offset: usize) -> Result<String, Error> {
		Err(Error::unsupported("direct data decryption"))
	}
}

impl KeyExchange for AsymmetricBundle {
	#[tracing::instrument(level = "debug", skip(self, secret))]
	fn create_key_exchange(&self, secret: &[u8]) -> Result<Vec<u8>, Error> {
		wrap_secret(&self.key_pair.public, secret)
	}

	#[tracing::instrument(level = "debug", skip(self, blob))]
	fn decrypt_key_exchange(&self, blob: &[u8]) -> Result<SecretSlice<u8>, Error> {
		unwrap_secret(&self.key_pair.private, blob)
	}
}
