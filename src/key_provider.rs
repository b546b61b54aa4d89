use rsa::{RsaPrivateKey, RsaPublicKey, traits::PublicKeyParts as _};

use super::Error;

/// An asymmetric key pair backing a bundle's key-exchange (and, for the
/// legacy generation, direct data encryption).
#[derive(Clone)]
pub struct KeyPair {
	pub public: RsaPublicKey,
	pub private: RsaPrivateKey,
}

impl KeyPair {
	/// Modulus size in bits.
	pub fn bits(&self) -> usize {
		self.public.size() * 8
	}
}

impl std::fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		f.debug_struct("KeyPair").field("bits", &self.bits()).finish()
	}
}

/// Where bundles get their key material from.
///
/// Implementations typically front a certificate store; the thumbprint is
/// whatever identifier that store keys its certificates by.
pub trait KeyProvider: Send + Sync {
	/// Look up the key pair for a certificate thumbprint.
	///
	/// # Errors
	///
	/// Will return [`Error::InvalidKey`] if no certificate matches the
	/// thumbprint, or its key material cannot be loaded.
	fn key_pair(&self, thumbprint: &str) -> Result<KeyPair, Error>;
}

/// The two configuration values this subsystem consumes.
pub trait EncryptionConfig: Send + Sync {
	/// Thumbprint of the certificate whose key pair encrypts new data.
	fn encryption_thumbprint(&self) -> String;

	/// Whether the legacy generation may still be used for *new*
	/// encryptions.  Decryption of old legacy ciphertexts is unaffected.
	fn use_legacy(&self) -> bool;
}

/// Generate a fresh key pair of the given modulus size.
///
/// This isn't usually required in real-world usage, as production key pairs
/// come out of a certificate store via a [`KeyProvider`].  However, for
/// testing use, or the odd occasion when a throwaway key pair is all you
/// need, a simple generation function is useful to have laying around.
///
/// # Errors
///
/// Will return [`Error::InvalidKey`] if `bits` is not a size the underlying
/// implementation can generate.
#[tracing::instrument(level = "debug")]
pub fn generate_key_pair(bits: usize) -> Result<KeyPair, Error> {
	let mut rng = rand::thread_rng();

	let private = RsaPrivateKey::new(&mut rng, bits).map_err(|e| Error::invalid_key(e.to_string()))?;
	let public = private.to_public_key();

	Ok(KeyPair { public, private })
}

#[cfg(test)]
pub(crate) fn test_key_pair() -> KeyPair {
	use std::sync::OnceLock;

	static KEYS: OnceLock<KeyPair> = OnceLock::new();

	KEYS.get_or_init(|| generate_key_pair(1024).expect("key generation failed"))
		.clone()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generated_pair_has_requested_size() {
		let keys = test_key_pair();

		assert_eq!(1024, keys.bits());
	}

	#[test]
	fn debug_does_not_leak_key_material() {
		let keys = test_key_pair();

		assert_eq!("KeyPair { bits: 1024 }", format!("{keys:?}"));
	}
}
