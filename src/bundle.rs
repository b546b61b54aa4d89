use super::Error;

/// Version number reserved for the original, unversioned encryption
/// generation.  Exactly one bundle (the [`LegacyBundle`](super::LegacyBundle))
/// may carry it.
pub const LEGACY_VERSION: u16 = 0;

/// Caller-facing alias meaning "whichever bundle is currently newest".
/// Never assigned to a real bundle; only meaningful to
/// [`BundleRegistry::resolve`](super::BundleRegistry::resolve).
pub const LATEST_VERSION: u16 = u16::MAX;

/// Core trait implemented by every generation of encryption bundle.
///
/// A bundle pairs a fixed wire version with the ability to produce and
/// consume that generation's encrypted payload.  Callers don't normally
/// touch bundles directly; they go through the
/// [`BundleRegistry`](super::BundleRegistry), which picks a bundle for
/// encryption and routes ciphertexts back to the bundle that can read them.
pub trait Bundle: Send + Sync {
	/// The wire version this bundle stamps into (and claims from) messages.
	fn version(&self) -> u16;

	/// Decide whether this bundle will take `input`, and if so, hand back
	/// the plaintext bytes to feed [`Bundle::encrypt_value`].
	///
	/// The default implementation accepts everything.  Bundles with a size
	/// ceiling or an off switch override this to decline.
	fn can_encrypt(&self, input: &str) -> Option<Vec<u8>> {
		Some(input.as_bytes().to_vec())
	}

	/// Encrypt `plaintext` and format it into this bundle's wire form.
	///
	/// # Errors
	///
	/// Will return [`Error::Encryption`] if the underlying cipher or key
	/// exchange fails, or [`Error::Unsupported`] for bundles that only do
	/// key exchange.
	fn encrypt_value(&self, plaintext: &[u8]) -> Result<String, Error>;

	/// Invert [`Bundle::encrypt_value`], starting at `offset` within
	/// `payload` (the dispatcher has already consumed the version prefix).
	///
	/// # Errors
	///
	/// Will return one of the following:
	/// * [`Error::Decryption`] if the ciphertext was produced with a
	///   different key, or the recovered plaintext is not valid UTF-8.
	/// * [`Error::InvalidMessage`] if the payload framing is malformed,
	///   which means the message was corrupted in storage or transit, or
	///   was never one of ours.
	fn decrypt_value(&self, payload: &[u8], offset: usize) -> Result<String, Error>;

	/// Whether this bundle can decrypt a payload stamped with `version`.
	///
	/// The empty payload decrypts trivially to the empty string under any
	/// bundle, so every bundle claims it.
	fn can_decrypt(&self, version: u16, payload: &[u8]) -> bool {
		version == self.version() || payload.is_empty()
	}
}
