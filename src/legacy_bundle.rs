use base64::prelude::{BASE64_STANDARD, Engine as _};
use secrecy::{ExposeSecret as _, SecretSlice};

use super::{
	Bundle, EncryptionConfig, Error, KeyExchange, KeyPair, KeyProvider, LEGACY_VERSION,
	asymmetric_bundle,
};

/// The original encryption generation: short payloads encrypted directly
/// with the public key, emitted as bare Base64 with no marker and no
/// version bytes.
///
/// This is the one bundle whose wire output is the legacy (unversioned)
/// form, which is what keeps ciphertexts minted before versioning existed
/// decryptable forever.  It pays for that with a hard payload ceiling
/// derived from the key size, so the registry only ever selects it as a
/// last resort -- and only when the configuration still allows it.
///
/// It also serves as the key-exchange delegate for every symmetric bundle,
/// so session-key confidentiality always rests on the same certificate
/// regardless of cipher generation.
pub struct LegacyBundle {
	key_pair: KeyPair,
	enabled: bool,
	max_plaintext: usize,
}

impl LegacyBundle {
	/// Create the legacy bundle over `key_pair`.  `enabled` gates new
	/// encryptions only; decryption always works.
	#[tracing::instrument(level = "debug", skip(key_pair))]
	pub fn new(key_pair: KeyPair, enabled: bool) -> Self {
		let key_bits = key_pair.bits();
		let max_plaintext = ((key_bits - 384) / 8) + 6;

		tracing::debug!(key_bits, max_plaintext, enabled, "Initialized legacy bundle");

		Self {
			key_pair,
			enabled,
			max_plaintext,
		}
	}

	/// Resolve the certificate named by the configuration and build the
	/// legacy bundle from it.
	///
	/// # Errors
	///
	/// Will return [`Error::InvalidKey`] if the provider cannot produce a
	/// key pair for the configured thumbprint.
	#[tracing::instrument(level = "debug", skip(provider, config))]
	pub fn from_config(
		provider: &dyn KeyProvider,
		config: &dyn EncryptionConfig,
	) -> Result<Self, Error> {
		let key_pair = provider.key_pair(&config.encryption_thumbprint())?;

		Ok(Self::new(key_pair, config.use_legacy()))
	}

	/// Largest plaintext, in bytes, this bundle will accept.
	pub fn max_plaintext(&self) -> usize {
		self.max_plaintext
	}

	/// Whether new encryptions through this bundle are permitted.
	pub fn is_enabled(&self) -> bool {
		self.enabled
	}
}

impl std::fmt::Debug for LegacyBundle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		f.debug_struct("LegacyBundle")
			.field("key_pair", &self.key_pair)
			.field("enabled", &self.enabled)
			.field("max_plaintext", &self.max_plaintext)
			.finish()
	}
}

impl Bundle for LegacyBundle {
	fn version(&self) -> u16 {
		LEGACY_VERSION
	}

	#[tracing::instrument(level = "debug", skip(self, input))]
	fn can_encrypt(&self, input: &str) -> Option<Vec<u8>> {
		if !self.enabled {
			tracing::debug!("Legacy bundle disabled");
			return None;
		}

		let bytes = input.as_bytes();

		if bytes.len() > self.max_plaintext {
			tracing::debug!(
				len = bytes.len(),
				max = self.max_plaintext,
				"Payload too large for legacy bundle",
			);
			return None;
		}

		Some(bytes.to_vec())
	}

	#[tracing::instrument(level = "debug", skip(self, plaintext))]
	fn encrypt_value(&self, plaintext: &[u8]) -> Result<String, Error> {
		let ciphertext = asymmetric_bundle::wrap_secret(&self.key_pair.public, plaintext)?;

		// No marker, no version bytes: the legacy wire form
		Ok(BASE64_STANDARD.encode(ciphertext))
	}

	#[tracing::instrument(level = "debug", skip(self, payload))]
	fn decrypt_value(&self, payload: &[u8], offset: usize) -> Result<String, Error> {
		let body = payload.get(offset..).unwrap_or_default();

		if body.is_empty() {
			return Ok(String::new());
		}

		let plaintext = asymmetric_bundle::unwrap_secret(&self.key_pair.private, body)?;

		String::from_utf8(plaintext.expose_secret().to_vec()).map_err(|_| Error::Decryption)
	}
}

impl KeyExchange for LegacyBundle {
	#[tracing::instrument(level = "debug", skip(self, secret))]
	fn create_key_exchange(&self, secret: &[u8]) -> Result<Vec<u8>, Error> {
		asymmetric_bundle::wrap_secret(&self.key_pair.public, secret)
	}

	#[tracing::instrument(level = "debug", skip(self, blob))]
	fn decrypt_key_exchange(&self, blob: &[u8]) -> Result<SecretSlice<u8>, Error> {
		asymmetric_bundle::unwrap_secret(&self.key_pair.private, blob)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::key_provider::test_key_pair;
	use crate::message::{decode_message, is_versioned_message};

	fn bundle(enabled: bool) -> LegacyBundle {
		LegacyBundle::new(test_key_pair(), enabled)
	}

	#[test]
	fn ceiling_follows_key_size() {
		// 1024-bit key: ((1024 - 384) / 8) + 6
		assert_eq!(86, bundle(true).max_plaintext());
	}

	#[test]
	fn accepts_at_ceiling_rejects_above() {
		let bundle = bundle(true);
		let max = bundle.max_plaintext();

		let at_limit = "a".repeat(max);
		assert!(bundle.can_encrypt(&at_limit).is_some());

		let over_limit = "a".repeat(max + 1);
		assert!(bundle.can_encrypt(&over_limit).is_none());
	}

	#[test]
	fn ceiling_sized_payload_round_trips() {
		let bundle = bundle(true);
		let plaintext = "a".repeat(bundle.max_plaintext());

		let accepted = bundle.can_encrypt(&plaintext).unwrap();
		let message = bundle.encrypt_value(&accepted).unwrap();

		let decoded = decode_message(&message).unwrap();
		assert_eq!(
			plaintext,
			bundle
				.decrypt_value(&decoded.payload.unwrap(), decoded.offset)
				.unwrap()
		);
	}

	#[test]
	fn disabled_bundle_accepts_nothing() {
		let bundle = bundle(false);

		assert!(bundle.can_encrypt("x").is_none());
		assert!(bundle.can_encrypt("").is_none());
	}

	#[test]
	fn wire_form_is_unversioned() {
		let bundle = bundle(true);
		let message = bundle.encrypt_value(b"hello").unwrap();

		assert!(!is_versioned_message(&message));

		let decoded = decode_message(&message).unwrap();
		assert_eq!(LEGACY_VERSION, decoded.version);
		assert_eq!(0, decoded.offset);
	}

	#[test]
	fn empty_body_decrypts_to_empty_string() {
		assert_eq!("", bundle(true).decrypt_value(b"", 0).unwrap());
	}

	#[test]
	fn from_config_wires_provider_and_flag() {
		struct FixedProvider;

		impl KeyProvider for FixedProvider {
			fn key_pair(&self, thumbprint: &str) -> Result<KeyPair, Error> {
				if thumbprint == "ab12" {
					Ok(test_key_pair())
				} else {
					Err(Error::invalid_key(format!(
						"no certificate for thumbprint {thumbprint}"
					)))
				}
			}
		}

		struct FixedConfig;

		impl EncryptionConfig for FixedConfig {
			fn encryption_thumbprint(&self) -> String {
				"ab12".to_string()
			}

			fn use_legacy(&self) -> bool {
				false
			}
		}

		let bundle = LegacyBundle::from_config(&FixedProvider, &FixedConfig).unwrap();

		assert!(!bundle.is_enabled());
		assert_eq!(86, bundle.max_plaintext());
	}
}
