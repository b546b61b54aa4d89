use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use super::{
	Aes256Bundle, Bundle, EncryptionConfig, Error, KeyExchange, KeyProvider, LATEST_VERSION,
	LEGACY_VERSION, LegacyBundle, message,
};

/// The version→bundle index and the selection/dispatch logic over it.
///
/// Built exactly once at process startup and read-only from then on, the
/// registry is the only surface the rest of an application talks to:
/// [`BundleRegistry::encrypt`] picks the bundle for new data, and
/// [`BundleRegistry::decrypt`] routes any wire message -- from this cipher
/// generation or any earlier one -- back to the bundle that can read it.
///
/// Selection order for encryption is by version, descending, with the
/// legacy bundle always last regardless of its numeric version of zero.
/// That gives two guarantees at once: modern data always prefers the newest
/// capable bundle, and the size-capped legacy generation is only ever a
/// last resort (and only when the caller explicitly allows it).
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use cipher_bundle::{
/// 	Aes256Bundle, Bundle, BundleRegistry, Error, KeyExchange, LegacyBundle, generate_key_pair,
/// };
/// # fn main() -> Result<(), Error> {
///
/// let keys = generate_key_pair(2048)?;
/// let legacy = Arc::new(LegacyBundle::new(keys, true));
///
/// // The legacy bundle's key pair protects every generation's session keys
/// let exchanger: Arc<dyn KeyExchange> = legacy.clone();
/// let aes = Aes256Bundle::new(exchanger)?;
///
/// let bundles: [Arc<dyn Bundle>; 2] = [Arc::new(aes), legacy];
/// let registry = BundleRegistry::new(bundles)?;
///
/// // New data goes out under the newest capable bundle...
/// let message = registry.encrypt("attack at dawn", true)?;
/// assert!(message.starts_with('#'));
///
/// // ...and whatever comes back is routed to whichever bundle produced it
/// assert_eq!("attack at dawn", registry.decrypt(&message)?);
/// # Ok(())
/// # }
/// ```
pub struct BundleRegistry {
	// Encryption priority order: version descending, legacy last
	bundles: Vec<Arc<dyn Bundle>>,
	by_version: HashMap<u16, Arc<dyn Bundle>>,
	latest: Arc<dyn Bundle>,
	legacy: Option<Arc<dyn Bundle>>,
}

impl BundleRegistry {
	/// Build the registry from a pre-constructed set of bundles.
	///
	/// A bundle whose version is already registered is skipped with a
	/// warning; first-seen wins.
	///
	/// # Errors
	///
	/// Will return [`Error::NoBundles`] if no bundle survives registration.
	#[tracing::instrument(level = "debug", skip(bundles))]
	pub fn new(bundles: impl IntoIterator<Item = Arc<dyn Bundle>>) -> Result<Self, Error> {
		let mut by_version: HashMap<u16, Arc<dyn Bundle>> = HashMap::default();
		let mut ordered: Vec<Arc<dyn Bundle>> = Vec::new();

		for bundle in bundles {
			let version = bundle.version();

			if by_version.contains_key(&version) {
				tracing::warn!(version, "Skipping bundle with duplicate version");
				continue;
			}

			tracing::debug!(version, "Registering bundle");
			by_version.insert(version, Arc::clone(&bundle));
			ordered.push(bundle);
		}

		ordered.sort_by(|a, b| {
			match (a.version() == LEGACY_VERSION, b.version() == LEGACY_VERSION) {
				(false, false) => b.version().cmp(&a.version()),
				(true, false) => Ordering::Greater,
				(false, true) => Ordering::Less,
				(true, true) => Ordering::Equal,
			}
		});

		let legacy = by_version.get(&LEGACY_VERSION).cloned();
		let latest = ordered.first().cloned().ok_or(Error::NoBundles)?;

		tracing::debug!(latest = latest.version(), "Registry built");

		Ok(Self {
			bundles: ordered,
			by_version,
			latest,
			legacy,
		})
	}

	/// Build the production bundle set -- the AES-256-GCM generation plus
	/// the legacy generation as both fallback codec and key-exchange
	/// delegate -- from the two collaborator interfaces.
	///
	/// # Errors
	///
	/// Will return [`Error::InvalidKey`] if the provider cannot produce a
	/// key pair for the configured thumbprint.
	pub fn with_default_bundles(
		provider: &dyn KeyProvider,
		config: &dyn EncryptionConfig,
	) -> Result<Self, Error> {
		let legacy = Arc::new(LegacyBundle::from_config(provider, config)?);

		let exchanger: Arc<dyn KeyExchange> = legacy.clone();
		let aes = Aes256Bundle::new(exchanger)?;

		let bundles: [Arc<dyn Bundle>; 2] = [Arc::new(aes), legacy];
		Self::new(bundles)
	}

	/// Look up a bundle by version.  [`LATEST_VERSION`] resolves to the
	/// numerically highest registered bundle, [`LEGACY_VERSION`] to the
	/// legacy bundle if one was registered.
	///
	/// # Errors
	///
	/// Will return [`Error::UnknownVersion`] if nothing claims `version`.
	pub fn resolve(&self, version: u16) -> Result<&Arc<dyn Bundle>, Error> {
		match version {
			LATEST_VERSION => Ok(&self.latest),
			LEGACY_VERSION => self
				.legacy
				.as_ref()
				.ok_or(Error::UnknownVersion { version }),
			_ => self
				.by_version
				.get(&version)
				.ok_or(Error::UnknownVersion { version }),
		}
	}

	/// Version of the newest registered bundle.
	pub fn latest_version(&self) -> u16 {
		self.latest.version()
	}

	/// Registered versions in encryption priority order.
	pub fn versions(&self) -> Vec<u16> {
		self.bundles.iter().map(|b| b.version()).collect()
	}

	/// Encrypt `input` with the first bundle, in priority order, that will
	/// take it.  When `include_legacy` is false the legacy bundle is not
	/// consulted at all.
	///
	/// # Errors
	///
	/// Will return [`Error::NoSuitableBundle`] if every consulted bundle
	/// declines, or [`Error::Encryption`] if the chosen bundle's cipher
	/// fails.
	#[tracing::instrument(level = "debug", skip(self, input))]
	pub fn encrypt(&self, input: &str, include_legacy: bool) -> Result<String, Error> {
		for bundle in &self.bundles {
			if !include_legacy && bundle.version() == LEGACY_VERSION {
				tracing::debug!("Skipping legacy bundle");
				continue;
			}

			if let Some(plaintext) = bundle.can_encrypt(input) {
				tracing::debug!(version = bundle.version(), "Bundle accepted payload");
				return bundle.encrypt_value(&plaintext);
			}
		}

		Err(Error::NoSuitableBundle)
	}

	/// Decrypt a wire message, dispatching on its embedded version.
	///
	/// The bundle registered under the message's version gets first claim;
	/// failing that, the message is offered to each bundle in priority
	/// order, so one bundle can stand in for another's ciphertexts when it
	/// says it can.  Empty messages (and empty payloads) decrypt to the
	/// empty string without consulting anyone.
	///
	/// # Errors
	///
	/// Will return [`Error::UnknownVersion`] if no registered bundle claims
	/// the version, [`Error::InvalidMessage`] if the message is malformed,
	/// or [`Error::Decryption`] if the claiming bundle's cipher fails.
	#[tracing::instrument(level = "debug", skip(self, message))]
	pub fn decrypt(&self, message: &str) -> Result<String, Error> {
		let decoded = message::decode_message(message)?;

		let Some(payload) = decoded.payload else {
			return Ok(String::new());
		};

		if payload.is_empty() {
			return Ok(String::new());
		}

		if let Some(bundle) = self.by_version.get(&decoded.version) {
			if bundle.can_decrypt(decoded.version, &payload) {
				tracing::debug!(version = decoded.version, "Decrypting with version owner");
				return bundle.decrypt_value(&payload, decoded.offset);
			}
		}

		for bundle in &self.bundles {
			if bundle.can_decrypt(decoded.version, &payload) {
				tracing::debug!(
					version = decoded.version,
					delegate = bundle.version(),
					"Forwarding decryption",
				);
				return bundle.decrypt_value(&payload, decoded.offset);
			}
		}

		Err(Error::UnknownVersion {
			version: decoded.version,
		})
	}

	/// [`BundleRegistry::encrypt`], but `None` on any failure.
	pub fn try_encrypt(&self, input: &str, include_legacy: bool) -> Option<String> {
		self.encrypt(input, include_legacy).ok()
	}

	/// [`BundleRegistry::decrypt`], but `None` on any failure.
	pub fn try_decrypt(&self, message: &str) -> Option<String> {
		self.decrypt(message).ok()
	}
}

impl std::fmt::Debug for BundleRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		f.debug_struct("BundleRegistry")
			.field("versions", &self.versions())
			.field("latest", &self.latest.version())
			.field("has_legacy", &self.legacy.is_some())
			.finish()
	}
}
