//! Versioned encryption bundles with transparent cipher rollover.
//!
//! If you need to encrypt string payloads today, decrypt payloads you
//! encrypted years ago with an older algorithm, and roll the whole fleet
//! forward to a stronger cipher without re-encrypting a single row, then
//! this crate is for you.
//!
//! Each generation of encryption is a [`Bundle`]: a fixed 16-bit version
//! number plus the ability to produce and consume that generation's wire
//! format.  Encrypted values are self-describing strings -- a `#` marker
//! and a Base64 payload whose first two bytes carry the version -- so any
//! ciphertext can always be routed back to the bundle that made it.  The
//! one exception is the [`LegacyBundle`], whose output predates versioning
//! entirely: bare Base64 over a direct asymmetric encryption, implied to be
//! version zero.
//!
//! Callers don't pick bundles themselves.  They hand the full set to a
//! [`BundleRegistry`] once at startup and then call
//! [`encrypt`](BundleRegistry::encrypt) and
//! [`decrypt`](BundleRegistry::decrypt) on it.  Encryption tries bundles
//! newest-first (legacy always dead last, and only if the caller allows
//! it); decryption dispatches on the version embedded in the message.
//!
//! # Kinds of Bundles
//!
//! The modern generations are [`SymmetricBundle`]s: the payload is
//! encrypted with a fast symmetric cipher under a fresh session key and IV,
//! and those two secrets travel alongside the ciphertext, each wrapped by
//! an asymmetric [`KeyExchange`] delegate.  [`Aes256Bundle`] is the current
//! concrete generation (AES-256-GCM).  Growing a stronger cipher later
//! means allocating a new version number with
//! [`SymmetricBundle::with_version`] -- never changing the key or IV size
//! of a version that has already shipped.
//!
//! [`AsymmetricBundle`] protects secrets directly with a public/private
//! key pair, but refuses bulk payloads: asymmetric encryption is reserved
//! for key exchange, where its size ceiling doesn't hurt.  The
//! [`LegacyBundle`] is the historical exception that *does* encrypt
//! payloads asymmetrically -- capped at a handful of bytes derived from the
//! key size, gated by configuration, and kept around so nothing already in
//! storage ever becomes unreadable.
mod aes_bundle;
mod asymmetric_bundle;
mod bundle;
mod error;
mod key_provider;
mod legacy_bundle;
mod message;
mod registry;
mod symmetric_bundle;

pub use aes_bundle::{AES256_GCM_VERSION, Aes256, Aes256Bundle};
pub use asymmetric_bundle::{AsymmetricBundle, KeyExchange};
pub use bundle::{Bundle, LATEST_VERSION, LEGACY_VERSION};
pub use error::Error;
pub use key_provider::{EncryptionConfig, KeyPair, KeyProvider, generate_key_pair};
pub use legacy_bundle::LegacyBundle;
pub use message::{
	DecodedMessage, VERSION_MARKER, decode_message, encode_versioned, is_versioned_message,
};
pub use registry::BundleRegistry;
pub use symmetric_bundle::{SymmetricBundle, SymmetricCipher};
