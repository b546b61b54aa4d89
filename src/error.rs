#[derive(Debug, thiserror::Error, thiserror_ext::Construct)]
#[non_exhaustive]
pub enum Error {
	#[error("failed to decrypt message")]
	Decryption,

	#[error("failed to encrypt payload")]
	Encryption,

	#[error("invalid message: {0}")]
	InvalidMessage(String),

	#[error("invalid key: {0}")]
	InvalidKey(String),

	#[error("version {version} is reserved and cannot be assigned to a bundle")]
	ReservedVersion { version: u16 },

	#[error("no bundle registered for version {version}")]
	UnknownVersion { version: u16 },

	#[error("no suitable bundle available for this payload")]
	NoSuitableBundle,

	#[error("no bundles were registered")]
	NoBundles,

	#[error("{0} is not supported by this bundle")]
	Unsupported(String),
}
