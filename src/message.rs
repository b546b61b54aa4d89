use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::{Error, LEGACY_VERSION};

/// First character of every versioned wire message.  Legacy messages are
/// bare Base64 and never start with it, so the two forms can share a
/// storage column indefinitely.
pub const VERSION_MARKER: char = '#';

/// A wire message pulled apart into its payload bytes, the offset of the
/// first bundle-specific byte, and the version that produced it.
#[derive(Clone, Debug)]
pub struct DecodedMessage {
	/// `None` for an empty message.
	pub payload: Option<Vec<u8>>,
	/// Where the bundle payload starts (2 for versioned messages, 0 for
	/// legacy ones).
	pub offset: usize,
	/// The embedded version, or [`LEGACY_VERSION`] when there is none.
	pub version: u16,
}

/// True iff `message` is in the versioned wire form.
pub fn is_versioned_message(message: &str) -> bool {
	message.starts_with(VERSION_MARKER)
}

/// Split a wire message into payload, payload offset, and version.
///
/// A message starting with [`VERSION_MARKER`] has the marker stripped, the
/// remainder Base64-decoded, and its first two bytes read as the
/// little-endian version.  Anything else is decoded whole and implied to be
/// [`LEGACY_VERSION`].  An empty message decodes to no payload at all.
///
/// # Errors
///
/// Will return [`Error::InvalidMessage`] if the Base64 is malformed, or a
/// versioned payload is shorter than its own version prefix.
pub fn decode_message(message: &str) -> Result<DecodedMessage, Error> {
	if message.is_empty() {
		return Ok(DecodedMessage {
			payload: None,
			offset: 0,
			version: LEGACY_VERSION,
		});
	}

	if let Some(body) = message.strip_prefix(VERSION_MARKER) {
		let payload = BASE64_STANDARD
			.decode(body)
			.map_err(|_| Error::invalid_message("payload is not valid base64"))?;

		if payload.len() < 2 {
			return Err(Error::invalid_message(
				"versioned payload shorter than its version prefix",
			));
		}

		let version = u16::from_le_bytes([payload[0], payload[1]]);

		Ok(DecodedMessage {
			payload: Some(payload),
			offset: 2,
			version,
		})
	} else {
		let payload = BASE64_STANDARD
			.decode(message)
			.map_err(|_| Error::invalid_message("payload is not valid base64"))?;

		Ok(DecodedMessage {
			payload: Some(payload),
			offset: 0,
			version: LEGACY_VERSION,
		})
	}
}

/// Frame a bundle payload into the versioned wire form: marker, then
/// Base64 over the little-endian version followed by `body`.
pub fn encode_versioned(version: u16, body: &[u8]) -> String {
	let mut buf = Vec::with_capacity(2 + body.len());
	buf.extend_from_slice(&version.to_le_bytes());
	buf.extend_from_slice(body);

	format!("{VERSION_MARKER}{}", BASE64_STANDARD.encode(buf))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_message_has_no_payload() {
		let decoded = decode_message("").unwrap();

		assert!(decoded.payload.is_none());
		assert_eq!(0, decoded.offset);
		assert_eq!(LEGACY_VERSION, decoded.version);
	}

	#[test]
	fn versioned_framing_round_trip() {
		let message = encode_versioned(42, b"payload bytes");

		assert!(is_versioned_message(&message));

		let decoded = decode_message(&message).unwrap();
		assert_eq!(42, decoded.version);
		assert_eq!(2, decoded.offset);
		assert_eq!(
			b"payload bytes".as_slice(),
			&decoded.payload.unwrap()[decoded.offset..]
		);
	}

	#[test]
	fn version_prefix_is_little_endian() {
		let message = encode_versioned(0x0102, b"");
		let decoded = decode_message(&message).unwrap();

		assert_eq!(0x0102, decoded.version);
		assert_eq!(vec![0x02, 0x01], decoded.payload.unwrap());
	}

	#[test]
	fn bare_base64_is_legacy() {
		use base64::prelude::{BASE64_STANDARD, Engine as _};

		let message = BASE64_STANDARD.encode(b"raw asymmetric output");

		assert!(!is_versioned_message(&message));

		let decoded = decode_message(&message).unwrap();
		assert_eq!(LEGACY_VERSION, decoded.version);
		assert_eq!(0, decoded.offset);
		assert_eq!(b"raw asymmetric output".to_vec(), decoded.payload.unwrap());
	}

	#[test]
	fn truncated_version_prefix_is_rejected() {
		// "#" followed by base64 of a single byte: too short to hold a version
		let result = decode_message("#AA==");
		assert!(matches!(result, Err(Error::InvalidMessage(_))));

		let result = decode_message("#");
		assert!(matches!(result, Err(Error::InvalidMessage(_))));
	}

	#[test]
	fn garbage_base64_is_rejected() {
		assert!(matches!(
			decode_message("#!!not base64!!"),
			Err(Error::InvalidMessage(_))
		));
		assert!(matches!(
			decode_message("!!not base64!!"),
			Err(Error::InvalidMessage(_))
		));
	}
}
