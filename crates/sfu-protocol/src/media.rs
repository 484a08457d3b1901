//! Media datagram layout: a 32-byte zero-padded UTF-8 name prefix followed
//! by raw 16-bit little-endian linear PCM (16 kHz, mono).
//!
//! The name prefix is always present on the wire, inbound and outbound
//! alike: the forwarder retransmits every datagram body verbatim after
//! binding, it never strips the prefix before re-sending.

/// Width of the embedded name field, in bytes.
pub const NAME_PREFIX_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("datagram shorter than the {0}-byte name prefix")]
    TooShort(usize),
    #[error("embedded name decodes to an empty string")]
    EmptyName,
}

/// Extract the sender's asserted name from a media datagram.
///
/// This only inspects the fixed 32-byte prefix; it does not allocate a copy
/// of the payload. Callers that need to forward the datagram should keep the
/// original byte slice and send it on unchanged.
pub fn parse_datagram(bytes: &[u8]) -> Result<String, MediaError> {
    if bytes.len() < NAME_PREFIX_LEN {
        return Err(MediaError::TooShort(NAME_PREFIX_LEN));
    }
    let prefix = &bytes[..NAME_PREFIX_LEN];
    let trimmed = trim_trailing_zeros(prefix);
    let name = String::from_utf8_lossy(trimmed).into_owned();
    if name.is_empty() {
        return Err(MediaError::EmptyName);
    }
    Ok(name)
}

fn trim_trailing_zeros(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Encode a name into a zero-padded 32-byte prefix, for use by test clients
/// and the demo client. Truncates names that don't fit; participant names
/// are capped at 32 encoded bytes so truncation should never trigger in
/// practice.
pub fn encode_name_prefix(name: &str) -> [u8; NAME_PREFIX_LEN] {
    let mut buf = [0u8; NAME_PREFIX_LEN];
    let bytes = name.as_bytes();
    let n = bytes.len().min(NAME_PREFIX_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}
