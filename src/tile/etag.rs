//! Content-identity tags.
//!
//! A tile's identity is a 64-bit value rendered as a fixed 13-character
//! base-32 token. Thirteen five-bit digits give one bit more than the
//! value needs; that spare bit, carried in the leading digit, flags the
//! token as denoting the canonical missing tile.

/// Base-32 digit alphabet, lowercase.
const DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Token length: 13 digits x 5 bits = 64 value bits + 1 flag bit.
pub const ETAG_LEN: usize = 13;

/// Number of payload bytes folded into a content-derived tag.
const FOLD_SAMPLES: usize = 64;

// =============================================================================
// Base-32 token codec
// =============================================================================

/// Render a 64-bit value as a 13-character base-32 token.
///
/// The flag occupies the spare bit of the leading digit, so flagged and
/// unflagged tokens for the same value differ only in that digit.
pub fn to_base32(value: u64, flag: bool) -> String {
    let mut buf = [0u8; ETAG_LEN];
    let mut v = value;
    for slot in buf.iter_mut().rev() {
        *slot = (v & 0x1F) as u8;
        v >>= 5;
    }
    if flag {
        buf[0] |= 0x10;
    }
    let rendered: Vec<u8> = buf.iter().map(|&d| DIGITS[d as usize]).collect();
    // The alphabet is ASCII
    String::from_utf8(rendered).unwrap_or_default()
}

/// Decode a 13-character base-32 token back to its value and flag.
///
/// Returns `None` for tokens of the wrong length or with characters
/// outside the alphabet.
pub fn from_base32(token: &str) -> Option<(u64, bool)> {
    let bytes = token.as_bytes();
    if bytes.len() != ETAG_LEN {
        return None;
    }

    let digit = |c: u8| -> Option<u64> {
        match c {
            b'0'..=b'9' => Some((c - b'0') as u64),
            b'a'..=b'v' => Some((c - b'a' + 10) as u64),
            b'A'..=b'V' => Some((c - b'A' + 10) as u64),
            _ => None,
        }
    };

    let first = digit(bytes[0])?;
    let flag = first & 0x10 != 0;
    let mut value = first & 0x0F;
    for &c in &bytes[1..] {
        value = (value << 5) | digit(c)?;
    }
    Some((value, flag))
}

// =============================================================================
// Tag derivation
// =============================================================================

/// Fold evenly sampled payload bytes into the seed.
///
/// Used when the upstream source provided no usable identity of its own.
/// Deterministic shift-XOR only: the same bytes always produce the same
/// tag, and nothing stronger is promised.
pub fn fold_tag(seed: u64, data: &[u8]) -> u64 {
    if data.is_empty() {
        return seed;
    }
    let samples = FOLD_SAMPLES.min(data.len());
    let step = data.len() / samples;
    let mut tag = seed;
    for i in 0..samples {
        tag = tag.rotate_left(5) ^ data[i * step] as u64;
    }
    tag
}

/// Derive the output tag for a tile from the source's tag and the payload.
///
/// The source tag is XOR-ed with the configured seed; when that collides
/// with the bare seed (the source tag decoded to zero, meaning the source
/// omitted a usable tag), the tag is derived from the payload instead.
pub fn derive_tag(seed: u64, source_tag: Option<u64>, payload: &[u8]) -> u64 {
    let tag = source_tag.unwrap_or(0) ^ seed;
    if tag == seed {
        fold_tag(seed, payload)
    } else {
        tag
    }
}

// =============================================================================
// Tests
// =============================================================================
