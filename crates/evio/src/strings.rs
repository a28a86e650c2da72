//! Encoding of CHARSTAR8 payloads.
//!
//! Every string is followed by a single NUL and the whole payload is padded
//! with one to four `0x04` bytes so it fills a whole number of words:
//!
//! | Content                | Bytes                                   |
//! |------------------------|-----------------------------------------|
//! | `["a", "", "bc"]`      | `61 00 00 62 63 00 04 04`               |
//! | `["abc"]`              | `61 62 63 00 04 04 04 04`               |
//!
//! Payloads that do not end in `0x04` come from older writers that stored a
//! single string and left anything after its NUL undefined.

use tracing::{trace, warn};

const PAD: u8 = 0x04;

/// Number of `0x04` bytes appended to a payload of `len` bytes
const PAD_COUNT: [usize; 4] = [4, 3, 2, 1];

/// Strings recovered from a CHARSTAR8 payload
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodedStrings {
    /// The strings, in payload order
    pub strings: Vec<String>,

    /// Offset of the last NUL terminator, or the payload length when there is none
    pub string_end: usize,

    /// The payload could not be split cleanly and was returned as one string
    pub bad_format: bool,
}

/// Encode `strings` into a CHARSTAR8 payload
///
/// An empty list gives an empty payload.
pub fn strings_to_raw_bytes<S: AsRef<str>>(strings: &[S]) -> Vec<u8> {
    if strings.is_empty() {
        return Vec::new();
    }

    let len: usize = strings.iter().map(|s| s.as_ref().len() + 1).sum();
    let pad = PAD_COUNT[len % 4];

    let mut raw = Vec::with_capacity(len + pad);
    for s in strings {
        raw.extend_from_slice(s.as_ref().as_bytes());
        raw.push(0);
    }
    raw.resize(len + pad, PAD);
    raw
}

fn is_printable(byte: u8) -> bool {
    matches!(byte, 32..=126 | b'\t' | b'\n')
}

/// Whether the `0x04` at `at` starts a valid end of payload: preceded by a NUL,
/// followed only by at most three more `0x04`.
fn is_padding_run(raw: &[u8], at: usize) -> bool {
    at > 0 && raw[at - 1] == 0 && raw.len() - at <= 4 && raw[at..].iter().all(|&b| b == PAD)
}

fn whole(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Decode a CHARSTAR8 payload
///
/// Malformed payloads never fail: they come back as a single string holding
/// the entire payload with `bad_format` set. With `only_good_chars` only the
/// printable characters read before the bad byte are kept.
pub fn raw_bytes_to_strings(raw: &[u8], only_good_chars: bool) -> DecodedStrings {
    if raw.is_empty() {
        return DecodedStrings::default();
    }

    if raw[raw.len() - 1] != PAD {
        return match raw.iter().position(|&b| b == 0) {
            Some(nul) => {
                trace!(len = raw.len(), "legacy single string payload");
                DecodedStrings {
                    strings: vec![whole(&raw[..nul])],
                    string_end: nul,
                    bad_format: false,
                }
            }
            None => {
                warn!(len = raw.len(), "string payload has no terminator, keeping it whole");
                DecodedStrings {
                    strings: vec![whole(raw)],
                    string_end: raw.len(),
                    bad_format: true,
                }
            }
        };
    }

    let mut nuls = Vec::new();
    for (i, &byte) in raw.iter().enumerate() {
        match byte {
            0 => nuls.push(i),
            PAD if is_padding_run(raw, i) => break,
            b if is_printable(b) => {}
            b => {
                warn!(offset = i, byte = b, "malformed string payload, keeping it whole");
                let strings = if only_good_chars {
                    vec![raw[..i].iter().filter(|&&b| b != 0).map(|&b| b as char).collect()]
                } else {
                    vec![whole(raw)]
                };
                return DecodedStrings {
                    strings,
                    string_end: raw.len(),
                    bad_format: true,
                };
            }
        }
    }

    let mut strings = Vec::with_capacity(nuls.len());
    let mut start = 0;
    for &nul in &nuls {
        strings.push(whole(&raw[start..nul]));
        start = nul + 1;
    }

    DecodedStrings {
        strings,
        string_end: nuls.last().copied().unwrap_or(0),
        bad_format: false,
    }
}

/// Number of 32-bit words a CHARSTAR8 or COMPOSITE payload of `len` bytes occupies
pub const fn byte_payload_words(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        1 + (len - 1) / 4
    }
}
