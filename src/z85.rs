//! Z85 binary-to-text codec (ZeroMQ RFC 32 alphabet).
//!
//! Unlike strict RFC 32, arbitrary lengths are accepted: [`encode`] pads the
//! final group with zero bytes and drops the symbols that only carry padding,
//! while [`decode`] pads short text with `#` (the last alphabet symbol) and
//! drops the bytes that only carry padding. The bootstrap decoder in
//! `bootstrap/z85.js` applies the same rules, so both must change together.

use crate::error::Z85Error;

/// The 85 symbols in index order.
pub const ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// Symbol appended to short text before decoding.
pub const PAD_SYMBOL: u8 = ALPHABET[84];

const PAD_VALUE: u32 = 84;

const INVALID: u8 = 0xFF;

/// Inverse table indexed by `code point - 32`.
const DECODE_TABLE: [u8; 96] = build_decode_table();

const fn build_decode_table() -> [u8; 96] {
    let mut table = [INVALID; 96];
    let mut idx = 0;
    while idx < ALPHABET.len() {
        table[(ALPHABET[idx] - 32) as usize] = idx as u8;
        idx += 1;
    }
    table
}

fn lookup(byte: u8) -> Option<u32> {
    let slot = byte.checked_sub(32)?;
    match DECODE_TABLE.get(slot as usize) {
        Some(&value) if value != INVALID => Some(value as u32),
        _ => None,
    }
}

/// Lenient inverse table indexed by `code point - 32`, unknown symbols as 0.
/// The bootstrap decoder embeds this verbatim.
pub fn lenient_decode_table() -> [u8; 96] {
    DECODE_TABLE.map(|value| if value == INVALID { 0 } else { value })
}

/// Length of the text [`encode`] produces for `byte_len` input bytes.
pub fn encoded_len(byte_len: usize) -> usize {
    byte_len + byte_len.div_ceil(4)
}

/// Length of the buffer [`decode`] produces for `text_len` symbols.
pub fn decoded_len(text_len: usize) -> usize {
    let pad = (5 - text_len % 5) % 5;
    (text_len + pad) * 4 / 5 - pad
}

/// Encodes `data` as Z85 text of exactly [`encoded_len`] characters.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(encoded_len(data.len()));
    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(group);

        let mut symbols = [0u8; 5];
        for slot in symbols.iter_mut().rev() {
            *slot = ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        // A short final group keeps one symbol per real byte plus one.
        out.extend(symbols[..chunk.len() + 1].iter().map(|&b| b as char));
    }
    out
}

/// Decodes Z85 text without validation.
///
/// Text is read as UTF-16 code units, one symbol each, the way the bootstrap
/// reads it with `charCodeAt`. Units outside the alphabet read as symbol 0 and
/// group values wrap at 32 bits, so both decoders agree on any input. Use
/// [`decode_checked`] for untrusted text.
pub fn decode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(decoded_len(text.encode_utf16().count()));
    let mut group = [PAD_VALUE; 5];
    let mut filled = 0usize;
    for unit in text.encode_utf16() {
        group[filled] = lenient_symbol(unit);
        filled += 1;
        if filled == group.len() {
            push_wrapped_group(&mut out, &group, filled);
            filled = 0;
        }
    }
    if filled > 0 {
        group[filled..].fill(PAD_VALUE);
        push_wrapped_group(&mut out, &group, filled);
    }
    out
}

fn lenient_symbol(unit: u16) -> u32 {
    u8::try_from(unit).ok().and_then(lookup).unwrap_or(0)
}

/// Appends the bytes of a group holding `symbols` real symbols.
fn push_wrapped_group(out: &mut Vec<u8>, group: &[u32; 5], symbols: usize) {
    let value = group
        .iter()
        .fold(0u32, |acc, &symbol| acc.wrapping_mul(85).wrapping_add(symbol));
    out.extend_from_slice(&value.to_be_bytes()[..symbols - 1]);
}

/// Decodes Z85 text, rejecting anything [`encode`] could not have produced.
pub fn decode_checked(text: &str) -> Result<Vec<u8>, Z85Error> {
    if let Some((offset, ch)) = text
        .char_indices()
        .find(|&(_, ch)| !ch.is_ascii() || lookup(ch as u8).is_none())
    {
        return Err(Z85Error::InvalidChar { ch, offset });
    }
    if text.len() % 5 == 1 {
        return Err(Z85Error::DanglingChar { len: text.len() });
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(decoded_len(bytes.len()));
    for (group_idx, chunk) in bytes.chunks(5).enumerate() {
        let mut value = 0u64;
        for idx in 0..5 {
            let symbol = chunk.get(idx).copied().unwrap_or(PAD_SYMBOL);
            value = value * 85 + lookup(symbol).unwrap_or(0) as u64;
        }
        let value = u32::try_from(value).map_err(|_| Z85Error::GroupOverflow {
            offset: group_idx * 5,
        })?;
        out.extend_from_slice(&value.to_be_bytes()[..chunk.len() - 1]);
    }
    Ok(out)
}
