//! Seven-segment glyph tables.
//!
//! Bit `i` of a mask refers to the `i`-th segment in the canonical order
//! TL, TM, TR, BR, BM, BL, MM (LSB first). The ordering and the digit table
//! are a public contract: persisted calibration relies on them.

/// Top-left vertical segment.
pub const SEG_TL: u8 = 0x01;
/// Top horizontal segment.
pub const SEG_TM: u8 = 0x02;
/// Top-right vertical segment.
pub const SEG_TR: u8 = 0x04;
/// Bottom-right vertical segment.
pub const SEG_BR: u8 = 0x08;
/// Bottom horizontal segment.
pub const SEG_BM: u8 = 0x10;
/// Bottom-left vertical segment.
pub const SEG_BL: u8 = 0x20;
/// Middle horizontal segment.
pub const SEG_MM: u8 = 0x40;

/// Mask of a blank (all-off) cell.
pub const BLANK_MASK: u8 = 0x00;

/// Placeholder emitted for an unrecognised mask or an out-of-bounds digit.
pub const PLACEHOLDER: char = '?';

/// Masks for the decimal digits, indexed by digit value.
const DIGIT_MASKS: [u8; 10] = [
    0x3F, // 0
    0x0C, // 1
    0x76, // 2
    0x5E, // 3
    0x4D, // 4
    0x5B, // 5
    0x7B, // 6
    0x0E, // 7
    0x7F, // 8
    0x5F, // 9
];

/// Closed set of glyphs the decoder can classify from a mask.
///
/// `'.'` (decimal-point suffix) and [`PLACEHOLDER`] can additionally appear
/// in decode output, but never originate from this table.
pub const CHAR_SET: [char; 11] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ' '];

/// Glyph for a recognised seven-bit mask, `None` otherwise.
pub fn mask_to_char(mask: u8) -> Option<char> {
    if mask == BLANK_MASK {
        return Some(' ');
    }
    DIGIT_MASKS
        .iter()
        .position(|&m| m == mask)
        .map(|d| char::from_digit(d as u32, 10).expect("digit index < 10"))
}

/// Mask for one of the ten decimal digits, `None` otherwise.
pub fn digit_to_mask(c: char) -> Option<u8> {
    c.to_digit(10).map(|d| DIGIT_MASKS[d as usize])
}

/// Mask for any calibratable glyph: the ten digits plus the blank cell.
pub fn glyph_to_mask(c: char) -> Option<u8> {
    if c == ' ' {
        return Some(BLANK_MASK);
    }
    digit_to_mask(c)
}
