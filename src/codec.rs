// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Byte level codecs shared by every layer: big endian integer reads,
//! EBCDIC translation, UTF-16BE emission and timestamp decoding.
//!
//! All multibyte integers on the wire are big endian. Textual fields are
//! EBCDIC under the negotiated CCSID, with CCSID 37 (U.S./Canada) carried
//! as a built in table pair. CP037 permutes the Latin-1 repertoire, so
//! translation is a byte for byte table lookup in both directions.

use byteorder::{BigEndian, ByteOrder};

use crate::error::Error;

/// The built in EBCDIC code page.
pub const CCSID_EBCDIC_US: u32 = 37;

const CCSID_UTF16: u32 = 1200;
const CCSID_UTF16_LEGACY: u32 = 13488;

// EBCDIC ? used for characters with no CP037 image
const EBCDIC_SUB: u8 = 0x6F;

// CP037 -> Latin-1
static EBCDIC_TO_LATIN1: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x9C, 0x09, 0x86, 0x7F,
    0x97, 0x8D, 0x8E, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x9D, 0x85, 0x08, 0x87,
    0x18, 0x19, 0x92, 0x8F, 0x1C, 0x1D, 0x1E, 0x1F,
    0x80, 0x81, 0x82, 0x83, 0x84, 0x0A, 0x17, 0x1B,
    0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x05, 0x06, 0x07,
    0x90, 0x91, 0x16, 0x93, 0x94, 0x95, 0x96, 0x04,
    0x98, 0x99, 0x9A, 0x9B, 0x14, 0x15, 0x9E, 0x1A,
    0x20, 0xA0, 0xE2, 0xE4, 0xE0, 0xE1, 0xE3, 0xE5,
    0xE7, 0xF1, 0xA2, 0x2E, 0x3C, 0x28, 0x2B, 0x7C,
    0x26, 0xE9, 0xEA, 0xEB, 0xE8, 0xED, 0xEE, 0xEF,
    0xEC, 0xDF, 0x21, 0x24, 0x2A, 0x29, 0x3B, 0xAC,
    0x2D, 0x2F, 0xC2, 0xC4, 0xC0, 0xC1, 0xC3, 0xC5,
    0xC7, 0xD1, 0xA6, 0x2C, 0x25, 0x5F, 0x3E, 0x3F,
    0xF8, 0xC9, 0xCA, 0xCB, 0xC8, 0xCD, 0xCE, 0xCF,
    0xCC, 0x60, 0x3A, 0x23, 0x40, 0x27, 0x3D, 0x22,
    0xD8, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67,
    0x68, 0x69, 0xAB, 0xBB, 0xF0, 0xFD, 0xFE, 0xB1,
    0xB0, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F, 0x70,
    0x71, 0x72, 0xAA, 0xBA, 0xE6, 0xB8, 0xC6, 0xA4,
    0xB5, 0x7E, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7A, 0xA1, 0xBF, 0xD0, 0xDD, 0xDE, 0xAE,
    0x5E, 0xA3, 0xA5, 0xB7, 0xA9, 0xA7, 0xB6, 0xBC,
    0xBD, 0xBE, 0x5B, 0x5D, 0xAF, 0xA8, 0xB4, 0xD7,
    0x7B, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47,
    0x48, 0x49, 0xAD, 0xF4, 0xF6, 0xF2, 0xF3, 0xF5,
    0x7D, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F, 0x50,
    0x51, 0x52, 0xB9, 0xFB, 0xFC, 0xF9, 0xFA, 0xFF,
    0x5C, 0xF7, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5A, 0xB2, 0xD4, 0xD6, 0xD2, 0xD3, 0xD5,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
    0x38, 0x39, 0xB3, 0xDB, 0xDC, 0xD9, 0xDA, 0x9F,
];

// Latin-1 -> CP037
static LATIN1_TO_EBCDIC: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x37, 0x2D, 0x2E, 0x2F,
    0x16, 0x05, 0x25, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x3C, 0x3D, 0x32, 0x26,
    0x18, 0x19, 0x3F, 0x27, 0x1C, 0x1D, 0x1E, 0x1F,
    0x40, 0x5A, 0x7F, 0x7B, 0x5B, 0x6C, 0x50, 0x7D,
    0x4D, 0x5D, 0x5C, 0x4E, 0x6B, 0x60, 0x4B, 0x61,
    0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
    0xF8, 0xF9, 0x7A, 0x5E, 0x4C, 0x7E, 0x6E, 0x6F,
    0x7C, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
    0xC8, 0xC9, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6,
    0xD7, 0xD8, 0xD9, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6,
    0xE7, 0xE8, 0xE9, 0xBA, 0xE0, 0xBB, 0xB0, 0x6D,
    0x79, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6,
    0xA7, 0xA8, 0xA9, 0xC0, 0x4F, 0xD0, 0xA1, 0x07,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x15, 0x06, 0x17,
    0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x09, 0x0A, 0x1B,
    0x30, 0x31, 0x1A, 0x33, 0x34, 0x35, 0x36, 0x08,
    0x38, 0x39, 0x3A, 0x3B, 0x04, 0x14, 0x3E, 0xFF,
    0x41, 0xAA, 0x4A, 0xB1, 0x9F, 0xB2, 0x6A, 0xB5,
    0xBD, 0xB4, 0x9A, 0x8A, 0x5F, 0xCA, 0xAF, 0xBC,
    0x90, 0x8F, 0xEA, 0xFA, 0xBE, 0xA0, 0xB6, 0xB3,
    0x9D, 0xDA, 0x9B, 0x8B, 0xB7, 0xB8, 0xB9, 0xAB,
    0x64, 0x65, 0x62, 0x66, 0x63, 0x67, 0x9E, 0x68,
    0x74, 0x71, 0x72, 0x73, 0x78, 0x75, 0x76, 0x77,
    0xAC, 0x69, 0xED, 0xEE, 0xEB, 0xEF, 0xEC, 0xBF,
    0x80, 0xFD, 0xFE, 0xFB, 0xFC, 0xAD, 0xAE, 0x59,
    0x44, 0x45, 0x42, 0x46, 0x43, 0x47, 0x9C, 0x48,
    0x54, 0x51, 0x52, 0x53, 0x58, 0x55, 0x56, 0x57,
    0x8C, 0x49, 0xCD, 0xCE, 0xCB, 0xCF, 0xCC, 0xE1,
    0x70, 0xDD, 0xDE, 0xDB, 0xDC, 0x8D, 0x8E, 0xDF,
];

/// Reads an unsigned big endian integer of `width` bytes (right justified,
/// at most 8) starting at `offset`. A read that would run past the end of
/// the buffer yields 0 instead of failing, which lets response parsers
/// probe optional trailing fields without length juggling.
pub fn read_uint(buf: &[u8], offset: usize, width: usize) -> u64 {
    let width = width.min(8);
    if width == 0 {
        return 0;
    }
    let end = match offset.checked_add(width) {
        Some(end) if end <= buf.len() => end,
        _ => return 0,
    };
    BigEndian::read_uint(&buf[offset..end], width)
}

pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    read_uint(buf, offset, 2) as u16
}

pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    read_uint(buf, offset, 4) as u32
}

pub fn read_u64(buf: &[u8], offset: usize) -> u64 {
    read_uint(buf, offset, 8)
}

/// CCSID 37 EBCDIC to text, byte for byte.
pub fn ebcdic_to_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| EBCDIC_TO_LATIN1[b as usize] as char)
        .collect()
}

/// Text to CCSID 37 EBCDIC, byte for byte. Characters outside Latin-1
/// become the EBCDIC substitution character.
pub fn ascii_to_ebcdic(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            if cp < 256 {
                LATIN1_TO_EBCDIC[cp as usize]
            } else {
                EBCDIC_SUB
            }
        })
        .collect()
}

/// Decodes server text under a negotiated CCSID. 0 is treated as the
/// default code page 37; the UTF-16 CCSIDs decode as UTF-16BE; anything
/// else is rejected so a wrong guess never silently garbles text.
pub fn ebcdic_to_ascii_ccsid(ccsid: u32, bytes: &[u8]) -> Result<String, Error> {
    match ccsid {
        0 | CCSID_EBCDIC_US => Ok(ebcdic_to_ascii(bytes)),
        CCSID_UTF16 | CCSID_UTF16_LEGACY => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| BigEndian::read_u16(pair))
                .collect();
            Ok(String::from_utf16_lossy(&units))
        }
        other => Err(Error::UnsupportedCcsid(other)),
    }
}

/// Encodes text under a negotiated CCSID; the inverse of
/// [`ebcdic_to_ascii_ccsid`] for the supported pages.
pub fn ascii_to_ebcdic_ccsid(ccsid: u32, text: &str) -> Result<Vec<u8>, Error> {
    match ccsid {
        0 | CCSID_EBCDIC_US => Ok(ascii_to_ebcdic(text)),
        CCSID_UTF16 | CCSID_UTF16_LEGACY => Ok(utf16be(text)),
        other => Err(Error::UnsupportedCcsid(other)),
    }
}

/// UTF-16BE code units, two bytes each. Used for command text at
/// datastream level 10 and above and for the SHA-1 proof input.
pub fn utf16be(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.push((unit >> 8) as u8);
        out.push(unit as u8);
    }
    out
}

/// Uppercases and right pads with blanks to `len`. Names longer than
/// `len` are returned uppercased but untruncated, length checks belong
/// to the caller.
pub fn upper_pad(text: &str, len: usize) -> String {
    let mut out = text.to_ascii_uppercase();
    while out.len() < len {
        out.push(' ');
    }
    out
}

/// Decodes a Standard Time Format (DTS) timestamp into milliseconds since
/// 1970-01-01 UTC. The low 12 bits carry uniqueness, not time.
pub fn dts_to_millis(dts: u64) -> u64 {
    let micros_since_2000 = dts.wrapping_sub(0x8000_0000_0000_0000) >> 12;
    (micros_since_2000 + 946_684_800_000_000) / 1000
}

#[test]
fn test_read_uint() {
    let buf = [0x11u8, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
    assert_eq!(read_u16(&buf, 0), 0x1122);
    assert_eq!(read_u32(&buf, 2), 0x3344_5566);
    assert_eq!(read_u64(&buf, 0), 0x1122_3344_5566_7788);
    // truncated width is right justified and zero extended
    assert_eq!(read_uint(&buf, 0, 2), 0x1122);
    assert_eq!(read_uint(&buf, 6, 1), 0x77);
}

#[test]
fn test_read_past_end_is_zero() {
    let buf = [0xFFu8; 4];
    assert_eq!(read_u32(&buf, 1), 0);
    assert_eq!(read_u64(&buf, 0), 0);
    assert_eq!(read_u16(&buf, 4), 0);
    assert_eq!(read_uint(&buf, usize::MAX, 8), 0);
    assert_eq!(read_uint(&buf, 0, 0), 0);
}

#[test]
fn test_ebcdic_vectors() {
    assert_eq!(
        ascii_to_ebcdic("QSECOFR"),
        vec![0xD8, 0xE2, 0xC5, 0xC3, 0xD6, 0xC6, 0xD9]
    );
    assert_eq!(ascii_to_ebcdic("  "), vec![0x40, 0x40]);
    assert_eq!(ebcdic_to_ascii(&[0xD8, 0xE2, 0xE8, 0xE2]), "QSYS");
    assert_eq!(ebcdic_to_ascii(&[0xF0, 0xF9]), "09");
}

#[test]
fn test_ebcdic_substitution() {
    // a character without a CP037 image becomes the EBCDIC ?
    assert_eq!(ascii_to_ebcdic("\u{4e16}"), vec![EBCDIC_SUB]);
}

#[test]
fn test_ccsid_dispatch() {
    assert_eq!(ebcdic_to_ascii_ccsid(0, &[0xC1]).unwrap(), "A");
    assert_eq!(ebcdic_to_ascii_ccsid(37, &[0xC1]).unwrap(), "A");
    assert_eq!(
        ebcdic_to_ascii_ccsid(1200, &[0x00, 0x41, 0x00, 0x42]).unwrap(),
        "AB"
    );
    assert_eq!(
        ebcdic_to_ascii_ccsid(13488, &[0x00, 0x43]).unwrap(),
        "C"
    );
    match ebcdic_to_ascii_ccsid(500, &[0xC1]) {
        Err(Error::UnsupportedCcsid(500)) => {}
        other => panic!("expected unsupported CCSID, got {:?}", other),
    }
}

#[test]
fn test_utf16be() {
    assert_eq!(utf16be("AB"), vec![0x00, 0x41, 0x00, 0x42]);
    assert_eq!(utf16be(""), Vec::<u8>::new());
}

#[test]
fn test_upper_pad() {
    assert_eq!(upper_pad("qsecofr", 10), "QSECOFR   ");
    assert_eq!(upper_pad("QZRUCLSP", 10), "QZRUCLSP  ");
    assert_eq!(upper_pad("LONGPROGRAMNAME", 10), "LONGPROGRAMNAME");
}

#[test]
fn test_dts_to_millis() {
    // 2000-01-01T00:00:00Z
    assert_eq!(dts_to_millis(0x8000_0000_0000_0000), 946_684_800_000);
    // one hour later
    assert_eq!(dts_to_millis(0x8000_0D69_3A40_0000), 946_688_400_000);
}
