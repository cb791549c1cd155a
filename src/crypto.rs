// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Seeded password proofs for the sign-on and remote command handshakes.
//!
//! The cleartext password never crosses the wire. Both sides hold the
//! exchanged seeds, the server verifies an 8 byte DES construction
//! (RFC 2877 section 5) or a 20 byte SHA-1 construction depending on the
//! negotiated password level. Inputs are ASCII; the caller validates
//! length and repertoire before the handshake starts.

use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use des::Des;
use sha1::{Digest, Sha1};

use crate::codec;
use crate::constant;

/// Which proof construction a password level selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofScheme {
    Des,
    Sha1,
}

impl ProofScheme {
    /// Password levels 0 and 1 store DES material, 2 adds the SHA-1 copy
    /// but still verifies DES; 3 and above verify SHA-1 only.
    pub fn for_password_level(level: u8) -> ProofScheme {
        if level <= 2 {
            ProofScheme::Des
        } else {
            ProofScheme::Sha1
        }
    }

    /// The encryption type byte carried in the authenticate template.
    pub fn encryption_id(self) -> u8 {
        match self {
            ProofScheme::Des => constant::PWD_ENC_DES,
            ProofScheme::Sha1 => constant::PWD_ENC_SHA1,
        }
    }

    /// Proof length in bytes.
    pub fn proof_length(self) -> usize {
        match self {
            ProofScheme::Des => 8,
            ProofScheme::Sha1 => 20,
        }
    }
}

/// The DES password proof of RFC 2877 section 5.
pub fn des_password_proof(
    user: &str,
    password: &str,
    server_seed: u64,
    client_seed: u64,
) -> [u8; 8] {
    let token = password_token(user, password);
    let (first_half, second_half) = name_halves(user);
    let next_seed = server_seed.wrapping_add(1).to_be_bytes();

    let r1 = des_encrypt(&token, next_seed);
    let r2 = des_encrypt(&token, xor8(r1, client_seed.to_be_bytes()));
    let r3 = des_encrypt(&token, xor8(xor8(first_half, next_seed), r2));
    let r4 = des_encrypt(&token, xor8(xor8(second_half, next_seed), r3));
    des_encrypt(&token, xor8(r4, 1u64.to_be_bytes()))
}

/// The SHA-1 password proof used at password level 3 and above.
pub fn sha_password_proof(
    user: &str,
    password: &str,
    server_seed: u64,
    client_seed: u64,
) -> [u8; 20] {
    let padded = codec::upper_pad(user, 10);
    let mut credential = codec::utf16be(&padded);
    credential.extend_from_slice(&codec::utf16be(password));
    let token: [u8; 20] = Sha1::digest(&credential).into();

    let mut hasher = Sha1::new();
    hasher.update(token);
    hasher.update(server_seed.to_be_bytes());
    hasher.update(client_seed.to_be_bytes());
    hasher.update(codec::utf16be(&padded));
    hasher.update(1u64.to_be_bytes());
    hasher.finalize().into()
}

// The 8 byte token both halves of the DES chain are keyed with. For
// passwords longer than 8 characters the two half tokens are folded
// together with XOR.
fn password_token(user: &str, password: &str) -> [u8; 8] {
    if password.len() <= 8 {
        return half_token(user, password);
    }
    let (head, tail) = password.split_at(8);
    xor8(half_token(user, head), half_token(user, tail))
}

fn half_token(user: &str, password: &str) -> [u8; 8] {
    let padded = codec::ascii_to_ebcdic(&codec::upper_pad(password, 8));
    let mut key = [0u8; 8];
    key.copy_from_slice(&padded[..8]);
    let shifted = (u64::from_be_bytes(key) ^ 0x5555_5555_5555_5555) << 1;
    des_encrypt(&shifted.to_be_bytes(), prepared_name(user))
}

// User name as the DES plaintext block. Names up to 8 characters are
// blank padded; the EBCDIC bytes of characters 9 and 10 are folded into
// the block two bits at a time.
fn prepared_name(user: &str) -> [u8; 8] {
    let encoded = codec::ascii_to_ebcdic(&codec::upper_pad(user, 10));
    let mut block = [0u8; 8];
    block.copy_from_slice(&encoded[..8]);
    if user.len() > 8 {
        let (b9, b10) = (encoded[8], encoded[9]);
        block[0] ^= b9 & 0xC0;
        block[1] ^= (b9 & 0x30) << 2;
        block[2] ^= (b9 & 0x0C) << 4;
        block[3] ^= (b9 & 0x03) << 6;
        block[4] ^= b10 & 0xC0;
        block[5] ^= (b10 & 0x30) << 2;
        block[6] ^= (b10 & 0x0C) << 4;
        block[7] ^= (b10 & 0x03) << 6;
    }
    block
}

// Blank padded EBCDIC user name split into two 8 byte blocks.
fn name_halves(user: &str) -> ([u8; 8], [u8; 8]) {
    let encoded = codec::ascii_to_ebcdic(&codec::upper_pad(user, 10));
    let mut first = [0u8; 8];
    first.copy_from_slice(&encoded[..8]);
    let mut second = [0x40u8; 8];
    second[0] = encoded[8];
    second[1] = encoded[9];
    (first, second)
}

fn des_encrypt(key: &[u8; 8], plaintext: [u8; 8]) -> [u8; 8] {
    let cipher = Des::new(GenericArray::from_slice(key));
    let mut block = GenericArray::clone_from_slice(&plaintext);
    cipher.encrypt_block(&mut block);
    let mut out = [0u8; 8];
    out.copy_from_slice(&block);
    out
}

fn xor8(a: [u8; 8], b: [u8; 8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    for i in 0..8 {
        out[i] = a[i] ^ b[i];
    }
    out
}

#[test]
fn test_scheme_selection() {
    assert_eq!(ProofScheme::for_password_level(0), ProofScheme::Des);
    assert_eq!(ProofScheme::for_password_level(2), ProofScheme::Des);
    assert_eq!(ProofScheme::for_password_level(3), ProofScheme::Sha1);
    assert_eq!(ProofScheme::for_password_level(4), ProofScheme::Sha1);
    assert_eq!(ProofScheme::Des.encryption_id(), 1);
    assert_eq!(ProofScheme::Sha1.encryption_id(), 3);
    assert_eq!(ProofScheme::Des.proof_length(), 8);
    assert_eq!(ProofScheme::Sha1.proof_length(), 20);
}

#[test]
fn test_password_token_vector() {
    use hex_literal::hex;
    assert_eq!(
        password_token("QSECOFR", "QSECOFR"),
        hex!("5913 f8ef 4476 398f")
    );
}

#[test]
fn test_des_proof_zero_seeds() {
    use hex_literal::hex;
    assert_eq!(
        des_password_proof("QSECOFR", "QSECOFR", 0, 0),
        hex!("1d40 b5ba 3359 58f2")
    );
}

#[test]
fn test_des_proof_seeded() {
    use hex_literal::hex;
    assert_eq!(
        des_password_proof("QSECOFR", "QSECOFR", 0x1122_3344_5566_7788, 0x0102_0304_0506_0708),
        hex!("65a4 8367 d5ac c3d0")
    );
}

#[test]
fn test_des_proof_long_name_and_password() {
    // 10 character name exercises the two bit fold, 14 character
    // password exercises the half token XOR
    use hex_literal::hex;
    assert_eq!(
        des_password_proof(
            "JOHNDOE100",
            "LONGPASSWORD12",
            0x1122_3344_5566_7788,
            0x0102_0304_0506_0708
        ),
        hex!("052a eb24 92e0 2294")
    );
}

#[test]
fn test_sha_proof_vector() {
    use hex_literal::hex;
    assert_eq!(
        sha_password_proof("QSECOFR", "QSECOFR", 0x1122_3344_5566_7788, 0x0102_0304_0506_0708),
        hex!("7268 05e5 3e40 630e 0a0b 1234 7c44 892c 292f 9b99")
    );
}

#[test]
fn test_proofs_are_deterministic() {
    let a = des_password_proof("QUSER", "SECRET", 7, 9);
    let b = des_password_proof("QUSER", "SECRET", 7, 9);
    assert_eq!(a, b);
    let a = sha_password_proof("QUSER", "SECRET", 7, 9);
    let b = sha_password_proof("QUSER", "SECRET", 7, 9);
    assert_eq!(a, b);
}
