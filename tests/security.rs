//! Security-focused test suite for the cookie codec and ID generation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cookie_vault::codec::{decode_cookie_at, encode_cookie_at};
use cookie_vault::{
    CookieCodec, DecodeError, SecretKey, SessionData, SessionValue, decode_cookie, encode_cookie,
    generate_random_key, generate_session_id,
};

const ISSUED_AT: i64 = 1_700_000_000;
const GC_LIFETIME: i64 = 3600;

fn codec() -> CookieCodec {
    let block_key = generate_random_key(16).unwrap();
    let security_name = hex::encode(generate_random_key(20).unwrap());
    CookieCodec::new(&block_key, SecretKey::new("testhashKey"), security_name).unwrap()
}

fn data() -> SessionData {
    let mut data = SessionData::new();
    data.insert("name".to_owned(), "astaxie".into());
    data.insert("gender".to_owned(), "male".into());
    data.insert("age".to_owned(), 30.into());
    data.insert("admin".to_owned(), false.into());
    data
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn encode_decode_round_trip() {
    let codec = codec();
    let encoded = encode_cookie(&codec, &data()).unwrap();

    let decoded: SessionData = decode_cookie(&codec, &encoded, GC_LIFETIME).unwrap();
    assert_eq!(decoded, data());
    assert_eq!(decoded["name"], SessionValue::from("astaxie"));
    assert_eq!(decoded["gender"], SessionValue::from("male"));
}

#[test]
fn empty_session_round_trips() {
    let codec = codec();
    let encoded = encode_cookie(&codec, &SessionData::new()).unwrap();

    let decoded: SessionData = decode_cookie(&codec, &encoded, GC_LIFETIME).unwrap();
    assert!(decoded.is_empty());
}

// =============================================================================
// Tamper detection
// =============================================================================

#[test]
fn flipped_bits_never_decode() {
    let codec = codec();
    let encoded = encode_cookie_at(&codec, &data(), ISSUED_AT).unwrap();
    let raw = URL_SAFE_NO_PAD.decode(&encoded).unwrap();

    for index in 0..raw.len() {
        let mut tampered = raw.clone();
        tampered[index] ^= 0x80;
        let tampered = URL_SAFE_NO_PAD.encode(tampered);

        let result: Result<SessionData, _> =
            decode_cookie_at(&codec, &tampered, GC_LIFETIME, ISSUED_AT);
        assert!(result.is_err(), "byte {index} accepted after tampering");
    }
}

#[test]
fn truncated_cookie_is_rejected() {
    let codec = codec();
    let encoded = encode_cookie_at(&codec, &data(), ISSUED_AT).unwrap();

    for cut in [1, 4, encoded.len() / 2] {
        let truncated = &encoded[..encoded.len() - cut];
        let result: Result<SessionData, _> =
            decode_cookie_at(&codec, truncated, GC_LIFETIME, ISSUED_AT);
        assert!(result.is_err());
    }
}

#[test]
fn cookie_from_other_keys_is_rejected() {
    let ours = codec();
    let theirs = codec();
    let encoded = encode_cookie_at(&theirs, &data(), ISSUED_AT).unwrap();

    let result: Result<SessionData, _> = decode_cookie_at(&ours, &encoded, GC_LIFETIME, ISSUED_AT);
    assert_eq!(result.unwrap_err(), DecodeError::Tampered);
}

#[test]
fn ciphertext_does_not_leak_plaintext() {
    let codec = codec();
    let encoded = encode_cookie(&codec, &data()).unwrap();
    let raw = URL_SAFE_NO_PAD.decode(&encoded).unwrap();

    let haystack = String::from_utf8_lossy(&raw);
    assert!(!haystack.contains("astaxie"));
    assert!(!haystack.contains("gender"));
}

#[test]
fn same_data_encodes_differently_each_time() {
    let codec = codec();
    let encodings: HashSet<String> = (0..100)
        .map(|_| encode_cookie_at(&codec, &data(), ISSUED_AT).unwrap())
        .collect();
    assert_eq!(encodings.len(), 100);
}

// =============================================================================
// Expiry
// =============================================================================

#[test]
fn cookie_accepted_inside_window() {
    let codec = codec();
    let encoded = encode_cookie_at(&codec, &data(), ISSUED_AT).unwrap();

    let result: Result<SessionData, _> =
        decode_cookie_at(&codec, &encoded, GC_LIFETIME, ISSUED_AT + GC_LIFETIME - 1);
    assert!(result.is_ok());
}

#[test]
fn cookie_rejected_after_window() {
    let codec = codec();
    let encoded = encode_cookie_at(&codec, &data(), ISSUED_AT).unwrap();

    let result: Result<SessionData, _> =
        decode_cookie_at(&codec, &encoded, GC_LIFETIME, ISSUED_AT + GC_LIFETIME + 1);
    assert_eq!(result.unwrap_err(), DecodeError::Expired);
}

#[test]
fn expiry_checked_only_after_signature() {
    let codec = codec();
    let encoded = encode_cookie_at(&codec, &data(), ISSUED_AT).unwrap();
    let mut raw = URL_SAFE_NO_PAD.decode(&encoded).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0x01;

    let result: Result<SessionData, _> = decode_cookie_at(
        &codec,
        &URL_SAFE_NO_PAD.encode(raw),
        GC_LIFETIME,
        ISSUED_AT + GC_LIFETIME + 1,
    );
    assert_eq!(result.unwrap_err(), DecodeError::Tampered);
}

// =============================================================================
// Session IDs and random keys
// =============================================================================

#[test]
fn generated_key_has_requested_length() {
    assert_eq!(generate_random_key(20).unwrap().len(), 20);
}

#[test]
fn generated_session_ids_are_unique() {
    let ids: HashSet<String> = (0..10_000)
        .map(|_| generate_session_id(16, "").unwrap())
        .collect();
    assert_eq!(ids.len(), 10_000);
    assert!(ids.iter().all(|id| id.len() == 32));
}

#[test]
fn secret_key_redacts_in_debug() {
    let key = SecretKey::new("beegocookiehashkey");
    let debug_output = format!("{key:?}");

    assert!(!debug_output.contains("beegocookiehashkey"));
    assert!(debug_output.contains("[REDACTED]"));
}
