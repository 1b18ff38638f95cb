//! Adversarial and property tests for AES-256-GCM sealing.
//!
//! Covers wrong-key decryption, ciphertext/tag/nonce tampering, truncation,
//! nonce uniqueness, and round trips over arbitrary inputs.

use keyward_crypto::{
    CryptoError, EncryptedPayload, KdfParams, decrypt_with_password, encrypt_with_password,
    generate_random_key, open, seal,
};
use proptest::prelude::*;

// ── Round Trips ──────────────────────────────────────────────────

#[test]
fn empty_plaintext_round_trips() {
    let key = generate_random_key().unwrap();
    let sealed = seal(&key, b"").unwrap();
    assert!(sealed.ciphertext.is_empty());
    assert_eq!(open(&key, &sealed.ciphertext, &sealed.iv, &sealed.tag).unwrap(), b"");
}

#[test]
fn large_unicode_plaintext_round_trips() {
    let key = generate_random_key().unwrap();
    let text = "Ünïcødé 🎙️ transcript ".repeat(500);
    let sealed = seal(&key, text.as_bytes()).unwrap();
    let opened = open(&key, &sealed.ciphertext, &sealed.iv, &sealed.tag).unwrap();
    assert_eq!(String::from_utf8(opened).unwrap(), text);
}

// ── Wrong Key ────────────────────────────────────────────────────

#[test]
fn decrypt_with_wrong_key_returns_error() {
    let key_a = generate_random_key().unwrap();
    let key_b = generate_random_key().unwrap();

    let sealed = seal(&key_a, b"meeting notes").unwrap();
    let err = open(&key_b, &sealed.ciphertext, &sealed.iv, &sealed.tag).unwrap_err();

    match err {
        CryptoError::Decryption(msg) => {
            assert!(
                msg.contains("wrong key") || msg.contains("tampered"),
                "should indicate wrong key, got: {msg}"
            );
        }
        other => panic!("expected CryptoError::Decryption, got: {other:?}"),
    }
}

// ── Tampering ────────────────────────────────────────────────────

#[test]
fn every_ciphertext_byte_is_authenticated() {
    let key = generate_random_key().unwrap();
    let sealed = seal(&key, b"integrity-protected").unwrap();

    for i in 0..sealed.ciphertext.len() {
        let mut tampered = sealed.ciphertext.clone();
        tampered[i] ^= 0x01;
        assert!(
            open(&key, &tampered, &sealed.iv, &sealed.tag).is_err(),
            "flip at byte {i} went undetected"
        );
    }
}

#[test]
fn every_tag_byte_is_authenticated() {
    let key = generate_random_key().unwrap();
    let sealed = seal(&key, b"integrity-protected").unwrap();

    for i in 0..sealed.tag.len() {
        let mut tag = sealed.tag;
        tag[i] ^= 0x80;
        assert!(open(&key, &sealed.ciphertext, &sealed.iv, &tag).is_err());
    }
}

#[test]
fn corrupted_nonce_detected() {
    let key = generate_random_key().unwrap();
    let sealed = seal(&key, b"integrity-protected").unwrap();
    let mut iv = sealed.iv;
    iv[0] ^= 0xFF;
    assert!(open(&key, &sealed.ciphertext, &iv, &sealed.tag).is_err());
}

#[test]
fn truncated_ciphertext_detected() {
    let key = generate_random_key().unwrap();
    let sealed = seal(&key, b"integrity-protected").unwrap();
    let truncated = &sealed.ciphertext[..sealed.ciphertext.len() - 1];
    assert!(open(&key, truncated, &sealed.iv, &sealed.tag).is_err());
}

// ── Nonce Uniqueness ─────────────────────────────────────────────

#[test]
fn same_plaintext_same_key_produces_distinct_nonces_and_ciphertexts() {
    let key = generate_random_key().unwrap();
    let a = seal(&key, b"Hello, World!").unwrap();
    let b = seal(&key, b"Hello, World!").unwrap();

    assert_ne!(a.iv, b.iv);
    assert_ne!(a.ciphertext, b.ciphertext);
    assert_eq!(open(&key, &a.ciphertext, &a.iv, &a.tag).unwrap(), b"Hello, World!");
    assert_eq!(open(&key, &b.ciphertext, &b.iv, &b.tag).unwrap(), b"Hello, World!");
}

#[test]
fn thousand_nonces_never_repeat() {
    let key = generate_random_key().unwrap();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1000 {
        let sealed = seal(&key, b"n").unwrap();
        assert!(seen.insert(sealed.iv), "nonce repeated");
    }
}

// ── Password Path ────────────────────────────────────────────────

#[test]
fn password_encryptions_differ_in_salt_iv_and_ciphertext() {
    let params = KdfParams::with_iterations(1).unwrap();
    let a = encrypt_with_password(b"same", "pw-123456", &params).unwrap();
    let b = encrypt_with_password(b"same", "pw-123456", &params).unwrap();

    assert_ne!(a.salt, b.salt);
    assert_ne!(a.payload.iv, b.payload.iv);
    assert_ne!(a.payload.ciphertext, b.payload.ciphertext);
    assert_eq!(decrypt_with_password(&a, "pw-123456").unwrap(), b"same");
    assert_eq!(decrypt_with_password(&b, "pw-123456").unwrap(), b"same");
}

#[test]
fn password_payload_survives_json_round_trip() {
    let params = KdfParams::with_iterations(1).unwrap();
    let enc = encrypt_with_password(b"{\"k\":1}", "pw", &params).unwrap();
    let text = serde_json::to_string(&enc).unwrap();
    let back = serde_json::from_str(&text).unwrap();
    assert_eq!(enc, back);
    assert_eq!(decrypt_with_password(&back, "pw").unwrap(), b"{\"k\":1}");
}

#[test]
fn payload_from_sealed_carries_key_id() {
    let key = generate_random_key().unwrap();
    let payload = EncryptedPayload::from_sealed(seal(&key, b"x").unwrap(), Some("k1".into()));
    assert_eq!(payload.require_key_id().unwrap(), "k1");
    assert_eq!(payload.iv.len(), keyward_crypto::NONCE_SIZE);
    assert_eq!(payload.tag.len(), keyward_crypto::TAG_SIZE);
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn arbitrary_bytes_round_trip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let key = generate_random_key().unwrap();
        let sealed = seal(&key, &data).unwrap();
        prop_assert_eq!(open(&key, &sealed.ciphertext, &sealed.iv, &sealed.tag).unwrap(), data);
    }

    #[test]
    fn arbitrary_strings_round_trip_through_wire_format(text in ".*") {
        let key = generate_random_key().unwrap();
        let payload = EncryptedPayload::from_sealed(seal(&key, text.as_bytes()).unwrap(), Some("k".into()));
        let map = payload.to_wire_map().unwrap();
        let back = EncryptedPayload::from_wire_map(&map).unwrap();
        let opened = open(&key, &back.ciphertext, &back.iv, &back.tag).unwrap();
        prop_assert_eq!(String::from_utf8(opened).unwrap(), text);
    }
}
