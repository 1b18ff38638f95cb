//! EncryptionService behaviour: round trips, nonce uniqueness, tampering,
//! missing keys, password payloads, deletion and concurrency.

mod support;

use keyward_vault::{EncryptedPayload, VaultError};
use pretty_assertions::assert_eq;
use support::service;

// ── Round Trips ──────────────────────────────────────────────────

#[test]
fn round_trip_covers_edge_case_plaintexts() {
    let svc = service();
    let key = svc.create_encryption_key("transcript").unwrap();

    let long = "a".repeat(10_000);
    let cases = [
        "",
        long.as_str(),
        "Grüße 👋🏽 — 日本語のテキスト",
        r#"{"speaker":"A","words":["hello","world"],"confidence":0.97}"#,
    ];

    for plaintext in cases {
        let payload = svc.encrypt_data(plaintext, &key).unwrap().unwrap();
        assert_eq!(svc.decrypt_data(&payload).unwrap().as_deref(), Some(plaintext));
    }
}

#[test]
fn payload_records_key_id_and_algorithm() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let payload = svc.encrypt_data("x", &key).unwrap().unwrap();

    assert_eq!(payload.key_id.as_deref(), Some(key.as_str()));
    assert_eq!(payload.iv.len(), 12);
    assert_eq!(payload.tag.len(), 16);
    assert_eq!(payload.algorithm.to_string(), "AES-256-GCM");
}

#[test]
fn payload_survives_wire_round_trip_and_still_decrypts() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let payload = svc.encrypt_data("over the wire", &key).unwrap().unwrap();

    let text = serde_json::to_string(&payload.to_wire_map().unwrap()).unwrap();
    let map = serde_json::from_str(&text).unwrap();
    let back = EncryptedPayload::from_wire_map(&map).unwrap();

    assert_eq!(back, payload);
    assert_eq!(svc.decrypt_data(&back).unwrap().as_deref(), Some("over the wire"));
}

// ── Nonce Uniqueness ─────────────────────────────────────────────

#[test]
fn repeated_encryption_yields_distinct_iv_and_ciphertext() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();

    let a = svc.encrypt_data("same text", &key).unwrap().unwrap();
    let b = svc.encrypt_data("same text", &key).unwrap().unwrap();

    assert_ne!(a.iv, b.iv);
    assert_ne!(a.ciphertext, b.ciphertext);
    assert_eq!(svc.decrypt_data(&a).unwrap().as_deref(), Some("same text"));
    assert_eq!(svc.decrypt_data(&b).unwrap().as_deref(), Some("same text"));
}

// ── Tampering ────────────────────────────────────────────────────

#[test]
fn flipping_any_ciphertext_byte_yields_none() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let payload = svc.encrypt_data("tamper target", &key).unwrap().unwrap();

    for i in 0..payload.ciphertext.len() {
        let mut tampered = payload.clone();
        tampered.ciphertext[i] ^= 0x01;
        assert_eq!(svc.decrypt_data(&tampered).unwrap(), None, "byte {i}");
    }
}

#[test]
fn flipping_any_tag_byte_yields_none() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let payload = svc.encrypt_data("tamper target", &key).unwrap().unwrap();

    for i in 0..payload.tag.len() {
        let mut tampered = payload.clone();
        tampered.tag[i] ^= 0x01;
        assert_eq!(svc.decrypt_data(&tampered).unwrap(), None, "byte {i}");
    }
}

#[test]
fn corrupted_or_truncated_iv_yields_none() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let payload = svc.encrypt_data("iv target", &key).unwrap().unwrap();

    let mut flipped = payload.clone();
    flipped.iv[3] ^= 0x40;
    assert_eq!(svc.decrypt_data(&flipped).unwrap(), None);

    let mut short = payload.clone();
    short.iv.truncate(8);
    assert_eq!(svc.decrypt_data(&short).unwrap(), None);
}

#[test]
fn payload_under_other_key_yields_none() {
    let svc = service();
    let key_a = svc.create_encryption_key("a").unwrap();
    let key_b = svc.create_encryption_key("b").unwrap();

    let mut payload = svc.encrypt_data("secret", &key_a).unwrap().unwrap();
    payload.key_id = Some(key_b);
    assert_eq!(svc.decrypt_data(&payload).unwrap(), None);
}

// ── Missing Key Semantics ────────────────────────────────────────

#[test]
fn encrypt_with_unknown_key_returns_none() {
    let svc = service();
    assert_eq!(svc.encrypt_data("plaintext", "unknown-id").unwrap(), None);
}

#[test]
fn decrypt_without_key_id_is_a_contract_violation() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let mut payload = svc.encrypt_data("x", &key).unwrap().unwrap();
    payload.key_id = None;

    let err = svc.decrypt_data(&payload).unwrap_err();
    assert!(matches!(err, VaultError::Precondition(_)), "got {err:?}");
    assert!(err.is_contract_violation());
}

#[test]
fn decrypt_with_unknown_key_returns_none() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let mut payload = svc.encrypt_data("x", &key).unwrap().unwrap();
    payload.key_id = Some("never-created".into());
    assert_eq!(svc.decrypt_data(&payload).unwrap(), None);
}

// ── Password Path ────────────────────────────────────────────────

#[test]
fn password_round_trip() {
    let svc = service();
    let enc = svc.encrypt_with_password("export body", "pw-123").unwrap();
    assert_eq!(
        svc.decrypt_with_password(&enc, "pw-123").unwrap().as_deref(),
        Some("export body")
    );
}

#[test]
fn wrong_password_returns_none() {
    let svc = service();
    let enc = svc.encrypt_with_password("export body", "pw-123").unwrap();
    assert_eq!(svc.decrypt_with_password(&enc, "pw-124").unwrap(), None);
}

#[test]
fn password_encryptions_are_randomized() {
    let svc = service();
    let a = svc.encrypt_with_password("same", "pw").unwrap();
    let b = svc.encrypt_with_password("same", "pw").unwrap();

    assert_ne!(a.salt, b.salt);
    assert_ne!(a.payload.iv, b.payload.iv);
    assert_ne!(a.payload.ciphertext, b.payload.ciphertext);
    assert_eq!(a.iterations, 1);
}

#[test]
fn malformed_iteration_count_is_a_contract_violation() {
    let svc = service();
    let mut enc = svc.encrypt_with_password("x", "pw").unwrap();
    enc.iterations = 0;
    assert!(matches!(
        svc.decrypt_with_password(&enc, "pw"),
        Err(VaultError::Precondition(_))
    ));
}

// ── Key Inventory & Deletion ─────────────────────────────────────

#[test]
fn list_contains_created_keys() {
    let svc = service();
    let a = svc.create_encryption_key("description").unwrap();
    let b = svc.create_encryption_key("tags").unwrap();

    let keys = svc.list_encryption_keys().unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&a));
    assert!(keys.contains(&b));
    assert!(a.starts_with("description_"));
}

#[test]
fn deletion_makes_existing_payloads_inaccessible() {
    let svc = service();
    let key = svc.create_encryption_key("notes").unwrap();
    let payload = svc.encrypt_data("gone soon", &key).unwrap().unwrap();

    assert!(svc.delete_encryption_key(&key).unwrap());
    assert_eq!(svc.decrypt_data(&payload).unwrap(), None);
    assert!(!svc.list_encryption_keys().unwrap().contains(&key));
}

#[test]
fn deleting_missing_key_still_reports_success() {
    let svc = service();
    assert!(svc.delete_encryption_key("does-not-exist").unwrap());
}

#[test]
fn key_info_has_no_material_and_reports_origin() {
    let svc = service();
    let key = svc.create_encryption_key("location").unwrap();
    let info = svc.key_info(&key).unwrap().unwrap();
    assert_eq!(info.purpose, "location");
    assert_eq!(info.origin, keyward_vault::KeyOrigin::Created);
    assert_eq!(svc.key_info("nope").unwrap(), None);
}

// ── Concurrency ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_concurrent_encryptions_on_one_key() {
    let svc = service();
    let key = svc.create_encryption_key("concurrent").unwrap();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let svc = svc.clone();
            let key = key.clone();
            tokio::task::spawn_blocking(move || {
                let text = format!("message number {i}");
                let payload = svc.encrypt_data(&text, &key).unwrap().unwrap();
                (text, payload)
            })
        })
        .collect();

    let mut ivs = std::collections::HashSet::new();
    for h in handles {
        let (text, payload) = h.await.unwrap();
        assert!(ivs.insert(payload.iv.clone()), "nonce reused");
        assert_eq!(svc.decrypt_data(&payload).unwrap(), Some(text));
    }
    assert_eq!(ivs.len(), 10);
}

#[test]
fn concurrent_key_creation_yields_distinct_ids() {
    let svc = service();
    let ids: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..10)
            .map(|_| s.spawn(|| svc.create_encryption_key("race").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 10);
    assert_eq!(svc.list_encryption_keys().unwrap().len(), 10);
}
