// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde_json::json;

use crate::error::KernelError;
use crate::record::{ActivityRecord, AdminGrant, Category, SideEffectRecord};

#[test]
fn test_classify_activity_by_key() {
    let raw = br#"{"activity_id":"a1","reward_points":10,"block_hash":"5-abc"}"#;
    let record = SideEffectRecord::classify(raw).unwrap();
    assert_eq!(record.category(), Category::Activity);
    assert_eq!(
        record,
        SideEffectRecord::Activity(ActivityRecord {
            activity_id: "a1".into(),
            block_hash: "5-abc".into(),
            reward_points: 10,
        })
    );
}

#[test]
fn test_classify_admin_by_key() {
    let record = SideEffectRecord::classify(br#"{"admin_did":"bafyAdmin"}"#).unwrap();
    assert_eq!(
        record,
        SideEffectRecord::AdminGrant(AdminGrant {
            admin_did: "bafyAdmin".into()
        })
    );
}

#[test]
fn test_declared_discriminator_wins() {
    let record =
        SideEffectRecord::classify(br#"{"kind":"admin_grant","admin_did":"bafyAdmin"}"#).unwrap();
    assert_eq!(record.category(), Category::AdminGrant);
    assert_eq!(record.to_body(), json!({"admin_did": "bafyAdmin"}));
}

#[test]
fn test_unknown_discriminator_rejected() {
    match SideEffectRecord::classify(br#"{"kind":"nft_mint","admin_did":"x"}"#) {
        Err(KernelError::UnknownDiscriminator(kind)) => assert_eq!(kind, "nft_mint"),
        other => panic!("expected UnknownDiscriminator, got {other:?}"),
    }
    assert!(matches!(
        SideEffectRecord::classify(br#"{"kind":7}"#),
        Err(KernelError::UnknownDiscriminator(_))
    ));
}

#[test]
fn test_unrecognized_shape_is_an_error() {
    match SideEffectRecord::classify(br#"{"user":"u1","points":3}"#) {
        Err(KernelError::UnrecognizedRecord(msg)) => assert!(msg.contains("user")),
        other => panic!("expected UnrecognizedRecord, got {other:?}"),
    }
    assert!(matches!(
        SideEffectRecord::classify(b"[1,2,3]"),
        Err(KernelError::UnrecognizedRecord(_))
    ));
    assert!(matches!(
        SideEffectRecord::classify(b"not json"),
        Err(KernelError::MalformedRecord(_))
    ));
}

#[test]
fn test_both_keys_is_ambiguous() {
    assert_eq!(
        SideEffectRecord::classify(br#"{"activity_id":"a1","reward_points":1,"admin_did":"x"}"#),
        Err(KernelError::AmbiguousRecord)
    );
}

#[test]
fn test_activity_missing_points_is_invalid() {
    match SideEffectRecord::classify(br#"{"activity_id":"a1"}"#) {
        Err(KernelError::InvalidRecord { category, .. }) => assert_eq!(category, "activity"),
        other => panic!("expected InvalidRecord, got {other:?}"),
    }
}

#[test]
fn test_activity_body_shape() {
    let record = SideEffectRecord::classify(br#"{"activity_id":"a1","reward_points":3}"#).unwrap();
    assert_eq!(
        record.to_body(),
        json!({"activity_id": "a1", "block_hash": "", "reward_points": 3})
    );
}

#[test]
fn test_category_names_round_trip() {
    for category in Category::ALL {
        assert_eq!(Category::from_discriminator(category.as_str()).unwrap(), category);
    }
}
