//! # Malformed Payload Tests
//!
//! Truncated, oversized and random payloads. The decoder must reject each
//! with the stage that broke, and never panic.
//!
//! Run with: cargo test --package cairn_networking --test malformed

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cairn_networking::protocol::{
    BubbleHeader, BubbleLanguage, InventoryCommand, InventoryItem, ItemRef, Knowledge, Language,
};
use cairn_networking::{
    decode_frame, CommitPolicy, DecoderConfig, DrawStateClient, FrameBuilder, Limits, Stage,
    StageErrorKind, Timestamp,
};
use cairn_shared::{
    BubbleKind, DescriptorRecord, LightingFlags, MobileRecord, PictureRecord, StatBars,
};

/// A frame touching every section, up to and including sounds.
fn busy_frame() -> FrameBuilder {
    busy_frame_replaying(0)
}

/// Same as [`busy_frame`], with an extended picture header when `again > 0`.
fn busy_frame_replaying(again: u8) -> FrameBuilder {
    let descriptor = DescriptorRecord {
        index: 12,
        kind: 2,
        sprite_id: 3001,
        name: "Wanderer".into(),
        colors: vec![4, 5, 6, 7],
    };
    let mobile = MobileRecord {
        index: 12,
        pose: 33,
        h: -12,
        v: 48,
        color: 2,
    };
    let bubble = BubbleHeader {
        entity_index: 12,
        kind: BubbleKind::Thought,
        language: Some(BubbleLanguage {
            language: Language::Sylvan,
            knowledge: Knowledge::Known,
        }),
        position: Some((5, -5)),
    };

    FrameBuilder::new()
        .header(3, 1_000, 998)
        .descriptors(&[descriptor])
        .stats(StatBars::default(), LightingFlags::AREA_DARKER)
        .pictures(
            again,
            &[
                PictureRecord::new(100, 1, 2),
                PictureRecord::new(200, -300, 250),
                PictureRecord::new(300, 7, -7),
            ],
        )
        .mobiles(&[mobile])
        .info_strings(&["A cold wind blows."])
        .bubbles(&[(bubble, "hmm")])
        .sounds(&[1, 2])
}

fn inventory() -> Vec<InventoryCommand> {
    vec![
        InventoryCommand::Full {
            items: vec![
                InventoryItem {
                    id: 7,
                    equipped: true,
                },
                InventoryItem {
                    id: 8,
                    equipped: false,
                },
            ],
        },
        InventoryCommand::Equip {
            item: ItemRef {
                id: 8,
                index: Some(1),
            },
        },
    ]
}

// ============================================================================
// TRUNCATION
// ============================================================================

/// Decodes every strict prefix of `frame` plus `inventory`, checking that
/// each failure is a truncation at a stage no earlier than the last one.
/// Returns every stage reported.
fn truncation_stages(frame: FrameBuilder) -> BTreeSet<Stage> {
    let without_inventory = frame.clone().finish().len();
    let full = frame.inventory(&inventory()).finish();
    let limits = Limits::default();
    assert!(decode_frame(&full, &limits).is_ok());

    let mut seen = BTreeSet::new();
    let mut last = Stage::Header;
    for len in 0..full.len() {
        match decode_frame(&full[..len], &limits) {
            Ok(_) => assert_eq!(len, without_inventory, "prefix {len} decoded"),
            Err(err) => {
                assert_eq!(err.kind, StageErrorKind::Truncated, "prefix {len}");
                assert!(err.stage >= last, "prefix {len}: {} after {last}", err.stage);
                last = err.stage;
                seen.insert(err.stage);
            }
        }
    }
    seen
}

#[test]
fn test_every_prefix_fails_at_a_monotonic_stage() {
    let seen = truncation_stages(busy_frame());
    let expected: BTreeSet<_> = Stage::ALL
        .into_iter()
        .filter(|&stage| stage != Stage::PictureHeader)
        .collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_extended_header_prefixes_reach_every_stage() {
    let seen = truncation_stages(busy_frame_replaying(2));
    assert_eq!(seen, Stage::ALL.into_iter().collect::<BTreeSet<_>>());
}

#[test]
fn test_truncated_extended_header() {
    let head = FrameBuilder::new()
        .header(0, 0, 0)
        .descriptors(&[])
        .stats(StatBars::default(), LightingFlags::NONE);
    for tail in [&[255][..], &[255, 1][..]] {
        let bytes = head.clone().raw(tail).finish();
        let err = decode_frame(&bytes, &Limits::default()).unwrap_err();
        assert_eq!(err.stage, Stage::PictureHeader);
        assert_eq!(err.kind, StageErrorKind::Truncated);
    }
}

#[test]
fn test_descriptor_count_without_entries() {
    let bytes = FrameBuilder::new().header(0, 0, 0).raw(&[2]).finish();
    let err = decode_frame(&bytes, &Limits::default()).unwrap_err();
    assert_eq!(err.stage, Stage::Descriptor);
    assert_eq!(err.kind, StageErrorKind::Truncated);
}

#[test]
fn test_missing_inventory_means_no_change() {
    let bytes = busy_frame().finish();
    let frame = decode_frame(&bytes, &Limits::default()).unwrap();
    assert!(frame.tail.inventory.is_empty());
}

#[test]
fn test_truncated_tail_still_commits_under_partial_policy() {
    let full = busy_frame().finish();
    // Cut inside the sound list.
    let cut = &full[..full.len() - 1];

    let client = DrawStateClient::new(DecoderConfig::default());
    let err = client.handle_packet_at(cut, Timestamp::from_millis(1)).unwrap_err();
    assert_eq!(err.stage, Stage::Sounds);
    assert_eq!(client.state().generation(), 1);

    let atomic = DrawStateClient::new(DecoderConfig {
        commit_policy: CommitPolicy::Atomic,
        ..DecoderConfig::default()
    });
    let err = atomic.handle_packet_at(cut, Timestamp::from_millis(1)).unwrap_err();
    assert_eq!(err.stage, Stage::Sounds);
    assert_eq!(atomic.state().generation(), 0);
}

// ============================================================================
// BOUNDS
// ============================================================================

#[test]
fn test_counts_above_limits_are_rejected() {
    let bytes = busy_frame().finish();
    let cases = [
        (
            Limits {
                max_descriptors: 0,
                ..Limits::default()
            },
            Stage::DescriptorCount,
        ),
        (
            Limits {
                max_pictures: 2,
                ..Limits::default()
            },
            Stage::PictureCount,
        ),
        (
            Limits {
                max_mobiles: 0,
                ..Limits::default()
            },
            Stage::MobileCount,
        ),
        (
            Limits {
                max_bubbles: 0,
                ..Limits::default()
            },
            Stage::BubbleCount,
        ),
        (
            Limits {
                max_sounds: 1,
                ..Limits::default()
            },
            Stage::SoundCount,
        ),
    ];

    for (limits, stage) in cases {
        let err = decode_frame(&bytes, &limits).unwrap_err();
        assert_eq!(err.stage, stage);
        assert!(err.is_bounds_exceeded());
    }
}

#[test]
fn test_full_sound_byte_fits_default_limits() {
    let sounds: Vec<u16> = (0..255).collect();
    let bytes = FrameBuilder::new()
        .header(0, 0, 0)
        .descriptors(&[])
        .stats(StatBars::default(), LightingFlags::NONE)
        .pictures(0, &[])
        .mobiles(&[])
        .info_strings(&[])
        .bubbles(&[])
        .sounds(&sounds)
        .finish();

    let frame = decode_frame(&bytes, &Limits::default()).unwrap();
    assert_eq!(frame.tail.sounds, sounds);
}

#[test]
fn test_extended_picture_total_counts_replay() {
    let bytes = FrameBuilder::new()
        .header(0, 0, 0)
        .descriptors(&[])
        .stats(StatBars::default(), LightingFlags::NONE)
        .pictures(200, &[PictureRecord::new(1, 0, 0)])
        .finish();
    let limits = Limits {
        max_pictures: 200,
        ..Limits::default()
    };
    let err = decode_frame(&bytes, &limits).unwrap_err();
    assert_eq!(err.stage, Stage::PictureHeader);
    assert_eq!(
        err.kind,
        StageErrorKind::BoundsExceeded {
            count: 201,
            max: 200
        }
    );
}

// ============================================================================
// RANDOM INPUT
// ============================================================================

#[test]
fn test_random_bytes_never_panic() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let client = DrawStateClient::new(DecoderConfig::default());
    let limits = Limits::default();

    for i in 0..2_000u64 {
        let len = rng.gen_range(0..256);
        let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let _ = decode_frame(&bytes, &limits);
        let _ = client.handle_packet_at(&bytes, Timestamp::from_millis(i * 200));
        let _ = client.render_frame();
    }

    let stats = client.stats();
    assert_eq!(stats.frames_decoded + stats.frames_dropped, 2_000);
}

#[test]
fn test_mutated_frames_never_panic() {
    let mut rng = StdRng::seed_from_u64(42);
    let base = busy_frame().inventory(&inventory()).finish();
    let client = DrawStateClient::new(DecoderConfig::default());

    for i in 0..2_000u64 {
        let mut bytes = base.clone();
        for _ in 0..rng.gen_range(1..4) {
            let at = rng.gen_range(0..bytes.len());
            bytes[at] = rng.gen();
        }
        if rng.gen_bool(0.25) {
            let keep = rng.gen_range(0..=bytes.len());
            bytes.truncate(keep);
        }

        let now = Timestamp::from_millis(i * 200);
        let _ = client.handle_packet_at(&bytes, now);
        let snapshot = client.state().capture(now);
        let _ = cairn_networking::blend(&snapshot, now, &client.state().blend_settings());
    }
}
