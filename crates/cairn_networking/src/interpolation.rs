//! # Interpolation Engine
//!
//! Turns a [`DrawSnapshot`] into render positions for one moment in time.
//!
//! The server sends a frame every ~200 ms. Between frames, positions glide
//! from where the previous frame put them to where the current frame puts
//! them:
//!
//! ```text
//!   prev_time                      cur_time
//!      │──────────── interval ────────│
//!      ▼                              ▼
//!   alpha 0.0 ─────────────────────► 1.0      positions
//!   fade  0.0 ───────────► 1.0                poses (blend_rate < 1)
//! ```
//!
//! ## Anti-jump
//!
//! Anything that moved further than `max_interp_distance` in one frame
//! (respawn, teleport, a reused index) snaps to its current position.
//!
//! ## Scroll
//!
//! Background pictures follow the motion shift backwards, so while the
//! player walks the whole scene slides instead of stepping.

use cairn_shared::{BlendSettings, Timestamp};

use crate::snapshot::DrawSnapshot;

/// Position and fade factors for `now` within `[prev, cur]`.
///
/// Both lie in `[0, 1]`. Returns `(1, 1)` when interpolation is off or the
/// interval is unset or empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_interpolation(
    prev: Timestamp,
    cur: Timestamp,
    now: Timestamp,
    settings: &BlendSettings,
) -> (f32, f32) {
    if !settings.interpolate || cur.is_zero() || cur <= prev {
        return (1.0, 1.0);
    }

    let interval = cur.saturating_micros_since(prev) as f32;
    let elapsed = now.saturating_micros_since(prev) as f32;

    let alpha = (elapsed / interval).clamp(0.0, 1.0);
    let fade_span = interval * settings.blend_rate;
    let fade = if fade_span > 0.0 {
        (elapsed / fade_span).clamp(0.0, 1.0)
    } else {
        1.0
    };
    (alpha, fade)
}

/// Blends one status bar value.
///
/// Increases always glide. Decreases jump straight to `cur` in fast mode.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn lerp_bar(prev: i32, cur: i32, alpha: f32, fast_bars: bool) -> i32 {
    if fast_bars && cur < prev {
        return cur;
    }
    (prev as f32 + alpha * (cur - prev) as f32).round() as i32
}

#[inline]
fn within(dh: i32, dv: i32, max: i32) -> bool {
    let d2 = i64::from(dh) * i64::from(dh) + i64::from(dv) * i64::from(dv);
    d2 <= i64::from(max) * i64::from(max)
}

/// Render position of one mobile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MobileBlend {
    /// Mobile index.
    pub index: u8,
    /// Current pose.
    pub pose: u8,
    /// Color byte.
    pub color: u8,
    /// Blended H.
    pub h: f32,
    /// Blended V.
    pub v: f32,
    /// Pose to cross-fade from, when onion skinning.
    pub prev_pose: Option<u8>,
    /// Weight of `prev_pose`.
    pub prev_weight: f32,
    /// Whether the position was interpolated rather than snapped.
    pub interpolated: bool,
}

/// Render position of one picture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PictureBlend {
    /// Sprite ID.
    pub sprite_id: u16,
    /// Blended H.
    pub h: f32,
    /// Blended V.
    pub v: f32,
    /// Replayed from the previous frame; drawn where it is.
    pub replayed: bool,
}

/// Blended status bars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BarBlend {
    /// Health.
    pub hp: i32,
    /// Health max.
    pub hp_max: i32,
    /// Spirit.
    pub sp: i32,
    /// Spirit max.
    pub sp_max: i32,
    /// Balance.
    pub balance: i32,
    /// Balance max.
    pub balance_max: i32,
}

/// Everything the renderer needs for one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct BlendedFrame {
    /// Position factor.
    pub alpha: f32,
    /// Pose cross-fade factor.
    pub fade: f32,
    /// Mobiles in index order.
    pub mobiles: Vec<MobileBlend>,
    /// Pictures in list order.
    pub pictures: Vec<PictureBlend>,
    /// Status bars.
    pub bars: BarBlend,
    /// Scroll still to be covered by the background.
    pub scroll: (f32, f32),
}

/// Blends a snapshot for rendering at `now`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn blend(snapshot: &DrawSnapshot, now: Timestamp, settings: &BlendSettings) -> BlendedFrame {
    let (alpha, fade) =
        compute_interpolation(snapshot.prev_time, snapshot.cur_time, now, settings);
    let rest = 1.0 - alpha;
    let max = settings.max_interp_distance;

    let mobiles = snapshot
        .mobiles
        .values()
        .map(|cur| {
            let prev = snapshot.prev_mobiles.get(&cur.index);
            let (h, v, interpolated) = match prev {
                Some(p) if within(
                    i32::from(cur.h) - i32::from(p.h),
                    i32::from(cur.v) - i32::from(p.v),
                    max,
                ) =>
                {
                    let h = f32::from(p.h) + alpha * (f32::from(cur.h) - f32::from(p.h));
                    let v = f32::from(p.v) + alpha * (f32::from(cur.v) - f32::from(p.v));
                    (h, v, true)
                }
                _ => (f32::from(cur.h), f32::from(cur.v), false),
            };

            let prev_pose = prev
                .filter(|p| settings.onion_skin && p.pose != cur.pose)
                .map(|p| p.pose);
            MobileBlend {
                index: cur.index,
                pose: cur.pose,
                color: cur.color,
                h,
                v,
                prev_pose,
                prev_weight: if prev_pose.is_some() { 1.0 - fade } else { 0.0 },
                interpolated,
            }
        })
        .collect();

    let (sh, sv) = snapshot
        .shift
        .map_or((0, 0), |(h, v)| (i32::from(h), i32::from(v)));
    let pictures = snapshot
        .pictures
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i < snapshot.pict_again {
                return PictureBlend {
                    sprite_id: p.sprite_id,
                    h: f32::from(p.h),
                    v: f32::from(p.v),
                    replayed: true,
                };
            }

            let (mut own_h, mut own_v) = if p.moving {
                (
                    i32::from(p.h) - i32::from(p.prev_h) - sh,
                    i32::from(p.v) - i32::from(p.prev_v) - sv,
                )
            } else {
                (0, 0)
            };
            if !within(own_h, own_v, max) {
                own_h = 0;
                own_v = 0;
            }
            PictureBlend {
                sprite_id: p.sprite_id,
                h: rest.mul_add(-(sh + own_h) as f32, f32::from(p.h)),
                v: rest.mul_add(-(sv + own_v) as f32, f32::from(p.v)),
                replayed: false,
            }
        })
        .collect();

    let b = &snapshot.bars;
    let pb = &snapshot.prev_bars;
    let lerp =
        |prev: u8, cur: u8| lerp_bar(i32::from(prev), i32::from(cur), alpha, settings.fast_bars);
    let bars = BarBlend {
        hp: lerp(pb.hp, b.hp),
        hp_max: i32::from(b.hp_max),
        sp: lerp(pb.sp, b.sp),
        sp_max: i32::from(b.sp_max),
        balance: lerp(pb.balance, b.balance),
        balance_max: i32::from(b.balance_max),
    };

    let scroll = (-rest * sh as f32, -rest * sv as f32);

    BlendedFrame {
        alpha,
        fade,
        mobiles,
        pictures,
        bars,
        scroll,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_shared::{MobileRecord, PictureRecord, StatBars};

    fn settings() -> BlendSettings {
        BlendSettings::default()
    }

    fn halfway() -> (Timestamp, Timestamp, Timestamp) {
        (
            Timestamp::from_millis(1_000),
            Timestamp::from_millis(1_200),
            Timestamp::from_millis(1_100),
        )
    }

    #[test]
    fn test_interpolation_bounds() {
        let s = settings();
        let cases = [
            (0, 200, 100),
            (0, 200, 0),
            (0, 200, 5_000),
            (500, 200, 300),
            (200, 200, 200),
            (100, 0, 50),
        ];
        for (prev, cur, now) in cases {
            let (alpha, fade) = compute_interpolation(
                Timestamp::from_millis(prev),
                Timestamp::from_millis(cur),
                Timestamp::from_millis(now),
                &s,
            );
            assert!((0.0..=1.0).contains(&alpha));
            assert!((0.0..=1.0).contains(&fade));
        }
    }

    #[test]
    fn test_interpolation_snaps_when_unset_or_disabled() {
        let s = settings();
        let now = Timestamp::from_millis(5);
        assert_eq!(
            compute_interpolation(Timestamp::ZERO, Timestamp::ZERO, now, &s),
            (1.0, 1.0)
        );
        assert_eq!(
            compute_interpolation(Timestamp::from_millis(9), Timestamp::from_millis(3), now, &s),
            (1.0, 1.0)
        );

        let off = BlendSettings {
            interpolate: false,
            ..settings()
        };
        let (prev, cur, now) = halfway();
        assert_eq!(compute_interpolation(prev, cur, now, &off), (1.0, 1.0));
    }

    #[test]
    fn test_fade_runs_faster_with_lower_rate() {
        let (prev, cur, now) = halfway();
        let s = BlendSettings {
            blend_rate: 0.5,
            ..settings()
        };
        let (alpha, fade) = compute_interpolation(prev, cur, now, &s);
        assert!((alpha - 0.5).abs() < 1e-6);
        assert!((fade - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_bar() {
        assert_eq!(lerp_bar(100, 50, 0.5, false), 75);
        assert_eq!(lerp_bar(100, 50, 0.5, true), 50);
        assert_eq!(lerp_bar(50, 100, 0.5, false), 75);
        assert_eq!(lerp_bar(50, 100, 0.5, true), 75);
        assert_eq!(lerp_bar(10, 10, 0.3, true), 10);
    }

    fn snapshot_with_mobile(prev: (i16, i16), cur: (i16, i16)) -> DrawSnapshot {
        let (prev_time, cur_time, _) = halfway();
        let mut snapshot = DrawSnapshot {
            prev_time,
            cur_time,
            ..DrawSnapshot::default()
        };
        snapshot.prev_mobiles.insert(
            1,
            MobileRecord {
                index: 1,
                pose: 3,
                h: prev.0,
                v: prev.1,
                color: 0,
            },
        );
        snapshot.mobiles.insert(
            1,
            MobileRecord {
                index: 1,
                pose: 4,
                h: cur.0,
                v: cur.1,
                color: 0,
            },
        );
        snapshot
    }

    #[test]
    fn test_mobile_glides_halfway() {
        let (_, _, now) = halfway();
        let frame = blend(&snapshot_with_mobile((0, 0), (10, -20)), now, &settings());
        let m = frame.mobiles[0];
        assert!(m.interpolated);
        assert!((m.h - 5.0).abs() < 1e-4);
        assert!((m.v + 10.0).abs() < 1e-4);
        assert_eq!(m.prev_pose, None);
    }

    #[test]
    fn test_mobile_jump_snaps_to_current() {
        let (_, _, now) = halfway();
        let frame = blend(&snapshot_with_mobile((0, 0), (200, 0)), now, &settings());
        let m = frame.mobiles[0];
        assert!(!m.interpolated);
        assert_eq!((m.h, m.v), (200.0, 0.0));
    }

    #[test]
    fn test_onion_skin_reports_previous_pose() {
        let (_, _, now) = halfway();
        let s = BlendSettings {
            onion_skin: true,
            ..settings()
        };
        let frame = blend(&snapshot_with_mobile((0, 0), (2, 0)), now, &s);
        let m = frame.mobiles[0];
        assert_eq!(m.prev_pose, Some(3));
        assert!((m.prev_weight - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_pictures_follow_scroll() {
        let (prev_time, cur_time, now) = halfway();
        let mut still = PictureRecord::new(1, 10, 0);
        still.prev_h = 18;
        let mut walker = PictureRecord::new(2, 30, 0);
        walker.prev_h = 34;
        walker.moving = true;
        let snapshot = DrawSnapshot {
            pictures: vec![PictureRecord::new(9, 5, 5), still, walker],
            pict_again: 1,
            shift: Some((-8, 0)),
            prev_time,
            cur_time,
            ..DrawSnapshot::default()
        };

        let frame = blend(&snapshot, now, &settings());
        let p = &frame.pictures;
        assert!(p[0].replayed);
        assert_eq!((p[0].h, p[0].v), (5.0, 5.0));
        // halfway between 18 and 10
        assert!((p[1].h - 14.0).abs() < 1e-4);
        // halfway between 34 and 30
        assert!((p[2].h - 32.0).abs() < 1e-4);
        assert!((frame.scroll.0 - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_bars_blend() {
        let (prev_time, cur_time, now) = halfway();
        let snapshot = DrawSnapshot {
            prev_bars: StatBars {
                hp: 100,
                sp: 50,
                ..StatBars::default()
            },
            bars: StatBars {
                hp: 50,
                hp_max: 120,
                sp: 100,
                ..StatBars::default()
            },
            prev_time,
            cur_time,
            ..DrawSnapshot::default()
        };
        let frame = blend(&snapshot, now, &settings());
        assert_eq!(frame.bars.hp, 50);
        assert_eq!(frame.bars.sp, 75);
        assert_eq!(frame.bars.hp_max, 120);
    }
}
