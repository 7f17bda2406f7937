//! # Motion Shift
//!
//! Separates camera scroll from actor motion.
//!
//! When the player walks, every background picture moves by the same offset
//! between two frames. Matching pictures by sprite ID and voting on the
//! displacement recovers that offset:
//!
//! ```text
//!   previous frame          current frame
//!   ┌───────────────┐       ┌───────────────┐
//!   │  T(12)   R(7) │       │ T(12)   R(7)  │   every match moved by (-4, 0)
//!   │      R(7)     │  ──►  │     R(7)      │   → shift = (-4, 0)
//!   └───────────────┘       └───────────────┘
//! ```
//!
//! The winning offset must hold a strict majority of the votes and stay
//! within `max_shift`, otherwise no shift is reported.

use std::collections::HashMap;

use cairn_shared::{PictureRecord, PlayfieldBounds};

#[inline]
fn squared_distance(ah: i32, av: i32, bh: i32, bv: i32) -> i64 {
    let dh = i64::from(ah - bh);
    let dv = i64::from(av - bv);
    dh * dh + dv * dv
}

#[inline]
fn clamp_i16(value: i32) -> i16 {
    // Lossless after the clamp.
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Nearest picture in `candidates` with `sprite_id`, measured from `(h, v)`.
fn nearest<'a>(
    candidates: impl Iterator<Item = &'a PictureRecord>,
    sprite_id: u16,
    h: i32,
    v: i32,
) -> Option<&'a PictureRecord> {
    candidates
        .filter(|c| c.sprite_id == sprite_id)
        .min_by_key(|c| squared_distance(i32::from(c.h), i32::from(c.v), h, v))
}

/// Estimates the dominant scroll offset from `prev` to `cur`.
///
/// Returns `(dh, dv)` such that a background picture at `p` in the previous
/// frame appears at `p + (dh, dv)` in the current one.
#[must_use]
pub fn estimate_shift(
    prev: &[PictureRecord],
    cur: &[PictureRecord],
    bounds: &PlayfieldBounds,
    max_shift: i32,
) -> Option<(i16, i16)> {
    if prev.is_empty() || cur.is_empty() {
        return None;
    }

    let mut votes: HashMap<(i32, i32), u32> = HashMap::new();
    let mut total = 0u32;
    for p in prev.iter().filter(|p| bounds.contains(p.h, p.v)) {
        let on_screen = cur.iter().filter(|c| bounds.contains(c.h, c.v));
        let Some(m) = nearest(on_screen, p.sprite_id, i32::from(p.h), i32::from(p.v)) else {
            continue;
        };
        let offset = (i32::from(m.h) - i32::from(p.h), i32::from(m.v) - i32::from(p.v));
        *votes.entry(offset).or_insert(0) += 1;
        total += 1;
    }

    let (&(dh, dv), &count) = votes.iter().max_by_key(|&(_, count)| *count)?;
    if count * 2 <= total {
        return None;
    }
    let max = i64::from(max_shift);
    if squared_distance(dh, dv, 0, 0) > max * max {
        return None;
    }
    Some((clamp_i16(dh), clamp_i16(dv)))
}

/// Fills `prev_h`, `prev_v` and `moving` on freshly decoded pictures.
///
/// Each new picture is matched to the previous picture of the same sprite
/// nearest to where the scroll alone would have put it. A picture that sits
/// exactly there is stationary. One with no match starts where the scroll
/// puts it and is not moving.
pub fn link_pictures(prev: &[PictureRecord], new: &mut [PictureRecord], shift: Option<(i16, i16)>) {
    let (sh, sv) = shift.map_or((0, 0), |(h, v)| (i32::from(h), i32::from(v)));

    for picture in new.iter_mut() {
        let expected_h = i32::from(picture.h) - sh;
        let expected_v = i32::from(picture.v) - sv;

        match nearest(prev.iter(), picture.sprite_id, expected_h, expected_v) {
            Some(m) => {
                picture.prev_h = m.h;
                picture.prev_v = m.v;
                picture.moving = i32::from(m.h) != expected_h || i32::from(m.v) != expected_v;
            }
            None => {
                picture.prev_h = clamp_i16(expected_h);
                picture.prev_v = clamp_i16(expected_v);
                picture.moving = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_shared::constants::MAX_SHIFT;

    fn pic(id: u16, h: i16, v: i16) -> PictureRecord {
        PictureRecord::new(id, h, v)
    }

    #[test]
    fn test_uniform_offset_is_found() {
        let prev = vec![pic(1, 0, 0), pic(2, 50, 10), pic(3, -40, 30)];
        let cur: Vec<_> = prev.iter().map(|p| pic(p.sprite_id, p.h - 4, p.v + 2)).collect();
        let shift = estimate_shift(&prev, &cur, &PlayfieldBounds::default(), MAX_SHIFT);
        assert_eq!(shift, Some((-4, 2)));
    }

    #[test]
    fn test_unrelated_pictures_have_no_shift() {
        let prev = vec![pic(1, 0, 0)];
        let cur = vec![pic(2, 5, 5)];
        assert_eq!(
            estimate_shift(&prev, &cur, &PlayfieldBounds::default(), MAX_SHIFT),
            None
        );
    }

    #[test]
    fn test_empty_side_has_no_shift() {
        let bounds = PlayfieldBounds::default();
        assert_eq!(estimate_shift(&[], &[pic(1, 0, 0)], &bounds, MAX_SHIFT), None);
        assert_eq!(estimate_shift(&[pic(1, 0, 0)], &[], &bounds, MAX_SHIFT), None);
    }

    #[test]
    fn test_split_vote_has_no_shift() {
        let prev = vec![pic(1, 0, 0), pic(2, 100, 100)];
        let cur = vec![pic(1, 3, 0), pic(2, 100, 103)];
        assert_eq!(
            estimate_shift(&prev, &cur, &PlayfieldBounds::default(), MAX_SHIFT),
            None
        );
    }

    #[test]
    fn test_majority_wins_over_outlier() {
        let prev = vec![pic(1, 0, 0), pic(2, 20, 20), pic(3, -20, 20), pic(4, 0, -60)];
        let cur = vec![pic(1, 8, 0), pic(2, 28, 20), pic(3, -12, 20), pic(4, 30, -60)];
        assert_eq!(
            estimate_shift(&prev, &cur, &PlayfieldBounds::default(), MAX_SHIFT),
            Some((8, 0))
        );
    }

    #[test]
    fn test_large_offset_is_rejected() {
        let prev = vec![pic(1, 0, 0)];
        let cur = vec![pic(1, 100, 0)];
        assert_eq!(estimate_shift(&prev, &cur, &PlayfieldBounds::default(), 64), None);
        assert_eq!(
            estimate_shift(&prev, &cur, &PlayfieldBounds::default(), 100),
            Some((100, 0))
        );
    }

    #[test]
    fn test_off_screen_pictures_do_not_vote() {
        let bounds = PlayfieldBounds::default();
        let prev = vec![pic(1, 0, 0), pic(2, 400, 0), pic(3, 401, 0)];
        let cur = vec![pic(1, 2, 0), pic(2, 380, 0), pic(3, 381, 0)];
        assert_eq!(estimate_shift(&prev, &cur, &bounds, MAX_SHIFT), Some((2, 0)));
    }

    #[test]
    fn test_link_marks_stationary_and_moving() {
        let prev = vec![pic(1, 0, 0), pic(2, 10, 10)];
        let mut new = vec![pic(1, 4, 0), pic(2, 20, 10), pic(3, 0, 0)];
        link_pictures(&prev, &mut new, Some((4, 0)));

        assert!(!new[0].moving);
        assert_eq!((new[0].prev_h, new[0].prev_v), (0, 0));

        assert!(new[1].moving);
        assert_eq!((new[1].prev_h, new[1].prev_v), (10, 10));

        assert!(!new[2].moving);
        assert_eq!((new[2].prev_h, new[2].prev_v), (-4, 0));
    }
}
