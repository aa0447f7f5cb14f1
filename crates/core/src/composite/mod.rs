use serde::{Deserialize, Serialize};

use crate::buffer::{pack_argb, unpack_argb};

/// Rule for resolving sample coordinates that fall outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Clip to the nearest edge pixel.
    #[default]
    Clamp,
    /// Tile the image.
    Wrap,
    /// Reflect at the borders without repeating the edge pixel.
    Mirror,
}

impl EdgeMode {
    /// Maps `coord` onto `0..len`. `len` must be non-zero.
    #[inline]
    pub fn resolve(self, coord: i64, len: usize) -> usize {
        debug_assert!(len > 0, "cannot resolve coordinates on an empty axis");
        let last = len as i64 - 1;
        let resolved = match self {
            EdgeMode::Clamp => coord.clamp(0, last),
            EdgeMode::Wrap => coord.rem_euclid(len as i64),
            EdgeMode::Mirror => {
                if last == 0 {
                    0
                } else {
                    let period = 2 * last;
                    let folded = coord.rem_euclid(period);
                    if folded > last {
                        period - folded
                    } else {
                        folded
                    }
                }
            }
        };
        debug_assert!((0..len as i64).contains(&resolved));
        resolved as usize
    }
}

/// How a newly produced pixel is combined with the pixel already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Replace,
    /// Per-channel saturating add.
    Additive,
    /// Per-channel multiply, normalised so 255 is the identity.
    Multiply,
}

impl BlendMode {
    /// Composites `src` over `dst`. Colour channels follow the blend mode;
    /// alpha comes from `src` for replace and is kept from `dst` otherwise.
    #[inline]
    pub fn apply(self, src: u32, dst: u32) -> u32 {
        match self {
            BlendMode::Replace => src,
            BlendMode::Additive => {
                let [_, sr, sg, sb] = unpack_argb(src);
                let [da, dr, dg, db] = unpack_argb(dst);
                pack_argb(
                    da,
                    dr.saturating_add(sr),
                    dg.saturating_add(sg),
                    db.saturating_add(sb),
                )
            }
            BlendMode::Multiply => {
                let [_, sr, sg, sb] = unpack_argb(src);
                let [da, dr, dg, db] = unpack_argb(dst);
                pack_argb(da, mul_channel(sr, dr), mul_channel(sg, dg), mul_channel(sb, db))
            }
        }
    }
}

#[inline]
fn mul_channel(a: u8, b: u8) -> u8 {
    ((u32::from(a) * u32::from(b) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_negative_one_on_width_ten() {
        assert_eq!(EdgeMode::Wrap.resolve(-1, 10), 9);
        assert_eq!(EdgeMode::Clamp.resolve(-1, 10), 0);
        assert_eq!(EdgeMode::Mirror.resolve(-1, 10), 1);
    }

    #[test]
    fn resolves_past_the_far_edge() {
        assert_eq!(EdgeMode::Clamp.resolve(12, 10), 9);
        assert_eq!(EdgeMode::Wrap.resolve(12, 10), 2);
        assert_eq!(EdgeMode::Mirror.resolve(10, 10), 8);
        assert_eq!(EdgeMode::Mirror.resolve(18, 10), 0);
    }

    #[test]
    fn single_pixel_axis_always_resolves_to_zero() {
        for mode in [EdgeMode::Clamp, EdgeMode::Wrap, EdgeMode::Mirror] {
            assert_eq!(mode.resolve(-7, 1), 0);
            assert_eq!(mode.resolve(5, 1), 0);
        }
    }

    #[test]
    fn in_range_coordinates_are_untouched() {
        for mode in [EdgeMode::Clamp, EdgeMode::Wrap, EdgeMode::Mirror] {
            for coord in 0..10 {
                assert_eq!(mode.resolve(coord, 10), coord as usize);
            }
        }
    }

    #[test]
    fn additive_saturates_per_channel() {
        let src = pack_argb(0x00, 200, 10, 0);
        let dst = pack_argb(0xFF, 100, 20, 5);
        assert_eq!(BlendMode::Additive.apply(src, dst), pack_argb(0xFF, 255, 30, 5));
    }

    #[test]
    fn multiply_by_white_is_identity() {
        let white = pack_argb(0xFF, 255, 255, 255);
        let dst = pack_argb(0xFF, 12, 130, 250);
        assert_eq!(BlendMode::Multiply.apply(white, dst), dst);
        let black = pack_argb(0xFF, 0, 0, 0);
        assert_eq!(BlendMode::Multiply.apply(black, dst), pack_argb(0xFF, 0, 0, 0));
    }

    #[test]
    fn replace_takes_source() {
        assert_eq!(BlendMode::Replace.apply(0x1234_5678, 0xFFFF_FFFF), 0x1234_5678);
    }

    #[test]
    fn modes_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&EdgeMode::Mirror).unwrap(), "\"mirror\"");
        let mode: BlendMode = serde_json::from_str("\"additive\"").unwrap();
        assert_eq!(mode, BlendMode::Additive);
    }
}
