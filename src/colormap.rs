//! # Colour mapping
//!
//! Jet colour ramp used to render normalised disparities: blue, cyan, yellow, red.

use image::Rgb;

/// Map a value in `[0, 1]` onto the jet ramp. Values outside are clamped.
pub fn jet(v: f32) -> Rgb<u8> {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };

    let (r, g, b) = if v < 0.25 {
        (0.0, 4.0 * v, 1.0)
    } else if v < 0.5 {
        (0.0, 1.0, 1.0 + 4.0 * (0.25 - v))
    } else if v < 0.75 {
        (4.0 * (v - 0.5), 1.0, 0.0)
    } else {
        (1.0, 1.0 + 4.0 * (0.75 - v), 0.0)
    };

    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_and_knots() {
        assert_eq!(jet(0.0).0, [0, 0, 255]);
        assert_eq!(jet(0.25).0, [0, 255, 255]);
        assert_eq!(jet(0.5).0, [0, 255, 0]);
        assert_eq!(jet(0.75).0, [255, 255, 0]);
        assert_eq!(jet(1.0).0, [255, 0, 0]);
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(jet(-3.0), jet(0.0));
        assert_eq!(jet(7.5), jet(1.0));
        assert_eq!(jet(f32::NAN), jet(0.0));
    }
}
