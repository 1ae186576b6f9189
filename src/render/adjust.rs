//! Global brightness/contrast adjustment applied to the template before text.

use image::RgbaImage;

/// Apply brightness and contrast in place. No-op when both are zero.
///
/// Both parameters range over -100..=100:
/// - brightness adds `brightness/100 * 255` to each color channel
/// - contrast scales channels around 128 by `1 + contrast/100`
///   (-100 flattens to gray, 100 doubles the spread)
///
/// Alpha is left untouched.
pub fn brightness_contrast(img: &mut RgbaImage, brightness: i32, contrast: i32) {
    if brightness == 0 && contrast == 0 {
        return;
    }

    let brightness_offset = (brightness as f32 / 100.0) * 255.0;
    let contrast_factor = 1.0 + (contrast as f32 / 100.0);

    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let val = pixel[c] as f32;
            let val = (val - 128.0) * contrast_factor + 128.0;
            let val = val + brightness_offset;
            pixel[c] = val.round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_zero_is_noop() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 40]));
        brightness_contrast(&mut img, 0, 0);
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 40]);
    }

    #[test]
    fn test_brightness_shifts_and_clamps() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([100, 250, 0, 255]));
        brightness_contrast(&mut img, 10, 0);
        // +25.5 per channel
        assert_eq!(img.get_pixel(0, 0).0, [126, 255, 26, 255]);

        let mut img = RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 7]));
        brightness_contrast(&mut img, -100, 0);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 7]);
    }

    #[test]
    fn test_contrast_pivots_on_midpoint() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([128, 64, 192, 255]));
        brightness_contrast(&mut img, 0, 100);
        assert_eq!(img.get_pixel(0, 0).0, [128, 0, 255, 255]);

        let mut img = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 30, 255]));
        brightness_contrast(&mut img, 0, -100);
        assert_eq!(img.get_pixel(0, 0).0, [128, 128, 128, 255]);
    }
}
