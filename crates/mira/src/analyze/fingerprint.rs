//! Perceptual fingerprints for near-duplicate detection.
//!
//! A difference hash: downscale to a 9x8 grayscale grid and record the
//! sign of each horizontal gradient, giving 64 bits that survive
//! re-encoding, resizing, and small edits. Similarity is Hamming distance
//! between fingerprints.

use image::imageops::FilterType;
use image::DynamicImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn from_image(img: &DynamicImage) -> Self {
        let small = img.resize_exact(9, 8, FilterType::Triangle).to_luma8();

        let mut bits = 0u64;
        let mut bit = 0u32;
        for y in 0..8 {
            for x in 0..8 {
                let left = small.get_pixel(x, y)[0];
                let right = small.get_pixel(x + 1, y)[0];
                if left > right {
                    bits |= 1 << bit;
                }
                bit += 1;
            }
        }

        Fingerprint(bits)
    }

    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gradient_image(step: u8) -> DynamicImage {
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([(x as u8).wrapping_mul(step)]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn identical_images_have_zero_distance() {
        let a = Fingerprint::from_image(&gradient_image(3));
        let b = Fingerprint::from_image(&gradient_image(3));
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn resized_copy_stays_close() {
        let original = gradient_image(3);
        let resized = original.resize_exact(32, 32, FilterType::Triangle);

        let a = Fingerprint::from_image(&original);
        let b = Fingerprint::from_image(&resized);

        assert!(a.distance(&b) <= 5, "distance was {}", a.distance(&b));
    }

    #[test]
    fn flat_and_gradient_images_differ() {
        let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([128])));
        let a = Fingerprint::from_image(&flat);
        let b = Fingerprint::from_image(&gradient_image(4));

        assert!(a.distance(&b) > 5);
    }

    #[test]
    fn distance_counts_differing_bits() {
        assert_eq!(Fingerprint(0b1011).distance(&Fingerprint(0b0010)), 2);
        assert_eq!(Fingerprint(u64::MAX).distance(&Fingerprint(0)), 64);
    }
}
