use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::separable_filter_equal;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Neighbourhood size of the adaptive threshold.
pub const THRESHOLD_BLOCK: usize = 11;
/// Constant subtracted from the local weighted mean.
pub const THRESHOLD_C: i32 = 2;

const WHITE: u8 = 255;
const BLACK: u8 = 0;

/// Turns one decoded frame into the binary raster handed to the tracer:
/// resize, flip vertically, luma, adaptive threshold, 2x2 opening.
pub fn binarize(frame: &RgbImage, width: u32, height: u32) -> GrayImage {
    let resized = imageops::resize(frame, width, height, FilterType::Triangle);
    let flipped = imageops::flip_vertical(&resized);
    // Rec. 709 luma weights, so edge cases can threshold slightly differently than BT.601 grey.
    let gray = imageops::grayscale(&flipped);
    let binary = adaptive_threshold(&gray, THRESHOLD_BLOCK, THRESHOLD_C);
    open_2x2(&binary)
}

/// Gaussian-weighted adaptive threshold. A pixel turns white when it is brighter
/// than its neighbourhood mean minus `c`. Borders are replicated.
pub fn adaptive_threshold(gray: &GrayImage, block: usize, c: i32) -> GrayImage {
    let kernel = gaussian_kernel(block);
    let mean = separable_filter_equal(gray, &kernel);

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0] as i32;
        let local = mean.get_pixel(x, y)[0] as i32;
        if value - local > -c {
            Luma([WHITE])
        } else {
            Luma([BLACK])
        }
    })
}

/// Normalised Gaussian taps with the sigma OpenCV derives from the block size.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Morphological opening with a 2x2 square: erosion over the up-left window,
/// dilation over the mirrored down-right window. Isolated white specks vanish,
/// strokes at least two pixels wide survive in place.
pub fn open_2x2(binary: &GrayImage) -> GrayImage {
    let square = GrayImage::from_pixel(2, 2, Luma([WHITE]));
    let up_left = Mask::from_image(&square, 1, 1);
    let down_right = Mask::from_image(&square, 0, 0);
    grayscale_dilate(&grayscale_erode(binary, &up_left), &down_right)
}
