//! Conversions between FFmpeg frames, `ndarray` frames, and images.

use ffmpeg_next::frame::Video as VideoFrame;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::Array3;

use crate::configuration::PixelFormat;
use crate::error::FramefoldError;

/// Copy a packed single-plane FFmpeg frame into a tightly-packed buffer,
/// dropping the per-row stride padding FFmpeg usually adds.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Wrap a scaled FFmpeg frame as a `(height, width, channels)` array.
pub(crate) fn frame_to_array(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
) -> Result<Array3<u8>, FramefoldError> {
    let channels = pixel_format.channels();
    let buffer = frame_to_buffer(video_frame, width, height, channels);
    Array3::from_shape_vec((height as usize, width as usize, channels), buffer)
        .map_err(|error| FramefoldError::FrameConversion(error.to_string()))
}

/// Convert a `(height, width, channels)` frame back into an image.
///
/// The channel count selects the image type: 1 → grayscale, 3 → RGB,
/// 4 → RGBA.
///
/// # Errors
///
/// Returns [`FramefoldError::FrameConversion`] for any other channel count.
pub fn array_to_image(frame: &Array3<u8>) -> Result<DynamicImage, FramefoldError> {
    let (height, width, channels) = frame.dim();
    let pixels: Vec<u8> = frame.iter().copied().collect();
    let (width, height) = (width as u32, height as u32);

    let image = match channels {
        1 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
        other => {
            return Err(FramefoldError::FrameConversion(format!(
                "unsupported channel count {other}"
            )));
        }
    };

    image.ok_or_else(|| {
        FramefoldError::FrameConversion(format!(
            "buffer does not fit a {width}x{height} image with {channels} channels"
        ))
    })
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::array_to_image;

    #[test]
    fn rgb_frame_becomes_rgb_image() {
        let frame = Array3::<u8>::zeros((2, 3, 3));
        let image = array_to_image(&frame).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert!(image.as_rgb8().is_some());
    }

    #[test]
    fn two_channel_frame_is_rejected() {
        let frame = Array3::<u8>::zeros((2, 2, 2));
        assert!(array_to_image(&frame).is_err());
    }
}
