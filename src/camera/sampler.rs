//! Still-frame sampling
//!
//! Pulls the latest frame from a live stream and encodes it as a JPEG
//! still for upload. Stateless per call: each capture reads whatever the
//! pump last published and never depends on a previous capture.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use thiserror::Error;

use crate::camera::{RawFrame, StreamHandle};

/// Default JPEG quality for sampled stills.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// A JPEG-encoded still ready for upload.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The stream has not produced a usable frame yet (no frame published,
    /// or a zero-dimension frame). Callers should treat this as a skip.
    #[error("no frame ready from the camera stream")]
    NotReady,
    #[error("jpeg encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Sample the stream's current frame as a JPEG still.
pub fn capture(handle: &StreamHandle, quality: u8) -> Result<EncodedFrame, CaptureError> {
    let frame = handle.latest().ok_or(CaptureError::NotReady)?;
    encode_jpeg(&frame, quality)
}

/// Encode one raw RGB frame as JPEG at the given quality.
pub fn encode_jpeg(frame: &RawFrame, quality: u8) -> Result<EncodedFrame, CaptureError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(CaptureError::NotReady);
    }

    let mut out = Vec::with_capacity(frame.data.len() / 8);
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)?;

    Ok(EncodedFrame {
        bytes: Bytes::from(out),
        width: frame.width,
        height: frame.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32) -> RawFrame {
        RawFrame {
            data: Bytes::from(vec![0x7Fu8; (width * height * 3) as usize]),
            width,
            height,
        }
    }

    #[test]
    fn encodes_jpeg_magic_bytes() {
        let encoded = encode_jpeg(&solid_frame(4, 4), DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(encoded.width, 4);
        assert_eq!(encoded.height, 4);
    }

    #[test]
    fn zero_dimension_frame_is_not_ready() {
        let err = encode_jpeg(&solid_frame(0, 4), DEFAULT_JPEG_QUALITY).unwrap_err();
        assert!(matches!(err, CaptureError::NotReady));
    }

    #[tokio::test]
    async fn capture_without_published_frame_is_not_ready() {
        use crate::camera::CameraMode;
        use tokio::sync::{mpsc, watch};

        let (_frame_tx, frame_rx) = watch::channel(None);
        let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
        let handle = StreamHandle::new(CameraMode::Rear, frame_rx, shutdown_tx);

        let err = capture(&handle, DEFAULT_JPEG_QUALITY).unwrap_err();
        assert!(matches!(err, CaptureError::NotReady));
    }
}
