use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use tracing::debug;

use crate::error::Error;
use crate::services::{DecodedImage, Frame, ImageService};

/// GIF frames that declare no delay are shown this long, as browsers do.
const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Synchronous decoder backed by the `image` crate.
#[derive(Debug, Default)]
pub struct ImageLoader;

impl ImageService for ImageLoader {
    fn decode(&mut self, path: &Path) -> Result<DecodedImage, Error> {
        let reader = image::ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| Error::decode(path, e))?;
        if reader.format() == Some(ImageFormat::Gif) {
            return decode_gif(path);
        }
        let img = reader.decode().map_err(|e| Error::decode(path, e))?;
        let orientation = read_orientation(path).unwrap_or(1);
        let img = apply_orientation(img.to_rgba8(), orientation);
        let mut decoded = DecodedImage::still(img);
        decoded.orientation = orientation;
        debug!(path = %path.display(), width = decoded.width, height = decoded.height, orientation, "decoded");
        Ok(decoded)
    }
}

fn decode_gif(path: &Path) -> Result<DecodedImage, Error> {
    let file = File::open(path).map_err(|e| Error::decode(path, e))?;
    let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| Error::decode(path, e))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| Error::decode(path, e))?;
    let frames: Vec<Frame> = frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let ms = if denom == 0 { 0 } else { numer / denom };
            let delay = if ms == 0 {
                DEFAULT_FRAME_DELAY
            } else {
                Duration::from_millis(u64::from(ms))
            };
            Frame {
                image: frame.into_buffer(),
                delay,
            }
        })
        .collect();
    let Some(first) = frames.first() else {
        return Err(Error::decode(path, "gif has no frames"));
    };
    let (width, height) = first.image.dimensions();
    debug!(path = %path.display(), frames = frames.len(), "decoded animation");
    Ok(DecodedImage {
        width,
        height,
        frames,
        orientation: 1,
    })
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let val = field.value.get_uint(0)?;
    u16::try_from(val).ok()
}

/// Rotate/flip `img` so it displays upright for EXIF `orientation`.
#[must_use]
pub fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        // transpose
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        // transverse
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba};

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    #[test]
    fn applies_orientation_six() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orient6.jpg");
        std::fs::write(&path, &bytes).unwrap();
        let img = ImageLoader.decode(&path).unwrap();
        assert_eq!((img.width, img.height), (1, 2));
        assert_eq!(img.orientation, 6);
        assert!(!img.is_animated());
    }

    #[test]
    fn decodes_gif_frames_with_delays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = GifEncoder::new(file);
            let frames = [Rgba([255, 0, 0, 255]), Rgba([0, 0, 255, 255])].map(|px| {
                image::Frame::from_parts(
                    RgbaImage::from_pixel(3, 2, px),
                    0,
                    0,
                    Delay::from_numer_denom_ms(50, 1),
                )
            });
            encoder.encode_frames(frames).unwrap();
        }
        let img = ImageLoader.decode(&path).unwrap();
        assert!(img.is_animated());
        assert_eq!(img.frames.len(), 2);
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.frames[0].delay, Duration::from_millis(50));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = ImageLoader.decode(&path).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn orientation_three_rotates_half_turn() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([1, 0, 0, 255]));
        let out = apply_orientation(img, 3);
        assert_eq!(out.get_pixel(1, 0)[0], 1);
    }
}
