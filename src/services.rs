//! Narrow seams to the window system, the image codecs and the trash.

use std::path::Path;
use std::time::Duration;

use image::RgbaImage;

use crate::error::Error;
use crate::processing::resize::resize_rgba;

/// One frame of a decoded image.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    /// How long the frame stays up before the next one; zero for stills.
    pub delay: Duration,
}

/// A decoded, orientation-corrected image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Never empty. More than one entry means an animation.
    pub frames: Vec<Frame>,
    /// EXIF orientation found in the file (1 when absent); already applied.
    pub orientation: u16,
}

impl DecodedImage {
    /// Wrap a single still frame.
    #[must_use]
    pub fn still(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            frames: vec![Frame {
                image,
                delay: Duration::ZERO,
            }],
            orientation: 1,
        }
    }

    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// The window the slideshow draws into.
pub trait Screen {
    fn set_title(&mut self, title: &str);
    /// Replace whatever is on screen with `image`, centred.
    fn present(&mut self, image: &RgbaImage);
    fn set_fullscreen(&mut self, fullscreen: bool);
    /// Resolution of the display the window is on, if known.
    fn monitor_size(&self) -> Option<(u32, u32)>;
}

/// Image decoding and resampling.
pub trait ImageService {
    /// # Errors
    /// Returns [`Error::Decode`] when the file cannot be read as an image.
    fn decode(&mut self, path: &Path) -> Result<DecodedImage, Error>;

    /// # Errors
    /// Returns [`Error::Render`] if resampling fails.
    fn resize(&mut self, frame: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, Error> {
        resize_rgba(frame, width, height).map_err(Error::Render)
    }
}

/// Removal of files and whole directories.
pub trait Trash {
    /// Delete `path`; directories are removed recursively.
    ///
    /// # Errors
    /// Any failure leaves the caller's state untouched.
    fn delete(&mut self, path: &Path) -> std::io::Result<()>;
}

impl<T: Trash + ?Sized> Trash for Box<T> {
    fn delete(&mut self, path: &Path) -> std::io::Result<()> {
        (**self).delete(path)
    }
}
