//! Fetching and normalising the image behind a record.

use image::{DynamicImage, RgbaImage, imageops::FilterType};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DISPLAY_SIZE: (u32, u32) = (400, 300);

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("cannot resize a {width}x{height} image to {target_width}x{target_height}")]
    Resize {
        width: u32,
        height: u32,
        target_width: u32,
        target_height: u32,
    },
}

/// True for references that must be fetched over HTTP.
pub fn is_remote(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Loads record images from disk or HTTP and scales them to one display size.
pub struct ImageLoader {
    client: reqwest::blocking::Client,
    width: u32,
    height: u32,
}

impl ImageLoader {
    pub fn new(width: u32, height: u32, timeout: Option<Duration>) -> Result<Self, ImageLoadError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ImageLoadError::Request {
            url: String::new(),
            source,
        })?;
        Ok(Self {
            client,
            width,
            height,
        })
    }

    /// Use a preconfigured HTTP client, e.g. one with custom proxy settings.
    pub fn with_client(client: reqwest::blocking::Client, width: u32, height: u32) -> Self {
        Self {
            client,
            width,
            height,
        }
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Load `reference` and resize it to the display size.
    pub fn load(&self, reference: &str) -> Result<RgbaImage, ImageLoadError> {
        let img = if is_remote(reference) {
            self.fetch(reference.trim())?
        } else {
            let path = PathBuf::from(reference);
            let bytes = std::fs::read(&path)
                .map_err(|source| ImageLoadError::Read { path, source })?;
            image::load_from_memory(&bytes)?
        };
        self.resize(img)
    }

    fn fetch(&self, url: &str) -> Result<DynamicImage, ImageLoadError> {
        let request_error = |source| ImageLoadError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageLoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(request_error)?;
        Ok(image::load_from_memory(&bytes)?)
    }

    fn resize(&self, img: DynamicImage) -> Result<RgbaImage, ImageLoadError> {
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 || self.width == 0 || self.height == 0 {
            return Err(ImageLoadError::Resize {
                width,
                height,
                target_width: self.width,
                target_height: self.height,
            });
        }
        Ok(img
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_rgba8())
    }
}
