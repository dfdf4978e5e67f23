use std::io::Cursor;
use std::path::Path;

use image::{GenericImageView, ImageFormat, ImageResult};
use rand::RngCore;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Profile pictures are shrunk to fit this square.
pub const THUMBNAIL_SIZE: u32 = 125;

/// Lowercased extension of an uploaded file name, if it is one we accept.
pub fn picture_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// An uploaded picture, decoded, shrunk and re-encoded in the format it arrived in.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl Thumbnail {
    /// Fails on anything that isn't a PNG or JPEG image, whatever its name says.
    pub fn from_upload(data: &[u8]) -> ImageResult<Self> {
        let format = image::guess_format(data)?;
        let picture = image::load_from_memory_with_format(data, format)?;
        let (width, height) = picture.dimensions();
        let thumb = if width > THUMBNAIL_SIZE || height > THUMBNAIL_SIZE {
            picture.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
        } else {
            picture
        };

        let mut bytes = Cursor::new(Vec::new());
        thumb.write_to(&mut bytes, format)?;
        Ok(Self {
            format,
            bytes: bytes.into_inner(),
        })
    }

    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpg",
            _ => "png",
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Stores the thumbnail under a random name and returns that name.
pub async fn save_picture(dir: &Path, thumbnail: &Thumbnail) -> anyhow::Result<String> {
    let mut random = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut random);
    let file_name = format!("{}.{}", hex::encode(random), thumbnail.extension());

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&file_name), thumbnail.bytes()).await?;
    tracing::info!(%file_name, size = thumbnail.bytes().len(), "saved profile picture");

    Ok(file_name)
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let picture = image::RgbImage::from_pixel(width, height, image::Rgb([95, 120, 138]));
    let mut bytes = Cursor::new(Vec::new());
    picture.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}
