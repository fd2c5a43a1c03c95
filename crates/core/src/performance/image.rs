//! CDN image URL optimization

use bitebase_domain::impl_domain_enum_conversions;

const CLOUDINARY_HOST: &str = "cloudinary.com";
const UPLOAD_SEGMENT: &str = "/upload/";

/// Output format requested from the CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Webp,
    Avif,
    Jpeg,
    Png,
}

impl_domain_enum_conversions!(ImageFormat {
    Webp => "webp",
    Avif => "avif",
    Jpeg => "jpeg",
    Png => "png",
});

/// Transformations applied by [`optimize_image_url`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// Target width in pixels
    pub width: Option<u32>,
    /// Target height in pixels
    pub height: Option<u32>,
    /// Encoder quality, 1 to 100
    pub quality: u8,
    /// Output format
    pub format: ImageFormat,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { width: None, height: None, quality: 80, format: ImageFormat::Webp }
    }
}

/// Rewrite a Cloudinary upload URL with quality, format and size
/// transformations. Other URLs are returned unchanged.
///
/// ```
/// use bitebase_core::performance::{optimize_image_url, ImageOptions};
///
/// let url = "https://res.cloudinary.com/demo/image/upload/v1/pad-thai.jpg";
/// let options = ImageOptions { width: Some(640), ..ImageOptions::default() };
/// assert_eq!(
///     optimize_image_url(url, &options),
///     "https://res.cloudinary.com/demo/image/upload/q_80,f_webp,w_640/v1/pad-thai.jpg"
/// );
/// ```
pub fn optimize_image_url(src: &str, options: &ImageOptions) -> String {
    if !src.contains(CLOUDINARY_HOST) {
        return src.to_string();
    }

    let mut transformations = vec![format!("q_{}", options.quality), format!("f_{}", options.format)];
    if let Some(width) = options.width {
        transformations.push(format!("w_{width}"));
    }
    if let Some(height) = options.height {
        transformations.push(format!("h_{height}"));
    }

    src.replacen(UPLOAD_SEGMENT, &format!("{UPLOAD_SEGMENT}{}/", transformations.join(",")), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_cdn_urls_are_untouched() {
        let url = "https://images.example.com/upload/menu.png";
        assert_eq!(optimize_image_url(url, &ImageOptions::default()), url);
    }

    #[test]
    fn only_first_upload_segment_is_rewritten() {
        let url = "https://res.cloudinary.com/x/image/upload/upload/a.png";
        let options = ImageOptions { height: Some(200), quality: 60, format: ImageFormat::Avif, width: None };

        assert_eq!(
            optimize_image_url(url, &options),
            "https://res.cloudinary.com/x/image/upload/q_60,f_avif,h_200/upload/a.png"
        );
    }
}
