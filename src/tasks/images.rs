//! Responsive raster variants.
//!
//! One variant task resamples every source of an asset group to a single
//! width and writes it either re-encoded in its own format or as WebP.

use super::{ensure_dir, TaskError, TaskOutput};
use crate::build::{discover_files, VariantEncoding, VariantSpec};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Encoder settings shared by every variant task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// Lossy WebP quality, 1-100
    pub webp_quality: u8,
    /// Resample sources narrower than the target width
    pub upscale: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { jpeg_quality: 80, webp_quality: 75, upscale: true }
    }
}

/// Output file name for a variant: `{stem}-{width}.{ext}` for optimized
/// variants, `{stem}-{width}.webp` for WebP.
pub fn variant_file_name(source: &Path, width: u32, encoding: VariantEncoding) -> String {
    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = match encoding {
        VariantEncoding::WebP => "webp".to_string(),
        VariantEncoding::Optimized => {
            source.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default()
        }
    };

    if ext.is_empty() {
        format!("{}-{}", stem, width)
    } else {
        format!("{}-{}.{}", stem, width, ext)
    }
}

/// Resample `image` to `width`, keeping its aspect ratio.
///
/// Height is `round(h * width / w)`, at least one pixel. Without `upscale`,
/// images already at most `width` wide are returned unchanged.
pub fn resize_to_width(image: &DynamicImage, width: u32, upscale: bool) -> DynamicImage {
    let (src_width, src_height) = (image.width(), image.height());

    if src_width == width || (!upscale && src_width < width) || src_width == 0 {
        return image.clone();
    }

    let height = (src_height as f64 * width as f64 / src_width as f64).round().max(1.0) as u32;
    image.resize_exact(width, height, FilterType::Lanczos3)
}

#[derive(Debug, Clone, Copy)]
enum OutputCodec {
    Jpeg,
    Png,
    WebP,
}

fn output_codec(
    source: &Path,
    format: ImageFormat,
    encoding: VariantEncoding,
) -> Result<OutputCodec, TaskError> {
    match (encoding, format) {
        (VariantEncoding::WebP, _) => Ok(OutputCodec::WebP),
        (VariantEncoding::Optimized, ImageFormat::Jpeg) => Ok(OutputCodec::Jpeg),
        (VariantEncoding::Optimized, ImageFormat::Png) => Ok(OutputCodec::Png),
        (VariantEncoding::Optimized, _) => Err(TaskError::UnsupportedFormat(source.to_path_buf())),
    }
}

fn encode(
    image: &DynamicImage,
    codec: OutputCodec,
    options: &EncodeOptions,
    dest: &Path,
) -> Result<(), TaskError> {
    let file = File::create(dest).map_err(TaskError::io(dest))?;
    let mut writer = BufWriter::new(file);
    let image_error = |e: image::ImageError| TaskError::Image { path: dest.to_path_buf(), source: e };

    match codec {
        OutputCodec::WebP => {
            let (width, height) = (image.width(), image.height());
            let encoded = if image.color().has_alpha() {
                let pixels = image.to_rgba8();
                webp::Encoder::from_rgba(pixels.as_raw(), width, height)
                    .encode_simple(false, f32::from(options.webp_quality))
            } else {
                let pixels = image.to_rgb8();
                webp::Encoder::from_rgb(pixels.as_raw(), width, height)
                    .encode_simple(false, f32::from(options.webp_quality))
            }
            .map_err(|e| TaskError::WebPEncode { path: dest.to_path_buf(), reason: format!("{:?}", e) })?;
            writer.write_all(&encoded).map_err(TaskError::io(dest))?;
        }
        OutputCodec::Jpeg => {
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, options.jpeg_quality))
                .map_err(image_error)?;
        }
        OutputCodec::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut writer,
                CompressionType::Best,
                PngFilterType::Adaptive,
            );
            image.write_with_encoder(encoder).map_err(image_error)?;
        }
    }

    writer.flush().map_err(TaskError::io(dest))
}

/// Produce one variant per source file matching `source_glob`.
///
/// A glob matching nothing yields no outputs. Any undecodable source fails
/// the whole task.
pub fn build_variants(
    root: &Path,
    spec: &VariantSpec,
    source_glob: &str,
    dest_dir: &Path,
    options: &EncodeOptions,
) -> Result<TaskOutput, TaskError> {
    let sources = discover_files(root, source_glob)?;
    if sources.is_empty() {
        tracing::debug!(group = %spec.group, pattern = source_glob, "no images matched");
        return Ok(TaskOutput::default());
    }

    ensure_dir(dest_dir)?;

    let mut outputs: Vec<PathBuf> = Vec::with_capacity(sources.len());
    for source in &sources {
        let format = ImageFormat::from_path(source)
            .map_err(|e| TaskError::Image { path: source.clone(), source: e })?;
        let codec = output_codec(source, format, spec.encoding)?;
        let image =
            image::open(source).map_err(|e| TaskError::Image { path: source.clone(), source: e })?;

        let resized = resize_to_width(&image, spec.width, options.upscale);
        let dest = dest_dir.join(variant_file_name(source, spec.width, spec.encoding));
        encode(&resized, codec, options, &dest)?;

        tracing::debug!(
            source = %source.display(),
            dest = %dest.display(),
            width = resized.width(),
            height = resized.height(),
            "wrote variant"
        );
        outputs.push(dest);
    }

    Ok(TaskOutput::files(outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn spec(width: u32, encoding: VariantEncoding) -> VariantSpec {
        VariantSpec { group: "main".to_string(), width, encoding }
    }

    fn write_photo(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_variant_file_name() {
        let source = Path::new("src/assets/images/photo.jpg");
        assert_eq!(variant_file_name(source, 576, VariantEncoding::Optimized), "photo-576.jpg");
        assert_eq!(variant_file_name(source, 576, VariantEncoding::WebP), "photo-576.webp");
        assert_eq!(
            variant_file_name(Path::new("logo.PNG"), 100, VariantEncoding::Optimized),
            "logo-100.PNG"
        );
    }

    #[test]
    fn test_resize_keeps_aspect_ratio() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(1600, 900));
        let resized = resize_to_width(&image, 576, true);
        assert_eq!((resized.width(), resized.height()), (576, 324));
    }

    #[test]
    fn test_resize_height_never_zero() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(1000, 1));
        let resized = resize_to_width(&image, 100, true);
        assert_eq!((resized.width(), resized.height()), (100, 1));
    }

    #[test]
    fn test_resize_upscale_policy() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(80, 40));

        let up = resize_to_width(&image, 200, true);
        assert_eq!((up.width(), up.height()), (200, 100));

        let kept = resize_to_width(&image, 200, false);
        assert_eq!((kept.width(), kept.height()), (80, 40));
    }

    #[test]
    fn test_build_variants_jpeg_and_webp() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("images");
        fs_create(&src);
        write_photo(&src.join("photo.jpg"), 1600, 900);
        let dest = temp.path().join("dist/images");
        let options = EncodeOptions::default();

        let optimized = build_variants(
            temp.path(),
            &spec(768, VariantEncoding::Optimized),
            "images/*.{jpg,jpeg,png}",
            &dest,
            &options,
        )
        .unwrap();
        let webp = build_variants(
            temp.path(),
            &spec(768, VariantEncoding::WebP),
            "images/*.{jpg,jpeg,png}",
            &dest,
            &options,
        )
        .unwrap();

        assert_eq!(optimized.outputs, vec![dest.join("photo-768.jpg")]);
        assert_eq!(webp.outputs, vec![dest.join("photo-768.webp")]);
        assert_eq!(image::image_dimensions(dest.join("photo-768.jpg")).unwrap(), (768, 432));
        assert_eq!(image::image_dimensions(dest.join("photo-768.webp")).unwrap(), (768, 432));
        assert_eq!(ImageFormat::from_path(dest.join("photo-768.webp")).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_build_variants_png_with_alpha() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("logo");
        fs_create(&src);
        let logo = RgbaImage::from_fn(400, 200, |x, _| Rgba([255, 0, 0, (x % 256) as u8]));
        logo.save(src.join("logo.png")).unwrap();
        let dest = temp.path().join("dist/images/logo");
        let options = EncodeOptions::default();

        for encoding in [VariantEncoding::Optimized, VariantEncoding::WebP] {
            build_variants(temp.path(), &spec(100, encoding), "logo/*.png", &dest, &options).unwrap();
        }

        let png = image::open(dest.join("logo-100.png")).unwrap();
        assert_eq!((png.width(), png.height()), (100, 50));
        assert!(png.color().has_alpha());
        let webp = image::open(dest.join("logo-100.webp")).unwrap();
        assert_eq!((webp.width(), webp.height()), (100, 50));
    }

    #[test]
    fn test_webp_variant_is_lossy() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("images");
        fs_create(&src);
        // Noise defeats lossless prediction, so only a lossy encoder stays small
        let mut state: u32 = 0x2545_f491;
        let noisy = RgbImage::from_fn(400, 300, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        });
        noisy.save(src.join("noise.png")).unwrap();
        let dest = temp.path().join("dist");
        let options = EncodeOptions::default();

        for encoding in [VariantEncoding::Optimized, VariantEncoding::WebP] {
            build_variants(temp.path(), &spec(400, encoding), "images/*.png", &dest, &options).unwrap();
        }

        let png_len = std::fs::metadata(dest.join("noise-400.png")).unwrap().len();
        let webp_len = std::fs::metadata(dest.join("noise-400.webp")).unwrap().len();
        assert!(webp_len * 2 < png_len, "webp {} bytes vs png {} bytes", webp_len, png_len);
        assert_eq!(image::image_dimensions(dest.join("noise-400.webp")).unwrap(), (400, 300));
    }

    #[test]
    fn test_webp_quality_controls_size() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("images");
        fs_create(&src);
        write_photo(&src.join("photo.jpg"), 800, 600);

        let mut sizes = Vec::new();
        for quality in [10u8, 95] {
            let dest = temp.path().join(format!("q{}", quality));
            let options = EncodeOptions { webp_quality: quality, ..EncodeOptions::default() };
            build_variants(temp.path(), &spec(800, VariantEncoding::WebP), "images/*.jpg", &dest, &options)
                .unwrap();
            sizes.push(std::fs::metadata(dest.join("photo-800.webp")).unwrap().len());
        }
        assert!(sizes[0] < sizes[1], "q10 {} bytes vs q95 {} bytes", sizes[0], sizes[1]);
    }

    #[test]
    fn test_build_variants_no_sources() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dist/images");
        let output = build_variants(
            temp.path(),
            &spec(576, VariantEncoding::WebP),
            "images/*.{jpg,png}",
            &dest,
            &EncodeOptions::default(),
        )
        .unwrap();
        assert!(output.outputs.is_empty());
    }

    #[test]
    fn test_build_variants_corrupt_source_fails() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("images");
        fs_create(&src);
        std::fs::write(src.join("broken.jpg"), b"definitely not a jpeg").unwrap();

        let result = build_variants(
            temp.path(),
            &spec(576, VariantEncoding::Optimized),
            "images/*.jpg",
            &temp.path().join("dist"),
            &EncodeOptions::default(),
        );
        assert!(matches!(result, Err(TaskError::Image { .. })));
    }

    fn fs_create(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
    }
}
