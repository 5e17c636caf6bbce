// Image size probing for layout. Raster formats are sized from their
// header; SVG sizes come from the root element's attributes.

use crate::layout::ImageProbe;
use crate::parser::html::tokenizer::{Token, Tokenizer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes read to tell SVG apart from raster data.
const SNIFF_LEN: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
    WebP,
    Svg,
    Bmp,
    Ico,
    Unknown,
}

pub fn detect_from_magic_bytes(data: &[u8]) -> ImageType {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return ImageType::Png;
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return ImageType::Jpeg;
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return ImageType::Gif;
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return ImageType::WebP;
    }
    if data.starts_with(b"BM") {
        return ImageType::Bmp;
    }
    if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return ImageType::Ico;
    }

    let head = String::from_utf8_lossy(&data[..data.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return ImageType::Svg;
    }
    ImageType::Unknown
}

/// Width of an SVG document: the `width` attribute of the root element,
/// else the third `viewBox` number.
pub fn svg_width(svg: &str) -> Option<u32> {
    let mut tokenizer = Tokenizer::new(svg);
    while let Some(token) = tokenizer.next_token() {
        match token {
            Token::StartTag { name, attributes, .. } if name == "svg" => {
                let attr = |key: &str| {
                    attributes
                        .iter()
                        .find(|a| a.name == key)
                        .map(|a| a.value.as_str())
                };
                if let Some(width) = attr("width").and_then(leading_number) {
                    return Some(width.round() as u32);
                }
                let view_box: Vec<f32> = attr("viewbox")?
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter_map(|s| s.parse().ok())
                    .collect();
                return view_box.get(2).map(|w| w.round() as u32);
            }
            Token::Eof => break,
            _ => {}
        }
    }
    None
}

/// `"120px"` -> 120. Percentages have no intrinsic meaning.
fn leading_number(value: &str) -> Option<f32> {
    let value = value.trim();
    if value.ends_with('%') {
        return None;
    }
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Reads image sizes from files under a base directory. Remote and
/// `data:` sources are not probed.
#[derive(Debug, Clone)]
pub struct FileProbe {
    base_dir: PathBuf,
}

impl FileProbe {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, src: &str) -> Option<PathBuf> {
        let remote = src.contains("://") || src.starts_with("//") || src.starts_with("data:");
        if src.is_empty() || remote {
            return None;
        }
        let path = src.split(['?', '#']).next()?;
        Some(self.base_dir.join(path.trim_start_matches('/')))
    }
}

fn sniff(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::new();
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
    Ok(head)
}

fn raster_width(path: &Path) -> ::image::ImageResult<u32> {
    let (width, _) = ::image::io::Reader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(width)
}

impl ImageProbe for FileProbe {
    fn intrinsic_width(&self, src: &str) -> Option<u32> {
        let path = self.resolve(src)?;
        let head = match sniff(&path) {
            Ok(head) => head,
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "image not readable");
                return None;
            }
        };

        let svg_extension = path.extension().map_or(false, |e| e.eq_ignore_ascii_case("svg"));
        if svg_extension || detect_from_magic_bytes(&head) == ImageType::Svg {
            let svg = std::fs::read_to_string(&path).ok()?;
            return svg_width(&svg);
        }
        match raster_width(&path) {
            Ok(width) => Some(width),
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "unrecognised image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_from_magic_bytes() {
        assert_eq!(detect_from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]), ImageType::Png);
        assert_eq!(detect_from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageType::Jpeg);
        assert_eq!(detect_from_magic_bytes(b"GIF89aXXX"), ImageType::Gif);
        assert_eq!(detect_from_magic_bytes(b"RIFF\x00\x00\x00\x00WEBP"), ImageType::WebP);
        assert_eq!(detect_from_magic_bytes(b"  <svg xmlns=\"x\">"), ImageType::Svg);
        assert_eq!(detect_from_magic_bytes(b"hello"), ImageType::Unknown);
    }

    #[test]
    fn reads_svg_width() {
        assert_eq!(svg_width(r#"<svg width="120px" height="10"></svg>"#), Some(120));
        assert_eq!(svg_width(r#"<?xml version="1.0"?><svg viewBox="0 0 100 50"></svg>"#), Some(100));
        assert_eq!(svg_width(r#"<svg width="50%"></svg>"#), None);
    }

    #[test]
    fn probes_png_header() {
        let dir = tempfile::tempdir().unwrap();
        ::image::RgbaImage::new(37, 5).save(dir.path().join("a.png")).unwrap();

        let probe = FileProbe::new(dir.path());
        assert_eq!(probe.intrinsic_width("a.png"), Some(37));
        assert_eq!(probe.intrinsic_width("/a.png?v=2"), Some(37));
        assert_eq!(probe.intrinsic_width("missing.png"), None);
        assert_eq!(probe.intrinsic_width("https://cdn.example.com/a.png"), None);
    }

    #[test]
    fn sizes_svg_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("icon.svg"), r#"<svg viewBox="0 0 24 24"></svg>"#).unwrap();
        std::fs::write(dir.path().join("logo"), r#"<svg width="64" height="8"></svg>"#).unwrap();

        let probe = FileProbe::new(dir.path());
        assert_eq!(probe.intrinsic_width("icon.svg"), Some(24));
        assert_eq!(probe.intrinsic_width("logo"), Some(64));
    }
}
