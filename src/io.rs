use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageError, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::canvas::{Layer, PixelBuffer, TRANSPARENT, WHITE};
use crate::components::colors::{Palette, PaletteEntry};
use crate::components::layers::LayerStack;
use crate::ops::composite::{flatten, flatten_onto};
use crate::project::Document;

// ============================================================================
// PROJECT PACKAGE FORMAT (.ddp)
// ============================================================================
//
// A zip archive holding:
//   project.json     canvas size, per-layer flags, palette
//   layer_<i>.png    one lossless RGBA raster per layer, i = paint order

pub const PROJECT_EXTENSION: &str = "ddp";
pub const METADATA_ENTRY: &str = "project.json";
pub const FORMAT_VERSION: u32 = 1;
/// Quality used for lossy (JPEG) export.
pub const EXPORT_JPEG_QUALITY: u8 = 95;

/// Maximum supported canvas dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted project files.
const MAX_CANVAS_DIM: u32 = 32_768;
/// Maximum number of layers in a project file.
const MAX_LAYERS: usize = 256;

/// Error type for project package and export operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] ZipError),
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("Package has no {METADATA_ENTRY} entry")]
    MissingMetadata,
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Serializable metadata entry of a project package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub layers: Vec<LayerMeta>,
    #[serde(default)]
    pub palette: Vec<PaletteEntry>,
}

/// Per-layer flags stored in the metadata entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerMeta {
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub opacity: f32,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

impl ProjectDocument {
    pub fn describe(doc: &Document) -> Self {
        Self {
            version: FORMAT_VERSION,
            canvas_width: doc.width(),
            canvas_height: doc.height(),
            layers: doc
                .layers
                .layers()
                .iter()
                .map(|l| LayerMeta {
                    name: l.name.clone(),
                    visible: l.visible,
                    locked: l.locked,
                    opacity: l.opacity,
                })
                .collect(),
            palette: doc.palette.to_entries(),
        }
    }

    fn validate(&self) -> Result<(), ProjectError> {
        if self.version > FORMAT_VERSION {
            return Err(ProjectError::InvalidFormat(format!(
                "Format version {} is newer than supported version {}",
                self.version, FORMAT_VERSION
            )));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ProjectError::InvalidFormat(
                "Canvas dimensions cannot be zero".into(),
            ));
        }
        if self.canvas_width > MAX_CANVAS_DIM || self.canvas_height > MAX_CANVAS_DIM {
            return Err(ProjectError::InvalidFormat(format!(
                "Canvas size {}x{} exceeds maximum allowed {}x{}",
                self.canvas_width, self.canvas_height, MAX_CANVAS_DIM, MAX_CANVAS_DIM
            )));
        }
        if self.layers.is_empty() {
            return Err(ProjectError::InvalidFormat("Project contains no layers".into()));
        }
        if self.layers.len() > MAX_LAYERS {
            return Err(ProjectError::InvalidFormat(format!(
                "Project contains {} layers, which exceeds the maximum of {}",
                self.layers.len(),
                MAX_LAYERS
            )));
        }
        Ok(())
    }
}

/// Archive entry name of the raster for layer `index`.
pub fn layer_entry_name(index: usize) -> String {
    format!("layer_{index}.png")
}

/// Inverse of [`layer_entry_name`].
pub fn parse_layer_entry_name(name: &str) -> Option<usize> {
    name.strip_prefix("layer_")?.strip_suffix(".png")?.parse().ok()
}

// ============================================================================
// SAVE
// ============================================================================

/// Write `doc` as a project package into any seekable writer.
pub fn write_project<W: Write + Seek>(doc: &Document, writer: W) -> Result<W, ProjectError> {
    let mut zip = ZipWriter::new(writer);

    let meta = ProjectDocument::describe(doc);
    zip.start_file(METADATA_ENTRY, SimpleFileOptions::default())?;
    serde_json::to_writer_pretty(&mut zip, &meta)?;

    for (index, layer) in doc.layers.layers().iter().enumerate() {
        // PNG data is already compressed
        zip.start_file(
            layer_entry_name(index),
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )?;
        let pixels = &layer.pixels;
        PngEncoder::new(&mut zip).write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            image::ColorType::Rgba8,
        )?;
    }

    Ok(zip.finish()?)
}

/// Save a project package to `path`.
///
/// The package is written next to the destination and renamed into place,
/// so a failed save leaves any existing file untouched.
pub fn save_project(doc: &Document, path: &Path) -> Result<(), ProjectError> {
    let tmp_path = path.with_extension(format!("{PROJECT_EXTENSION}.tmp"));
    let result = File::create(&tmp_path)
        .map_err(ProjectError::from)
        .and_then(|file| write_project(doc, BufWriter::new(file)))
        .and_then(|writer| writer.into_inner().map_err(|e| ProjectError::Io(e.into_error())))
        .and_then(|file| file.sync_all().map_err(ProjectError::from));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        log::error!("Failed to save project {}: {}", path.display(), e);
        return Err(e);
    }
    std::fs::rename(&tmp_path, path)?;
    log::info!(
        "Saved project {} ({} layers, {}x{})",
        path.display(),
        doc.layers.len(),
        doc.width(),
        doc.height()
    );
    Ok(())
}

// ============================================================================
// LOAD
// ============================================================================

/// What `inspect_package` reports without decoding any raster.
#[derive(Clone, Debug, PartialEq)]
pub struct PackageSummary {
    pub metadata: ProjectDocument,
    /// Indices of `layer_<i>.png` entries no metadata layer refers to.
    pub stray_layers: Vec<usize>,
}

/// Read the metadata entry of a package and list its unused raster entries.
pub fn inspect_package<R: Read + Seek>(reader: R) -> Result<PackageSummary, ProjectError> {
    let mut archive = ZipArchive::new(reader)?;
    let metadata = read_metadata_entry(&mut archive)?;
    let stray_layers = stray_layer_entries(archive.file_names(), metadata.layers.len());
    Ok(PackageSummary {
        metadata,
        stray_layers,
    })
}

/// Sorted indices of layer entries at or past `layer_count`.
pub fn stray_layer_entries<'a>(names: impl IntoIterator<Item = &'a str>, layer_count: usize) -> Vec<usize> {
    let mut stray: Vec<usize> = names
        .into_iter()
        .filter_map(parse_layer_entry_name)
        .filter(|&index| index >= layer_count)
        .collect();
    stray.sort_unstable();
    stray
}

fn read_metadata_entry<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<ProjectDocument, ProjectError> {
    let mut json = String::new();
    match archive.by_name(METADATA_ENTRY) {
        Ok(mut entry) => {
            entry.read_to_string(&mut json)?;
        }
        Err(ZipError::FileNotFound) => return Err(ProjectError::MissingMetadata),
        Err(e) => return Err(e.into()),
    }
    let meta: ProjectDocument = serde_json::from_str(&json)?;
    meta.validate()?;
    Ok(meta)
}

/// Read a project package from any seekable reader.
///
/// A layer whose raster entry is missing loads as a blank layer; every
/// other defect fails the whole load.
pub fn read_project<R: Read + Seek>(reader: R) -> Result<Document, ProjectError> {
    let mut archive = ZipArchive::new(reader)?;
    let meta = read_metadata_entry(&mut archive)?;
    let (w, h) = (meta.canvas_width, meta.canvas_height);
    let stray = stray_layer_entries(archive.file_names(), meta.layers.len());
    if !stray.is_empty() {
        log::warn!("Ignoring layer entries with no metadata: {:?}", stray);
    }

    let mut layers = Vec::with_capacity(meta.layers.len());
    for (index, lm) in meta.layers.iter().enumerate() {
        let entry_name = layer_entry_name(index);
        let mut bytes = Vec::new();
        let found = match archive.by_name(&entry_name) {
            Ok(mut entry) => {
                entry.read_to_end(&mut bytes)?;
                true
            }
            Err(ZipError::FileNotFound) => false,
            Err(e) => return Err(e.into()),
        };

        let pixels = if found {
            let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8();
            if img.width() != w || img.height() != h {
                return Err(ProjectError::InvalidFormat(format!(
                    "Layer '{}' is {}x{}, expected {}x{}",
                    lm.name,
                    img.width(),
                    img.height(),
                    w,
                    h
                )));
            }
            PixelBuffer::from_rgba_image(img)
        } else {
            log::warn!("Layer '{}' has no {} entry, loading it blank", lm.name, entry_name);
            PixelBuffer::new_filled(w, h, LayerStack::blank_fill_for(index))
        };

        let mut layer = Layer::new(lm.name.clone(), w, h, TRANSPARENT);
        layer.visible = lm.visible;
        layer.locked = lm.locked;
        layer.set_opacity(lm.opacity);
        layer.pixels = pixels;
        layers.push(layer);
    }

    let active = 1.min(layers.len() - 1);
    Ok(Document {
        layers: LayerStack::from_layers(w, h, layers, active),
        palette: Palette::from_entries(&meta.palette),
    })
}

/// Load a project package from `path`.
pub fn load_project(path: &Path) -> Result<Document, ProjectError> {
    let file = File::open(path)?;
    let doc = read_project(BufReader::new(file)).inspect_err(|e| {
        log::error!("Failed to load project {}: {}", path.display(), e);
    })?;
    log::info!(
        "Loaded project {} ({} layers, {}x{})",
        path.display(),
        doc.layers.len(),
        doc.width(),
        doc.height()
    );
    Ok(doc)
}

// ============================================================================
// EXPORT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Lossless RGBA.
    Png,
    /// Opaque, flattened onto white.
    Jpeg,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Encode an RGBA image into `writer`. JPEG output is composited onto an
/// opaque white background first.
pub fn encode_image<W: Write>(
    image: &PixelBuffer,
    writer: &mut W,
    format: ExportFormat,
    quality: u8,
) -> Result<(), ImageError> {
    match format {
        ExportFormat::Png => {
            PngEncoder::new(writer).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        ExportFormat::Jpeg => {
            let rgb_image = flatten_onto(image, WHITE);
            let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
    }
    Ok(())
}

/// Encode and write an image to a file.
pub fn encode_and_write(image: &PixelBuffer, path: &Path, format: ExportFormat, quality: u8) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_image(image, &mut writer, format, quality)?;
    writer.flush()?;
    Ok(())
}

/// Flatten the visible layers and write them as a single image.
pub fn export_flattened(layers: &LayerStack, path: &Path, format: ExportFormat, quality: u8) -> Result<(), ProjectError> {
    let image = flatten(layers.layers(), layers.width(), layers.height());
    encode_and_write(&image, path, format, quality)?;
    log::info!("Exported {} ({:?}, {}x{})", path.display(), format, image.width(), image.height());
    Ok(())
}

/// Decode any image the `image` crate understands into an RGBA buffer.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BLACK;
    use image::Rgba;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn sample_document() -> Document {
        let mut layers = LayerStack::new(64, 64);
        layers.add("LAYER 1");
        layers.active_layer_mut().pixels.set(5, 5, RED);
        Document {
            layers,
            palette: Palette::new(vec![BLACK, WHITE]),
        }
    }

    fn package(doc: &Document) -> Vec<u8> {
        write_project(doc, Cursor::new(Vec::new())).unwrap().into_inner()
    }

    /// Build a package by hand with arbitrary entries.
    fn raw_package(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn round_trip_in_memory() {
        let doc = sample_document();
        let loaded = read_project(Cursor::new(package(&doc))).unwrap();

        assert_eq!(ProjectDocument::describe(&loaded), ProjectDocument::describe(&doc));
        assert_eq!(loaded.layers.get(1).unwrap().pixels.get(5, 5), RED);
        assert_eq!(loaded.layers.get(0).unwrap().pixels, doc.layers.get(0).unwrap().pixels);
        assert_eq!(loaded.layers.active_index(), 1);
    }

    #[test]
    fn flags_survive_round_trip() {
        let mut doc = sample_document();
        doc.layers.add("hidden");
        doc.layers.toggle_visibility(2);
        doc.layers.toggle_lock();
        doc.layers.set_opacity(2, 0.25);

        let loaded = read_project(Cursor::new(package(&doc))).unwrap();
        let layer = loaded.layers.get(2).unwrap();
        assert_eq!(layer.name, "hidden");
        assert!(!layer.visible);
        assert!(layer.locked);
        assert_eq!(layer.opacity, 0.25);
    }

    #[test]
    fn entry_names_encode_index() {
        assert_eq!(layer_entry_name(12), "layer_12.png");
        assert_eq!(parse_layer_entry_name("layer_12.png"), Some(12));
        assert_eq!(parse_layer_entry_name("layer_x.png"), None);
        assert_eq!(parse_layer_entry_name(METADATA_ENTRY), None);
    }

    #[test]
    fn stray_layer_entries_are_reported_and_ignored() {
        let meta = br#"{"canvas_width": 2, "canvas_height": 2,
            "layers": [{"name": "BACKGROUND", "visible": true, "locked": false, "opacity": 1.0}]}"#;
        let bytes = raw_package(&[
            (METADATA_ENTRY, meta),
            ("layer_3.png", b"orphan"),
            ("layer_1.png", b"orphan"),
            ("notes.txt", b"x"),
        ]);

        let summary = inspect_package(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(summary.metadata.layers.len(), 1);
        assert_eq!(summary.stray_layers, vec![1, 3]);

        let doc = read_project(Cursor::new(bytes)).unwrap();
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(stray_layer_entries(["layer_0.png", "layer_2.png"], 2), vec![2]);
    }

    #[test]
    fn missing_metadata_is_structural_error() {
        let bytes = raw_package(&[("layer_0.png", b"not used")]);
        let err = read_project(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ProjectError::MissingMetadata), "{err}");
    }

    #[test]
    fn missing_raster_loads_blank_layer() {
        let meta = br#"{
            "canvas_width": 4,
            "canvas_height": 3,
            "layers": [
                {"name": "BACKGROUND", "visible": true, "locked": false, "opacity": 1.0},
                {"name": "LAYER 1", "visible": true, "locked": false, "opacity": 0.5}
            ],
            "palette": [{"r": 1, "g": 2, "b": 3, "a": 4}]
        }"#;
        let bytes = raw_package(&[(METADATA_ENTRY, meta)]);
        let doc = read_project(Cursor::new(bytes)).unwrap();

        assert_eq!(doc.width(), 4);
        assert_eq!(doc.height(), 3);
        assert_eq!(doc.layers.get(0).unwrap().pixels.get(1, 1), WHITE);
        assert_eq!(doc.layers.get(1).unwrap().pixels.count_opaque(), 0);
        assert_eq!(doc.layers.get(1).unwrap().opacity, 0.5);
        assert_eq!(doc.palette.colors(), &[Rgba([1, 2, 3, 4])]);
    }

    #[test]
    fn invalid_metadata_is_rejected() {
        let zero = br#"{"canvas_width": 0, "canvas_height": 3, "layers": [], "palette": []}"#;
        let err = read_project(Cursor::new(raw_package(&[(METADATA_ENTRY, zero)]))).unwrap_err();
        assert!(matches!(err, ProjectError::InvalidFormat(_)));

        let garbage = raw_package(&[(METADATA_ENTRY, b"{ nope")]);
        let err = read_project(Cursor::new(garbage)).unwrap_err();
        assert!(matches!(err, ProjectError::Metadata(_)));

        let err = read_project(Cursor::new(b"definitely not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, ProjectError::Zip(_)));
    }

    #[test]
    fn wrong_raster_size_is_rejected() {
        let mut small = Vec::new();
        encode_image(&PixelBuffer::new(2, 2), &mut small, ExportFormat::Png, 90).unwrap();
        let meta = br#"{"canvas_width": 4, "canvas_height": 4,
            "layers": [{"name": "BACKGROUND", "visible": true, "locked": false, "opacity": 1.0}]}"#;
        let bytes = raw_package(&[(METADATA_ENTRY, meta), ("layer_0.png", &small)]);
        let err = read_project(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ProjectError::InvalidFormat(_)));
    }

    #[test]
    fn png_export_is_exact() {
        let mut img = PixelBuffer::new(3, 2);
        img.set(1, 1, Rgba([10, 20, 30, 40]));
        let mut bytes = Vec::new();
        encode_image(&img, &mut bytes, ExportFormat::Png, EXPORT_JPEG_QUALITY).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn jpeg_export_is_opaque_on_white() {
        let img = PixelBuffer::new(8, 8);
        let mut bytes = Vec::new();
        encode_image(&img, &mut bytes, ExportFormat::Jpeg, EXPORT_JPEG_QUALITY).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        let px = decoded.get_pixel(4, 4);
        assert_eq!(px[3], 255);
        assert!(px[0] > 245 && px[1] > 245 && px[2] > 245, "{px:?}");
    }

    #[test]
    fn export_format_lookup() {
        assert_eq!(ExportFormat::from_extension("JPG"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_path(Path::new("a/b.png")), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_path(Path::new("a/b.tif")), None);
        assert_eq!(ExportFormat::Jpeg.extension(), "jpg");
    }
}
