//! Square-grid layout shared by the thumbnail view and contact sheets.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgb, RgbImage, RgbaImage};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Result, ViewerError};
use crate::files::Identity;
use crate::loader::{decode_thumbnail, DecodedImage, THUMB_SIZE};

const SHEET_QUALITY: u8 = 95;

/// Columns of the smallest square grid holding `count` cells. Never zero.
pub fn grid_columns(count: usize) -> usize {
    let mut cols = (count as f64).sqrt().ceil() as usize;
    while cols * cols < count {
        cols += 1;
    }
    cols.max(1)
}

pub fn sheet_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("contact_sheet_{}.jpg", now.format("%Y%m%d_%H%M%S"))
}

/// Lay `tiles` out row by row on black, each centred in a `cell` square.
/// `None` leaves its cell empty.
pub fn compose(tiles: &[Option<Arc<DecodedImage>>], cell: u32) -> RgbImage {
    let cols = grid_columns(tiles.len()) as u32;
    let rows = (tiles.len() as u32).div_ceil(cols).max(1);
    let mut sheet = RgbImage::from_pixel(cols * cell, rows * cell, Rgb([0, 0, 0]));

    for (i, tile) in tiles.iter().enumerate() {
        let Some(tile) = tile else {
            continue;
        };
        let Some(rgba) = RgbaImage::from_raw(tile.width, tile.height, tile.rgba_bytes.clone()) else {
            continue;
        };
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
        let (col, row) = (i as u32 % cols, i as u32 / cols);
        let x = col * cell + cell.saturating_sub(tile.width) / 2;
        let y = row * cell + cell.saturating_sub(tile.height) / 2;
        imageops::replace(&mut sheet, &rgb, x as i64, y as i64);
    }
    sheet
}

/// Write a contact sheet of `images` to `path` as JPEG. Tiles already held
/// are reused, the rest are decoded in parallel; images that fail leave a
/// blank cell. Returns how many tiles were placed. Writes nothing for an
/// empty list.
pub fn write_contact_sheet(
    images: &[(Identity, Option<Arc<DecodedImage>>)],
    path: &Path,
) -> Result<usize> {
    if images.is_empty() {
        return Ok(0);
    }
    let t0 = Instant::now();
    let tiles: Vec<Option<Arc<DecodedImage>>> = images
        .par_iter()
        .map(|(identity, held)| match held {
            Some(thumb) => Some(Arc::clone(thumb)),
            None => match decode_thumbnail(identity.path(), THUMB_SIZE) {
                Ok(thumb) => Some(Arc::new(thumb)),
                Err(e) => {
                    log::warn!("[sheet] {}", e);
                    None
                }
            },
        })
        .collect();
    let placed = tiles.iter().filter(|t| t.is_some()).count();
    let sheet = compose(&tiles, THUMB_SIZE);

    let file = File::create(path).map_err(|e| ViewerError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let written = sheet
        .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, SHEET_QUALITY))
        .map_err(io::Error::other)
        .and_then(|_| writer.flush());
    if let Err(e) = written {
        drop(writer);
        let _ = fs::remove_file(path);
        return Err(ViewerError::io(path, e));
    }

    log::info!(
        "Contact sheet {} ({} of {} images) in {:?}",
        path.display(),
        placed,
        images.len(),
        t0.elapsed()
    );
    Ok(placed)
}
