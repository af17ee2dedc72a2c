//! Shared fixtures for the integration tests: temporary folders filled with
//! small real images.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use sortiv::{Navigator, ViewerConfig};

pub const WAIT: Duration = Duration::from_secs(5);

pub struct Pics {
    pub dir: TempDir,
}

impl Pics {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Write an 8x8 image per name; each decodes to 256 bytes of RGBA.
pub fn folder_with(names: &[&str]) -> Pics {
    let dir = TempDir::new().expect("create temp dir");
    for (n, name) in names.iter().enumerate() {
        write_image(dir.path(), name, n as u8);
    }
    Pics { dir }
}

pub fn write_image(dir: &Path, name: &str, shade: u8) {
    image::RgbImage::from_pixel(8, 8, image::Rgb([shade.wrapping_mul(40), 100, 200]))
        .save(dir.join(name))
        .expect("write test image");
}

pub fn write_garbage(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"this is not an image").expect("write garbage");
}

pub fn small_config() -> ViewerConfig {
    ViewerConfig {
        cache_budget: 1024 * 1024,
        preload_ahead: 2,
        preload_behind: 1,
        decode_workers: 2,
    }
}

pub fn current_name(nav: &Navigator) -> Option<String> {
    nav.current_identity().map(|id| id.file_name())
}

pub fn names(nav: &Navigator) -> Vec<String> {
    nav.listing().iter().map(|id| id.file_name()).collect()
}

/// Poll `cond` until it holds or `WAIT` runs out.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}
