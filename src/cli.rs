use clap::Parser;
use std::path::PathBuf;

use crate::config::ViewerConfig;
use crate::fileops::TransferMode;

pub const HELP_KEYS: &str = "\
Key Bindings:
  Esc / q         : Quit
  Left / h        : Previous image
  Right / l / Spc : Next image
  Home / End      : First / last image
  1-9             : Move (or copy) image into sub-folder 1-9
  Delete          : Delete image
  Tab / CapsLock  : Toggle move / copy mode
  m / t           : Toggle thumbnail grid (Enter: back to single)
  c               : Save contact sheet to the working directory
  s               : Toggle slideshow
  f               : Toggle fullscreen
  i               : Toggle info overlay
  ?               : Toggle help overlay
";

#[derive(Parser, Debug)]
#[command(name = "sortiv", about = "Full-screen image sorter", after_help = HELP_KEYS)]
pub struct Cli {
    /// Folder to browse
    #[arg(default_value = ".")]
    pub folder: PathBuf,

    /// Memory budget for decoded images (e.g. 512MB, 2GB). Default: 10% of RAM.
    #[arg(short, long, value_parser = parse_memory_budget)]
    pub memory: Option<u64>,

    /// Images to preload in the navigation direction
    #[arg(long, default_value = "2")]
    pub ahead: usize,

    /// Images to preload behind
    #[arg(long, default_value = "1")]
    pub behind: usize,

    /// Background decode threads
    #[arg(short = 'j', long, default_value = "2")]
    pub workers: usize,

    /// Start in copy mode instead of move mode
    #[arg(long)]
    pub copy: bool,

    /// Start in a window instead of fullscreen
    #[arg(long)]
    pub windowed: bool,

    /// Advance automatically every SECS seconds
    #[arg(long, value_name = "SECS")]
    pub slideshow: Option<f64>,

    /// Text scaling factor for overlays
    #[arg(long, default_value = "2")]
    pub font_size: u32,
}

impl Cli {
    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            cache_budget: self.memory.unwrap_or_else(default_memory_budget),
            preload_ahead: self.ahead,
            preload_behind: self.behind,
            decode_workers: self.workers.max(1),
        }
    }

    pub fn transfer_mode(&self) -> TransferMode {
        if self.copy {
            TransferMode::Copy
        } else {
            TransferMode::Move
        }
    }
}

/// Accepts `2GB`, `512MB`, `512` (megabytes) or fractions like `1.5GB`.
pub fn parse_memory_budget(s: &str) -> Result<u64, String> {
    let s = s.trim().to_uppercase();
    let (num, unit) = if let Some(num) = s.strip_suffix("GB") {
        (num, 1024.0 * 1024.0 * 1024.0)
    } else if let Some(num) = s.strip_suffix("MB") {
        (num, 1024.0 * 1024.0)
    } else {
        (s.as_str(), 1024.0 * 1024.0)
    };
    let value: f64 = num
        .trim()
        .parse()
        .map_err(|_| format!("invalid memory size: {}", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("memory size must be positive: {}", s));
    }
    Ok((value * unit) as u64)
}

pub fn default_memory_budget() -> u64 {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    (sys.total_memory() / 10).max(64 * 1024 * 1024)
}
