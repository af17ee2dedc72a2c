use std::time::{Duration, Instant};
use winit::keyboard::{Key, NamedKey};

use crate::cli::HELP_KEYS;
use crate::fileops::TransferMode;
use crate::mosaic::grid_columns;
use crate::navigator::{Action, NavigationInfo, Navigator, ViewMode};
use crate::ui::render::{fit_scale, line_height, text_width, Canvas, BG_COLOR, ERROR_RED, WHITE};

const DEFAULT_SLIDE_INTERVAL: Duration = Duration::from_secs(3);
const GRID_GAP: u32 = 2;

// ---------------------------------------------------------------------------
// Input mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Action(Action),
    ToggleMode,
    ToggleGrid,
    LeaveGrid,
    ContactSheet,
    ToggleSlideshow,
    ToggleInfo,
    ToggleHelp,
    ToggleFullscreen,
    Quit,
}

pub fn input_for_key(key: &Key) -> Option<Input> {
    match key {
        Key::Named(named) => input_for_named(*named),
        Key::Character(s) => s.chars().next().and_then(input_for_char),
        _ => None,
    }
}

pub fn input_for_named(key: NamedKey) -> Option<Input> {
    Some(match key {
        NamedKey::ArrowLeft => Input::Action(Action::NavigateLeft),
        NamedKey::ArrowRight | NamedKey::Space => Input::Action(Action::NavigateRight),
        NamedKey::Home => Input::Action(Action::First),
        NamedKey::End => Input::Action(Action::Last),
        NamedKey::Delete => Input::Action(Action::Delete),
        NamedKey::Tab | NamedKey::CapsLock => Input::ToggleMode,
        NamedKey::Enter => Input::LeaveGrid,
        NamedKey::Escape => Input::Quit,
        _ => return None,
    })
}

pub fn input_for_char(c: char) -> Option<Input> {
    if let Some(bucket) = c.to_digit(10).filter(|d| (1..=9).contains(d)) {
        return Some(Input::Action(Action::FileToBucket(bucket)));
    }
    Some(match c.to_ascii_lowercase() {
        'h' => Input::Action(Action::NavigateLeft),
        'l' | ' ' => Input::Action(Action::NavigateRight),
        'm' | 't' => Input::ToggleGrid,
        'c' => Input::ContactSheet,
        's' => Input::ToggleSlideshow,
        'i' => Input::ToggleInfo,
        '?' => Input::ToggleHelp,
        'f' => Input::ToggleFullscreen,
        'q' => Input::Quit,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

pub struct ViewerState {
    pub navigator: Navigator,
    /// Move-vs-copy; handed to the navigator with every bucket action.
    pub mode: TransferMode,
    pub show_info: bool,
    pub show_help: bool,
    pub is_fullscreen: bool,
    pub font_scale: u32,
    pub slide_interval: Option<Duration>,
    pub next_slide: Option<Instant>,
}

impl ViewerState {
    pub fn new(
        navigator: Navigator,
        mode: TransferMode,
        font_scale: u32,
        slideshow: Option<Duration>,
        is_fullscreen: bool,
    ) -> Self {
        Self {
            navigator,
            mode,
            show_info: false,
            show_help: false,
            is_fullscreen,
            font_scale: font_scale.max(1),
            slide_interval: slideshow,
            next_slide: slideshow.map(|d| Instant::now() + d),
        }
    }

    /// Apply an input that only touches viewer state. Quit and fullscreen are
    /// left to the window owner.
    pub fn apply(&mut self, input: Input) {
        match input {
            Input::Action(action) => {
                if let Err(e) = self.navigator.handle(action, self.mode) {
                    log::debug!("[ui] {:?} rejected: {}", action, e);
                }
                self.restart_slide_timer();
            }
            Input::ToggleMode => {
                self.mode = self.mode.toggled();
                log::info!("Mode changed to: {}", self.mode.label());
            }
            Input::ToggleGrid => {
                let view = match self.navigator.view() {
                    ViewMode::Single => ViewMode::Grid,
                    ViewMode::Grid => ViewMode::Single,
                };
                self.navigator.set_view(view);
            }
            Input::LeaveGrid => self.navigator.set_view(ViewMode::Single),
            Input::ContactSheet => {
                let dir = std::env::current_dir().unwrap_or_else(|_| ".".into());
                if let Err(e) = self.navigator.save_contact_sheet(&dir) {
                    log::error!("Contact sheet failed: {}", e);
                }
            }
            Input::ToggleSlideshow => {
                self.slide_interval = match self.slide_interval {
                    Some(_) => None,
                    None => Some(DEFAULT_SLIDE_INTERVAL),
                };
                self.restart_slide_timer();
            }
            Input::ToggleInfo => self.show_info = !self.show_info,
            Input::ToggleHelp => self.show_help = !self.show_help,
            Input::ToggleFullscreen | Input::Quit => {}
        }
    }

    fn restart_slide_timer(&mut self) {
        self.next_slide = self.slide_interval.map(|d| Instant::now() + d);
    }

    /// Advance the slideshow if it is due. Returns true when a redraw is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.next_slide {
            Some(due) if now >= due => {
                if !self.navigator.is_busy() {
                    let _ = self.navigator.handle(Action::NavigateRight, self.mode);
                }
                self.restart_slide_timer();
                true
            }
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    pub fn render(&mut self, canvas: &mut Canvas) {
        canvas.clear(BG_COLOR);
        let (sw, sh) = (canvas.width as f32, canvas.height as f32);

        if self.navigator.view() == ViewMode::Grid {
            self.render_grid(canvas);
        } else if let Some(img) = self.navigator.current_bitmap() {
            let scale = fit_scale(img.width as f32, img.height as f32, sw, sh);
            let x0 = (sw - img.width as f32 * scale) / 2.0;
            let y0 = (sh - img.height as f32 * scale) / 2.0;
            canvas.blit_scaled(&img.rgba_bytes, img.width, img.height, x0, y0, scale);

            if self.show_info {
                let info = self.navigator.info(self.mode);
                let lines = info_lines(&info, img.width, img.height, &img.format_name, img.file_size);
                self.draw_panel(canvas, 0, &lines);
            }
        }

        self.draw_status_bar(canvas);

        if self.show_help {
            let (w, h) = (canvas.width, canvas.height);
            canvas.fill_rect(0, 0, w, h, (0, 0, 0, 200));
            let mut y = 20;
            for line in HELP_KEYS.lines() {
                canvas.draw_text(line, 20, y, self.font_scale, WHITE);
                y += line_height(self.font_scale);
            }
        }
    }

    /// Thumbnails of the whole listing on a square grid above the status bar,
    /// with the selection outlined. Cells without a thumbnail yet stay blank.
    fn render_grid(&mut self, canvas: &mut Canvas) {
        let listing = self.navigator.listing();
        if listing.is_empty() {
            return;
        }
        let cols = grid_columns(listing.len()) as u32;
        let rows = (listing.len() as u32).div_ceil(cols);
        let status_h = (line_height(self.font_scale) + 8) as u32;
        let cell_w = (canvas.width / cols).max(1);
        let cell_h = (canvas.height.saturating_sub(status_h) / rows).max(1);
        let (box_w, box_h) = (
            cell_w.saturating_sub(2 * GRID_GAP).max(1) as f32,
            cell_h.saturating_sub(2 * GRID_GAP).max(1) as f32,
        );
        let selected = self.navigator.index();

        for (i, id) in listing.iter().enumerate() {
            let x = (i as u32 % cols * cell_w) as i32;
            let y = (i as u32 / cols * cell_h) as i32;
            if let Some(thumb) = self.navigator.thumbnail(id) {
                let scale = fit_scale(thumb.width as f32, thumb.height as f32, box_w, box_h);
                let x0 = x as f32 + (cell_w as f32 - thumb.width as f32 * scale) / 2.0;
                let y0 = y as f32 + (cell_h as f32 - thumb.height as f32 * scale) / 2.0;
                canvas.blit_scaled(&thumb.rgba_bytes, thumb.width, thumb.height, x0, y0, scale);
            }
            if selected == Some(i) {
                canvas.stroke_rect(x, y, cell_w, cell_h, GRID_GAP, WHITE);
            }
        }
    }

    fn draw_panel(&self, canvas: &mut Canvas, y: i32, lines: &[String]) {
        let line_h = line_height(self.font_scale);
        let w = canvas.width;
        canvas.fill_rect(0, y, w, (line_h * lines.len() as i32 + 8) as u32, (0, 0, 0, 178));
        for (n, line) in lines.iter().enumerate() {
            canvas.draw_text(line, 10, y + 4 + line_h * n as i32, self.font_scale, WHITE);
        }
    }

    fn draw_status_bar(&self, canvas: &mut Canvas) {
        let scale = self.font_scale;
        let line_h = line_height(scale);
        let y = canvas.height as i32 - line_h - 8;
        let w = canvas.width;
        canvas.fill_rect(0, y, w, (line_h + 8) as u32, (0, 0, 0, 150));

        let mode = format!("[{}]", self.mode.label());
        let x = canvas.draw_text(&mode, 10, y + 4, scale, WHITE);

        let status = self.navigator.status_message();
        let color = if status.starts_with("Error") || status.starts_with("Busy") {
            ERROR_RED
        } else {
            WHITE
        };
        canvas.draw_text(status, x + text_width(" ", scale) as i32, y + 4, scale, color);
    }
}

fn info_lines(info: &NavigationInfo, width: u32, height: u32, format: &str, file_size: u64) -> Vec<String> {
    let position = info.position.map(|p| p + 1).unwrap_or(0);
    let modified = info
        .modified
        .map(|t| {
            chrono::DateTime::<chrono::Local>::from(t)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string());
    let mb = |b: u64| b as f64 / (1024.0 * 1024.0);

    vec![
        format!("[{}/{}] {}", position, info.total, info.file_name.as_deref().unwrap_or("")),
        format!(
            "{}x{} | {} | {:.1} KB | modified {}",
            width,
            height,
            format,
            file_size as f64 / 1024.0,
            modified
        ),
        format!(
            "cache: {} frames | {:.0}/{:.0} MB",
            info.cached_frames,
            mb(info.cached_bytes),
            mb(info.cache_budget)
        ),
        format!("mode: {} | {} thumbnails", info.mode.label(), info.thumbnails),
    ]
}
