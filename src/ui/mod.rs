use softbuffer::Surface;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::{Fullscreen, Window, WindowId};

use crate::navigator::ViewMode;
use crate::ui::render::Canvas;
use crate::ui::state::{input_for_key, Input, ViewerState};

pub mod render;
pub mod state;

/// Events sent to the event loop from background threads.
#[derive(Debug)]
pub enum UserEvent {
    FileOpFinished,
    ThumbnailReady,
}

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

pub struct App {
    pub state: ViewerState,
    pub window: Option<Arc<Window>>,
    pub context: Option<softbuffer::Context<Arc<Window>>>,
    pub surface: Option<Surface<Arc<Window>, Arc<Window>>>,
}

impl App {
    pub fn new(state: ViewerState) -> Self {
        Self {
            state,
            window: None,
            context: None,
            surface: None,
        }
    }

    fn request_redraw(&self) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn set_fullscreen(&mut self, on: bool) {
        self.state.is_fullscreen = on;
        if let Some(ref window) = self.window {
            window.set_fullscreen(on.then_some(Fullscreen::Borderless(None)));
        }
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let mut attrs = Window::default_attributes()
            .with_title("sortiv")
            .with_inner_size(LogicalSize::new(1280u32, 720u32));
        if self.state.is_fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let context = match softbuffer::Context::new(Arc::clone(&window)) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to create softbuffer context: {}", e);
                event_loop.exit();
                return;
            }
        };
        let surface = match Surface::new(&context, Arc::clone(&window)) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to create surface: {}", e);
                event_loop.exit();
                return;
            }
        };

        window.request_redraw();
        self.window = Some(window);
        self.context = Some(context);
        self.surface = Some(surface);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::FileOpFinished => {
                if self.state.navigator.poll() {
                    self.request_redraw();
                }
            }
            UserEvent::ThumbnailReady => {
                if self.state.navigator.view() == ViewMode::Grid {
                    self.request_redraw();
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let (Some(surface), Some(w), Some(h)) = (
                    self.surface.as_mut(),
                    NonZeroU32::new(width),
                    NonZeroU32::new(height),
                ) {
                    if let Err(e) = surface.resize(w, h) {
                        log::warn!("Surface resize failed: {}", e);
                    }
                }
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let Some(input) = input_for_key(&event.logical_key) else {
                    return;
                };
                // OS key repeat drives held navigation; toggles fire once
                if event.repeat && !matches!(input, Input::Action(_)) {
                    return;
                }
                match input {
                    Input::Quit => {
                        event_loop.exit();
                        return;
                    }
                    Input::ToggleFullscreen => {
                        let on = !self.state.is_fullscreen;
                        self.set_fullscreen(on);
                    }
                    other => self.state.apply(other),
                }
                self.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                let Some(window) = self.window.as_ref() else {
                    return;
                };
                let size = window.inner_size();
                let (fb_w, fb_h) = (size.width.max(1), size.height.max(1));
                if let Some(ref mut surface) = self.surface {
                    if let Ok(mut buffer) = surface.buffer_mut() {
                        let mut canvas = Canvas::new(&mut buffer, fb_w, fb_h);
                        self.state.render(&mut canvas);
                        if let Err(e) = buffer.present() {
                            log::warn!("Present failed: {}", e);
                        }
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.tick(Instant::now()) {
            self.request_redraw();
        }
        match self.state.next_slide {
            Some(when) => event_loop.set_control_flow(ControlFlow::WaitUntil(when)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}
