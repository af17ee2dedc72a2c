use clap::Parser;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use winit::event_loop::EventLoop;

use sortiv::cli::Cli;
use sortiv::session::{Notify, Wake};
use sortiv::navigator::Navigator;
use sortiv::ui::state::ViewerState;
use sortiv::ui::{App, UserEvent};

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.viewer_config();
    log::info!(
        "Cache budget {} MB, preload {} ahead / {} behind, {} workers",
        config.cache_budget / (1024 * 1024),
        config.preload_ahead,
        config.preload_behind,
        config.decode_workers
    );

    let event_loop = match EventLoop::<UserEvent>::with_user_event().build() {
        Ok(el) => el,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    let proxy = Mutex::new(event_loop.create_proxy());
    let notify: Notify = Arc::new(move |wake: Wake| {
        let event = match wake {
            Wake::FileOpFinished => UserEvent::FileOpFinished,
            Wake::ThumbnailReady => UserEvent::ThumbnailReady,
        };
        if let Ok(proxy) = proxy.lock() {
            let _ = proxy.send_event(event);
        }
    });

    let navigator = match Navigator::with_notify(&cli.folder, config, Some(notify)) {
        Ok(nav) => nav,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let slideshow = cli
        .slideshow
        .filter(|secs| *secs > 0.0)
        .map(Duration::from_secs_f64);
    let state = ViewerState::new(
        navigator,
        cli.transfer_mode(),
        cli.font_size,
        slideshow,
        !cli.windowed,
    );

    let mut app = App::new(state);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }
}
