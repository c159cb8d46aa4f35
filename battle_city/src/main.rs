//! Battle City
//!
//! Opens a window, loads one shader, texture and sprite and draws the
//! sprite every frame until Escape is pressed or the window is closed.

mod app;
mod config;

use battle_city_engine::{engine_error, engine_info};
use winit::event_loop::{ControlFlow, EventLoop};
use crate::app::App;
use crate::config::GameConfig;

fn main() {
    engine_info!("battle_city", "Battle City starting...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(error) => {
            engine_error!("battle_city", "Failed to create event loop: {}", error);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(GameConfig::default());
    let run_result = event_loop.run_app(&mut app);
    app.shutdown();

    if let Err(error) = run_result {
        engine_error!("battle_city", "Event loop error: {}", error);
        std::process::exit(1);
    }
    if let Some(error) = app.take_error() {
        engine_error!("battle_city", "Exiting after error: {}", error);
        std::process::exit(1);
    }
}
