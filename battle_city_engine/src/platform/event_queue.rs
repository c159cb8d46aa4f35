/// Platform events collected between frames.
///
/// The winit handler pushes translated events as they arrive; the render
/// loop drains the queue once per iteration and reacts in order.

use std::collections::VecDeque;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Up,
    Down,
    Left,
    Right,
    Space,
    Enter,
}

impl Key {
    pub fn from_key_code(key_code: KeyCode) -> Option<Self> {
        match key_code {
            KeyCode::Escape => Some(Key::Escape),
            KeyCode::ArrowUp => Some(Key::Up),
            KeyCode::ArrowDown => Some(Key::Down),
            KeyCode::ArrowLeft => Some(Key::Left),
            KeyCode::ArrowRight => Some(Key::Right),
            KeyCode::Space => Some(Key::Space),
            KeyCode::Enter | KeyCode::NumpadEnter => Some(Key::Enter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    Resized { width: u32, height: u32 },
    KeyPressed(Key),
    CloseRequested,
}

impl PlatformEvent {
    /// Translate a winit window event. Events the game does not use give `None`.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::Resized(size) => Some(PlatformEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::CloseRequested => Some(PlatformEvent::CloseRequested),
            WindowEvent::KeyboardInput { event, .. } => {
                Self::from_key(event.physical_key, event.state, event.repeat)
            }
            _ => None,
        }
    }

    /// First press of a mapped key. Releases and auto-repeats are dropped.
    pub fn from_key(physical_key: PhysicalKey, state: ElementState, repeat: bool) -> Option<Self> {
        if state != ElementState::Pressed || repeat {
            return None;
        }
        match physical_key {
            PhysicalKey::Code(key_code) => Key::from_key_code(key_code).map(PlatformEvent::KeyPressed),
            PhysicalKey::Unidentified(_) => None,
        }
    }
}

/// FIFO of platform events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<PlatformEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: PlatformEvent) {
        self.events.push_back(event);
    }

    /// Take every pending event, oldest first
    pub fn drain(&mut self) -> Vec<PlatformEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
#[path = "event_queue_tests.rs"]
mod tests;
