use super::*;
use winit::dpi::PhysicalSize;
use winit::keyboard::NativeKeyCode;

#[test]
fn test_key_mapping() {
    assert_eq!(Key::from_key_code(KeyCode::Escape), Some(Key::Escape));
    assert_eq!(Key::from_key_code(KeyCode::ArrowLeft), Some(Key::Left));
    assert_eq!(Key::from_key_code(KeyCode::NumpadEnter), Some(Key::Enter));
    assert_eq!(Key::from_key_code(KeyCode::KeyQ), None);
}

#[test]
fn test_resize_and_close_events() {
    let resized = WindowEvent::Resized(PhysicalSize::new(800, 600));
    assert_eq!(
        PlatformEvent::from_window_event(&resized),
        Some(PlatformEvent::Resized { width: 800, height: 600 }),
    );
    assert_eq!(
        PlatformEvent::from_window_event(&WindowEvent::CloseRequested),
        Some(PlatformEvent::CloseRequested),
    );
    assert_eq!(PlatformEvent::from_window_event(&WindowEvent::Focused(true)), None);
}

#[test]
fn test_key_press_only() {
    let escape = PhysicalKey::Code(KeyCode::Escape);

    assert_eq!(
        PlatformEvent::from_key(escape, ElementState::Pressed, false),
        Some(PlatformEvent::KeyPressed(Key::Escape)),
    );
    assert_eq!(PlatformEvent::from_key(escape, ElementState::Released, false), None);
    assert_eq!(PlatformEvent::from_key(escape, ElementState::Pressed, true), None);
    assert_eq!(
        PlatformEvent::from_key(PhysicalKey::Unidentified(NativeKeyCode::Unidentified), ElementState::Pressed, false),
        None,
    );
}

#[test]
fn test_queue_is_fifo() {
    let mut queue = EventQueue::new();
    assert!(queue.is_empty());

    queue.push(PlatformEvent::Resized { width: 1, height: 1 });
    queue.push(PlatformEvent::KeyPressed(Key::Escape));
    queue.push(PlatformEvent::CloseRequested);
    assert_eq!(queue.len(), 3);

    assert_eq!(queue.drain(), vec![
        PlatformEvent::Resized { width: 1, height: 1 },
        PlatformEvent::KeyPressed(Key::Escape),
        PlatformEvent::CloseRequested,
    ]);
    assert!(queue.is_empty());
    assert!(queue.drain().is_empty());
}
