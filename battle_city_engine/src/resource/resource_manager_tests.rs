/// Tests for ResourceManager
///
/// These tests use MockRenderer and temporary asset directories, so no GPU
/// is required.

use super::*;
use crate::renderer::mock_renderer::{MockFrame, MockRenderer, spirv_stub};
use std::io::Cursor;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

struct Fixture {
    /// Keeps the asset directory alive
    _dir: TempDir,
    mock: Arc<Mutex<MockRenderer>>,
    manager: ResourceManager,
}

impl Fixture {
    fn live_textures(&self) -> usize {
        self.mock.lock().unwrap().live_texture_count()
    }
}

/// Asset directory with valid shaders, a broken fragment shader and two PNGs.
/// The "executable" lives in the same directory.
fn create_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let shaders = dir.path().join("res/shaders");
    let textures = dir.path().join("res/textures");
    std::fs::create_dir_all(&shaders).unwrap();
    std::fs::create_dir_all(&textures).unwrap();

    std::fs::write(shaders.join("sprite.vert.spv"), spirv_stub()).unwrap();
    std::fs::write(shaders.join("sprite.frag.spv"), spirv_stub()).unwrap();
    std::fs::write(shaders.join("broken.frag.spv"), b"void main() { oops }").unwrap();
    std::fs::write(textures.join("kirpichi.png"), encode_png(2, 2)).unwrap();
    std::fs::write(textures.join("big.png"), encode_png(8, 4)).unwrap();
    std::fs::write(textures.join("corrupt.png"), b"not an image").unwrap();

    let mock = Arc::new(Mutex::new(MockRenderer::new()));
    let renderer: Arc<Mutex<dyn Renderer>> = mock.clone();
    let manager = ResourceManager::new(renderer, &dir.path().join("battle_city"));

    Fixture { _dir: dir, mock, manager }
}

fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 80, 40, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn load_default_shader(manager: &mut ResourceManager, name: &str) -> ShaderProgramKey {
    manager.load_shaders(name, "res/shaders/sprite.vert.spv", "res/shaders/sprite.frag.spv").unwrap()
}

// ============================================================================
// Asset paths
// ============================================================================

#[test]
fn test_asset_root_is_executable_directory() {
    let fixture = create_fixture();
    assert_eq!(fixture.manager.asset_root(), fixture._dir.path());
    assert_eq!(
        fixture.manager.resolve_asset_path("res/textures/kirpichi.png"),
        fixture._dir.path().join("res/textures/kirpichi.png"),
    );
}

#[test]
fn test_bare_executable_name_resolves_to_current_directory() {
    let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(MockRenderer::new()));
    let manager = ResourceManager::new(renderer, Path::new("battle_city"));
    assert_eq!(manager.asset_root(), Path::new("."));
}

#[test]
fn test_absolute_paths_are_kept() {
    let fixture = create_fixture();
    let absolute = fixture._dir.path().join("elsewhere.png");
    assert_eq!(fixture.manager.resolve_asset_path(&absolute), absolute);
}

// ============================================================================
// Shader programs
// ============================================================================

#[test]
fn test_load_shaders() {
    let mut fixture = create_fixture();
    let key = load_default_shader(&mut fixture.manager, "SpriteShader");

    assert_eq!(fixture.manager.shader_program_count(), 1);
    assert_eq!(fixture.manager.shader_program_key("SpriteShader").unwrap(), key);
    assert!(fixture.manager.shader_program("SpriteShader").unwrap().is_valid());
}

#[test]
fn test_load_shaders_malformed_fragment_adds_nothing() {
    let mut fixture = create_fixture();
    let result = fixture.manager.load_shaders(
        "SpriteShader",
        "res/shaders/sprite.vert.spv",
        "res/shaders/broken.frag.spv",
    );

    assert!(matches!(result, Err(Error::ShaderCompilationFailed(_))));
    assert_eq!(fixture.manager.shader_program_count(), 0);
    assert!(fixture.manager.shader_program("SpriteShader").is_err());
}

#[test]
fn test_load_shaders_missing_file() {
    let mut fixture = create_fixture();
    let result = fixture.manager.load_shaders("S", "res/shaders/none.vert.spv", "res/shaders/sprite.frag.spv");

    assert!(matches!(result, Err(Error::FileReadFailed(_))));
    assert_eq!(fixture.manager.shader_program_count(), 0);
}

#[test]
fn test_failed_reload_keeps_previous_program() {
    let mut fixture = create_fixture();
    let key = load_default_shader(&mut fixture.manager, "S");

    let result = fixture.manager.load_shaders("S", "res/shaders/sprite.vert.spv", "res/shaders/broken.frag.spv");

    assert!(result.is_err());
    assert_eq!(fixture.manager.shader_program_key("S").unwrap(), key);
    assert_eq!(fixture.manager.shader_program_count(), 1);
}

#[test]
fn test_set_unknown_uniform_through_manager_is_noop() {
    let mut fixture = create_fixture();
    load_default_shader(&mut fixture.manager, "S");

    let program = fixture.manager.shader_program_mut("S").unwrap();
    let before = program.uniform_data().to_vec();
    program.set_float("doesNotExist", 4.0);

    assert_eq!(program.uniform_data(), before.as_slice());
}

// ============================================================================
// Textures
// ============================================================================

#[test]
fn test_load_texture() {
    let mut fixture = create_fixture();
    fixture.manager.load_texture("DefaultTexture", "res/textures/kirpichi.png").unwrap();

    let texture = fixture.manager.texture("DefaultTexture").unwrap();
    assert_eq!((texture.width(), texture.height()), (2, 2));
    assert_eq!(texture.channels(), 4);
    assert_eq!(texture.params(), TextureParams::default());
}

#[test]
fn test_load_texture_twice_replaces_and_releases() {
    let mut fixture = create_fixture();
    let first = fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    assert_eq!(fixture.live_textures(), 1);

    let second = fixture.manager.load_texture("T", "res/textures/big.png").unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.manager.texture_count(), 1);
    assert_eq!(fixture.live_textures(), 1);
    assert_eq!(fixture.manager.texture("T").unwrap().width(), 8);
}

#[test]
fn test_load_texture_missing_and_corrupt() {
    let mut fixture = create_fixture();

    let missing = fixture.manager.load_texture("T", "res/textures/none.png");
    assert!(matches!(missing, Err(Error::FileReadFailed(_))));

    let corrupt = fixture.manager.load_texture("T", "res/textures/corrupt.png");
    assert!(matches!(corrupt, Err(Error::ImageDecodeFailed(_))));

    assert_eq!(fixture.manager.texture_count(), 0);
    assert_eq!(fixture.live_textures(), 0);
}

// ============================================================================
// Sprites
// ============================================================================

#[test]
fn test_load_sprite_end_to_end() {
    let mut fixture = create_fixture();
    load_default_shader(&mut fixture.manager, "S");
    fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    fixture.manager.load_sprite("Spr", "T", "S", 500, 500).unwrap();

    let sprite = fixture.manager.sprite("Spr").unwrap();
    assert_eq!(sprite.size(), Vec2::new(500.0, 500.0));
    assert_eq!(sprite.position(), Vec2::ZERO);
    assert_eq!(sprite.texture_key(), fixture.manager.texture_key("T").unwrap());
    assert_eq!(sprite.shader_program_key(), fixture.manager.shader_program_key("S").unwrap());
}

#[test]
fn test_load_sprite_unknown_texture_leaves_registry_unchanged() {
    let mut fixture = create_fixture();
    load_default_shader(&mut fixture.manager, "S");
    fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    fixture.manager.load_sprite("Existing", "T", "S", 10, 10).unwrap();

    let result = fixture.manager.load_sprite("Spr", "Missing", "S", 500, 500);

    assert!(matches!(result, Err(Error::ResourceNotFound(ref msg)) if msg.contains("Missing")));
    assert_eq!(fixture.manager.sprite_count(), 1);
    assert!(fixture.manager.sprite("Spr").is_err());
}

#[test]
fn test_load_sprite_unknown_shader() {
    let mut fixture = create_fixture();
    fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();

    let result = fixture.manager.load_sprite("Spr", "T", "NoShader", 500, 500);

    assert!(matches!(result, Err(Error::ResourceNotFound(_))));
    assert_eq!(fixture.manager.sprite_count(), 0);
}

#[test]
fn test_lookups_of_unknown_names_fail() {
    let fixture = create_fixture();
    assert!(matches!(fixture.manager.shader_program("x"), Err(Error::ResourceNotFound(_))));
    assert!(matches!(fixture.manager.texture("x"), Err(Error::ResourceNotFound(_))));
    assert!(matches!(fixture.manager.sprite("x"), Err(Error::ResourceNotFound(_))));
}

#[test]
fn test_sprite_mut_set_position() {
    let mut fixture = create_fixture();
    load_default_shader(&mut fixture.manager, "S");
    fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    fixture.manager.load_sprite("Spr", "T", "S", 500, 500).unwrap();

    fixture.manager.sprite_mut("Spr").unwrap().set_position(Vec2::new(500.0, 300.0));

    assert_eq!(fixture.manager.sprite("Spr").unwrap().position(), Vec2::new(500.0, 300.0));
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_render_sprite() {
    let mut fixture = create_fixture();
    load_default_shader(&mut fixture.manager, "S");
    fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    fixture.manager.load_sprite("Spr", "T", "S", 500, 500).unwrap();

    let frame = MockFrame::new();
    fixture.manager.render_sprite("Spr", &frame).unwrap();

    assert_eq!(frame.commands().last().unwrap(), "draw(6, 0)");
    assert!(frame.commands().contains(&"bind_texture(0, 2x2)".to_string()));
}

#[test]
fn test_render_sprite_sees_replaced_texture() {
    let mut fixture = create_fixture();
    load_default_shader(&mut fixture.manager, "S");
    fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    fixture.manager.load_sprite("Spr", "T", "S", 500, 500).unwrap();
    fixture.manager.load_texture("T", "res/textures/big.png").unwrap();

    let frame = MockFrame::new();
    fixture.manager.render_sprite("Spr", &frame).unwrap();

    assert!(frame.commands().contains(&"bind_texture(0, 8x4)".to_string()));
}

#[test]
fn test_render_unknown_sprite() {
    let mut fixture = create_fixture();
    let frame = MockFrame::new();

    let result = fixture.manager.render_sprite("Nope", &frame);

    assert!(matches!(result, Err(Error::ResourceNotFound(_))));
    assert!(frame.commands().is_empty());
}

#[test]
fn test_render_all_sprites() {
    let mut fixture = create_fixture();
    load_default_shader(&mut fixture.manager, "S");
    fixture.manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    fixture.manager.load_sprite("A", "T", "S", 16, 16).unwrap();
    fixture.manager.load_sprite("B", "T", "S", 32, 32).unwrap();

    let frame = MockFrame::new();
    fixture.manager.render_all_sprites(&frame).unwrap();

    let draws = frame.commands().iter().filter(|c| c.starts_with("draw")).count();
    assert_eq!(draws, 2);
}

#[test]
fn test_drop_releases_textures() {
    let fixture = create_fixture();
    let Fixture { _dir, mock, mut manager } = fixture;
    manager.load_texture("T", "res/textures/kirpichi.png").unwrap();
    assert_eq!(mock.lock().unwrap().live_texture_count(), 1);

    drop(manager);

    assert_eq!(mock.lock().unwrap().live_texture_count(), 0);
}
