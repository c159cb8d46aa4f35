//! Integration tests for the Engine + ResourceManager workflow
//!
//! Uses a recording renderer defined below, so no GPU is required.
//!
//! Run with: cargo test --test resource_integration_tests

use battle_city_engine::battle_city::render::{
    Renderer, RendererFrame, RendererShaderProgram, RendererStats, RendererTexture,
    ReflectedUniform, ShaderProgramDesc, ShaderStage, TextureDesc, TextureInfo, UniformKind,
    UniformLayout, validate_spirv, SPIRV_MAGIC,
};
use battle_city_engine::battle_city::platform::WindowContext;
use battle_city_engine::battle_city::{Engine, Error, Result};
use glam::{Mat4, Vec2};
use serial_test::serial;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

// ============================================================================
// RECORDING RENDERER
// ============================================================================

struct StubTexture(TextureInfo);

impl RendererTexture for StubTexture {
    fn info(&self) -> &TextureInfo {
        &self.0
    }
}

struct StubProgram(UniformLayout);

impl RendererShaderProgram for StubProgram {
    fn is_valid(&self) -> bool {
        true
    }

    fn uniform_layout(&self) -> &UniformLayout {
        &self.0
    }
}

#[derive(Default)]
struct StubFrame {
    log: Arc<Mutex<Vec<String>>>,
    uniforms: Arc<Mutex<Vec<u8>>>,
}

impl RendererFrame for StubFrame {
    fn bind_shader_program(&self, _program: &Arc<dyn RendererShaderProgram>) -> Result<()> {
        self.log.lock().unwrap().push("program".to_string());
        Ok(())
    }

    fn bind_texture(&self, unit: u32, texture: &Arc<dyn RendererTexture>) -> Result<()> {
        let info = texture.info();
        self.log.lock().unwrap().push(format!("texture {} {}x{}", unit, info.width, info.height));
        Ok(())
    }

    fn push_uniforms(&self, data: &[u8]) -> Result<()> {
        *self.uniforms.lock().unwrap() = data.to_vec();
        Ok(())
    }

    fn draw(&self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.log.lock().unwrap().push(format!("draw {} {}", vertex_count, first_vertex));
        Ok(())
    }
}

#[derive(Default)]
struct StubRenderer {
    log: Arc<Mutex<Vec<String>>>,
    uniforms: Arc<Mutex<Vec<u8>>>,
}

impl Renderer for StubRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        Ok(Arc::new(StubTexture(TextureInfo {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            mip_levels: desc.mipmap.mip_levels(desc.width, desc.height),
        })))
    }

    fn create_shader_program(&mut self, desc: ShaderProgramDesc) -> Result<Arc<dyn RendererShaderProgram>> {
        validate_spirv(ShaderStage::Vertex, &desc.vertex_code)?;
        validate_spirv(ShaderStage::Fragment, &desc.fragment_code)?;
        let layout = UniformLayout::new(
            vec![
                ReflectedUniform { name: "modelMat".to_string(), offset: 0, kind: UniformKind::Mat4 },
                ReflectedUniform { name: "projectionMat".to_string(), offset: 64, kind: UniformKind::Mat4 },
                ReflectedUniform { name: "tex".to_string(), offset: 0, kind: UniformKind::Sampler { unit: 0 } },
            ],
            128,
        )?;
        Ok(Arc::new(StubProgram(layout)))
    }

    fn set_clear_color(&mut self, _color: [f32; 4]) {}

    fn begin_frame(&mut self) -> Result<Option<Arc<dyn RendererFrame>>> {
        Ok(Some(Arc::new(StubFrame {
            log: Arc::clone(&self.log),
            uniforms: Arc::clone(&self.uniforms),
        })))
    }

    fn end_frame(&mut self, _frame: Arc<dyn RendererFrame>) -> Result<()> {
        self.log.lock().unwrap().push("present".to_string());
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        RendererStats::default()
    }

    fn resize(&mut self, _width: u32, _height: u32) {}
}

// ============================================================================
// FIXTURES
// ============================================================================

fn spirv_header() -> Vec<u8> {
    [SPIRV_MAGIC, 0x0001_0000, 0, 8, 0].iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn write_assets(dir: &std::path::Path) {
    std::fs::create_dir_all(dir.join("res/shaders")).unwrap();
    std::fs::create_dir_all(dir.join("res/textures")).unwrap();
    std::fs::write(dir.join("res/shaders/sprite.vert.spv"), spirv_header()).unwrap();
    std::fs::write(dir.join("res/shaders/sprite.frag.spv"), spirv_header()).unwrap();

    let image = image::RgbImage::from_pixel(16, 16, image::Rgb([150, 60, 30]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(dir.join("res/textures/kirpichi.png"), png).unwrap();
}

// ============================================================================
// WORKFLOW TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_load_and_render_sprite() {
    let dir = tempfile::tempdir().unwrap();
    write_assets(dir.path());

    Engine::initialize().unwrap();
    let renderer = StubRenderer::default();
    let log = Arc::clone(&renderer.log);
    let uniforms = Arc::clone(&renderer.uniforms);
    Engine::create_renderer(renderer).unwrap();
    let rm = Engine::create_resource_manager(&dir.path().join("battle_city")).unwrap();

    let context = WindowContext::new(640, 480);
    {
        let mut rm = rm.lock().unwrap();
        rm.load_shaders("SpriteShader", "res/shaders/sprite.vert.spv", "res/shaders/sprite.frag.spv").unwrap();
        rm.load_texture("DefaultTexture", "res/textures/kirpichi.png").unwrap();
        rm.load_sprite("NewSprite", "DefaultTexture", "SpriteShader", 500, 500).unwrap();
        rm.sprite_mut("NewSprite").unwrap().set_position(Vec2::new(500.0, 300.0));

        let program = rm.shader_program_mut("SpriteShader").unwrap();
        program.set_int("tex", 0);
        program.set_matrix4("projectionMat", context.projection_matrix());
    }

    let renderer = Engine::renderer().unwrap();
    let frame = renderer.lock().unwrap().begin_frame().unwrap().unwrap();
    rm.lock().unwrap().render_sprite("NewSprite", frame.as_ref()).unwrap();
    renderer.lock().unwrap().end_frame(frame).unwrap();

    assert_eq!(*log.lock().unwrap(), vec![
        "program".to_string(),
        "texture 0 16x16".to_string(),
        "draw 6 0".to_string(),
        "present".to_string(),
    ]);

    let block = uniforms.lock().unwrap().clone();
    let model: [f32; 16] = bytemuck::pod_read_unaligned(&block[0..64]);
    let projection: [f32; 16] = bytemuck::pod_read_unaligned(&block[64..128]);
    assert_eq!(&model[12..14], &[500.0, 300.0]);
    assert_eq!(Mat4::from_cols_array(&projection), context.projection_matrix());

    drop(rm);
    drop(renderer);
    Engine::shutdown();
}

#[test]
#[serial]
fn test_integration_missing_assets_report_errors() {
    let dir = tempfile::tempdir().unwrap();

    Engine::initialize().unwrap();
    Engine::create_renderer(StubRenderer::default()).unwrap();
    let rm = Engine::create_resource_manager(&dir.path().join("battle_city")).unwrap();

    {
        let mut rm = rm.lock().unwrap();
        let shader = rm.load_shaders("SpriteShader", "res/shaders/sprite.vert.spv", "res/shaders/sprite.frag.spv");
        assert!(matches!(shader, Err(Error::FileReadFailed(_))));
        let sprite = rm.load_sprite("NewSprite", "DefaultTexture", "SpriteShader", 500, 500);
        assert!(matches!(sprite, Err(Error::ResourceNotFound(_))));
        assert_eq!(rm.sprite_count(), 0);
    }

    drop(rm);
    Engine::shutdown();
}
