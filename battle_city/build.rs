//! Build script: copy res/ next to the executable
//!
//! Textures are copied as-is. GLSL shaders are compiled to SPIR-V with
//! `glslc` (Vulkan SDK / shaderc) into `<name>.spv` beside the copies.
//! Without `glslc` the build still succeeds with a warning and the game
//! reports the missing .spv files at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_EXTENSIONS: [&str; 2] = ["vert", "frag"];

fn main() {
    println!("cargo:rerun-if-changed=res");

    let Some(target_dir) = target_profile_dir() else {
        println!("cargo:warning=Cannot locate the target directory, assets not copied");
        return;
    };

    let source = Path::new("res");
    let destination = target_dir.join("res");
    if let Err(error) = copy_dir(source, &destination) {
        println!("cargo:warning=Failed to copy assets: {}", error);
        return;
    }

    compile_shaders(&source.join("shaders"), &destination.join("shaders"));
}

/// `target/<profile>`, three levels above OUT_DIR
fn target_profile_dir() -> Option<PathBuf> {
    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR")?);
    out_dir.ancestors().nth(3).map(Path::to_path_buf)
}

fn copy_dir(source: &Path, destination: &Path) -> io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let target = destination.join(entry.file_name());
        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

fn is_shader_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SHADER_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn compile_shaders(source_dir: &Path, output_dir: &Path) {
    let Ok(entries) = fs::read_dir(source_dir) else {
        return;
    };

    let mut shaders: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_shader_source(p))
        .collect();
    shaders.sort();

    for shader in shaders {
        let Some(file_name) = shader.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let output = output_dir.join(format!("{}.spv", file_name));

        match Command::new("glslc").arg(&shader).arg("-o").arg(&output).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                println!("cargo:warning=glslc failed on {} ({})", shader.display(), status);
            }
            Err(_) => {
                println!("cargo:warning=glslc not found, {} was not compiled", shader.display());
            }
        }
    }
}
