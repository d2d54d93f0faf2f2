use anyhow::Context;
use clap::{Parser, Subcommand};
use extquad_common::SurfaceTransform;
use extquad_render::{
    RecordingGl, RendererConfig, ShaderProgram, SurfaceTextureRenderer, TextureSource, shaders,
};
use glam::Mat4;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extquad-cli", about = "CLI tool for extquad renderer operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the built-in vertex and fragment shaders
    Shaders,
    /// Compile and link a fragment shader against the built-in vertex shader
    CheckShader {
        /// GLSL ES fragment shader source file
        path: PathBuf,
        /// Check against a context without GL_OES_EGL_image_external
        #[arg(long)]
        without_external_image: bool,
    },
    /// Replay frames with a zooming surface transform on the software backend
    Replay {
        /// Number of frames to draw
        #[arg(short, long, default_value = "5")]
        frames: u32,
        /// Texture-coordinate scale reached on the last frame
        #[arg(short, long, default_value = "0.5")]
        scale: f32,
        /// Renderer configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Fragment shader to swap in before the first frame
        #[arg(long)]
        shader: Option<PathBuf>,
        /// Print the GL calls issued for the last frame
        #[arg(long)]
        trace: bool,
    },
}

/// Stands in for a decoder: each frame zooms a little further into the texture.
struct ZoomingSource {
    frame: u32,
    frames: u32,
    target_scale: f32,
}

impl TextureSource for ZoomingSource {
    fn current_transform(&mut self) -> Mat4 {
        let t = if self.frames > 1 {
            self.frame as f32 / (self.frames - 1) as f32
        } else {
            1.0
        };
        self.frame += 1;
        SurfaceTransform::scale(1.0 + (self.target_scale - 1.0) * t)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("extquad-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", extquad_common::crate_info());
            println!("render: {}", extquad_render::crate_info());
            println!("render-glow: {}", extquad_render_glow::crate_info());
            println!(
                "required extension: {}",
                shaders::EXTERNAL_IMAGE_EXTENSION
            );
        }
        Commands::Shaders => {
            println!("// vertex shader");
            print!("{}", shaders::VERTEX_SHADER);
            println!();
            println!("// fragment shader");
            print!("{}", shaders::FRAGMENT_SHADER);
        }
        Commands::CheckShader {
            path,
            without_external_image,
        } => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let mut gl = if without_external_image {
                RecordingGl::with_extensions(Vec::<String>::new())
            } else {
                RecordingGl::new()
            };

            match ShaderProgram::build(&mut gl, shaders::VERTEX_SHADER, &source) {
                Ok(program) => {
                    println!("{}: OK", path.display());
                    if program.bindings().sampler.is_none() {
                        println!(
                            "note: no `{}` uniform, the sampler keeps its default unit",
                            shaders::SAMPLER_UNIFORM
                        );
                    }
                    program.release(&mut gl);
                }
                Err(e) if e.is_shader_error() => {
                    println!("{}: FAILED", path.display());
                    anyhow::bail!(e);
                }
                Err(e) => anyhow::bail!("context error while checking {}: {e}", path.display()),
            }
        }
        Commands::Replay {
            frames,
            scale,
            config,
            shader,
            trace,
        } => {
            let config = match config {
                Some(path) => RendererConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => RendererConfig::default(),
            };
            println!(
                "Replay: frames={frames}, scale={scale}, unbind_after_draw={}",
                config.unbind_after_draw
            );

            let mut gl = RecordingGl::new();
            let mut renderer = SurfaceTextureRenderer::new(config);
            renderer.setup(&mut gl)?;
            if let Some(path) = shader {
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                renderer.change_fragment_shader(&mut gl, Some(&source))?;
                println!("fragment shader: {}", path.display());
            }
            println!("external texture: {:?}", renderer.texture());

            let mut source = ZoomingSource {
                frame: 0,
                frames,
                target_scale: scale,
            };
            for i in 0..frames {
                gl.clear_calls();
                renderer.draw_from(&mut gl, &mut source)?;
                let draws = gl.take_draws();
                let Some(draw) = draws.last() else {
                    anyhow::bail!("frame {i} produced no draw call");
                };
                let corners: Vec<String> = draw
                    .sampled_uvs()
                    .iter()
                    .map(|[u, v]| format!("({u:.3}, {v:.3})"))
                    .collect();
                println!("frame {i}: uv corners {}", corners.join(" "));
            }

            if trace {
                println!("GL calls for the last frame:");
                for call in gl.calls() {
                    println!("  {call:?}");
                }
            }
            renderer.teardown(&mut gl)?;
            println!(
                "After teardown: programs={}, textures={}, buffers={}",
                gl.live_programs(),
                gl.live_textures(),
                gl.live_buffers()
            );
        }
    }

    Ok(())
}
