use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for extquad")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, shader lint
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Compile every fragment shader in a directory against the built-in vertex shader
    ShaderLint {
        #[arg(default_value = "shaders")]
        dir: PathBuf,
    },
    /// Build rustdoc for the workspace
    Doc,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo("fmt", &["fmt", "--all", "--", "--check"])?;
            cargo(
                "clippy",
                &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            )?;
            cargo("test", &["test", "--workspace"])?;
            shader_lint(Path::new("shaders"))?;
        }
        Commands::Fmt => cargo("fmt", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => cargo(
            "clippy",
            &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        )?,
        Commands::Test => cargo("test", &["test", "--workspace"])?,
        Commands::ShaderLint { dir } => shader_lint(&dir)?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
    }

    Ok(())
}

fn cargo(label: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {label}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {label} failed");
    }
    Ok(())
}

fn is_fragment_shader(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("frag" | "glsl")
    )
}

fn shader_lint(dir: &Path) -> Result<()> {
    println!("==> Linting fragment shaders in {}", dir.display());
    let mut shaders: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_fragment_shader(p))
        .collect();
    shaders.sort();

    let mut failed = Vec::new();
    for shader in &shaders {
        let status = Command::new("cargo")
            .args(["run", "--quiet", "-p", "extquad-cli", "--", "check-shader"])
            .arg(shader)
            .status()?;
        if !status.success() {
            failed.push(shader.display().to_string());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} shader(s) failed: {}", failed.len(), failed.join(", "));
    }
    println!("{} shader(s) OK", shaders.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_shader_extensions() {
        assert!(is_fragment_shader(Path::new("shaders/grayscale.frag")));
        assert!(is_fragment_shader(Path::new("a/b.glsl")));
        assert!(!is_fragment_shader(Path::new("README.md")));
        assert!(!is_fragment_shader(Path::new("frag")));
    }
}
