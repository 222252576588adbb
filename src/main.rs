//! Mihbara command line - headless export and brush sharing

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use mihbara_lib::brush::{
    decode_brush_link, encode_brush_link, export_brush_file, find_builtin, import_brush_from_path,
    render_brush_preview, suggested_file_name, Brush, BRUSH_FILE_EXTENSION,
};
use mihbara_lib::config::EngineConfig;
use mihbara_lib::core::assets::AssetResolver;
use mihbara_lib::project::Project;
use mihbara_lib::raster::RasterSurface;
use mihbara_lib::render::{export_thumbnail, export_to_path, Compositor};

/// Render Mihbara projects and share brushes
#[derive(Parser, Debug)]
#[command(name = "mihbara")]
#[command(version)]
struct Args {
    /// Engine tunables (JSON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten a project to PNG
    Export {
        project: PathBuf,
        output: PathBuf,
        /// Rasterize layers on worker threads
        #[arg(long)]
        parallel: bool,
    },
    /// Write a downsized PNG of a project
    Thumbnail {
        project: PathBuf,
        output: PathBuf,
        /// Longest edge in pixels (defaults to the configured edge)
        #[arg(long)]
        edge: Option<u32>,
    },
    /// Render a brush preview stroke
    BrushPreview {
        /// Preset id (e.g. b-ink) or path to a .brush file
        brush: String,
        output: PathBuf,
        #[arg(long, default_value = "#000000")]
        color: String,
        #[arg(long, default_value = "200")]
        width: u32,
        #[arg(long, default_value = "100")]
        height: u32,
    },
    /// Print a shareable link code for a brush
    BrushLink {
        /// Preset id or path to a .brush file
        brush: String,
    },
    /// Decode a link code and save it as a .brush file
    BrushUnlink {
        code: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_project(path: &Path) -> Result<Project> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read project {}", path.display()))?;
    Project::from_json(&json).with_context(|| format!("Invalid project {}", path.display()))
}

fn load_brush(name: &str) -> Result<Brush> {
    if let Some(brush) = find_builtin(name) {
        return Ok(brush);
    }
    let path = Path::new(name);
    if path.extension().and_then(|e| e.to_str()) == Some(BRUSH_FILE_EXTENSION) || path.exists() {
        return import_brush_from_path(path)
            .with_context(|| format!("Failed to import brush {}", path.display()));
    }
    bail!("Unknown brush '{}': not a preset id or .brush file", name)
}

/// Image paths inside a project are relative to the project file
fn resolver_for(project_path: &Path) -> AssetResolver {
    match project_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => AssetResolver::with_base_dir(dir),
        _ => AssetResolver::new(),
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Export {
            project,
            output,
            parallel,
        } => {
            let resolver = resolver_for(&project);
            let doc = load_project(&project)?;
            let compositor =
                Compositor::new(&config, &resolver).parallel(parallel || config.compose.parallel);
            export_to_path(&compositor, &doc, &output)
                .with_context(|| format!("Failed to export {}", output.display()))?;
        }
        Command::Thumbnail {
            project,
            output,
            edge,
        } => {
            let resolver = resolver_for(&project);
            let doc = load_project(&project)?;
            let compositor = Compositor::new(&config, &resolver);
            let png = export_thumbnail(
                &compositor,
                &doc,
                edge.unwrap_or(config.compose.thumbnail_edge),
            )?;
            std::fs::write(&output, png)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!("Wrote thumbnail {}", output.display());
        }
        Command::BrushPreview {
            brush,
            output,
            color,
            width,
            height,
        } => {
            let brush = load_brush(&brush)?;
            let surface = render_brush_preview(&brush, &color, width, height)?;
            std::fs::write(&output, surface.encode_png()?)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!("Wrote preview of '{}' to {}", brush.name, output.display());
        }
        Command::BrushLink { brush } => {
            let brush = load_brush(&brush)?;
            println!("{}", encode_brush_link(&brush)?);
        }
        Command::BrushUnlink { code, out_dir } => {
            let brush = decode_brush_link(&code).context("Invalid brush link")?;
            let path = out_dir.join(suggested_file_name(&brush));
            std::fs::write(&path, export_brush_file(&brush)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    mihbara_lib::init();
    run(Args::parse())
}
