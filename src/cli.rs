// ============================================================================
// Deluxe Draw CLI: headless project handling via command-line arguments
// ============================================================================
//
// Usage examples:
//   deluxe-draw new sketch.ddp --width 800 --height 600
//   deluxe-draw info sketch.ddp
//   deluxe-draw export sketch.ddp flat.png
//   deluxe-draw export sketch.ddp flat.jpg --quality 80
//
// Everything runs synchronously on the current thread.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use crate::io::{self, ExportFormat, ProjectError};
use crate::logger;
use crate::project::Document;
use crate::settings::Settings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Deluxe Draw headless project tool.
#[derive(Parser, Debug)]
#[command(
    name = "deluxe-draw",
    version,
    about = "Create, inspect and export Deluxe Draw projects without a GUI"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug output to the session log and print timing information.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project with the default layers and palette.
    New {
        /// Destination project file (.ddp).
        output: PathBuf,
        /// Canvas width (defaults to the configured canvas size).
        #[arg(long)]
        width: Option<u32>,
        /// Canvas height (defaults to the configured canvas size).
        #[arg(long)]
        height: Option<u32>,
    },
    /// Print canvas size, layers and palette of a project.
    Info {
        project: PathBuf,
    },
    /// Flatten the visible layers of a project into a single image.
    Export {
        project: PathBuf,
        output: PathBuf,
        /// Output format. Inferred from the output extension when omitted.
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
        /// JPEG quality (1-100). Defaults to the configured quality.
        #[arg(short, long, value_name = "1-100")]
        quality: Option<u8>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Jpeg => ExportFormat::Jpeg,
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the requested command and return an OS exit code.
pub fn run(args: CliArgs, settings: &Settings) -> ExitCode {
    let started = Instant::now();
    let result = match &args.command {
        Command::New { output, width, height } => cmd_new(
            output,
            width.unwrap_or(settings.canvas_width),
            height.unwrap_or(settings.canvas_height),
        ),
        Command::Info { project } => cmd_info(project),
        Command::Export {
            project,
            output,
            format,
            quality,
        } => cmd_export(
            project,
            output,
            resolve_format(*format, output),
            quality.unwrap_or(settings.jpeg_quality),
        ),
    };

    match result {
        Ok(()) => {
            if args.verbose {
                println!("done in {:.1?}", started.elapsed());
                if let Some(path) = logger::log_path() {
                    println!("log: {}", path.display());
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Explicit `--format`, else the output extension, else PNG.
pub fn resolve_format(format: Option<FormatArg>, output: &Path) -> ExportFormat {
    format
        .map(ExportFormat::from)
        .or_else(|| ExportFormat::from_path(output))
        .unwrap_or(ExportFormat::Png)
}

fn cmd_new(output: &Path, width: u32, height: u32) -> Result<(), ProjectError> {
    if width == 0 || height == 0 {
        return Err(ProjectError::InvalidFormat(
            "Canvas dimensions cannot be zero".into(),
        ));
    }
    let doc = Document::new(width, height);
    io::save_project(&doc, output)?;
    println!("created {} ({}x{})", output.display(), width, height);
    Ok(())
}

fn cmd_info(project: &Path) -> Result<(), ProjectError> {
    let summary = io::inspect_package(BufReader::new(File::open(project)?))?;
    let meta = &summary.metadata;
    println!("{}", project.display());
    println!("  canvas:  {}x{}", meta.canvas_width, meta.canvas_height);
    println!("  version: {}", meta.version);
    println!("  layers:  {}", meta.layers.len());
    for (i, layer) in meta.layers.iter().enumerate() {
        println!(
            "    [{}] {:<24} {}{} opacity {:.2}",
            i,
            layer.name,
            if layer.visible { "visible" } else { "hidden " },
            if layer.locked { " locked" } else { "" },
            layer.opacity
        );
    }
    println!("  palette: {} colors", meta.palette.len());
    if !summary.stray_layers.is_empty() {
        println!("  unused rasters: {:?}", summary.stray_layers);
    }
    Ok(())
}

fn cmd_export(project: &Path, output: &Path, format: ExportFormat, quality: u8) -> Result<(), ProjectError> {
    let doc = io::load_project(project)?;
    io::export_flattened(&doc.layers, output, format, quality)?;
    println!("exported {} -> {}", project.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let args = CliArgs::try_parse_from(["deluxe-draw", "new", "a.ddp", "--width", "64"]).unwrap();
        match args.command {
            Command::New { output, width, height } => {
                assert_eq!(output, PathBuf::from("a.ddp"));
                assert_eq!(width, Some(64));
                assert_eq!(height, None);
            }
            other => panic!("unexpected {other:?}"),
        }

        let args = CliArgs::try_parse_from(["deluxe-draw", "export", "a.ddp", "b.out", "-f", "jpg", "-v"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Export { format: Some(FormatArg::Jpeg), .. }));

        assert!(CliArgs::try_parse_from(["deluxe-draw", "export", "a.ddp"]).is_err());
    }

    #[test]
    fn format_resolution() {
        assert_eq!(resolve_format(None, Path::new("x.JPEG")), ExportFormat::Jpeg);
        assert_eq!(resolve_format(None, Path::new("x.bin")), ExportFormat::Png);
        assert_eq!(resolve_format(Some(FormatArg::Png), Path::new("x.jpg")), ExportFormat::Png);
    }

    #[test]
    fn new_then_export_round_trip() {
        let dir = std::env::temp_dir().join(format!("deluxe-draw-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let project = dir.join("a.ddp");
        let flat = dir.join("a.png");

        cmd_new(&project, 16, 8).unwrap();
        cmd_info(&project).unwrap();
        cmd_export(&project, &flat, ExportFormat::Png, 90).unwrap();

        let img = io::decode_image(&std::fs::read(&flat).unwrap()).unwrap();
        assert_eq!(img.dimensions(), (16, 8));
        assert_eq!(img.get_pixel(3, 3).0, [255, 255, 255, 255]);
        assert!(cmd_new(&dir.join("zero.ddp"), 0, 8).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
