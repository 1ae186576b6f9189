//! # Laurel CLI
//!
//! Command-line interface for bulk certificate generation.
//!
//! ## Usage
//!
//! ```bash
//! # Render a single certificate
//! laurel render --template template.png --name "Ada Lovelace" --output ada.png
//!
//! # Render a batch from a CSV into a ZIP
//! laurel batch --template template.png --names-csv names.csv --zip certificates.zip
//!
//! # Render a batch into a directory, with a custom layer file
//! laurel batch --template template.png --layers layers.json \
//!     --name "Ada Lovelace" --name "Grace Hopper" --output-dir out/
//!
//! # List font families
//! laurel fonts
//!
//! # Start the HTTP API
//! laurel serve --listen 0.0.0.0:8080
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use laurel::{
    LaurelError,
    batch::BatchRenderer,
    codec::{EncodeOptions, OutputFormat},
    config::Config,
    export,
    layer::{Layer, LayerStack},
    logging,
    recipients::RecipientList,
    render::{FontBook, RenderOptions, Renderer},
    server,
    template::Template,
};

/// Laurel - Bulk certificate generator
#[derive(Parser, Debug)]
#[command(name = "laurel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra font directory (repeatable)
    #[arg(long, global = true, value_name = "DIR")]
    font_dir: Vec<PathBuf>,

    /// Log level filter (overrides LAUREL_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one certificate
    Render {
        /// Template image
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Recipient name
        #[arg(long)]
        name: String,

        /// JSON file with an array of layers (defaults to one recipient layer)
        #[arg(long, value_name = "FILE")]
        layers: Option<PathBuf>,

        /// Brightness adjustment, -100 to 100
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        brightness: i32,

        /// Contrast adjustment, -100 to 100
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        contrast: i32,

        /// Output format (png or jpeg); inferred from the output extension if omitted
        #[arg(long)]
        format: Option<OutputFormat>,

        /// JPEG quality, 1-100
        #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// Output file
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Render one certificate per recipient
    Batch {
        /// Template image
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// CSV file; the first column of each row is a name
        #[arg(long, value_name = "FILE", conflicts_with = "name", required_unless_present = "name")]
        names_csv: Option<PathBuf>,

        /// Recipient name (repeatable)
        #[arg(long)]
        name: Vec<String>,

        /// JSON file with an array of layers (defaults to one recipient layer)
        #[arg(long, value_name = "FILE")]
        layers: Option<PathBuf>,

        /// Brightness adjustment, -100 to 100
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        brightness: i32,

        /// Contrast adjustment, -100 to 100
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        contrast: i32,

        /// Output format
        #[arg(long, default_value = "png")]
        format: OutputFormat,

        /// JPEG quality, 1-100
        #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// Write each certificate into this directory
        #[arg(long, value_name = "DIR", conflicts_with = "zip", required_unless_present = "zip")]
        output_dir: Option<PathBuf>,

        /// Write all certificates into one ZIP archive
        #[arg(long, value_name = "FILE")]
        zip: Option<PathBuf>,
    },

    /// List available font families
    Fonts,

    /// Start the HTTP API server
    Serve {
        /// Address to listen on (overrides LAUREL_LISTEN)
        #[arg(long)]
        listen: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), LaurelError> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    config.font_dirs.extend(cli.font_dir);
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    logging::init(&config.logging);

    match cli.command {
        Commands::Render {
            template,
            name,
            layers,
            brightness,
            contrast,
            format,
            quality,
            output,
        } => {
            let format = match format {
                Some(format) => format,
                None => format_from_extension(&output)?,
            };
            let fonts = FontBook::new(&config.font_dirs, true);
            let template = Template::open(&template)?;
            let layers = load_layers(layers.as_deref())?;
            let encode = EncodeOptions {
                jpeg_quality: quality,
                ..EncodeOptions::new(format)
            };

            let renderer = Renderer::with_options(&fonts, RenderOptions { brightness, contrast });
            let bytes = renderer.render_encoded(&template, layers.as_slice(), &name, &encode)?;
            std::fs::write(&output, &bytes)?;

            let (width, height) = template.dimensions();
            println!(
                "Saved {}x{} certificate for {} to {}",
                width,
                height,
                name,
                output.display()
            );
        }

        Commands::Batch {
            template,
            names_csv,
            name,
            layers,
            brightness,
            contrast,
            format,
            quality,
            output_dir,
            zip,
        } => {
            let recipients = match names_csv {
                Some(path) => {
                    let mut list = RecipientList::new(config.max_recipients);
                    let report = list.import_csv_file(&path)?;
                    println!(
                        "Imported {} names from {} ({} duplicate, {} blank, {} over the limit of {})",
                        report.added,
                        path.display(),
                        report.duplicates,
                        report.blank,
                        report.dropped,
                        list.capacity()
                    );
                    list
                }
                None => RecipientList::from_names(&name, config.max_recipients)?,
            };

            let fonts = FontBook::new(&config.font_dirs, true);
            let template = Template::open(&template)?;
            let layers = load_layers(layers.as_deref())?;
            let encode = EncodeOptions {
                jpeg_quality: quality,
                ..EncodeOptions::new(format)
            };

            let renderer = Renderer::with_options(&fonts, RenderOptions { brightness, contrast });
            let certificates = BatchRenderer::new(renderer, &template, layers.as_slice())
                .encode_options(encode)
                .run_with_progress(&recipients, |progress| {
                    println!(
                        "[{:>3}%] {}/{}",
                        progress.percent(),
                        progress.completed,
                        progress.total
                    );
                })?;

            match (output_dir, zip) {
                (_, Some(zip_path)) => {
                    export::write_archive(&zip_path, &certificates)?;
                    println!(
                        "Saved {} certificates to {}",
                        certificates.len(),
                        zip_path.display()
                    );
                }
                (Some(dir), None) => {
                    let paths = export::write_files(&dir, &certificates)?;
                    println!("Saved {} certificates to {}", paths.len(), dir.display());
                }
                (None, None) => {
                    return Err(LaurelError::Validation(
                        "Either --output-dir or --zip is required".to_string(),
                    ));
                }
            }
        }

        Commands::Fonts => {
            let fonts = FontBook::new(&config.font_dirs, true);
            let families = fonts.families();
            if families.is_empty() {
                println!("No fonts found. Install system fonts or pass --font-dir.");
            } else {
                println!("Available font families:");
                for family in families {
                    println!("  {}", family);
                }
            }
        }

        Commands::Serve { listen } => {
            if let Some(addr) = listen {
                config.listen_addr = addr;
            }
            let fonts = FontBook::new(&config.font_dirs, true);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(config, fonts))?;
        }
    }

    Ok(())
}

/// Layers from a JSON array file, or the default stack.
fn load_layers(path: Option<&Path>) -> Result<LayerStack, LaurelError> {
    let Some(path) = path else {
        return Ok(LayerStack::with_defaults());
    };
    let json = std::fs::read_to_string(path)?;
    let layers: Vec<Layer> = serde_json::from_str(&json).map_err(|e| {
        LaurelError::Validation(format!("Invalid layer file {}: {}", path.display(), e))
    })?;
    for layer in &layers {
        layer.validate()?;
    }
    LayerStack::from_layers(layers)
}

fn format_from_extension(path: &Path) -> Result<OutputFormat, LaurelError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.parse(),
        None => Ok(OutputFormat::Png),
    }
}
