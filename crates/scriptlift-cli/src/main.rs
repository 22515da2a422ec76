use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use scriptlift_config::Settings;
use scriptlift_engine::{Diagnostic, MarkupMode, Severity, extract};
use std::path::{Path, PathBuf};
use std::{fs, process};

mod rules;

use rules::BuiltinRules;

#[derive(Parser)]
#[command(name = "scriptlift", version)]
#[command(about = "Lint script blocks embedded in HTML and XML documents")]
struct Cli {
    /// Config file to use instead of ~/.config/scriptlift/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Input {
    /// Document to read
    file: PathBuf,

    /// Read the document as XML whatever its extension
    #[arg(long, conflicts_with = "html")]
    xml: bool,

    /// Read the document as HTML whatever its extension
    #[arg(long)]
    html: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print each script fragment, dedented
    Extract {
        #[command(flatten)]
        input: Input,
    },
    /// Print the document with markup replaced by placeholders
    Transform {
        #[command(flatten)]
        input: Input,
    },
    /// Check script fragments with the built-in rules
    Lint {
        #[command(flatten)]
        input: Input,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let Some(config_path) = config else {
        log::debug!("Config path: {}", Settings::config_path().display());
        return Ok(Settings::load()?.unwrap_or_default());
    };
    match Settings::load_from_path(config_path)? {
        Some(settings) => Ok(settings),
        None => bail!("Config file '{}' does not exist", config_path.display()),
    }
}

fn resolve_mode(input: &Input, settings: &Settings) -> Option<MarkupMode> {
    if input.xml {
        Some(MarkupMode::Xml)
    } else if input.html {
        Some(MarkupMode::Html)
    } else {
        settings.file_mode(&input.file)
    }
}

fn read_document(input: &Input, settings: &Settings) -> Result<(String, MarkupMode)> {
    let Some(mode) = resolve_mode(input, settings) else {
        eprintln!(
            "Error: '{}' is neither an HTML nor an XML file",
            input.file.display()
        );
        eprintln!("Pass --html or --xml, or add its extension to the config file");
        process::exit(1);
    };
    let text = fs::read_to_string(&input.file)
        .with_context(|| format!("Failed to read '{}'", input.file.display()))?;
    Ok((text, mode))
}

fn format_diagnostic(path: &Path, diagnostic: &Diagnostic) -> String {
    let rule = diagnostic.rule_id.as_deref().unwrap_or("-");
    match diagnostic.location.filter(|_| !diagnostic.is_file_level()) {
        Some(location) => format!(
            "{}:{location}: {}: {} [{rule}]",
            path.display(),
            diagnostic.severity,
            diagnostic.message
        ),
        None => format!(
            "{}: {}: {} [{rule}]",
            path.display(),
            diagnostic.severity,
            diagnostic.message
        ),
    }
}

fn run(cli: Cli) -> Result<bool> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Extract { input } => {
            let (text, mode) = read_document(&input, &settings)?;
            let extraction = extract(&text, &settings.extract_options(mode))?;
            for fragment in &extraction.fragments {
                let lines = fragment.code.shared_original().lines();
                println!(
                    "--- <{}> at line {} ---",
                    fragment.tag.name,
                    lines.location_of(fragment.span.start).line
                );
                println!("{}", fragment.content());
            }
            Ok(true)
        }
        Command::Transform { input } => {
            let (text, mode) = read_document(&input, &settings)?;
            let extraction = extract(&text, &settings.extract_options(mode))?;
            print!("{}", extraction.document);
            Ok(true)
        }
        Command::Lint { input, json } => {
            let (text, mode) = read_document(&input, &settings)?;
            let diagnostics = settings
                .preprocessor(mode)
                .verify(&text, &mut BuiltinRules)?;
            log::info!(
                "{}: {} diagnostic(s)",
                input.file.display(),
                diagnostics.len()
            );

            if json {
                let report = serde_json::json!({
                    "file": input.file,
                    "diagnostics": diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for diagnostic in &diagnostics {
                    println!("{}", format_diagnostic(&input.file, diagnostic));
                }
            }
            Ok(!diagnostics
                .iter()
                .any(|diagnostic| diagnostic.severity == Severity::Error))
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    if !run(cli)? {
        process::exit(1);
    }
    Ok(())
}
