//! `typelens` - runtime type annotations for JavaScript snippets
//!
//! Runs a script under the V8 inspector with type profiling enabled and
//! renders the observed types inline, either once from the command line
//! or behind an HTTP server.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use console::Style;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ConfigCommand, OutputFormat};
use typelens_core::config::find_config_file;
use typelens_core::page::{render_logs, render_page, Template};
use typelens_core::{Annotation, Config, Typelens, TypelensError};

mod cli;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        let blue = Style::new().blue();
        println!(
            "{} v{} ({})",
            blue.apply_to("typelens"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH")
        );
        return Ok(());
    }

    init_tracing(cli.verbose);

    let mut config = Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Annotate { file, format, output }) => {
            handle_annotate(config, file.as_deref(), format, output.as_deref()).await?;
        }

        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::start_server(config).await?;
        }

        Some(Commands::Config { cmd }) => handle_config(&cli.config, &config, cmd)?,

        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

/// Logs go to stderr so annotated output on stdout stays clean
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn handle_annotate(
    config: Config,
    file: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let source = read_source(file)?;
    let template = Template::from_config(&config.server)?;
    let outcome = Typelens::new(config).collect_and_annotate(&source).await;

    let rendered = render_output(format, &template, &source, &outcome)?;
    match output {
        Some(path) => std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    match outcome {
        Ok(annotation) => {
            if format == OutputFormat::Fragment {
                print_logs(&annotation);
            }
            Ok(())
        }
        Err(e) => bail!(e.user_message()),
    }
}

fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read source from stdin")?;
            Ok(source)
        }
    }
}

fn render_output(
    format: OutputFormat,
    template: &Template,
    source: &str,
    outcome: &std::result::Result<Annotation, TypelensError>,
) -> Result<String> {
    let rendered = match (format, outcome) {
        (OutputFormat::Page, outcome) => render_page(template, source, outcome.as_ref()),
        (OutputFormat::Json, Ok(annotation)) => serde_json::to_string_pretty(annotation)?,
        (OutputFormat::Json, Err(e)) => serde_json::to_string_pretty(&json!({ "error": e.user_message() }))?,
        (OutputFormat::Fragment, Ok(annotation)) => annotation.annotated.clone(),
        (OutputFormat::Fragment, Err(_)) => String::new(),
    };
    Ok(rendered)
}

/// Console output from the script, on stderr next to the fragment
fn print_logs(annotation: &Annotation) {
    let dim = Style::new().dim();
    for log in &annotation.logs {
        eprintln!("{} {}", dim.apply_to(format!("[console.{}]", log.level)), log.value);
    }
}

fn handle_config(explicit: &Option<PathBuf>, config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Path => {
            let path = explicit
                .clone()
                .or_else(find_config_file)
                .or_else(Config::default_path);
            match path {
                Some(path) if path.exists() => println!("{}", path.display()),
                Some(path) => println!("{} (not created, using defaults)", path.display()),
                None => bail!("No configuration directory available"),
            }
        }
        ConfigCommand::Show => print!("{}", config.to_toml()?),
        ConfigCommand::Init { force } => {
            let path = Config::default_path().context("No configuration directory available")?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save(&path)?;
            let green = Style::new().green();
            println!("{} {}", green.apply_to("Wrote"), path.display());
        }
    }
    Ok(())
}
