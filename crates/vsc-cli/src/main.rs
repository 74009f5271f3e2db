use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vsc_cli::commands::{condense, support};
use vsc_cli::{Cli, Commands, Config, input};
use vsc_geoip::MaxMindEnricher;

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn configure_threads(threads: Option<usize>) -> Result<()> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker threads")?;
    }
    Ok(())
}

fn run_condense(
    config: &Config,
    inputs: &[PathBuf],
    isp_db: Option<&Path>,
    geo_db: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let enricher = MaxMindEnricher::open(
        isp_db.or(config.isp_database.as_deref()),
        geo_db.or(config.geo_database.as_deref()),
    )
    .context("failed to open GeoIP databases")?;
    let inputs = input::resolve(inputs);

    let counters = if let Some(path) = output {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let counters = condense::run(&mut writer, &inputs, &enricher)?;
        writer.flush()?;
        counters
    } else {
        let mut writer = BufWriter::new(io::stdout().lock());
        let counters = condense::run(&mut writer, &inputs, &enricher)?;
        writer.flush()?;
        counters
    };

    condense::write_counters(&mut io::stderr().lock(), &counters)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout carries summaries, so logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Condense {
            inputs,
            isp_db,
            geo_db,
            output,
            threads,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            configure_threads(threads.or(config.threads))?;
            run_condense(
                &config,
                inputs,
                isp_db.as_deref(),
                geo_db.as_deref(),
                output.as_deref(),
            )?;
        }
        Some(Commands::Support { source_tag, inputs }) => {
            let mut stdout = io::stdout().lock();
            support::run(&mut stdout, source_tag, inputs)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
