use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;

use listing_features::config::PipelineConfig;
use listing_features::geo_data::{read_sheet, shop_names};
use listing_features::geocode::{geocode_shops, write_shop_locations, Geocoder};
use listing_features::logging::init_logging;

#[derive(Parser)]
#[command(name = "listing-features", version, about = "Clean scraped property listings and engineer location features")]
struct Cli {
    /// TOML file overriding the default configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory relative input paths are resolved against
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the analysis and model tables
    Run {
        #[arg(long)]
        analysis_out: Option<PathBuf>,
        #[arg(long)]
        model_out: Option<PathBuf>,
        /// Leave entity names unmapped when their best match scores below this
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_match_score: Option<u8>,
        /// Use a `shopping_mall,lat,lon` file instead of the workbook shop sheet
        #[arg(long)]
        shop_locations: Option<PathBuf>,
    },
    /// Geocode the workbook's shopping malls into a `shopping_mall,lat,lon` file
    GeocodeShops {
        #[arg(short, long, default_value = "shop_locations.csv")]
        out: PathBuf,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.inputs.rebase(dir);
    }
    Ok(config)
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Run {
            analysis_out,
            model_out,
            min_match_score,
            shop_locations,
        } => {
            if let Some(path) = analysis_out {
                config.outputs.analysis = path;
            }
            if let Some(path) = model_out {
                config.outputs.model = path;
            }
            if min_match_score.is_some() {
                config.min_match_score = min_match_score;
            }
            if shop_locations.is_some() {
                config.inputs.shop_locations = shop_locations;
            }

            let summary = listing_features::run(&config).context("pipeline failed")?;
            println!(
                "{} of {} listings kept; wrote {} analysis rows to {} and {} model rows to {}",
                summary.clean.kept(),
                summary.clean.input,
                summary.analysis_rows,
                config.outputs.analysis.display(),
                summary.model_rows,
                config.outputs.model.display()
            );
        }
        Command::GeocodeShops { out } => {
            let sheet = read_sheet(&config.inputs.workbook, &config.sheets.shops)?;
            let names = shop_names(&sheet)?;
            let geocoder = Geocoder::new(config.geocoder.clone())?;
            let shops = geocode_shops(&names, &geocoder).context("geocoding failed")?;
            write_shop_locations(&out, &shops)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("wrote {} shops to {}", shops.len(), out.display());
        }
    }

    Ok(())
}

fn main() {
    if let Err(e) = real_main() {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}
