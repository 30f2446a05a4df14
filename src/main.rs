use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use lumi_healer::dom::{DomParser, HtmlParser};
use lumi_healer::healer::{hint_tokens, playwright_selector, Candidate, CandidateGenerator};
use lumi_healer::maintenance::{self, MaintenanceOptions, MaintenanceOutcome, VerifyReport};
use lumi_healer::predict::{build_predictor, Predictor, TemplatePredictor};
use lumi_healer::utils::config::PredictorKind;
use lumi_healer::{Config, ConfigLoader, SelectorType, Strategy, StrategyStore};

#[derive(Parser)]
#[command(name = "lumi-healer")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Self-healing locator store maintenance CLI", long_about = None)]
struct Cli {
    /// Config file (defaults to ./lumi-healer.yaml, then ~/.lumi-healer/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Strategy store file, overriding the config
    #[arg(long, global = true)]
    db_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report store contents without changing anything
    Verify {
        /// Back up the store file first
        #[arg(long, default_value = "false")]
        backup: bool,
    },

    /// Remove strategies not used for more than N days
    Prune {
        /// Age threshold in days (defaults to staleDays from the config)
        #[arg(short, long)]
        days: Option<u64>,

        /// Back up the store file first
        #[arg(long, default_value = "false")]
        backup: bool,
    },

    /// Keep only the newest strategy per type for every locator
    Optimize {
        /// Back up the store file first
        #[arg(long, default_value = "false")]
        backup: bool,
    },

    /// Copy the store file to <stem>.backup.<epoch>.json
    Backup,

    /// Pre-seed a strategy for a locator
    Register {
        /// Locator id
        locator: String,

        /// Selector type (css, xpath, text, role, alt, label, placeholder, testid)
        #[arg(value_name = "TYPE")]
        selector_type: String,

        /// Selector value
        selector: String,
    },

    /// Show heuristic candidates for a locator against a saved HTML page
    Candidates {
        /// Locator id
        locator: String,

        /// Saved HTML file
        html: PathBuf,
    },

    /// Show predictor output for a locator against a saved HTML page
    Predict {
        /// Locator id
        locator: String,

        /// Saved HTML file
        html: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigLoader::load_default()?,
    };
    if let Some(db_file) = cli.db_file {
        config.store_path = db_file;
    }

    match cli.command {
        Commands::Verify { backup } => {
            let outcome = run_maintenance(
                &config,
                MaintenanceOptions {
                    backup,
                    verify: true,
                    ..Default::default()
                },
            )?;
            if let Some(report) = &outcome.report {
                print_report(report);
            }
        }

        Commands::Prune { days, backup } => {
            let days = days.unwrap_or(config.stale_days);
            println!(
                "{} Pruning strategies older than {} days in {}",
                "▶".green().bold(),
                days.to_string().cyan(),
                config.store_path.display()
            );
            let outcome = run_maintenance(
                &config,
                MaintenanceOptions {
                    backup,
                    remove_stale_days: Some(days),
                    ..Default::default()
                },
            )?;
            println!(
                "{} Removed {} stale strategies",
                "✓".green().bold(),
                outcome.removed_stale.to_string().yellow()
            );
        }

        Commands::Optimize { backup } => {
            println!(
                "{} Optimizing {}",
                "▶".green().bold(),
                config.store_path.display()
            );
            let outcome = run_maintenance(
                &config,
                MaintenanceOptions {
                    backup,
                    optimize: true,
                    ..Default::default()
                },
            )?;
            println!(
                "{} Removed {} redundant strategies",
                "✓".green().bold(),
                outcome.optimized.to_string().yellow()
            );
        }

        Commands::Backup => {
            let path = maintenance::backup(&config.store_path)?;
            println!("{} Backup written to {}", "✓".green().bold(), path.display());
        }

        Commands::Register {
            locator,
            selector_type,
            selector,
        } => {
            let selector_type = SelectorType::parse(&selector_type);
            if let SelectorType::Unknown(raw) = selector_type.base() {
                anyhow::bail!("Unknown selector type: {}", raw);
            }

            let mut store = StrategyStore::open_existing(&config.store_path)?;
            let strategy = Strategy::new(selector_type.clone(), selector.as_str());
            if store.seed(&locator, strategy) {
                store.save()?;
                println!(
                    "{} Registered {} '{}' for {}",
                    "✓".green().bold(),
                    selector_type.to_string().cyan(),
                    selector,
                    locator.cyan()
                );
            } else {
                println!(
                    "{} {} '{}' is already stored for {}",
                    "ℹ".blue(),
                    selector_type,
                    selector,
                    locator
                );
            }
        }

        Commands::Candidates { locator, html } => {
            let markup = read_html(&html)?;
            let generator = CandidateGenerator::new(&locator);
            let elements = HtmlParser::new().parse(&markup);

            println!(
                "{} {} elements parsed, hints: {}",
                "🔍".to_string().blue(),
                elements.len(),
                generator.hints().join(", ").cyan()
            );
            print_candidates(&generator.rank(&elements), config.max_candidate_attempts);
        }

        Commands::Predict { locator, html } => {
            let markup = read_html(&html)?;
            // A disabled predictor still previews the stateless templates
            let predictor: Box<dyn Predictor> = match config.predictor {
                PredictorKind::None => {
                    Box::new(TemplatePredictor::new().with_max_predictions(config.max_predictions))
                }
                _ => build_predictor(&config)
                    .context("No predictor could be built from the configuration")?,
            };
            let candidates = predictor.predict(&locator, &markup, &hint_tokens(&locator));
            print_candidates(&candidates, config.max_candidate_attempts);
        }
    }

    Ok(())
}

fn run_maintenance(config: &Config, options: MaintenanceOptions) -> anyhow::Result<MaintenanceOutcome> {
    let outcome = maintenance::run(&config.store_path, &options)?;
    if let Some(path) = &outcome.backup {
        println!("{} Backup written to {}", "✓".green().bold(), path.display());
    }
    Ok(outcome)
}

fn read_html(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_report(report: &VerifyReport) {
    println!("{}", "=== Store Summary ===".bold());
    println!("  Locators:   {}", report.total_locators.to_string().cyan());
    println!("  Strategies: {}", report.total_strategies.to_string().cyan());
    println!("  Empty:      {}", report.empty_locators.len().to_string().yellow());
    if !report.empty_locators.is_empty() {
        println!("    {}", report.empty_locators.join(", ").dimmed());
    }

    println!("{}", "=== By Type ===".bold());
    for (selector_type, count) in &report.by_type {
        println!("  {:<20} {}", selector_type, count);
    }

    let ages = &report.by_age;
    println!("{}", "=== By Last Use ===".bold());
    println!("  Last day:     {}", ages.last_day.to_string().green());
    println!("  Last week:    {}", ages.last_week.to_string().green());
    println!("  Last month:   {}", ages.last_month.to_string().yellow());
    println!("  Last 90 days: {}", ages.last_quarter.to_string().yellow());
    println!("  Older:        {}", ages.older.to_string().red());
}

fn print_candidates(candidates: &[Candidate], attempted: usize) {
    if candidates.is_empty() {
        println!("{} No candidates", "✗".red().bold());
        return;
    }

    for (i, candidate) in candidates.iter().enumerate() {
        let marker = if i < attempted { "▶".green() } else { " ".normal() };
        let rendered = playwright_selector(&candidate.selector_type, &candidate.selector)
            .unwrap_or_else(|| candidate.selector.clone());
        let kind = candidate
            .element_kind
            .map(|k| format!(" [{}]", k))
            .unwrap_or_default();
        println!(
            "{} {:>2}. {:.2}  {:<8} {}{}",
            marker,
            i + 1,
            candidate.score,
            candidate.selector_type.to_string().cyan(),
            rendered,
            kind.dimmed()
        );
    }
}
