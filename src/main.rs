use anyhow::{Context, Result};
use barback::optimizer::grid_size;
use barback::prelude::*;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "barback")]
#[command(about = "Backtest indicator strategies and search their parameters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run one backtest with the configured indicator parameters
    Run {
        //path to strategy configuration json
        #[arg(long)]
        config: PathBuf,

        //override the csv data file from the configuration
        #[arg(long)]
        data: Option<PathBuf>,

        //stop loss percentage (0 disables)
        #[arg(long)]
        stop_loss: Option<f64>,

        //take profit percentage (0 disables)
        #[arg(long)]
        take_profit: Option<f64>,

        //starting capital
        #[arg(long)]
        initial_capital: Option<f64>,

        //fraction of capital committed per entry, in (0, 1]
        #[arg(long)]
        position_size: Option<f64>,

        //output options
        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,
    },

    //search indicator parameters for the best objective
    Optimise {
        //path to strategy configuration json
        #[arg(long)]
        config: PathBuf,

        //override the csv data file from the configuration
        #[arg(long)]
        data: Option<PathBuf>,

        //number of trials
        #[arg(long)]
        trials: Option<usize>,

        //search method (random, grid)
        #[arg(long)]
        method: Option<SearchMethod>,

        //seed for reproducible random search
        #[arg(long)]
        seed: Option<u64>,

        //write the configuration with the best parameters applied
        #[arg(long)]
        write_best: Option<PathBuf>,
    },

    //write an example configuration
    Init {
        #[arg(long, default_value = "strategy.json")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            stop_loss,
            take_profit,
            initial_capital,
            position_size,
            output_equity_csv,
            output_trades_csv,
        } => {
            let mut config = load_config(&config, data)?;
            if let Some(pct) = stop_loss {
                config.risk = config.risk.with_stop_loss(pct);
            }
            if let Some(pct) = take_profit {
                config.risk = config.risk.with_take_profit(pct);
            }
            if let Some(capital) = initial_capital {
                config.risk = config.risk.with_initial_capital(capital);
            }
            if let Some(fraction) = position_size {
                config.risk = config.risk.with_position_size(fraction);
            }
            if output_equity_csv.is_some() {
                config.output_equity_csv = output_equity_csv;
            }
            if output_trades_csv.is_some() {
                config.output_trades_csv = output_trades_csv;
            }
            run_manual(&config)?;
        }
        Commands::Optimise {
            config,
            data,
            trials,
            method,
            seed,
            write_best,
        } => {
            let mut config = load_config(&config, data)?;
            if let Some(trials) = trials {
                config.optimizer.trials = trials;
            }
            if let Some(method) = method {
                config.optimizer.method = method;
            }
            if seed.is_some() {
                config.optimizer.seed = seed;
            }
            run_search(&config, write_best.as_deref())?;
        }
        Commands::Init { out } => {
            StrategyConfiguration::default()
                .to_json_file(&out)
                .context(format!("Failed to write configuration to {:?}", out))?;
            println!("Example configuration written to {:?}", out);
        }
    }

    Ok(())
}

fn load_config(path: &Path, data: Option<PathBuf>) -> Result<StrategyConfiguration> {
    let mut config = StrategyConfiguration::from_json_file(path)
        .context(format!("Failed to load configuration from {:?}", path))?;
    if let Some(data) = data {
        config.data_path = data;
    }
    Ok(config)
}

fn load_table(config: &StrategyConfiguration) -> Result<PriceTable> {
    println!("Loading data from {:?}...", config.data_path);
    let bars = load_csv_for_symbol(&config.data_path, config.symbol.as_deref())
        .context(format!("Failed to load data from {:?}", config.data_path))?;

    if bars.is_empty() {
        match &config.symbol {
            Some(symbol) => anyhow::bail!("No data found for symbol {}", symbol),
            None => anyhow::bail!("No data found in {:?}", config.data_path),
        }
    }

    let table = PriceTable::from_bars(&bars)?;
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        println!("Loaded {} bars", bars.len());
        println!("Date range: {} to {}\n", first.timestamp, last.timestamp);
    }
    Ok(table)
}

fn run_manual(config: &StrategyConfiguration) -> Result<()> {
    println!("Barback Backtest");
    println!("================\n");

    let mut table = load_table(config)?;

    for indicator in &config.indicators {
        let added = augment_in_place(&mut table, indicator, &indicator.params, &BuiltinIndicators)
            .context(format!("Failed to compute indicator {}", indicator.name))?;
        println!("Indicator {}: {}", indicator.name, added.join(", "));
    }

    println!("\nInitial capital: ${:.2}", config.risk.initial_capital);
    println!("Position size: {:.0}%", config.risk.position_size_fraction * 100.0);
    println!("Stop loss: {}%", config.risk.stop_loss_pct);
    println!("Take profit: {}%\n", config.risk.take_profit_pct);

    let signals = config.strategy.build_fail_closed(&table);
    let result = run_backtest(&table, &signals, &config.risk)?;

    println!("Backtest Results");
    println!("================\n");
    result.pretty_print_table();

    if result.num_trades == 0 {
        println!("\nNo trades were executed.");
    } else {
        println!();
        result.trades_table().printstd();
    }

    //save outputs if requested
    if let Some(equity_path) = &config.output_equity_csv {
        save_equity_csv(&result.equity, equity_path)?;
        println!("\nEquity curve saved to {:?}", equity_path);
    }

    if let Some(trades_path) = &config.output_trades_csv {
        save_trades_csv(&result.trades, trades_path)?;
        println!("Trades saved to {:?}", trades_path);
    }

    Ok(())
}

fn run_search(config: &StrategyConfiguration, write_best: Option<&Path>) -> Result<()> {
    println!("Barback Parameter Search");
    println!("========================\n");

    let table = load_table(config)?;
    let settings = &config.optimizer;

    let mut optimizer = Optimizer::new(&BuiltinIndicators, &config.strategy, config.risk)
        .with_objective(settings.objective);
    if let Some(parallelism) = settings.parallelism {
        optimizer = optimizer.with_parallelism(parallelism);
    }

    println!(
        "Method: {} | trials: {} | objective: {:?}\n",
        settings.method, settings.trials, settings.objective
    );
    if settings.method == SearchMethod::Grid {
        let points = grid_size(&config.indicators, settings.grid_points);
        println!(
            "Grid: {} point(s), {} within the trial budget\n",
            points,
            points.min(settings.trials)
        );
    }

    let mut strategy = settings.strategy();
    let outcome = match optimizer.search(&table, &config.indicators, strategy.as_mut(), settings.trials) {
        Ok(outcome) => outcome,
        Err(SearchError::NoValidConfiguration { trials }) => {
            println!("No valid parameter combinations found. ({} trial(s) run)", trials);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "Best of {} trial(s) ({} failed), found at trial {}:",
        outcome.trials_run,
        outcome.failed_trials,
        outcome.best_trial + 1
    );
    for assignment in outcome.best_assignment.iter() {
        println!("  {}", assignment);
    }
    println!();
    outcome.best_result.pretty_print_table();

    if let Some(path) = write_best {
        let mut best = config.clone();
        for (indicator, assignment) in best.indicators.iter_mut().zip(outcome.best_assignment.iter()) {
            indicator.params = indicator.merged_params(&assignment.params);
        }
        best.to_json_file(path)
            .context(format!("Failed to write configuration to {:?}", path))?;
        println!("\nBest configuration saved to {:?}", path);
    }

    Ok(())
}

fn save_equity_csv(equity_curve: &[EquityPoint], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create {:?}", path))?;
    for point in equity_curve {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

fn save_trades_csv(trades: &[TradeRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create {:?}", path))?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}
