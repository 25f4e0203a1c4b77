//! Headless raid battle runner.
//!
//! Resolves attacks against defender layouts without a game client.
//! Results go to stdout, logs to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Resolve one attack
//! cargo run -p raid_headless -- simulate -l base.json -s stats.json -c attack.json
//!
//! # Type the attack in by hand
//! cargo run -p raid_headless -- simulate -l base.json -s stats.json --interactive
//!
//! # Batch of shuffled attacks
//! cargo run -p raid_headless -- batch -l base.json -s stats.json -c attack.json \
//!     --count 500 --shuffle
//!
//! # Verify determinism
//! cargo run -p raid_headless -- verify -l base.json -s stats.json -c attack.json --runs 20
//!
//! # Verify a recorded battle
//! cargo run -p raid_headless -- replay --file battle.bin --stats stats.json --verify
//! ```

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raid_core::prelude::*;
use raid_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    interactive,
    loader::{load_commands, load_config, load_layout, load_stats, save_commands},
    logging::log_filter,
};

#[derive(Parser)]
#[command(name = "raid_headless")]
#[command(about = "Headless raid battle runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Files describing one battle.
#[derive(Args, Clone)]
struct BattleFiles {
    /// Defender layout JSON
    #[arg(short, long)]
    layout: PathBuf,

    /// Building and troop stats JSON
    #[arg(short, long)]
    stats: PathBuf,

    /// Attack commands JSON
    #[arg(short, long)]
    commands: Option<PathBuf>,

    /// Battle timing config RON
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single battle
    Simulate {
        #[command(flatten)]
        files: BattleFiles,

        /// Enter commands on stdin (a commands file is preloaded if given)
        #[arg(short, long)]
        interactive: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Save the commands that were played
        #[arg(long)]
        save_commands: Option<PathBuf>,

        /// Record a replay of the battle
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a batch of games in parallel
    Batch {
        #[command(flatten)]
        files: BattleFiles,

        /// Number of games to run
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Shuffle the attack order per game
        #[arg(long)]
        shuffle: bool,

        /// Record and verify a replay per game
        #[arg(long)]
        replays: bool,

        /// Output JSON file for results
        #[arg(short, long, default_value = "results/batch.json")]
        output: PathBuf,
    },

    /// Verify determinism by resolving the same battle repeatedly
    Verify {
        #[command(flatten)]
        files: BattleFiles,

        /// Number of verification runs
        #[arg(short, long, default_value = "10")]
        runs: u32,
    },

    /// Re-run a recorded battle
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Stats JSON with the troop stats the recording used
        #[arg(short, long)]
        stats: Option<PathBuf>,

        /// Fail unless the re-run matches the recording
        #[arg(long)]
        verify: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for results)
    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(log_filter(cli.verbose, directives.as_deref()))
        .init();

    match cli.command {
        Commands::Simulate {
            files,
            interactive,
            json,
            save_commands,
            record,
        } => cmd_simulate(&files, interactive, json, save_commands, record),
        Commands::Batch {
            files,
            count,
            parallel,
            seed,
            shuffle,
            replays,
            output,
        } => cmd_batch(files, count, parallel, seed, shuffle, replays, &output),
        Commands::Verify { files, runs } => cmd_verify(&files, runs),
        Commands::Replay {
            file,
            stats,
            verify,
        } => cmd_replay(&file, stats, verify),
    }
}

fn fail(context: &str, error: impl Display) -> ! {
    eprintln!("{context}: {error}");
    std::process::exit(1);
}

/// Load the simulator for `files`, plus the commands file if one is named.
fn load_battle(files: &BattleFiles) -> (BattleSimulator, Vec<BattleCommand>) {
    let stats = load_stats(&files.stats).unwrap_or_else(|e| fail("Failed to load stats", e));
    let stats = Arc::new(stats);
    let layout = load_layout(&files.layout, stats.as_ref())
        .unwrap_or_else(|e| fail("Failed to load layout", e));
    let config = files.config.as_ref().map_or_else(BattleConfig::default, |path| {
        load_config(path).unwrap_or_else(|e| fail("Failed to load config", e))
    });
    let commands = files.commands.as_ref().map_or_else(Vec::new, |path| {
        load_commands(path).unwrap_or_else(|e| fail("Failed to load commands", e))
    });

    let simulator = BattleSimulator::new(Arc::new(layout), config)
        .unwrap_or_else(|e| fail("Invalid battle", e))
        .with_troop_stats(stats);
    (simulator, commands)
}

fn cmd_simulate(
    files: &BattleFiles,
    prompt: bool,
    json: bool,
    save_path: Option<PathBuf>,
    record: Option<PathBuf>,
) {
    let (simulator, mut commands) = load_battle(files);

    if prompt {
        if !commands.is_empty() {
            println!("Loaded {} commands.", commands.len());
        }
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        commands = interactive::read_commands(stdin.lock(), &mut stdout, commands)
            .unwrap_or_else(|e| fail("Failed to read commands", e));
    }

    if let Some(path) = save_path {
        save_commands(&path, &commands).unwrap_or_else(|e| fail("Failed to save commands", e));
        tracing::info!("Commands saved to {}", path.display());
    }

    tracing::info!(
        buildings = simulator.layout().len(),
        commands = commands.len(),
        "Resolving battle"
    );
    let result = simulator.run(&commands);

    if json {
        let text = serde_json::to_string_pretty(&result)
            .unwrap_or_else(|e| fail("Failed to encode result", e));
        println!("{text}");
    } else {
        println!("Battle resolved:");
        println!();
        println!("Stars:                 {}", result.stars);
        println!("Destruction:           {}%", result.destruction_percentage);
        println!("Battle time (seconds): {}", result.battle_time);
        println!("Town hall destroyed:   {}", result.town_hall_destroyed);
        println!("Prep time left:        {:.2}s", result.preparation_time_remaining);
        println!("Attack time left:      {:.2}s", result.attack_time_remaining);
        println!("End tick:              {}", result.end_tick);
    }

    if let Some(path) = record {
        let label = files
            .layout
            .file_stem()
            .map_or_else(|| "battle".to_string(), |s| s.to_string_lossy().into_owned());
        let replay = BattleReplay::record(label, &simulator, &commands);
        replay
            .save(&path)
            .unwrap_or_else(|e| fail("Failed to save replay", e));
        tracing::info!("Replay saved to {}", path.display());
    }
}

fn cmd_batch(
    files: BattleFiles,
    count: u32,
    parallel: u32,
    seed: u64,
    shuffle: bool,
    replays: bool,
    output: &Path,
) {
    let mut config = BatchConfig::new(files.layout, files.stats, count)
        .with_seed(seed)
        .with_shuffle(shuffle)
        .with_replays(replays);
    config.commands = files.commands;
    config.battle_config = files.config;
    config.parallel_games = parallel;

    tracing::info!(
        count = count,
        parallel = parallel,
        seed = seed,
        shuffle = shuffle,
        output = %output.display(),
        "Batch configuration"
    );

    let results = run_batch(config).unwrap_or_else(|e| fail("Failed to load batch inputs", e));

    if let Err(e) = results.save(output) {
        fail("Failed to save results", e);
    }

    let summary = &results.summary;
    println!("Games:             {}", summary.total_games);
    println!("Mean stars:        {:.2}", summary.mean_stars);
    println!("Mean destruction:  {:.1}%", summary.mean_destruction);
    println!(
        "Destruction range: {}% - {}%",
        summary.min_destruction, summary.max_destruction
    );
    println!("Mean reward:       {:.2}", summary.mean_reward);
    println!(
        "Stars 0/1/2/3:     {}/{}/{}/{}",
        summary.star_histogram[0],
        summary.star_histogram[1],
        summary.star_histogram[2],
        summary.star_histogram[3]
    );
    println!("Town hall rate:    {:.1}%", summary.town_hall_rate * 100.0);
    println!("Distinct results:  {}", summary.distinct_results);
    if let Some(best) = results.best_game() {
        println!(
            "Best game:         #{} (seed {}, reward {:.2}, {})",
            best.game_index, best.seed, best.reward, best.result
        );
    }
    println!("Results saved to {}", output.display());

    if !results.errors.is_empty() {
        eprintln!("FAIL: {} games failed", results.errors.len());
        std::process::exit(1);
    }
}

fn cmd_verify(files: &BattleFiles, runs: u32) {
    let (simulator, commands) = load_battle(files);
    tracing::info!(
        "Verifying determinism: {} commands ({} runs)",
        commands.len(),
        runs
    );

    if verify_determinism(&simulator, &commands, runs) {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

fn cmd_replay(file: &Path, stats: Option<PathBuf>, verify: bool) {
    let replay = BattleReplay::load(file).unwrap_or_else(|e| fail("Failed to load replay", e));

    eprintln!("Loaded replay:");
    eprintln!("  Label: {}", replay.label);
    eprintln!("  Buildings: {}", replay.layout.len());
    eprintln!("  Commands: {}", replay.command_count());
    eprintln!("  Recorded: {}", replay.result);

    let troop_stats: Option<SharedTroopStats> = stats.map(|path| {
        let table = load_stats(&path).unwrap_or_else(|e| fail("Failed to load stats", e));
        Arc::new(table) as SharedTroopStats
    });

    if verify {
        match replay.verify(troop_stats) {
            Ok(_) => eprintln!("PASS: Replay verification successful"),
            Err(e) => {
                eprintln!("FAIL: {e}");
                std::process::exit(1);
            }
        }
    } else {
        let result = replay
            .replay(troop_stats)
            .unwrap_or_else(|e| fail("Failed to replay", e));
        println!("{result}");
    }
}
