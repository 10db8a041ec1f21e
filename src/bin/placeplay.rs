use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng as _;
use rand::rngs::SmallRng;
use tracing_subscriber::EnvFilter;

use placeplay::{
    DatasetConfig, DirRawShards, DisplayScale, PlaybackSession, PngSequenceSink, ReorderOpts,
    ShardLayout,
};

#[derive(Parser, Debug)]
#[command(name = "placeplay", version)]
struct Cli {
    /// Dataset config JSON. Built-in 2022/2023 tables when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank and sort the raw shards of one epoch into ordered shards.
    Prepare(PrepareArgs),
    /// Replay a viewport into a PNG frame sequence.
    Play(PlayArgs),
    /// Replay the full canvas and save base snapshots at chosen ranks.
    Capture(CaptureArgs),
    /// Print the coordinate extent of ordered shards.
    Extent(ExtentArgs),
    /// Print the effective dataset config as JSON.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Directory holding the epoch's shard files.
    #[arg(long)]
    data_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct PrepareArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Epoch id.
    #[arg(long)]
    epoch: String,

    /// Sort shards in parallel.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel.
    #[arg(long)]
    threads: Option<usize>,

    /// Fail when two raw shards share a first second.
    #[arg(long)]
    strict: bool,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Directory holding base snapshots.
    #[arg(long)]
    snapshots: PathBuf,

    /// Epoch id. Drawn at random when omitted.
    #[arg(long)]
    epoch: Option<String>,

    /// RNG seed for epoch, scale and viewport draws.
    #[arg(long)]
    seed: Option<u64>,

    /// Fixed display scale instead of a random draw.
    #[arg(long)]
    scale: Option<f64>,

    /// Fixed viewport origin (requires --y).
    #[arg(long, requires = "y")]
    x: Option<u32>,

    /// Fixed viewport origin (requires --x).
    #[arg(long, requires = "x")]
    y: Option<u32>,

    /// Output directory for `frame_NNNNNN.png`.
    #[arg(long)]
    out: PathBuf,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

#[derive(Parser, Debug)]
struct CaptureArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Epoch id.
    #[arg(long)]
    epoch: String,

    /// Ranks to capture. Defaults to every growth stage with a snapshot.
    #[arg(long, value_delimiter = ',')]
    ranks: Vec<u32>,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExtentArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Epoch id.
    #[arg(long)]
    epoch: String,

    /// Single rank to inspect. Every ordered shard when omitted.
    #[arg(long)]
    rank: Option<u32>,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Write to this file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Prepare(args) => cmd_prepare(&config, args),
        Command::Play(args) => cmd_play(&config, args),
        Command::Capture(args) => cmd_capture(&config, args),
        Command::Extent(args) => cmd_extent(&config, args),
        Command::Config(args) => cmd_config(&config, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DatasetConfig> {
    let config = match path {
        Some(p) => DatasetConfig::from_path(p)
            .with_context(|| format!("load dataset config '{}'", p.display()))?,
        None => DatasetConfig::builtin(),
    };
    Ok(config)
}

fn cmd_prepare(config: &DatasetConfig, args: PrepareArgs) -> anyhow::Result<()> {
    let epoch = config.epoch(&args.epoch)?;
    let layout = ShardLayout::for_epoch(&args.data.data_dir, epoch);
    let source = DirRawShards::for_epoch(&args.data.data_dir, epoch);
    let opts = ReorderOpts {
        parallel: args.parallel,
        threads: args.threads,
    };

    let report = placeplay::prepare_epoch(epoch, &layout, &source, &opts)?;
    if args.strict {
        report.rank.ensure_no_collisions()?;
    }
    eprintln!(
        "ranked {} shards ({} collisions, {} unranked), sorted {}, dropped {} lines",
        report.rank.assignments.len(),
        report.rank.collisions.len(),
        report.rank.unranked.len(),
        report.sorted.len(),
        report.lines_dropped()
    );
    Ok(())
}

fn cmd_play(config: &DatasetConfig, args: PlayArgs) -> anyhow::Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, "session rng seeded");
    let mut rng = SmallRng::seed_from_u64(seed);

    let epoch_id = match args.epoch {
        Some(id) => id,
        None => PlaybackSession::random_epoch(config, &mut rng)?.id.clone(),
    };
    let session = PlaybackSession::new(config, &epoch_id, &args.data.data_dir, &args.snapshots)?;

    let plan = match (args.x, args.y, args.scale) {
        (Some(x), Some(y), scale) => {
            let scale = match scale {
                Some(s) => DisplayScale::new(s)?,
                None => DisplayScale::pick(&mut rng, config.display.max_scale),
            };
            session.plan_at(x, y, scale)?
        }
        (_, _, Some(s)) => {
            let display = config.display;
            let scale = DisplayScale::new(s)?;
            let size =
                placeplay::ViewportSize::for_display(display.width, display.height, scale);
            placeplay::select_viewport(session.epoch(), size, scale, &mut rng)?
        }
        _ => session.plan_random(&mut rng, &config.display)?,
    };
    let v = &plan.viewport;
    eprintln!(
        "epoch {} viewport {}x{} at ({},{}) scale {} from rank {}",
        v.epoch,
        v.width,
        v.height,
        v.origin_x,
        v.origin_y,
        v.scale.get(),
        plan.start_rank
    );

    let mut sink = PngSequenceSink::new(&args.out, args.max_frames);
    let stats = session.play(&plan, &mut sink)?;
    eprintln!(
        "wrote {} frames to {} ({} shards, {} missing)",
        sink.written(),
        args.out.display(),
        stats.shards_read,
        stats.shards_missing
    );
    Ok(())
}

fn cmd_capture(config: &DatasetConfig, args: CaptureArgs) -> anyhow::Result<()> {
    let session = PlaybackSession::new(config, &args.epoch, &args.data.data_dir, &args.out)?;
    let ranks = if args.ranks.is_empty() {
        session
            .epoch()
            .growth
            .iter()
            .filter(|s| s.snapshot.is_some())
            .map(|s| s.rank)
            .collect()
    } else {
        args.ranks
    };

    let captured = session.capture_snapshots(ranks, &args.out)?;
    for (rank, path) in &captured {
        eprintln!("rank {rank}: wrote {}", path.display());
    }
    Ok(())
}

fn cmd_extent(config: &DatasetConfig, args: ExtentArgs) -> anyhow::Result<()> {
    let epoch = config.epoch(&args.epoch)?;
    let layout = ShardLayout::for_epoch(&args.data.data_dir, epoch);
    let ranks = match args.rank {
        Some(r) => vec![r],
        None => layout.ordered_ranks(epoch.rank_range()),
    };
    if ranks.is_empty() {
        anyhow::bail!(
            "no ordered shards for epoch '{}' in '{}'",
            epoch.id,
            args.data.data_dir.display()
        );
    }

    for rank in ranks {
        let path = layout.ordered_path(rank);
        match placeplay::shard_extent(&epoch.schema, &path)? {
            Some(e) => println!(
                "{rank}\tx {}..={}\ty {}..={}\t{} lines ({} rejected)",
                e.min.x,
                e.max.x,
                e.min.y,
                e.max.y,
                e.lines.total,
                e.lines.rejected()
            ),
            None => println!("{rank}\tno events"),
        }
    }
    Ok(())
}

fn cmd_config(config: &DatasetConfig, args: ConfigArgs) -> anyhow::Result<()> {
    let json = config.to_json_pretty()?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, json.as_bytes())
                .with_context(|| format!("write config '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
