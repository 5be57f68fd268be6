use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use textzones::annotation::load_annotation_dir;
use textzones::batch::{BatchDetector, PoolKind, Slice};
use textzones::config::{AppConfig, Backend};
use textzones::detection::{Detector, LayoutModel};
use textzones::evaluation::{evaluate, MatchMode, ScoreMode};
use textzones::recognition::{transcribe_result_set, OcrsRecognizer};
use textzones::{render, snapshot};

#[derive(Parser)]
#[command(name = "textzones")]
#[command(about = "Detect text regions in page scans and evaluate them against ground truth")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect text regions in every image under ROOT
    Detect {
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// First index of the sorted corpus to process
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        start: i64,

        /// End index (exclusive) of the sorted corpus to process
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        end: i64,

        /// Snapshot file; reused when it already holds this run
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,

        #[arg(long, value_enum)]
        pool: Option<PoolKind>,

        #[arg(long)]
        workers: Option<usize>,

        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Keep non-text regions too
        #[arg(long)]
        all_regions: bool,
    },

    /// Score saved detections against Pascal-VOC annotations
    Evaluate {
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,

        #[arg(long, value_name = "DIR")]
        annotations: PathBuf,

        #[arg(long, value_enum)]
        match_mode: Option<MatchMode>,

        #[arg(long, value_enum)]
        score: Option<ScoreMode>,

        #[arg(long)]
        join_threshold: Option<f64>,

        #[arg(long)]
        min_width: Option<f64>,

        #[arg(long)]
        min_score: Option<f32>,
    },

    /// Draw saved detections onto their images
    Render {
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,

        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
    },

    /// Crop saved detections and run OCR on them, one text file per page
    Transcribe {
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,

        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Detect { root, start, end, snapshot: snapshot_path, pool, workers, backend, all_regions } => {
            if let Some(pool) = pool {
                config.batch.pool = pool;
            }
            if workers.is_some() {
                config.batch.workers = workers;
            }
            if let Some(backend) = backend {
                config.detector.backend = backend;
            }
            if all_regions {
                config.detector.keep_text_only = false;
            }
            config.batch.show_progress = true;
            run_detect(&config, &root, Slice::new(start, end), snapshot_path)
        }
        Command::Evaluate { snapshot: snapshot_path, annotations, match_mode, score, join_threshold, min_width, min_score } => {
            let eval = &mut config.evaluation;
            if let Some(m) = match_mode {
                eval.policy.match_mode = m;
            }
            if let Some(s) = score {
                eval.policy.score_mode = s;
            }
            if let Some(t) = join_threshold {
                eval.policy.join_threshold = t;
            }
            if let Some(w) = min_width {
                eval.filter.min_width = w;
            }
            if let Some(s) = min_score {
                eval.filter.min_score = s;
            }
            run_evaluate(&config, &snapshot_path, &annotations, args.verbose)
        }
        Command::Render { snapshot: snapshot_path, out_dir } => {
            let (meta, results) = snapshot::load(&snapshot_path)?;
            let written = render::render_result_set(&results, &meta.root, &out_dir, config.batch.workers)?;
            println!("Rendered {} of {} pages to {}", written, results.len(), out_dir.display());
            Ok(())
        }
        Command::Transcribe { snapshot: snapshot_path, out_dir } => {
            let (_, results) = snapshot::load(&snapshot_path)?;
            let model_dir = match &config.transcribe.model_dir {
                Some(dir) => dir.clone(),
                None => textzones::recognition::ocr::default_model_dir()?,
            };
            if args.verbose {
                println!("Initializing OCR engine from {}...", model_dir.display());
            }
            let recognizer = OcrsRecognizer::from_model_dir(&model_dir)?;
            let stats = transcribe_result_set(&results, &recognizer, None, &config.transcribe, &out_dir)?;
            println!(
                "{} pages: {} regions detected, {} kept, {} recognized",
                stats.pages, stats.detected, stats.kept, stats.recognized
            );
            Ok(())
        }
    }
}

fn run_detect(config: &AppConfig, root: &Path, slice: Slice, snapshot_path: Option<PathBuf>) -> anyhow::Result<()> {
    let detector = Detector::new(config.detector.build_model()).with_options(config.detector.options());
    let model_name = detector.model().name().to_string();
    let batch = BatchDetector::new(detector, config.batch.clone());

    let snapshot_path = snapshot_path.unwrap_or_else(|| PathBuf::from(snapshot::default_file_name(&model_name, slice)));
    let results = batch
        .run_or_resume(root, slice, &snapshot_path)
        .with_context(|| format!("Batch detection over {:?} failed", root))?;

    let regions: usize = results.iter().map(|r| r.boxes.len()).sum();
    println!("\n=== Detection Results ===");
    println!("Pages with detections: {}", results.len());
    println!("Regions detected: {}", regions);
    println!("Snapshot: {}", snapshot_path.display());
    Ok(())
}

fn run_evaluate(config: &AppConfig, snapshot_path: &Path, annotations: &Path, verbose: bool) -> anyhow::Result<()> {
    let (meta, results) = snapshot::load(snapshot_path)?;
    let ground_truth = load_annotation_dir(annotations)?;

    let eval = &config.evaluation;
    let report = evaluate(&results, &ground_truth, &eval.policy, &eval.filter);

    println!("\n=== Evaluation ({}, {:?}/{:?}) ===", meta.model, eval.policy.match_mode, eval.policy.score_mode);
    println!("Ground-truth boxes: {}", report.scores.len());
    println!("Images without detections: {}", report.missing_images.len());
    println!("Mean score: {:.4}", report.mean_score());
    if let Some(t) = eval.hit_threshold {
        println!("Hit rate @ {:.2}: {:.4}", t, report.hit_rate(t));
    }

    if verbose {
        for s in &report.scores {
            println!("  {} [{}] {:.4}", s.image_file_name, s.label, s.score);
        }
    }
    Ok(())
}
