use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

use squat_counter::config::Config;
use squat_counter::counter::{RepCounter, Transition};
use squat_counter::detection::{LabelMap, ViewTransform};
use squat_counter::replay::{load_frames, replay_frames, save_summary, SessionSummary};

/// 記録済みフレーム (JSON Lines) からスクワット回数を数える
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// フレームファイル (1行1フレームのJSON)
    frames: PathBuf,

    /// 設定ファイル
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// 生検出バッファ用のラベルファイル
    #[arg(long)]
    labels: Option<PathBuf>,

    /// 結果サマリーの保存先 (JSON)
    #[arg(long)]
    summary: Option<PathBuf>,

    /// ログレベル (off, trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    let config = Config::load_or_default(&args.config);
    let labels = match &args.labels {
        Some(path) => LabelMap::load(path)?,
        None => LabelMap::default(),
    };
    let transform = ViewTransform::identity();

    println!("Squat Counter - replay");
    println!("Frames: {}", args.frames.display());
    println!(
        "Counter: target={}±{}, stand>={}, fallback={:?}",
        config.counter.target_angle,
        config.counter.tolerance,
        config.counter.stand_angle,
        config.counter.leg_fallback
    );

    let frames = load_frames(&args.frames)?;
    let mut counter = RepCounter::new(&config);
    let stats = replay_frames(&mut counter, &frames, &labels, &transform, |i, result| {
        if let Some(Transition::Completed { rep }) = result.transition {
            println!("Frame {}: rep {} done", i + 1, rep);
        }
    });

    let state = counter.into_state();
    let summary = SessionSummary::from_state(&state);

    println!();
    println!("Frames: {} (skipped {})", stats.frames, stats.skipped);
    if stats.malformed > 0 {
        println!("Malformed detection buffers: {}", stats.malformed);
    }
    println!("Reps: {}", summary.reps_completed);
    match summary.average_tracked_x {
        Some(x) => println!("Average subject X: {:.1}", x),
        None => println!("Average subject X: -"),
    }

    if let Some(path) = &args.summary {
        save_summary(path, &summary)?;
        println!("Summary saved to {}", path.display());
    }

    Ok(())
}
