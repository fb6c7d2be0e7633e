use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use motion_triage::{
    display_summary, load_results, parse_label, run_batch, write_results, ConfigLoader,
    GroundTruth,
};

/// 监控视频误报筛查工具：对每个视频在 前段/中段/末段 三个窗口内
/// 计算相邻帧的结构相似度（SSIM），判定是运动触发还是误报
#[derive(Parser, Debug)]
#[command(name = "motion-triage")]
#[command(about = "监控视频误报筛查：窗口采样 + SSIM 打分，判定运动/误报", long_about = None)]
struct Args {
    /// 待分析视频所在目录
    path: PathBuf,

    /// 结果 JSON 文件的输出路径
    result: PathBuf,

    /// 视频帧率（整数）。默认 24
    /// 可通过环境变量 MOTION_TRIAGE_FPS 或配置文件设置
    #[arg(long = "f")]
    fps: Option<u32>,

    /// 从视频开头跳过的帧数（整数）。默认 12
    /// 可通过环境变量 MOTION_TRIAGE_SKIP_FRAMES 或配置文件设置
    #[arg(long = "s")]
    skip_frames: Option<u32>,

    /// 参与分析的时长（秒）。默认 3
    /// 可通过环境变量 MOTION_TRIAGE_LENGTH 或配置文件设置
    #[arg(long = "l", alias = "length")]
    length: Option<f64>,

    /// SSIM 低于该值判定为运动。默认 0.997
    /// 可通过环境变量 MOTION_TRIAGE_THRESHOLD 或配置文件设置
    #[arg(long = "t", alias = "threshold")]
    threshold: Option<f64>,

    /// 输出调试信息（总帧数、窗口位置、每个窗口的得分）
    #[arg(long = "v")]
    verbose: bool,

    /// 目录中视频的已知标注：True / False
    #[arg(long = "lab", value_parser = parse_label)]
    label: Option<GroundTruth>,

    /// 配置文件路径（可选，.ini 格式）
    /// 优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志；--v 时输出 DEBUG 级别
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    // 从配置文件、环境变量和命令行参数合并配置
    let config = ConfigLoader::load_config(
        args.config.as_deref(),
        args.fps,
        args.skip_frames,
        args.length,
        args.threshold,
    )
    .context("加载配置失败")?;

    println!(
        "使用配置: fps={}, skip_frames={}, length={:.1}s, threshold={}",
        config.fps, config.skip_frames, config.secs_consider, config.threshold
    );

    // 逐个分析目录中的视频
    let results = run_batch(&args.path, &config)?;

    // 全部处理完成后一次性写入结果文件
    write_results(&args.result, &results)?;

    // 读回结果文件并打印汇总报告
    let persisted = load_results(&args.result)?;
    display_summary(&persisted, args.label.unwrap_or(GroundTruth::Unlabeled));

    Ok(())
}
