use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TriageConfig;
use crate::motion_detector::MotionDetector;
use crate::record::{SkipReason, VideoOutcome};
use crate::sampler::plan_windows;
use crate::video_reader::{FrameSource, VideoReader};

/// 分析单个视频文件，返回判定结果或跳过原因
///
/// 任何失败都折算成 Skipped 返回，不向上抛错误，
/// 保证单个视频出问题不会中断整个批次
pub fn analyze_video(video_name: &str, dir: &Path, config: &TriageConfig) -> VideoOutcome {
    info!("🎬 开始分析视频: {}", video_name);

    // 只接受 .mp4 容器，其他文件连打开都不尝试
    let is_mp4 = Path::new(video_name)
        .extension()
        .map(|ext| ext == "mp4")
        .unwrap_or(false);
    if !is_mp4 {
        let reason = SkipReason::UnsupportedFormat;
        warn!("⚠️  {} 跳过: {}", video_name, reason.describe());
        return VideoOutcome::Skipped { reason };
    }

    let path = dir.join(video_name);
    let mut reader = match VideoReader::open(&path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("⚠️  {} 打开失败: {:#}", video_name, e);
            return VideoOutcome::Skipped {
                reason: SkipReason::ReadFailure,
            };
        }
    };

    let outcome = run_analysis(&mut reader, config);

    match &outcome {
        VideoOutcome::Verdict {
            motion_detected,
            average_score,
            elapsed_seconds,
        } => {
            let verdict = if *motion_detected {
                "检测到运动"
            } else {
                "判定为误报"
            };
            info!(
                "✅ {} {}；平均得分: {:.6}，耗时: {:.2}秒",
                video_name, verdict, average_score, elapsed_seconds
            );
        }
        VideoOutcome::Skipped { reason } => {
            warn!("⚠️  {} 跳过: {}", video_name, reason.describe());
        }
    }

    outcome
}

/// 判定引擎
///
/// 流程：校验帧数和窗口方案 -> 启动计时 -> 依次为 前段/中段/末段
/// 三个窗口打分，某个窗口的得分低于阈值就提前退出，不再为剩余窗口
/// 打分 -> 停止计时，汇总判定。
///
/// 最终判定以实际参与计算的窗口得分（1、2 或 3 个）的总体平均值
/// 为准，与阈值严格比较；单个窗口和阈值的比较只决定是否提前退出
pub fn run_analysis<S: FrameSource + ?Sized>(source: &mut S, config: &TriageConfig) -> VideoOutcome {
    let total_frames = source.total_frames();
    debug!("总帧数: {}", total_frames);

    if total_frames == 0 {
        return VideoOutcome::Skipped {
            reason: SkipReason::EmptyVideo,
        };
    }

    let plan = match plan_windows(
        total_frames,
        config.skip_frames,
        config.fps,
        config.secs_consider,
    ) {
        Ok(plan) => plan,
        Err(reason) => return VideoOutcome::Skipped { reason },
    };

    let starts: Vec<u64> = plan.windows.iter().map(|w| w.start).collect();
    debug!(
        "窗口起点: {:?}，每窗口帧预算: {}",
        starts, plan.frames_per_window
    );

    let detector = MotionDetector::new(config.threshold, config.denoise);

    // 开始计时
    let start = Instant::now();
    let mut window_scores: Vec<f64> = Vec::new();

    for (i, window) in plan.windows.iter().enumerate() {
        match detector.score_window(source, window) {
            Ok(score) => {
                debug!("窗口 {} 得分: {:.6}", i, score);
                window_scores.push(score);
                if detector.indicates_motion(score) {
                    // 这个窗口已经显示运动，剩余窗口不再打分
                    debug!("窗口 {} 低于阈值，提前退出", i);
                    break;
                }
            }
            Err(e) => {
                warn!("窗口 {} 未能产生得分: {:#}", i, e);
                break;
            }
        }
    }

    let elapsed_seconds = start.elapsed().as_secs_f64();

    if window_scores.is_empty() {
        return VideoOutcome::Skipped {
            reason: SkipReason::ReadFailure,
        };
    }

    let average_score = window_scores.iter().sum::<f64>() / window_scores.len() as f64;

    VideoOutcome::Verdict {
        motion_detected: detector.indicates_motion(average_score),
        average_score,
        elapsed_seconds,
    }
}
