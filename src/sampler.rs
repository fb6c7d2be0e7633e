use crate::record::SkipReason;

/// 一个分析窗口：从 start 帧开始，最多比较 frame_budget 对相邻帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    /// 窗口起始帧序号
    pub start: u64,
    /// 窗口内相邻帧比较的次数上限（实际读取 frame_budget + 1 帧）
    pub frame_budget: u64,
}

/// 三个分析窗口的采样方案，按 前段 / 中段 / 末段 排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub windows: [AnalysisWindow; 3],
    pub frames_per_window: u64,
}

/// 根据视频总帧数计算三个分析窗口的起始位置和每窗口的帧预算
///
/// 窗口起点分别是：
///   前段：跳过 skip_frames 帧之后的下一帧
///   中段：视频的正中间
///   末段：距结尾约一秒的位置
///
/// 视频太短（末段窗口落在中段窗口之前，或任一窗口越过视频结尾）时
/// 返回 TooShort，调用方据此跳过该视频，不读取任何帧
pub fn plan_windows(
    total_frames: u64,
    skip_frames: u32,
    fps: u32,
    secs_consider: f64,
) -> Result<WindowPlan, SkipReason> {
    let frames_per_window = (fps as f64 * secs_consider / 3.0).floor() as i64;
    // 预算为 0 时任何窗口都得不到一次相邻帧比较，按视频过短处理
    if frames_per_window < 1 {
        return Err(SkipReason::TooShort);
    }

    let total = total_frames as i64;
    let early = skip_frames as i64 + 1;
    let middle = total / 2;
    let late = total - fps as i64 - 1;

    // 末段窗口必须不早于中段窗口
    if late < middle {
        return Err(SkipReason::TooShort);
    }

    // 每个窗口读取的 frames_per_window + 1 帧都必须落在 [0, total) 之内
    for start in [early, middle, late] {
        if start < 0 || start + frames_per_window >= total {
            return Err(SkipReason::TooShort);
        }
    }

    let budget = frames_per_window as u64;
    let window = |start: i64| AnalysisWindow {
        start: start as u64,
        frame_budget: budget,
    };

    Ok(WindowPlan {
        windows: [window(early), window(middle), window(late)],
        frames_per_window: budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_budget() {
        // 24 fps、分析 3 秒 => 每个窗口 24 帧预算
        let plan = plan_windows(600, 12, 24, 3.0).unwrap();
        assert_eq!(plan.frames_per_window, 24);
        for w in &plan.windows {
            assert_eq!(w.frame_budget, 24);
        }
    }

    #[test]
    fn test_window_positions() {
        let plan = plan_windows(600, 12, 24, 3.0).unwrap();
        let starts: Vec<u64> = plan.windows.iter().map(|w| w.start).collect();
        // 前段 = skip + 1，中段 = total / 2，末段 = total - fps - 1
        assert_eq!(starts, vec![13, 300, 575]);
    }

    #[test]
    fn test_minimal_valid_clip() {
        // 末段窗口 35 >= 中段窗口 30，且 35 + 24 = 59 < 60，刚好放得下
        let plan = plan_windows(60, 12, 24, 3.0).unwrap();
        assert_eq!(plan.windows[1].start, 30);
        assert_eq!(plan.windows[2].start, 35);
    }

    #[test]
    fn test_late_before_middle_rejected() {
        // total = 40：末段 = 40 - 24 - 1 = 15 落在中段 20 之前
        assert_eq!(
            plan_windows(40, 12, 24, 3.0),
            Err(SkipReason::TooShort)
        );
    }

    #[test]
    fn test_window_past_end_rejected() {
        // 分析时长超过 3 秒时末段窗口的预算越过视频结尾
        assert_eq!(
            plan_windows(600, 12, 24, 6.0),
            Err(SkipReason::TooShort)
        );
    }

    #[test]
    fn test_zero_budget_rejected() {
        // fps * secs / 3 < 1 时不可能产生任何一次比较
        assert_eq!(plan_windows(600, 0, 24, 0.1), Err(SkipReason::TooShort));
    }

    #[test]
    fn test_overlapping_early_middle_allowed() {
        // skip 很大时前段窗口可以越过中段，只要求末段不早于中段
        let plan = plan_windows(200, 150, 24, 3.0).unwrap();
        assert!(plan.windows[0].start > plan.windows[1].start);
    }
}
