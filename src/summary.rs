use crate::record::ResultMap;

/// 视频目录的已知标注，三种状态：
/// 无标注、标注为有运动、标注为无运动。
/// 明确区分「没有标注」和「标注为无运动」
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundTruth {
    Unlabeled,
    ExpectTrue,
    ExpectFalse,
}

impl GroundTruth {
    /// 标注对应的期望判定；无标注时为 None
    fn expected(&self) -> Option<bool> {
        match self {
            GroundTruth::Unlabeled => None,
            GroundTruth::ExpectTrue => Some(true),
            GroundTruth::ExpectFalse => Some(false),
        }
    }
}

/// 解析 --lab 参数。只接受 True / False（不区分大小写），
/// 其他输入是致命的参数错误
pub fn parse_label(value: &str) -> Result<GroundTruth, String> {
    match value.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(GroundTruth::ExpectTrue),
        "FALSE" => Ok(GroundTruth::ExpectFalse),
        _ => Err("标注只能是 True 或 False".to_string()),
    }
}

/// 批次结果与标注对比得到的统计
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SummaryStats {
    /// 目录中的条目总数
    pub total: usize,
    /// 正常完成分析（非跳过）的视频数
    pub classified: usize,
    /// 跳过/出错的视频数
    pub errors: usize,
    /// 判定为有运动的视频数
    pub true_detections: usize,
    /// 判定为无运动的视频数
    pub false_detections: usize,
    /// 与标注一致的视频数（无标注时为 0）
    pub correct: usize,
    /// 与标注不一致的视频数（无标注时为 0）
    pub incorrect: usize,
    /// 被误分类的视频文件名
    pub misclassified: Vec<String>,
}

impl SummaryStats {
    /// 分类准确率（百分比），只对正常完成分析的视频计算
    pub fn accuracy(&self) -> f64 {
        if self.classified == 0 {
            0.0
        } else {
            self.correct as f64 / self.classified as f64 * 100.0
        }
    }
}

/// 从结果映射计算汇总统计
pub fn compute_stats(results: &ResultMap, label: GroundTruth) -> SummaryStats {
    let mut stats = SummaryStats::default();
    let expected = label.expected();

    for (name, row) in results {
        stats.total += 1;
        match row.verdict() {
            Some((motion, _, _)) => {
                stats.classified += 1;
                if motion {
                    stats.true_detections += 1;
                } else {
                    stats.false_detections += 1;
                }
                if let Some(expected) = expected {
                    if motion == expected {
                        stats.correct += 1;
                    } else {
                        stats.incorrect += 1;
                        stats.misclassified.push(name.clone());
                    }
                }
            }
            // 跳过的视频单独归入 Error 一档，不参与准确率
            None => stats.errors += 1,
        }
    }

    stats
}

/// 打印批次汇总报告。
/// 提供标注时额外输出检出统计、准确率和误分类列表
pub fn display_summary(results: &ResultMap, label: GroundTruth) {
    let stats = compute_stats(results, label);

    println!();
    println!("━━━━━━━━━━━━━━━━ 视频分析汇总 ━━━━━━━━━━━━━━━━");
    println!();
    println!("分析视频总数: {}", stats.total);
    println!();
    println!("{:<28} {:<16} {:>12}", "视频文件", "检测到运动?", "耗时(秒)");
    println!("{}", "─".repeat(60));

    for (name, row) in results {
        match row.verdict() {
            Some((motion, _avg, secs)) => {
                let verdict = if motion { "True" } else { "False" };
                println!("{:<28} {:<16} {:>12.2}", name, verdict, secs);
            }
            None => {
                println!("{:<28} {:<16} {:>12}", name, "Error", "Error");
            }
        }
    }

    if stats.errors > 0 {
        println!();
        println!("跳过/出错的视频: {}", stats.errors);
    }

    if label != GroundTruth::Unlabeled {
        println!();
        println!("有运动判定: {} / {}", stats.true_detections, stats.classified);
        println!("无运动判定: {} / {}", stats.false_detections, stats.classified);
        println!("分类准确率: {:.1}%", stats.accuracy());

        if !stats.misclassified.is_empty() {
            println!();
            println!("误分类的视频:");
            for name in &stats.misclassified {
                println!("  • {}", name);
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ResultRow, SkipReason, VideoOutcome};

    fn sample_map() -> ResultMap {
        let mut map = ResultMap::new();
        let motion = VideoOutcome::Verdict {
            motion_detected: true,
            average_score: 0.95,
            elapsed_seconds: 1.0,
        };
        let still = VideoOutcome::Verdict {
            motion_detected: false,
            average_score: 0.999,
            elapsed_seconds: 0.8,
        };
        let skipped = VideoOutcome::Skipped {
            reason: SkipReason::TooShort,
        };
        map.insert(
            "a.mp4".to_string(),
            ResultRow::from_outcome("a.mp4", &motion),
        );
        map.insert(
            "b.mp4".to_string(),
            ResultRow::from_outcome("b.mp4", &still),
        );
        map.insert(
            "c.mp4".to_string(),
            ResultRow::from_outcome("c.mp4", &skipped),
        );
        map
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("True"), Ok(GroundTruth::ExpectTrue));
        assert_eq!(parse_label("FALSE"), Ok(GroundTruth::ExpectFalse));
        assert_eq!(parse_label("tRuE"), Ok(GroundTruth::ExpectTrue));
        assert!(parse_label("yes").is_err());
        assert!(parse_label("").is_err());
    }

    #[test]
    fn test_counts_with_label() {
        let stats = compute_stats(&sample_map(), GroundTruth::ExpectTrue);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.classified, 2);
        // 有/无运动判定的数量之和等于正常完成分析的视频数
        assert_eq!(stats.true_detections + stats.false_detections, stats.classified);
        assert_eq!(stats.correct, 1);
        assert_eq!(stats.incorrect, 1);
        assert_eq!(stats.misclassified, vec!["b.mp4".to_string()]);
        assert!((stats.accuracy() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_unlabeled_has_no_accuracy_buckets() {
        let stats = compute_stats(&sample_map(), GroundTruth::Unlabeled);

        assert_eq!(stats.classified, 2);
        assert_eq!(stats.correct, 0);
        assert_eq!(stats.incorrect, 0);
        assert!(stats.misclassified.is_empty());
    }

    #[test]
    fn test_accuracy_with_no_classified() {
        let mut map = ResultMap::new();
        map.insert(
            "x.mp4".to_string(),
            ResultRow::from_outcome(
                "x.mp4",
                &VideoOutcome::Skipped {
                    reason: SkipReason::EmptyVideo,
                },
            ),
        );
        let stats = compute_stats(&map, GroundTruth::ExpectFalse);
        assert_eq!(stats.accuracy(), 0.0);
    }
}
