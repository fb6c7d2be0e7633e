use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 跳过结果在持久化文件中使用的哨兵值（与历史结果文件保持兼容）
pub const SKIP_SENTINEL: i64 = -1;

/// 跳过分析的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 文件扩展名不是 mp4
    UnsupportedFormat,
    /// 帧数为 0（视频为空或无法解码）
    EmptyVideo,
    /// 视频长度不足以安排三个分析窗口
    TooShort,
    /// 打开或读取视频帧失败
    ReadFailure,
}

impl SkipReason {
    /// 用于日志输出的中文描述
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::UnsupportedFormat => "不是 MP4 视频文件",
            SkipReason::EmptyVideo => "视频为空或无法解码出帧",
            SkipReason::TooShort => "视频长度不足，无法安排三个分析窗口",
            SkipReason::ReadFailure => "打开或读取视频帧失败",
        }
    }
}

/// 单个视频的分析结果
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    /// 正常完成分析的判定结果
    Verdict {
        /// 是否检测到运动
        motion_detected: bool,
        /// 实际参与计算的窗口得分的平均值
        average_score: f64,
        /// 分析耗时（秒）
        elapsed_seconds: f64,
    },
    /// 视频被跳过，未产生判定
    Skipped {
        /// 跳过原因
        reason: SkipReason,
    },
}

/// 结果文件中一个单元格的取值：布尔判定、哨兵整数或浮点数值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeValue {
    Flag(bool),
    Sentinel(i64),
    Score(f64),
}

/// 持久化文件中的一行：[文件名, 是否检测到运动, 平均得分, 耗时]
/// 跳过的视频三个结果字段都写入哨兵值 -1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow(pub String, pub OutcomeValue, pub OutcomeValue, pub OutcomeValue);

impl ResultRow {
    /// 从分析结果构造一行
    pub fn from_outcome(video_name: &str, outcome: &VideoOutcome) -> Self {
        match outcome {
            VideoOutcome::Verdict {
                motion_detected,
                average_score,
                elapsed_seconds,
            } => ResultRow(
                video_name.to_string(),
                OutcomeValue::Flag(*motion_detected),
                OutcomeValue::Score(*average_score),
                OutcomeValue::Score(*elapsed_seconds),
            ),
            VideoOutcome::Skipped { .. } => ResultRow(
                video_name.to_string(),
                OutcomeValue::Sentinel(SKIP_SENTINEL),
                OutcomeValue::Sentinel(SKIP_SENTINEL),
                OutcomeValue::Sentinel(SKIP_SENTINEL),
            ),
        }
    }

    /// 视频文件名
    pub fn video_name(&self) -> &str {
        &self.0
    }

    /// 提取判定字段。跳过（哨兵）行返回 None，
    /// 调用方通过模式匹配区分，而不是和魔法数字比较
    pub fn verdict(&self) -> Option<(bool, f64, f64)> {
        match (&self.1, &self.2, &self.3) {
            (OutcomeValue::Flag(motion), OutcomeValue::Score(avg), OutcomeValue::Score(secs)) => {
                Some((*motion, *avg, *secs))
            }
            _ => None,
        }
    }
}

/// 整个批次的结果映射：文件名 -> 结果行
pub type ResultMap = BTreeMap<String, ResultRow>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_row_roundtrip() {
        let outcome = VideoOutcome::Verdict {
            motion_detected: true,
            average_score: 0.985,
            elapsed_seconds: 1.25,
        };
        let row = ResultRow::from_outcome("cam_001.mp4", &outcome);
        let json = serde_json::to_string(&row).unwrap();
        let back: ResultRow = serde_json::from_str(&json).unwrap();

        assert_eq!(back, row);
        assert_eq!(back.verdict(), Some((true, 0.985, 1.25)));
    }

    #[test]
    fn test_sentinel_row_roundtrip() {
        let outcome = VideoOutcome::Skipped {
            reason: SkipReason::TooShort,
        };
        let row = ResultRow::from_outcome("cam_002.mp4", &outcome);
        let json = serde_json::to_string(&row).unwrap();

        // 哨兵必须按整数 -1 写出，和历史结果文件逐字节一致
        assert_eq!(json, r#"["cam_002.mp4",-1,-1,-1]"#);

        let back: ResultRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
        assert_eq!(back.verdict(), None);
    }

    #[test]
    fn test_result_map_keys_unique() {
        let mut map = ResultMap::new();
        let verdict = VideoOutcome::Verdict {
            motion_detected: false,
            average_score: 0.999,
            elapsed_seconds: 0.5,
        };
        map.insert(
            "a.mp4".to_string(),
            ResultRow::from_outcome("a.mp4", &verdict),
        );
        map.insert(
            "a.mp4".to_string(),
            ResultRow::from_outcome("a.mp4", &verdict),
        );
        assert_eq!(map.len(), 1);

        let json = serde_json::to_string(&map).unwrap();
        let back: ResultMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.contains_key("a.mp4"));
    }
}
