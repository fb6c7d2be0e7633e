pub mod video_reader;
pub mod preprocess;
pub mod sampler;
pub mod motion_detector;
pub mod analyzer;
pub mod record;
pub mod batch;
pub mod summary;
pub mod config;

pub use analyzer::{analyze_video, run_analysis};
pub use batch::{load_results, run_batch, write_results};
pub use config::{ConfigLoader, TriageConfig};
pub use motion_detector::{calculate_ssim, MotionDetector};
pub use preprocess::{preprocess_frame, DenoiseParams};
pub use record::{OutcomeValue, ResultMap, ResultRow, SkipReason, VideoOutcome};
pub use sampler::{plan_windows, AnalysisWindow, WindowPlan};
pub use summary::{compute_stats, display_summary, parse_label, GroundTruth, SummaryStats};
pub use video_reader::{FrameSource, VideoReader};
