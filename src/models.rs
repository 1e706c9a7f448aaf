use chrono::NaiveDateTime;
use serde::Serialize;

/// Number of slots in a feature vector.
pub const FEATURE_COUNT: usize = 7;

/// Column names in the order the classifier was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "avg_time_to_complete",
    "total_completed_modules",
    "active_days",
    "repeat_ratio",
    "avg_submission_rating",
    "avg_exam_score",
    "exam_pass_rate",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingRecord {
    pub tutorial_id: i64,
    pub status: Option<i32>,
    pub time_to_complete_hours: Option<f64>,
    pub last_activity_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExamRecord {
    pub score: Option<f64>,
    pub is_passed: Option<bool>,
}

/// Every activity row recorded for one learner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearnerActivity {
    pub tracking: Vec<TrackingRecord>,
    pub submissions: Vec<SubmissionRecord>,
    pub exams: Vec<ExamRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    pub avg_time_to_complete: f64,
    pub total_completed_modules: f64,
    pub active_days: f64,
    pub repeat_ratio: f64,
    pub avg_submission_rating: f64,
    pub avg_exam_score: f64,
    pub exam_pass_rate: f64,
}

impl FeatureVector {
    /// Values in training column order, see [`FEATURE_NAMES`].
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.avg_time_to_complete,
            self.total_completed_modules,
            self.active_days,
            self.repeat_ratio,
            self.avg_submission_rating,
            self.avg_exam_score,
            self.exam_pass_rate,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub user_id: i64,
    pub learner_type: String,
    pub features: [f64; FEATURE_COUNT],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerFeatures {
    pub user_id: i64,
    pub features: FeatureVector,
}
