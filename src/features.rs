use std::collections::HashSet;

use crate::models::{
    ExamRecord, FeatureVector, LearnerActivity, SubmissionRecord, TrackingRecord,
};

pub fn compute_features(activity: &LearnerActivity) -> FeatureVector {
    FeatureVector {
        avg_time_to_complete: avg_time_to_complete(&activity.tracking),
        total_completed_modules: total_completed_modules(&activity.tracking) as f64,
        active_days: active_days(&activity.tracking) as f64,
        repeat_ratio: repeat_ratio(&activity.tracking),
        avg_submission_rating: avg_submission_rating(&activity.submissions),
        avg_exam_score: avg_exam_score(&activity.exams),
        exam_pass_rate: exam_pass_rate(&activity.exams),
    }
}

pub fn total_completed_modules(tracking: &[TrackingRecord]) -> usize {
    tracking.iter().filter(|row| row.status == Some(1)).count()
}

pub fn avg_time_to_complete(tracking: &[TrackingRecord]) -> f64 {
    mean_or_zero(tracking.iter().map(|row| row.time_to_complete_hours))
}

pub fn active_days(tracking: &[TrackingRecord]) -> usize {
    tracking
        .iter()
        .filter_map(|row| row.last_activity_date)
        .map(|at| at.date())
        .collect::<HashSet<_>>()
        .len()
}

/// Share of rows whose tutorial already appeared earlier in source order.
/// Every occurrence after the first counts, not just one per tutorial.
pub fn repeat_ratio(tracking: &[TrackingRecord]) -> f64 {
    if tracking.is_empty() {
        return 0.0;
    }

    let mut seen = HashSet::new();
    let repeats = tracking
        .iter()
        .filter(|row| !seen.insert(row.tutorial_id))
        .count();

    repeats as f64 / tracking.len() as f64
}

pub fn avg_submission_rating(submissions: &[SubmissionRecord]) -> f64 {
    mean_or_zero(submissions.iter().map(|row| row.rating))
}

pub fn avg_exam_score(exams: &[ExamRecord]) -> f64 {
    mean_or_zero(exams.iter().map(|row| row.score))
}

pub fn exam_pass_rate(exams: &[ExamRecord]) -> f64 {
    mean_or_zero(
        exams
            .iter()
            .map(|row| row.is_passed.map(|passed| if passed { 1.0 } else { 0.0 })),
    )
}

/// Mean of the present, finite values; 0 when there are none.
fn mean_or_zero(values: impl Iterator<Item = Option<f64>>) -> f64 {
    let (total, count) = values
        .flatten()
        .filter(|value| value.is_finite())
        .fold((0.0, 0usize), |(total, count), value| (total + value, count + 1));

    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}
