use std::sync::Arc;

use crate::artifact::ModelArtifact;
use crate::db::RecordSource;
use crate::error::{PredictError, SourceError};
use crate::features::compute_features;
use crate::models::{LearnerFeatures, Prediction, FEATURE_NAMES};

/// Feature vector for one learner, without classifying it.
pub async fn learner_features<S: RecordSource>(
    source: &S,
    user_id: i64,
) -> Result<LearnerFeatures, SourceError> {
    let activity = source.activity(user_id).await?;
    Ok(LearnerFeatures {
        user_id,
        features: compute_features(&activity),
    })
}

pub struct PredictionService<S> {
    source: S,
    artifact: Arc<ModelArtifact>,
}

impl<S: RecordSource> PredictionService<S> {
    pub fn new(source: S, artifact: Arc<ModelArtifact>) -> Self {
        Self { source, artifact }
    }

    pub async fn features(&self, user_id: i64) -> Result<LearnerFeatures, PredictError> {
        learner_features(&self.source, user_id).await.map_err(|err| {
            log::error!("activity fetch failed for user {user_id}: {err}");
            PredictError::from(err)
        })
    }

    pub async fn predict(&self, user_id: i64) -> Result<Prediction, PredictError> {
        let LearnerFeatures { features, .. } = self.features(user_id).await?;
        if log::log_enabled!(log::Level::Debug) {
            for (name, value) in FEATURE_NAMES.iter().zip(features.to_array()) {
                log::debug!("user {user_id} {name} = {value}");
            }
        }

        let learner_type = self.artifact.classify(&features).map_err(|err| {
            log::error!("prediction failed for user {user_id}: {err}");
            err
        })?;
        log::info!("user {user_id} classified as {learner_type}");

        Ok(Prediction {
            user_id,
            learner_type: learner_type.to_string(),
            features: features.to_array(),
        })
    }
}
