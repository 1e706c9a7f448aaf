//! Trained scaler and classifier parameters, loaded once at startup.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ArtifactError, PredictError};
use crate::models::{FeatureVector, FEATURE_COUNT};

pub const DEFAULT_LABELS: [(usize, &str); 3] = [
    (0, "Consistent Learner"),
    (1, "Fast Learner"),
    (2, "Reflective Learner"),
];

/// On-disk shape of the scaler export.
#[derive(Deserialize)]
struct ScalerFile {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Standard-score transform fit during training.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        check_width("scaler mean", &self.mean)?;
        check_width("scaler scale", &self.scale)
    }

    pub fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut scaled = features.to_array();
        for (i, value) in scaled.iter_mut().enumerate() {
            // zero variance during training leaves the column centred only
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            *value = (*value - self.mean[i]) / scale;
        }
        scaled
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    /// Cluster assignment: closest centroid wins.
    NearestCentroid { centroids: Vec<Vec<f64>> },
    /// One score row per class, highest score wins.
    Linear {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
}

impl Classifier {
    fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            Classifier::NearestCentroid { centroids } => {
                if centroids.is_empty() {
                    return Err(ArtifactError::Shape("classifier has no centroids".into()));
                }
                centroids
                    .iter()
                    .try_for_each(|centroid| check_width("centroid", centroid))
            }
            Classifier::Linear {
                coefficients,
                intercepts,
            } => {
                if coefficients.is_empty() {
                    return Err(ArtifactError::Shape("classifier has no classes".into()));
                }
                if coefficients.len() != intercepts.len() {
                    return Err(ArtifactError::Shape(format!(
                        "{} coefficient rows but {} intercepts",
                        coefficients.len(),
                        intercepts.len()
                    )));
                }
                coefficients
                    .iter()
                    .try_for_each(|row| check_width("coefficient row", row))
            }
        }
    }

    /// Class index for an already scaled vector. Ties go to the lowest index.
    pub fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> usize {
        match self {
            Classifier::NearestCentroid { centroids } => {
                let distances = centroids.iter().map(|centroid| {
                    -centroid
                        .iter()
                        .zip(scaled)
                        .map(|(c, x)| (x - c) * (x - c))
                        .sum::<f64>()
                });
                argmax(distances)
            }
            Classifier::Linear {
                coefficients,
                intercepts,
            } => {
                let scores = coefficients.iter().zip(intercepts).map(|(row, intercept)| {
                    row.iter().zip(scaled).map(|(w, x)| w * x).sum::<f64>() + intercept
                });
                argmax(scores)
            }
        }
    }
}

fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, value) in values.enumerate() {
        if value > best_value {
            best = i;
            best_value = value;
        }
    }
    best
}

fn check_width(what: &str, values: &[f64]) -> Result<(), ArtifactError> {
    if values.len() != FEATURE_COUNT {
        return Err(ArtifactError::Shape(format!(
            "{what} has {} entries, expected {FEATURE_COUNT}",
            values.len()
        )));
    }
    if values.iter().any(|value| !value.is_finite()) {
        return Err(ArtifactError::Shape(format!("{what} contains non-finite values")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap(BTreeMap<usize, String>);

impl LabelMap {
    pub fn new(labels: impl IntoIterator<Item = (usize, String)>) -> Self {
        Self(labels.into_iter().collect())
    }

    pub fn get(&self, class: usize) -> Option<&str> {
        self.0.get(&class).map(String::as_str)
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::new(
            DEFAULT_LABELS
                .iter()
                .map(|(class, label)| (*class, label.to_string())),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ModelArtifact {
    scaler: Scaler,
    classifier: Classifier,
    labels: LabelMap,
}

impl ModelArtifact {
    pub fn new(
        scaler: Scaler,
        classifier: Classifier,
        labels: LabelMap,
    ) -> Result<Self, ArtifactError> {
        scaler.validate()?;
        classifier.validate()?;
        Ok(Self {
            scaler,
            classifier,
            labels,
        })
    }

    pub fn load(scaler_path: &Path, classifier_path: &Path) -> Result<Self, ArtifactError> {
        let ScalerFile { mean, scale } = read_json(scaler_path)?;
        let scaler = Scaler::new(mean, scale)?;
        let classifier: Classifier = read_json(classifier_path)?;
        Self::new(scaler, classifier, LabelMap::default())
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<&str, PredictError> {
        let scaled = self.scaler.transform(features);
        let class = self.classifier.predict(&scaled);
        self.labels
            .get(class)
            .ok_or(PredictError::UnmappedClass(class))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn identity_scaler() -> Scaler {
        Scaler::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]).unwrap()
    }

    pub(crate) fn centroid(first: f64) -> Vec<f64> {
        let mut values = vec![0.0; FEATURE_COUNT];
        values[0] = first;
        values
    }

    /// Three clusters along avg_time_to_complete at 0, 10 and 20 hours.
    pub(crate) fn sample_artifact() -> ModelArtifact {
        ModelArtifact::new(
            identity_scaler(),
            Classifier::NearestCentroid {
                centroids: vec![centroid(0.0), centroid(10.0), centroid(20.0)],
            },
            LabelMap::default(),
        )
        .unwrap()
    }

    fn features_with_time(hours: f64) -> FeatureVector {
        FeatureVector {
            avg_time_to_complete: hours,
            ..FeatureVector::default()
        }
    }

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn scaler_standardizes_and_tolerates_zero_scale() {
        let scaler = Scaler::new(
            vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 5.0],
            vec![2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0],
        )
        .unwrap();
        let features = FeatureVector {
            avg_time_to_complete: 5.0,
            total_completed_modules: 2.0,
            exam_pass_rate: 6.0,
            ..FeatureVector::default()
        };
        let scaled = scaler.transform(&features);
        assert_eq!(scaled[0], 2.0);
        assert_eq!(scaled[1], 0.0);
        assert_eq!(scaled[6], 1.0);
    }

    #[test]
    fn nearest_centroid_picks_closest_cluster() {
        let artifact = sample_artifact();
        assert_eq!(artifact.classify(&features_with_time(1.0)).unwrap(), "Consistent Learner");
        assert_eq!(artifact.classify(&features_with_time(11.0)).unwrap(), "Fast Learner");
        assert_eq!(artifact.classify(&features_with_time(40.0)).unwrap(), "Reflective Learner");
    }

    #[test]
    fn linear_classifier_takes_highest_score() {
        let classifier = Classifier::Linear {
            coefficients: vec![centroid(-1.0), centroid(1.0)],
            intercepts: vec![0.5, 0.0],
        };
        classifier.validate().unwrap();
        assert_eq!(classifier.predict(&[0.0; FEATURE_COUNT]), 0);
        assert_eq!(classifier.predict(&features_with_time(2.0).to_array()), 1);
    }

    #[test]
    fn unmapped_class_is_an_error() {
        let artifact = ModelArtifact::new(
            identity_scaler(),
            Classifier::NearestCentroid {
                centroids: vec![centroid(0.0), centroid(10.0), centroid(20.0), centroid(30.0)],
            },
            LabelMap::default(),
        )
        .unwrap();

        let err = artifact.classify(&features_with_time(31.0)).unwrap_err();
        assert!(matches!(err, PredictError::UnmappedClass(3)));
    }

    #[test]
    fn rejects_wrong_width() {
        let err = Scaler::new(vec![0.0; 6], vec![1.0; FEATURE_COUNT]).unwrap_err();
        assert!(matches!(err, ArtifactError::Shape(_)));

        let err = ModelArtifact::new(
            identity_scaler(),
            Classifier::Linear {
                coefficients: vec![centroid(1.0)],
                intercepts: vec![],
            },
            LabelMap::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ArtifactError::Shape(_)));
    }

    #[test]
    fn loads_json_artifacts_from_disk() {
        let scaler = write_file(
            r#"{"mean": [0, 0, 0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1, 1, 1]}"#,
        );
        let classifier = write_file(
            r#"{"kind": "nearest_centroid", "centroids": [
                [0, 0, 0, 0, 0, 0, 0],
                [10, 0, 0, 0, 0, 0, 0]
            ]}"#,
        );

        let artifact = ModelArtifact::load(scaler.path(), classifier.path()).unwrap();
        assert_eq!(artifact.classify(&features_with_time(9.0)).unwrap(), "Fast Learner");
    }

    #[test]
    fn short_scaler_file_is_rejected() {
        let scaler = write_file(r#"{"mean": [0, 0, 0], "scale": [1, 1, 1]}"#);
        let classifier = write_file(
            r#"{"kind": "nearest_centroid", "centroids": [[0, 0, 0, 0, 0, 0, 0]]}"#,
        );

        let err = ModelArtifact::load(scaler.path(), classifier.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Shape(_)));
    }

    #[test]
    fn missing_or_garbled_files_fail_to_load() {
        let scaler = write_file(
            r#"{"mean": [0, 0, 0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1, 1, 1]}"#,
        );
        let err = ModelArtifact::load(scaler.path(), Path::new("/nonexistent/classifier.json"))
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));

        let garbled = write_file("not json");
        let err = ModelArtifact::load(scaler.path(), garbled.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn shipped_artifacts_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("artifacts");
        let artifact =
            ModelArtifact::load(&root.join("scaler.json"), &root.join("classifier.json")).unwrap();
        assert!(artifact.classify(&FeatureVector::default()).is_ok());
    }
}
