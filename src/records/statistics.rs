use super::*;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregates derived from stored predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_predictions: usize,
    pub average_confidence: f64,
    pub disease_distribution: BTreeMap<String, usize>,
}

impl From<&[Prediction]> for Statistics {
    fn from(predictions: &[Prediction]) -> Self {
        let total_predictions = predictions.len();
        let average_confidence = match total_predictions {
            0 => 0.,
            n => predictions.iter().map(|p| p.confidence).sum::<f64>() / n as f64,
        };
        let mut disease_distribution = BTreeMap::new();
        for prediction in predictions {
            *disease_distribution
                .entry(prediction.disease.clone())
                .or_default() += 1;
        }
        Self {
            total_predictions,
            average_confidence,
            disease_distribution,
        }
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let distribution = serde_json::to_string(&self.disease_distribution).map_err(|_| std::fmt::Error)?;
        writeln!(f, "{:<24}{}", "total predictions", self.total_predictions)?;
        writeln!(f, "{:<24}{:.2}", "average confidence", self.average_confidence)?;
        write!(f, "{:<24}{}", "disease distribution", distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(id: &str, disease: &str, confidence: f64) -> Prediction {
        Prediction {
            prediction_id: id.to_string(),
            disease: disease.to_string(),
            confidence,
        }
    }

    #[test]
    fn empty_store_has_zero_statistics() {
        assert_eq!(Statistics::from(&[][..]), Statistics::default());
    }

    #[test]
    fn aggregates_predictions() {
        let predictions = vec![
            prediction("1", "Eczema", 0.5),
            prediction("2", "Psoriasis", 0.75),
            prediction("3", "Eczema", 1.0),
        ];
        let stats = Statistics::from(predictions.as_slice());
        assert_eq!(stats.total_predictions, 3);
        assert!((stats.average_confidence - 0.75).abs() < 1e-12);
        assert_eq!(stats.disease_distribution.get("Eczema"), Some(&2));
        assert_eq!(stats.disease_distribution.get("Psoriasis"), Some(&1));
        assert!(stats.to_string().contains(r#"{"Eczema":2,"Psoriasis":1}"#));
    }
}
