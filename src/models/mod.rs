use serde::{Deserialize, Serialize};

/// Normalized nutrition record for one analyzed food image.
///
/// Every field is always populated: the extractor fills missing or
/// malformed fields with the defaults below instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub calories_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub fiber_g: f64,
    pub estimated_portion: String,
    pub confidence: f64,
}

impl Default for NutritionEstimate {
    fn default() -> Self {
        Self {
            calories_kcal: 0.0,
            protein_g: 0.0,
            fat_g: 0.0,
            carbs_g: 0.0,
            fiber_g: 0.0,
            estimated_portion: "N/A".to_string(),
            confidence: 0.0,
        }
    }
}

impl NutritionEstimate {
    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::from_score(self.confidence)
    }

    /// Labeled rows for the result display, in fixed order.
    pub fn display_rows(&self) -> Vec<(String, String)> {
        vec![
            ("Energy".to_string(), format!("{} kcal", self.calories_kcal)),
            ("Protein".to_string(), format!("{} g", self.protein_g)),
            ("Fat".to_string(), format!("{} g", self.fat_g)),
            ("Carbohydrate".to_string(), format!("{} g", self.carbs_g)),
            ("Fiber".to_string(), format!("{} g", self.fiber_g)),
            ("Portion estimate".to_string(), self.estimated_portion.clone()),
            ("Confidence".to_string(), self.confidence_band().to_string()),
        ]
    }
}

/// Three-way confidence classification, derived at display time only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceBand::High
        } else if score >= 0.5 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fully_populated() {
        let estimate = NutritionEstimate::default();
        assert_eq!(estimate.calories_kcal, 0.0);
        assert_eq!(estimate.estimated_portion, "N/A");
        assert_eq!(estimate.confidence_band(), ConfidenceBand::Low);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(ConfidenceBand::from_score(0.85), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.8), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.6), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.5), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.3), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(0.0), ConfidenceBand::Low);
    }

    #[test]
    fn test_display_rows_order() {
        let estimate = NutritionEstimate {
            calories_kcal: 250.0,
            protein_g: 12.0,
            fat_g: 8.0,
            carbs_g: 30.0,
            fiber_g: 3.0,
            estimated_portion: "1 bowl".to_string(),
            confidence: 0.9,
        };
        let rows = estimate.display_rows();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0], ("Energy".to_string(), "250 kcal".to_string()));
        assert_eq!(rows[5].1, "1 bowl");
        assert_eq!(rows[6].1, "high");
    }
}
