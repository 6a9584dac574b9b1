//! State equivalence: when do two observed screens denote the same state.
//!
//! Levels, coarsest first:
//! - **package**: package names match.
//! - **activity**: package and activity match.
//! - **widget**: as activity, plus the ordered widget lists match
//!   structurally (class, depth, resource id, bounds).
//! - **widget_attributes**: as widget, plus text and content description.
//! - **similarity**: cosine similarity of binary widget feature vectors
//!   meets a threshold.
//!
//! Every level is reflexive and symmetric. The widget-based levels are not
//! transitive under dynamic content, and widget lists compare positionally:
//! a reordered list of equal-looking widgets yields a different state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::observation::ScreenObservation;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EquivalenceError {
    #[error("similarity threshold must lie in [0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// The active equivalence notion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum StateEquivalence {
    Package,
    Activity,
    Widget,
    #[default]
    WidgetAttributes,
    Similarity { threshold: f64 },
}

impl StateEquivalence {
    /// Similarity-based equivalence with a validated threshold.
    pub fn similarity(threshold: f64) -> Result<Self, EquivalenceError> {
        let level = StateEquivalence::Similarity { threshold };
        level.validate()?;
        Ok(level)
    }

    pub fn validate(&self) -> Result<(), EquivalenceError> {
        if let StateEquivalence::Similarity { threshold } = *self {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(EquivalenceError::InvalidThreshold(threshold));
            }
        }
        Ok(())
    }

    pub fn equivalent(&self, a: &ScreenObservation, b: &ScreenObservation) -> bool {
        match *self {
            StateEquivalence::Package => a.package == b.package,
            StateEquivalence::Activity => same_activity(a, b),
            StateEquivalence::Widget => {
                same_activity(a, b)
                    && a.widgets.len() == b.widgets.len()
                    && a.widgets
                        .iter()
                        .zip(&b.widgets)
                        .all(|(x, y)| x.same_structure(y))
            }
            StateEquivalence::WidgetAttributes => {
                same_activity(a, b)
                    && a.widgets.len() == b.widgets.len()
                    && a.widgets
                        .iter()
                        .zip(&b.widgets)
                        .all(|(x, y)| x.same_attributes(y))
            }
            StateEquivalence::Similarity { threshold } => {
                let fa = FeatureVector::extract(a);
                let fb = FeatureVector::extract(b);
                match fa.cosine_similarity(&fb) {
                    Some(similarity) => similarity >= threshold,
                    None => fa.is_empty() && fb.is_empty(),
                }
            }
        }
    }
}

fn same_activity(a: &ScreenObservation, b: &ScreenObservation) -> bool {
    a.package == b.package && a.activity == b.activity
}

/// One dimension of the binary feature space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Feature {
    pub class: String,
    pub depth: u32,
    pub label: String,
}

/// Binary feature vector: the set of dimensions set to 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureVector {
    features: BTreeSet<Feature>,
}

impl FeatureVector {
    /// One dimension per distinct `(class, depth, text-or-description)`.
    pub fn extract(observation: &ScreenObservation) -> Self {
        let features = observation
            .widgets
            .iter()
            .map(|w| Feature {
                class: w.class.clone(),
                depth: w.depth,
                label: w.label().to_string(),
            })
            .collect();
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Otsuka-Ochiai coefficient `|A∩B| / sqrt(|A|·|B|)`, the cosine
    /// similarity of two 0/1 vectors. `None` if either vector is empty.
    pub fn cosine_similarity(&self, other: &FeatureVector) -> Option<f64> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let shared = self.features.intersection(&other.features).count() as f64;
        let norm = ((self.len() * other.len()) as f64).sqrt();
        Some((shared / norm).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Widget;

    fn screen(labels: &[&str]) -> ScreenObservation {
        labels.iter().fold(ScreenObservation::new("pkg", "Main"), |obs, l| {
            obs.with_widget(Widget::new("Button", 1).with_text(l))
        })
    }

    #[test]
    fn test_threshold_validation() {
        assert!(StateEquivalence::similarity(0.8).is_ok());
        assert_eq!(
            StateEquivalence::similarity(1.5),
            Err(EquivalenceError::InvalidThreshold(1.5))
        );
        assert!(StateEquivalence::similarity(-0.1).is_err());
    }

    #[test]
    fn test_identical_vectors_similarity_one() {
        let a = FeatureVector::extract(&screen(&["a", "b", "c"]));
        assert_eq!(a.cosine_similarity(&a), Some(1.0));
    }

    #[test]
    fn test_disjoint_vectors_similarity_zero() {
        let a = FeatureVector::extract(&screen(&["a", "b"]));
        let b = FeatureVector::extract(&screen(&["x", "y"]));
        assert_eq!(a.cosine_similarity(&b), Some(0.0));
    }

    #[test]
    fn test_partial_overlap() {
        let a = FeatureVector::extract(&screen(&["a", "b"]));
        let b = FeatureVector::extract(&screen(&["a", "b", "c", "d"]));
        let s = a.cosine_similarity(&b).unwrap();
        assert!((s - 2.0 / 8f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_widgets_collapse_into_one_dimension() {
        let a = FeatureVector::extract(&screen(&["a", "a"]));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_empty_feature_vectors() {
        let level = StateEquivalence::similarity(0.5).unwrap();
        let empty = ScreenObservation::new("pkg", "Main");
        assert!(level.equivalent(&empty, &empty.clone()));
        assert!(!level.equivalent(&empty, &screen(&["a"])));
        assert!(!level.equivalent(&screen(&["a"]), &empty));
    }

    #[test]
    fn test_package_and_activity_levels() {
        let a = ScreenObservation::new("pkg", "Main");
        let b = ScreenObservation::new("pkg", "Settings");
        assert!(StateEquivalence::Package.equivalent(&a, &b));
        assert!(!StateEquivalence::Activity.equivalent(&a, &b));
    }
}
