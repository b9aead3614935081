//! Early stopping on the validation loss.
//!
//! Boosting keeps adding LUTs as long as the training loss decreases, which
//! eventually overfits. [`EarlyStopping`] follows the validation loss after
//! every round, remembers how many rounds gave the best value, and signals
//! the booster to stop once `patience` rounds passed without improvement.

/// Validation tracking state.
///
/// # Example
///
/// ```
/// use visioner::training::EarlyStopping;
///
/// let mut stop = EarlyStopping::new(2);
/// assert!(!stop.should_stop(0.50)); // round 1
/// assert!(!stop.should_stop(0.40)); // round 2, best
/// assert!(!stop.should_stop(0.45));
/// assert!(!stop.should_stop(0.41));
/// assert!(stop.should_stop(0.42));
/// assert_eq!(stop.best_rounds(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    patience: usize,
    best_value: Option<f64>,
    best_rounds: usize,
    rounds: usize,
}

impl EarlyStopping {
    /// Stop after `patience` rounds without a lower validation loss.
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_value: None,
            best_rounds: 0,
            rounds: 0,
        }
    }

    /// Record the validation loss after one more round.
    ///
    /// Returns `true` once the last `patience + 1` rounds brought no
    /// improvement. Non-finite values never count as improvements.
    pub fn should_stop(&mut self, value: f64) -> bool {
        self.rounds += 1;
        let improved = value.is_finite() && self.best_value.map_or(true, |best| value < best);
        if improved {
            self.best_value = Some(value);
            self.best_rounds = self.rounds;
        }
        self.rounds - self.best_rounds > self.patience
    }

    /// Lowest validation loss seen.
    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }

    /// Number of rounds that produced the lowest validation loss.
    pub fn best_rounds(&self) -> usize {
        self.best_rounds
    }

    /// Number of recorded rounds.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_going_while_improving() {
        let mut stop = EarlyStopping::new(0);
        for v in [1.0, 0.9, 0.8, 0.7] {
            assert!(!stop.should_stop(v));
        }
        assert_eq!(stop.best_rounds(), 4);
        assert_eq!(stop.best_value(), Some(0.7));
    }

    #[test]
    fn zero_patience_stops_on_first_plateau() {
        let mut stop = EarlyStopping::new(0);
        assert!(!stop.should_stop(0.5));
        assert!(stop.should_stop(0.5));
        assert_eq!(stop.best_rounds(), 1);
        assert_eq!(stop.rounds(), 2);
    }

    #[test]
    fn improvement_resets_patience() {
        let mut stop = EarlyStopping::new(2);
        assert!(!stop.should_stop(1.0));
        assert!(!stop.should_stop(1.1));
        assert!(!stop.should_stop(0.9));
        assert!(!stop.should_stop(1.0));
        assert!(!stop.should_stop(1.0));
        assert!(stop.should_stop(1.0));
        assert_eq!(stop.best_rounds(), 3);
    }

    #[test]
    fn nan_is_never_best() {
        let mut stop = EarlyStopping::new(1);
        assert!(!stop.should_stop(f64::NAN));
        assert!(stop.should_stop(f64::NAN));
        assert_eq!(stop.best_value(), None);
        assert_eq!(stop.best_rounds(), 0);
    }
}
