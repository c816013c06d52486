//! Sell-through allocation across price tiers.

use crate::error::{Result, SaleError};

/// Tolerance for accepting a caller-supplied allocation as summing to one.
pub const ALLOCATION_SUM_TOLERANCE: f64 = 1e-6;

/// Fraction of the total token supply committed to each tier.
///
/// If tier `i` is realized, every tier `0..=i` is sold at its own price, so
/// the fractions describe a cumulative sell-through schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation(Vec<f64>);

impl Allocation {
    /// Wrap fractions without checking them.
    ///
    /// Use [`Allocation::validated`] for caller-supplied input.
    pub fn new(fractions: Vec<f64>) -> Self {
        Self(fractions)
    }

    /// Equal split across `tiers`.
    pub fn uniform(tiers: usize) -> Self {
        let share = if tiers == 0 { 0.0 } else { 1.0 / tiers as f64 };
        Self(vec![share; tiers])
    }

    /// Wrap fractions after checking the tier count, signs and total.
    pub fn validated(fractions: Vec<f64>, tiers: usize) -> Result<Self> {
        let allocation = Self(fractions);
        allocation.validate(tiers)?;
        Ok(allocation)
    }

    /// Check that this allocation is usable against a ladder of `tiers`.
    pub fn validate(&self, tiers: usize) -> Result<()> {
        if self.0.len() != tiers {
            return Err(SaleError::length_mismatch(tiers, self.0.len()));
        }

        for (tier, &value) in self.0.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(SaleError::InvalidFraction { tier, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > ALLOCATION_SUM_TOLERANCE {
            return Err(SaleError::AllocationSum { sum });
        }

        Ok(())
    }

    pub fn fractions(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Move `amount` from tier `from` to tier `to`.
    pub(crate) fn transfer(&mut self, from: usize, to: usize, amount: f64) {
        self.0[from] -= amount;
        self.0[to] += amount;
    }

    pub(crate) fn get(&self, tier: usize) -> f64 {
        self.0[tier]
    }

    /// Rescale so the fractions sum to one.
    ///
    /// Fails instead of producing NaN or infinite fractions when the total is
    /// zero or not finite.
    pub fn normalize(&mut self) -> Result<()> {
        let total = self.sum();
        if total == 0.0 || !total.is_finite() {
            return Err(SaleError::ZeroTotal { total });
        }

        for fraction in &mut self.0 {
            *fraction /= total;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_accepts_reference_allocation() {
        let allocation = Allocation::validated(vec![0.5, 0.3, 0.2], 3).unwrap();
        assert_eq!(allocation.len(), 3);
        assert!((allocation.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_validated_rejects_wrong_length() {
        let err = Allocation::validated(vec![0.5, 0.5], 3).unwrap_err();
        assert_eq!(err, SaleError::LengthMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn test_validated_rejects_negative_fraction() {
        let err = Allocation::validated(vec![1.2, -0.2], 2).unwrap_err();
        assert!(matches!(err, SaleError::InvalidFraction { tier: 1, .. }));
    }

    #[test]
    fn test_validated_rejects_bad_sum() {
        let err = Allocation::validated(vec![0.5, 0.4], 2).unwrap_err();
        assert!(matches!(err, SaleError::AllocationSum { .. }));
    }

    #[test]
    fn test_normalize_rescales() {
        let mut allocation = Allocation::new(vec![2.0, 1.0, 1.0]);
        allocation.normalize().unwrap();
        assert_eq!(allocation.fractions(), &[0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_normalize_zero_total_fails() {
        let mut allocation = Allocation::new(vec![0.0, 0.0]);
        let err = allocation.normalize().unwrap_err();
        assert_eq!(err, SaleError::ZeroTotal { total: 0.0 });
        // Untouched on failure.
        assert_eq!(allocation.fractions(), &[0.0, 0.0]);
    }

    #[test]
    fn test_uniform_split() {
        let allocation = Allocation::uniform(4);
        assert_eq!(allocation.fractions(), &[0.25; 4]);
        assert!(Allocation::uniform(0).is_empty());
    }
}
