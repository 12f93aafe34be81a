//! Multi-dimensional FDR control of Guo, Sarkar and Peddada (2010), "Controlling false
//! discoveries in multidimensional directional decisions, with applications to gene expression
//! data on ordered categories". Biometrics 66(2).
//!
//! Variants are tested at the row level with Bonferroni-pooled p-values and a BH step-up
//! procedure. Samples of rejected rows are then called with a per-row cutoff that shrinks with
//! the number of samples tested in that row.

use crate::errors::Error;
use crate::estimation::pvalue_matrix::{PValueEntry, PValueMatrix};
use crate::estimation::tally::SignificanceCalls;
use crate::variants::{SampleId, VariantId};

#[derive(new, Debug, Clone, Copy, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct SampleCall {
    sample: SampleId,
    pvalue: f64,
    pass: bool,
}

#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct DimAdjustResult {
    #[getset(get_copy = "pub")]
    variant: VariantId,
    /// Bonferroni-pooled p-value of the row.
    #[getset(get_copy = "pub")]
    pooled_pvalue: f64,
    #[getset(get_copy = "pub")]
    rejected: bool,
    /// Cutoff applied to the p-values of this row's samples.
    #[getset(get_copy = "pub")]
    cutoff: f64,
    #[getset(get = "pub")]
    samples: Vec<SampleCall>,
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct MultiDimAdjustment {
    #[getset(get_copy = "pub")]
    alpha: f64,
    /// Number of rejected rows.
    #[getset(get_copy = "pub")]
    rejections: usize,
    #[getset(get = "pub")]
    results: Vec<DimAdjustResult>,
}

impl MultiDimAdjustment {
    pub fn result(&self, variant: VariantId) -> Option<&DimAdjustResult> {
        self.results
            .binary_search_by_key(&variant, |result| result.variant())
            .ok()
            .map(|i| &self.results[i])
    }
}

impl SignificanceCalls for MultiDimAdjustment {
    fn engine(&self) -> &'static str {
        "multi_dim"
    }

    fn is_significant(&self, variant: VariantId) -> Option<bool> {
        self.result(variant).map(|result| result.rejected())
    }

    fn is_sample_significant(&self, entry: &PValueEntry) -> bool {
        self.result(entry.variant()).map_or(false, |result| {
            result
                .samples()
                .iter()
                .any(|call| call.sample() == entry.sample() && call.pass())
        })
    }
}

#[derive(new, Debug, Clone, Copy)]
pub struct MultiDimAdjuster {
    alpha: f64,
}

impl MultiDimAdjuster {
    /// Number of rows rejected by step-up BH on the pooled p-values, found as the fixed point of
    /// R -> #{P_i <= R * alpha / N} starting from N.
    fn rejection_count(&self, pooled: &[f64]) -> Result<usize, Error> {
        let n = pooled.len();
        let mut rejections = n;
        for _ in 0..=n {
            let threshold = rejections as f64 * self.alpha / n as f64;
            let next = pooled.iter().filter(|p| **p <= threshold).count();
            if next == rejections {
                return Ok(rejections);
            }
            rejections = next;
        }
        Err(Error::Convergence { iterations: n + 1 })
    }

    pub fn adjust(&self, matrix: &PValueMatrix) -> Result<MultiDimAdjustment, Error> {
        let rows = matrix
            .rows()
            .iter()
            .filter_map(|row| row.min_pvalue().map(|min| (row, min)))
            .collect::<Vec<_>>();
        let n = rows.len();
        let pooled = rows
            .iter()
            .map(|(row, min)| (row.m() as f64 * min).min(1.0))
            .collect::<Vec<_>>();

        let rejections = self.rejection_count(&pooled)?;
        let threshold = if n > 0 {
            rejections as f64 * self.alpha / n as f64
        } else {
            0.0
        };
        debug!(
            "Multi-dimensional adjustment: {} of {} rows rejected, row threshold {}.",
            rejections, n, threshold
        );

        let results = rows
            .iter()
            .zip(pooled.iter())
            .map(|((row, _), pooled_pvalue)| {
                let cutoff = threshold / row.m() as f64;
                let samples = row
                    .entries()
                    .iter()
                    .map(|entry| {
                        SampleCall::new(entry.sample(), entry.pvalue(), entry.pvalue() <= cutoff)
                    })
                    .collect();
                DimAdjustResult::new(
                    row.variant(),
                    *pooled_pvalue,
                    *pooled_pvalue <= threshold,
                    cutoff,
                    samples,
                )
            })
            .collect();

        info!(
            "Multi-dimensional adjustment: {} of {} variants significant at alpha = {}.",
            rejections, n, self.alpha
        );
        Ok(MultiDimAdjustment {
            alpha: self.alpha,
            rejections,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::pvalue_matrix::tests::matrix;

    fn example() -> PValueMatrix {
        matrix(&[
            &[(40, 10, 0.0001), (25, 25, 1.0)],
            &[(25, 25, 1.0), (24, 26, 0.89)],
            &[(30, 10, 0.002)],
            &[(20, 22, 0.04), (21, 20, 0.03), (22, 20, 0.5)],
            &[(26, 24, 0.89)],
            &[],
        ])
    }

    #[test]
    fn test_adjust() {
        let adjustment = MultiDimAdjuster::new(0.05).adjust(&example()).unwrap();
        // pooled: 0.0002, 1.0, 0.002, 0.09, 0.89 -> R = 2
        assert_eq!(adjustment.rejections(), 2);
        assert_eq!(adjustment.results().len(), 5);
        assert_eq!(adjustment.is_significant(VariantId(0)), Some(true));
        assert_eq!(adjustment.is_significant(VariantId(2)), Some(true));
        assert_eq!(adjustment.is_significant(VariantId(3)), Some(false));
        assert_eq!(adjustment.is_significant(VariantId(5)), None);

        let first = adjustment.result(VariantId(0)).unwrap();
        assert_relative_eq!(first.pooled_pvalue(), 0.0002, epsilon = 1e-12);
        assert_relative_eq!(first.cutoff(), 2.0 * 0.05 / (5.0 * 2.0), epsilon = 1e-12);
        assert!(first.samples()[0].pass());
        assert!(!first.samples()[1].pass());

        let single = adjustment.result(VariantId(2)).unwrap();
        assert_relative_eq!(single.cutoff(), 2.0 * 0.05 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_step_up_rejects_ties_together() {
        let matrix = matrix(&[&[(1, 1, 0.02)], &[(1, 1, 0.02)], &[(1, 1, 0.02)]]);
        let adjustment = MultiDimAdjuster::new(0.05).adjust(&matrix).unwrap();
        assert_eq!(adjustment.rejections(), 3);
    }

    #[test]
    fn test_idempotent() {
        let adjuster = MultiDimAdjuster::new(0.05);
        let first = adjuster.adjust(&example()).unwrap();
        let second = adjuster.adjust(&example()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_monotone_in_alpha_and_bonferroni_floor() {
        let matrix = example();
        let mut previous: Option<MultiDimAdjustment> = None;
        for &alpha in &[0.001, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0] {
            let adjustment = MultiDimAdjuster::new(alpha).adjust(&matrix).unwrap();
            for result in adjustment.results() {
                let m = result.samples().len() as f64;
                assert!(result.cutoff() <= alpha / m + 1e-15);
                if let Some(previous) = &previous {
                    let before = previous.result(result.variant()).unwrap();
                    assert!(result.cutoff() >= before.cutoff());
                }
            }
            previous = Some(adjustment);
        }
    }

    #[test]
    fn test_no_rejection_gives_zero_cutoffs() {
        let adjustment = MultiDimAdjuster::new(1e-6).adjust(&example()).unwrap();
        assert_eq!(adjustment.rejections(), 0);
        for result in adjustment.results() {
            assert!(!result.rejected());
            assert_eq!(result.cutoff(), 0.0);
            assert!(result.samples().iter().all(|call| !call.pass()));
        }
    }

    #[test]
    fn test_empty_matrix() {
        let adjustment = MultiDimAdjuster::new(0.05)
            .adjust(&PValueMatrix::default())
            .unwrap();
        assert_eq!(adjustment.rejections(), 0);
        assert!(adjustment.results().is_empty());
    }
}
