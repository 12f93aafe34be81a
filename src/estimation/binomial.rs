// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Exact two-sided binomial test of allelic imbalance.

use rayon::prelude::*;
use statrs::distribution::{Binomial, Discrete};

use crate::errors::{self, Error};
use crate::estimation::pvalue_matrix::{PValueEntry, PValueMatrix, PValueRow};
use crate::filtration::TestableVariant;
use crate::variants::{SampleId, VariantId};

/// Relative tolerance when comparing outcome probabilities against the observed one.
const RELATIVE_TOLERANCE: f64 = 1e-7;

/// Two-sided exact binomial test.
///
/// The p-value is the total probability of all outcomes that are at most as likely as the
/// observed one (minimum likelihood definition).
///
/// # Arguments
///
/// * `k` - number of successes (alternate reads)
/// * `n` - number of trials (total reads)
/// * `p` - success probability under the null hypothesis
///
/// # Errors
///
/// `Error::DegenerateInput` if `n` is zero or `k` exceeds `n`.
pub fn binomial_test(k: u64, n: u64, p: f64) -> Result<f64, Error> {
    if n == 0 || k > n {
        return Err(Error::DegenerateInput { k, n });
    }
    let dist = Binomial::new(p, n).map_err(|e| {
        errors::invalid_config("binomial_success_probability", &e.to_string())
    })?;

    let observed = dist.pmf(k) * (1.0 + RELATIVE_TOLERANCE);
    let pvalue: f64 = (0..=n)
        .map(|i| dist.pmf(i))
        .filter(|prob| *prob <= observed)
        .sum();

    Ok(pvalue.min(1.0))
}

/// A sample record whose binomial test could not be performed.
#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct TestFailure {
    #[getset(get_copy = "pub")]
    variant: VariantId,
    #[getset(get_copy = "pub")]
    sample: SampleId,
    #[getset(get = "pub")]
    reason: String,
}

fn test_variant(variant: &TestableVariant, p: f64) -> Result<PValueRow, TestFailure> {
    let entries = variant
        .samples()
        .iter()
        .map(|sample| {
            let counts = sample.counts();
            binomial_test(counts.alt_count() as u64, counts.total(), p)
                .map(|pvalue| PValueEntry::new(variant.variant(), sample.sample(), pvalue, counts))
                .map_err(|e| TestFailure::new(variant.variant(), sample.sample(), e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PValueRow::new(variant.variant(), entries))
}

/// Test all testable sample records in parallel. A failing test excludes its whole variant, the
/// remaining variants are still tested.
pub fn test_variants(testable: &[TestableVariant], p: f64) -> (PValueMatrix, Vec<TestFailure>) {
    let results: Vec<_> = testable
        .par_iter()
        .map(|variant| test_variant(variant, p))
        .collect();

    let mut rows = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(row) => rows.push(row),
            Err(failure) => {
                error!(
                    "Binomial test failed for variant {}, sample {}: {}",
                    failure.variant(),
                    failure.sample(),
                    failure.reason()
                );
                failures.push(failure);
            }
        }
    }
    info!(
        "Computed {} binomial p-values for {} variants.",
        rows.iter().map(|row| row.m()).sum::<usize>(),
        rows.len()
    );

    (PValueMatrix::new(rows), failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtration::TestableSample;
    use crate::variants::{AlleleCounts, Genotype};

    #[test]
    fn test_known_values() {
        assert_relative_eq!(
            binomial_test(10, 50, 0.5).unwrap(),
            2.3861331676755526e-05,
            max_relative = 1e-8
        );
        assert_relative_eq!(
            binomial_test(3, 20, 0.3).unwrap(),
            0.22041826738070916,
            max_relative = 1e-8
        );
        assert_relative_eq!(binomial_test(7, 10, 0.5).unwrap(), 0.34375, epsilon = 1e-10);
        assert_relative_eq!(binomial_test(0, 5, 0.5).unwrap(), 0.0625, epsilon = 1e-10);
    }

    #[test]
    fn test_balanced_counts() {
        assert_relative_eq!(binomial_test(25, 50, 0.5).unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_symmetry() {
        for &(k, n, p) in &[(3, 20, 0.3), (10, 50, 0.5), (1, 7, 0.2), (40, 41, 0.6)] {
            let pvalue = binomial_test(k, n, p).unwrap();
            let mirrored = binomial_test(n - k, n, 1.0 - p).unwrap();
            assert_relative_eq!(pvalue, mirrored, max_relative = 1e-6);
            assert!(pvalue > 0.0 && pvalue <= 1.0);
        }
    }

    #[test]
    fn test_zero_reads() {
        assert_eq!(
            binomial_test(0, 0, 0.5),
            Err(Error::DegenerateInput { k: 0, n: 0 })
        );
    }

    #[test]
    fn test_failure_excludes_variant() {
        let sample = |i, r, a| {
            TestableSample::new(SampleId(i), Genotype::Het, AlleleCounts::new(r, a))
        };
        let testable = vec![
            TestableVariant::new(VariantId(0), vec![sample(0, 40, 10), sample(1, 25, 25)]),
            TestableVariant::new(VariantId(1), vec![sample(0, 20, 20), sample(1, 0, 0)]),
        ];
        let (matrix, failures) = test_variants(&testable, 0.5);
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.rows()[0].variant(), VariantId(0));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].variant(), VariantId(1));
        assert_eq!(failures[0].sample(), SampleId(1));
    }
}
