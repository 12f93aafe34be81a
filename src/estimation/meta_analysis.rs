//! Meta-analysis across samples: Fisher's method per variant followed by BH correction across
//! variants.

use anyhow::Result;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::estimation::fdr_bh::benjamini_hochberg;
use crate::estimation::pvalue_matrix::{PValueEntry, PValueMatrix};
use crate::estimation::tally::SignificanceCalls;
use crate::variants::VariantId;

/// Fisher's combined probability test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FisherCombination {
    pub statistic: f64,
    pub degrees_of_freedom: u64,
    pub pvalue: f64,
}

/// Combine independent p-values with Fisher's method. Returns `None` for an empty set.
/// A zero p-value makes the statistic infinite and the combined p-value zero.
pub fn fisher_combine(pvalues: &[f64]) -> Result<Option<FisherCombination>> {
    if pvalues.is_empty() {
        return Ok(None);
    }
    let degrees_of_freedom = 2 * pvalues.len() as u64;
    if pvalues.iter().any(|p| *p <= 0.0) {
        return Ok(Some(FisherCombination {
            statistic: f64::INFINITY,
            degrees_of_freedom,
            pvalue: 0.0,
        }));
    }
    let statistic = -2.0 * pvalues.iter().map(|p| p.ln()).sum::<f64>();
    let chi2 = ChiSquared::new(degrees_of_freedom as f64)?;
    Ok(Some(FisherCombination {
        statistic,
        degrees_of_freedom,
        pvalue: chi2.sf(statistic),
    }))
}

#[derive(new, Debug, Clone, Copy, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct MetaResult {
    variant: VariantId,
    n_samples: usize,
    statistic: f64,
    degrees_of_freedom: u64,
    pvalue: f64,
    qvalue: f64,
    significant: bool,
}

/// Results of the meta-analysis, one per variant with at least one tested sample.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct MetaAnalysis {
    #[getset(get = "pub")]
    results: Vec<MetaResult>,
    /// Rows without any tested sample.
    #[getset(get = "pub")]
    non_testable: Vec<VariantId>,
    #[getset(get_copy = "pub")]
    qvalue_cutoff: f64,
    #[getset(get_copy = "pub")]
    sample_pvalue_cutoff: f64,
}

impl MetaAnalysis {
    pub fn result(&self, variant: VariantId) -> Option<&MetaResult> {
        self.results
            .binary_search_by_key(&variant, |result| result.variant())
            .ok()
            .map(|i| &self.results[i])
    }

    pub fn n_significant(&self) -> usize {
        self.results.iter().filter(|r| r.significant()).count()
    }
}

impl SignificanceCalls for MetaAnalysis {
    fn engine(&self) -> &'static str {
        "meta_analysis"
    }

    fn is_significant(&self, variant: VariantId) -> Option<bool> {
        self.result(variant).map(|result| result.significant())
    }

    /// Per-sample calls are uncorrected estimates within significant variants.
    fn is_sample_significant(&self, entry: &PValueEntry) -> bool {
        self.is_significant(entry.variant()).unwrap_or(false)
            && entry.pvalue() <= self.sample_pvalue_cutoff
    }
}

#[derive(new, Debug, Clone, Copy)]
pub struct MetaAnalyzer {
    qvalue_cutoff: f64,
    sample_pvalue_cutoff: f64,
}

impl MetaAnalyzer {
    pub fn analyze(&self, matrix: &PValueMatrix) -> Result<MetaAnalysis> {
        let mut combined = Vec::with_capacity(matrix.len());
        let mut non_testable = Vec::new();
        for row in matrix.rows() {
            let pvalues: Vec<f64> = row.pvalues().collect();
            match fisher_combine(&pvalues)? {
                Some(fisher) => combined.push((row.variant(), row.m(), fisher)),
                None => non_testable.push(row.variant()),
            }
        }

        let qvalues = benjamini_hochberg(
            &combined
                .iter()
                .map(|(variant, _, fisher)| (*variant, fisher.pvalue))
                .collect::<Vec<_>>(),
        )?;
        let results: Vec<MetaResult> = combined
            .into_iter()
            .zip(qvalues)
            .map(|((variant, m, fisher), qvalue)| {
                MetaResult::new(
                    variant,
                    m,
                    fisher.statistic,
                    fisher.degrees_of_freedom,
                    fisher.pvalue,
                    qvalue,
                    qvalue <= self.qvalue_cutoff,
                )
            })
            .collect();

        let analysis = MetaAnalysis {
            results,
            non_testable,
            qvalue_cutoff: self.qvalue_cutoff,
            sample_pvalue_cutoff: self.sample_pvalue_cutoff,
        };
        info!(
            "Meta-analysis: {} of {} variants significant at q <= {}.",
            analysis.n_significant(),
            analysis.results.len(),
            self.qvalue_cutoff
        );
        Ok(analysis)
    }
}
