// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Orchestration of a complete analysis: filtering, binomial testing and the two independent
//! multiple testing corrections.

use anyhow::Result;
use derive_builder::Builder;

use crate::config::Config;
use crate::estimation::binomial::{test_variants, TestFailure};
use crate::estimation::{
    MetaAnalysis, MetaAnalyzer, MultiDimAdjuster, MultiDimAdjustment, PValueMatrix,
    ReferenceBias, SignificanceCalls, Tally,
};
use crate::filtration::{filter_callset, FiltrationResult};
use crate::variants::Callset;

/// Calls of one correction engine with the tallies derived from them.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct EngineOutcome<C> {
    calls: C,
    tally: Tally,
    reference_bias: ReferenceBias,
}

impl<C: SignificanceCalls> EngineOutcome<C> {
    fn new(
        calls: C,
        callset: &Callset,
        filtration: &FiltrationResult,
        matrix: &PValueMatrix,
    ) -> Self {
        let tally = Tally::compute(callset, filtration, matrix, &calls);
        let reference_bias = ReferenceBias::compute(matrix, &calls);
        EngineOutcome {
            calls,
            tally,
            reference_bias,
        }
    }
}

#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct AnalysisOutcome {
    config: Config,
    filtration: FiltrationResult,
    matrix: PValueMatrix,
    /// Variants excluded because a binomial test failed.
    test_failures: Vec<TestFailure>,
    meta_analysis: EngineOutcome<MetaAnalysis>,
    multi_dim: EngineOutcome<MultiDimAdjustment>,
}

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct Caller {
    #[builder(private)]
    config: Config,
}

impl CallerBuilder {
    /// Use the given configuration after checking it.
    pub fn checked_config(self, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(self.config(config))
    }
}

impl Caller {
    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads())
            .build()?)
    }

    /// Run the filters only.
    pub fn filter(&self, callset: &Callset) -> Result<FiltrationResult> {
        let pool = self.thread_pool()?;
        Ok(pool.install(|| filter_callset(callset, &self.config)))
    }

    /// Run the complete analysis on a callset.
    pub fn call(&self, callset: &Callset) -> Result<AnalysisOutcome> {
        let pool = self.thread_pool()?;
        pool.install(|| -> Result<AnalysisOutcome> {
            let filtration = filter_callset(callset, &self.config);
            let (matrix, test_failures) = test_variants(
                filtration.testable(),
                self.config.binomial_success_probability(),
            );
            if !test_failures.is_empty() {
                warn!(
                    "{} variants were excluded because their binomial test failed.",
                    test_failures.len()
                );
            }

            let (meta_analysis, multi_dim) = rayon::join(
                || {
                    MetaAnalyzer::new(
                        self.config.meta_bh_qvalue_cutoff(),
                        self.config.meta_sample_pvalue_cutoff(),
                    )
                    .analyze(&matrix)
                },
                || MultiDimAdjuster::new(self.config.multidim_fdr_alpha()).adjust(&matrix),
            );
            let meta_analysis =
                EngineOutcome::new(meta_analysis?, callset, &filtration, &matrix);
            let multi_dim = EngineOutcome::new(multi_dim?, callset, &filtration, &matrix);

            Ok(AnalysisOutcome {
                config: self.config.clone(),
                filtration,
                matrix,
                test_failures,
                meta_analysis,
                multi_dim,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::errors::Error;
    use crate::filtration::tests::record;
    use crate::filtration::FilterVerdict;
    use crate::variants::tests::variant;
    use crate::variants::VariantId;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ConfigBuilder::default()
            .multidim_fdr_alpha(0.0)
            .build()
            .unwrap();
        let err = CallerBuilder::default()
            .checked_config(config)
            .err()
            .unwrap();
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidConfiguration { param, .. }) => {
                assert_eq!(param, "multidim_fdr_alpha")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_no_testable_samples() {
        let callset = Callset::new(
            vec!["s1".to_owned(), "s2".to_owned()],
            vec![
                record(
                    variant(0, "chr1", 100, "A", "G"),
                    &[("0/1", "3,4"), ("0/1", "10,2")],
                ),
                record(
                    variant(1, "chr1", 300, "A", "G"),
                    &[("0/1", "3,4"), ("1/1", "0,30")],
                ),
            ],
        );
        let caller = CallerBuilder::default()
            .checked_config(Config::default())
            .unwrap()
            .build()
            .unwrap();
        let outcome = caller.call(&callset).unwrap();

        let verdicts = outcome.filtration().verdicts();
        assert_eq!(verdicts[0].verdict(), FilterVerdict::LowReadCount);
        assert_eq!(verdicts[1].verdict(), FilterVerdict::ComboFail);
        assert!(outcome.matrix().is_empty());
        assert!(outcome.meta_analysis().calls().results().is_empty());
        assert!(outcome.multi_dim().calls().results().is_empty());
        assert_eq!(
            outcome.meta_analysis().calls().is_significant(VariantId(0)),
            None
        );
        assert_eq!(outcome.multi_dim().tally().global().tested_variants, 0);
        assert!(outcome.meta_analysis().reference_bias().mean_ratio().is_none());
    }
}
