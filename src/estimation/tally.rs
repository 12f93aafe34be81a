//! Tallies of significant variants and samples, per variant, per sample and in total.

use std::collections::HashSet;

use crate::estimation::pvalue_matrix::{PValueEntry, PValueMatrix};
use crate::filtration::{FilterVerdict, FiltrationResult};
use crate::variants::{Callset, Genotype, SampleId, VariantId};

/// Significance decisions of a correction engine.
pub trait SignificanceCalls {
    /// Short name of the engine, used to label reports.
    fn engine(&self) -> &'static str;

    /// `None` if the variant was not tested by the engine.
    fn is_significant(&self, variant: VariantId) -> Option<bool>;

    fn is_sample_significant(&self, entry: &PValueEntry) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub biallelic: usize,
    pub significant: usize,
    pub significant_ref_higher: usize,
    pub significant_alt_higher: usize,
    pub biallelic_not_significant: usize,
    pub homozygous_ref: usize,
    pub homozygous_alt: usize,
    pub non_testable: usize,
}

impl CategoryCounts {
    fn add_tested(&mut self, entry: &PValueEntry, significant: bool) {
        self.biallelic += 1;
        if significant {
            self.significant += 1;
            if entry.counts().is_ref_biased() {
                self.significant_ref_higher += 1;
            } else {
                self.significant_alt_higher += 1;
            }
        } else {
            self.biallelic_not_significant += 1;
        }
    }

    fn add_untested(&mut self, genotype: Option<Genotype>, verdict: FilterVerdict) {
        match (verdict, genotype) {
            (FilterVerdict::Homozygous, Some(Genotype::HomRef)) => self.homozygous_ref += 1,
            (FilterVerdict::Homozygous, Some(Genotype::HomAlt)) => self.homozygous_alt += 1,
            _ => self.non_testable += 1,
        }
    }
}

/// Sample composition of a significant variant.
#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct VariantTally {
    #[getset(get_copy = "pub")]
    variant: VariantId,
    #[getset(get = "pub")]
    counts: CategoryCounts,
}

/// Calls of one sample across all significant variants.
#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct SampleTally {
    #[getset(get_copy = "pub")]
    sample: SampleId,
    /// Tested records of the sample across all variants.
    #[getset(get_copy = "pub")]
    testable: usize,
    #[getset(get = "pub")]
    counts: CategoryCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalTally {
    pub tested_variants: usize,
    pub significant_variants: usize,
    pub tested_sample_records: usize,
    /// Counted per variant and sample, a sample can contribute several times.
    pub significant_sample_records: usize,
    pub significant_ref_higher: usize,
    pub significant_alt_higher: usize,
    /// Distinct samples with at least one significant record.
    pub significant_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct Tally {
    engine: String,
    variants: Vec<VariantTally>,
    samples: Vec<SampleTally>,
    global: GlobalTally,
}

impl Tally {
    pub fn compute<C: SignificanceCalls>(
        callset: &Callset,
        filtration: &FiltrationResult,
        matrix: &PValueMatrix,
        calls: &C,
    ) -> Self {
        let n_samples = callset.n_samples();
        let mut sample_counts = vec![CategoryCounts::default(); n_samples];
        let mut sample_testable = vec![0; n_samples];
        let mut variants = Vec::new();
        let mut global = GlobalTally::default();
        let mut significant_samples = HashSet::new();

        for row in matrix.rows() {
            let significant = match calls.is_significant(row.variant()) {
                Some(significant) => significant,
                None => continue,
            };
            global.tested_variants += 1;
            global.tested_sample_records += row.m();
            for entry in row.entries() {
                if let Some(testable) = sample_testable.get_mut(entry.sample().0) {
                    *testable += 1;
                }
            }
            if !significant {
                continue;
            }
            global.significant_variants += 1;

            let mut counts = CategoryCounts::default();
            for entry in row.entries() {
                let sample_significant = calls.is_sample_significant(entry);
                counts.add_tested(entry, sample_significant);
                if let Some(sample) = sample_counts.get_mut(entry.sample().0) {
                    sample.add_tested(entry, sample_significant);
                }
                if sample_significant {
                    significant_samples.insert(entry.sample());
                }
            }

            let record = &callset.records()[row.variant().0];
            let verdict = &filtration.verdicts()[row.variant().0];
            for sample_verdict in verdict
                .samples()
                .iter()
                .filter(|sample| !sample.verdict().is_pass())
            {
                let genotype = record
                    .samples()
                    .iter()
                    .find(|sample| sample.sample() == sample_verdict.sample())
                    .map(|sample| sample.genotype());
                counts.add_untested(genotype, sample_verdict.verdict());
                if let Some(sample) = sample_counts.get_mut(sample_verdict.sample().0) {
                    sample.add_untested(genotype, sample_verdict.verdict());
                }
            }

            global.significant_sample_records += counts.significant;
            global.significant_ref_higher += counts.significant_ref_higher;
            global.significant_alt_higher += counts.significant_alt_higher;
            variants.push(VariantTally::new(row.variant(), counts));
        }
        global.significant_samples = significant_samples.len();

        let samples = sample_counts
            .into_iter()
            .zip(sample_testable)
            .enumerate()
            .map(|(i, (counts, testable))| SampleTally::new(SampleId(i), testable, counts))
            .collect();

        Tally {
            engine: calls.engine().to_owned(),
            variants,
            samples,
            global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::estimation::binomial::test_variants;
    use crate::estimation::meta_analysis::MetaAnalyzer;
    use crate::filtration::filter_callset;
    use crate::filtration::tests::record;
    use crate::variants::tests::variant;

    #[test]
    fn test_tally() {
        let callset = Callset::new(
            vec!["s1".to_owned(), "s2".to_owned(), "s3".to_owned()],
            vec![
                record(
                    variant(0, "chr1", 1000, "A", "G"),
                    &[("0/1", "40,10"), ("0/1", "25,25"), ("1/1", "0,30")],
                ),
                record(
                    variant(1, "chr1", 2000, "A", "G"),
                    &[("0/1", "26,24"), ("0/1", "24,26"), ("0/1", "3,2")],
                ),
            ],
        );
        let filtration = filter_callset(&callset, &Config::default());
        let (matrix, _) = test_variants(filtration.testable(), 0.5);
        let analysis = MetaAnalyzer::new(0.05, 0.05).analyze(&matrix).unwrap();
        let tally = Tally::compute(&callset, &filtration, &matrix, &analysis);

        assert_eq!(tally.engine(), "meta_analysis");
        assert_eq!(tally.global().tested_variants, 2);
        assert_eq!(tally.global().significant_variants, 1);
        assert_eq!(tally.global().significant_sample_records, 1);
        assert_eq!(tally.global().significant_ref_higher, 1);
        assert_eq!(tally.global().significant_samples, 1);

        let counts = tally.variants()[0].counts();
        assert_eq!(tally.variants()[0].variant(), VariantId(0));
        assert_eq!(counts.biallelic, 2);
        assert_eq!(counts.significant, 1);
        assert_eq!(counts.biallelic_not_significant, 1);
        assert_eq!(counts.homozygous_alt, 1);

        let s1 = &tally.samples()[0];
        assert_eq!(s1.testable(), 2);
        assert_eq!(s1.counts().significant_ref_higher, 1);
        let s3 = &tally.samples()[2];
        assert_eq!(s3.testable(), 0);
        assert_eq!(s3.counts().homozygous_alt, 1);
    }
}
