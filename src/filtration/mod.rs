// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Two-pass filtering of a callset. The first pass collects indel exclusion regions over all
//! sites, the second pass assigns exactly one verdict to every variant and every sample record.

use std::collections::BTreeMap;

use counter::Counter;
use itertools::Itertools;
use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::config::Config;
use crate::variants::{Callset, Genotype, SampleRecord, VariantRecord};

pub mod indels;
pub mod verdict;

pub use indels::{IndelIndex, IndelRegion, IndelStats};
pub use verdict::{FilterVerdict, SampleVerdict, TestableSample, TestableVariant, VariantVerdict};

/// Samples whose minor allele is supported by less than this fraction of reads are not tested.
pub const MIN_MINOR_ALLELE_FRACTION: f64 = 0.01;

#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct FiltrationResult {
    indels: IndelIndex,
    /// One verdict per input variant, in input order.
    verdicts: Vec<VariantVerdict>,
    /// Testable variants in input order.
    testable: Vec<TestableVariant>,
    stats: FilterStats,
}

/// Classifies variants and sample records against the configured thresholds.
#[derive(new, Debug)]
pub struct VariantFilter<'a> {
    indels: &'a IndelIndex,
    min_quality: f64,
    min_read_count: u64,
}

impl<'a> VariantFilter<'a> {
    fn variant_level_verdict(&self, record: &VariantRecord) -> Option<FilterVerdict> {
        let variant = record.variant();
        if record.is_malformed() {
            Some(FilterVerdict::Malformed)
        } else if !variant.is_pass() {
            Some(FilterVerdict::FailedFilter)
        } else if variant.is_multiallelic() {
            Some(FilterVerdict::MultiAllelic)
        } else if variant.qual().map_or(true, |qual| qual < self.min_quality) {
            Some(FilterVerdict::LowQuality)
        } else if self.indels.is_near_indel(variant.chrom(), variant.pos()) {
            Some(FilterVerdict::NearIndel)
        } else {
            None
        }
    }

    pub fn sample_verdict(&self, record: &SampleRecord) -> FilterVerdict {
        if record.is_malformed() {
            return FilterVerdict::Malformed;
        }
        let counts = match record.counts() {
            Some(counts) if !record.genotype().is_missing() => counts,
            _ => return FilterVerdict::NoData,
        };
        if record.genotype().is_homozygous() {
            FilterVerdict::Homozygous
        } else if counts.total() < self.min_read_count {
            FilterVerdict::LowReadCount
        } else if counts.minor_fraction() < MIN_MINOR_ALLELE_FRACTION {
            FilterVerdict::LowAlleleFraction
        } else {
            FilterVerdict::Biallelic
        }
    }

    /// Assign verdicts to a variant and its samples. Returns the testable part of the
    /// variant if at least one sample passed.
    pub fn classify(&self, record: &VariantRecord) -> (VariantVerdict, Option<TestableVariant>) {
        if let Some(verdict) = self.variant_level_verdict(record) {
            // samples inherit the reason of their variant
            let samples = record
                .samples()
                .iter()
                .map(|sample| SampleVerdict::new(sample.sample(), verdict))
                .collect();
            return (VariantVerdict::new(record.id(), verdict, samples), None);
        }

        let mut samples = Vec::with_capacity(record.samples().len());
        let mut testable = Vec::new();
        for sample in record.samples() {
            let verdict = self.sample_verdict(sample);
            if verdict.is_pass() {
                if let Some(counts) = sample.counts() {
                    testable.push(TestableSample::new(
                        sample.sample(),
                        sample.genotype(),
                        counts,
                    ));
                }
            }
            samples.push(SampleVerdict::new(sample.sample(), verdict));
        }

        let verdict = aggregate(&samples);
        let testable = if testable.is_empty() {
            None
        } else {
            Some(TestableVariant::new(record.id(), testable))
        };
        (VariantVerdict::new(record.id(), verdict, samples), testable)
    }
}

/// Verdict of a variant that passed all variant level filters, given its sample verdicts.
pub fn aggregate(samples: &[SampleVerdict]) -> FilterVerdict {
    if samples.iter().any(|sample| sample.verdict().is_pass()) {
        return FilterVerdict::Biallelic;
    }
    let mut reasons = samples.iter().map(|sample| sample.verdict()).unique();
    match (reasons.next(), reasons.next()) {
        (None, _) => FilterVerdict::NoData,
        (Some(reason), None) => reason,
        _ => FilterVerdict::ComboFail,
    }
}

/// Run both filtering passes over a callset.
pub fn filter_callset(callset: &Callset, config: &Config) -> FiltrationResult {
    let indels = IndelIndex::build(
        callset
            .records()
            .iter()
            .filter(|record| !record.is_malformed())
            .map(|record| record.variant()),
        config.indel_exclusion_width(),
    );
    info!(
        "Found {} indel exclusion regions of half-width {}.",
        indels.regions().len(),
        config.indel_exclusion_width()
    );

    let filter = VariantFilter::new(&indels, config.min_quality(), config.min_read_count());
    let (verdicts, testable): (Vec<_>, Vec<_>) = callset
        .records()
        .par_iter()
        .map(|record| filter.classify(record))
        .unzip();
    let testable = testable.into_iter().flatten().collect_vec();

    let stats = FilterStats::collect(callset, &verdicts, &testable);
    info!(
        "{} of {} variants are testable ({} testable sample records).",
        stats.testable_variants, stats.variants, stats.testable_samples
    );

    FiltrationResult {
        indels,
        verdicts,
        testable,
        stats,
    }
}

/// Genotype composition of variants that failed because all samples are homozygous.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomozygousBreakdown {
    pub all_ref: usize,
    pub all_alt: usize,
    pub mixed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterStats {
    pub variants: usize,
    pub sample_records: usize,
    pub testable_variants: usize,
    pub testable_samples: usize,
    pub variant_verdicts: BTreeMap<FilterVerdict, usize>,
    pub sample_verdicts: BTreeMap<FilterVerdict, usize>,
    pub homozygous: HomozygousBreakdown,
}

impl FilterStats {
    pub fn collect(
        callset: &Callset,
        verdicts: &[VariantVerdict],
        testable: &[TestableVariant],
    ) -> Self {
        let variant_counts: Counter<FilterVerdict> =
            verdicts.iter().map(|verdict| verdict.verdict()).collect();
        let sample_counts: Counter<FilterVerdict> = verdicts
            .iter()
            .flat_map(|verdict| verdict.samples().iter().map(|sample| sample.verdict()))
            .collect();

        let mut homozygous = HomozygousBreakdown::default();
        for verdict in verdicts
            .iter()
            .filter(|verdict| verdict.verdict() == FilterVerdict::Homozygous)
        {
            let genotypes = callset.records()[verdict.variant().0]
                .samples()
                .iter()
                .map(|sample| sample.genotype())
                .unique()
                .collect_vec();
            match genotypes.as_slice() {
                [Genotype::HomRef] => homozygous.all_ref += 1,
                [Genotype::HomAlt] => homozygous.all_alt += 1,
                _ => homozygous.mixed += 1,
            }
        }

        FilterStats {
            variants: verdicts.len(),
            sample_records: sample_counts.values().sum(),
            testable_variants: testable.len(),
            testable_samples: testable.iter().map(|t| t.samples().len()).sum(),
            variant_verdicts: per_tag(&variant_counts),
            sample_verdicts: per_tag(&sample_counts),
            homozygous,
        }
    }
}

/// Counts of all tags, including the ones that were never assigned.
fn per_tag(counts: &Counter<FilterVerdict>) -> BTreeMap<FilterVerdict, usize> {
    FilterVerdict::iter()
        .map(|verdict| (verdict, counts.get(&verdict).copied().unwrap_or(0)))
        .collect()
}
