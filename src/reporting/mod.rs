// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Tab-separated reports and a JSON summary of an analysis.
//!
//! All files are written into a staging directory next to the target directory, which is
//! renamed into place once every file has been written.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use serde::Serialize;

use crate::calling::{AnalysisOutcome, EngineOutcome};
use crate::config::Config;
use crate::errors::Error;
use crate::estimation::binomial::TestFailure;
use crate::estimation::tally::{CategoryCounts, GlobalTally, SignificanceCalls};
use crate::estimation::{MetaAnalysis, MultiDimAdjustment};
use crate::filtration::{FilterStats, FilterVerdict, FiltrationResult, IndelStats};
use crate::variants::{Callset, VariantId};

pub const FILTERING_DIR: &str = "filtering";
pub const META_ANALYSIS_DIR: &str = "meta_analysis";
pub const MULTI_DIM_DIR: &str = "multi_dim";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Serialize)]
struct IndelRegionRow<'a> {
    chrom: &'a str,
    pos: u64,
    start: u64,
    end: u64,
}

#[derive(Serialize)]
struct FailedVariantRow<'a> {
    chrom: &'a str,
    pos: u64,
    #[serde(rename = "ref")]
    ref_allele: &'a str,
    alt: String,
    qual: Option<f64>,
    filter: &'a str,
    verdict: FilterVerdict,
}

#[derive(Serialize)]
struct FailedSampleRow<'a> {
    chrom: &'a str,
    pos: u64,
    sample: &'a str,
    genotype: String,
    ref_count: Option<u32>,
    alt_count: Option<u32>,
    verdict: FilterVerdict,
}

#[derive(Serialize)]
struct TestableVariantRow<'a> {
    chrom: &'a str,
    pos: u64,
    #[serde(rename = "ref")]
    ref_allele: &'a str,
    alt: String,
    testable_samples: usize,
    samples: String,
}

#[derive(Serialize)]
struct MetaResultRow<'a> {
    chrom: &'a str,
    pos: u64,
    samples: usize,
    fisher_statistic: f64,
    degrees_of_freedom: u64,
    pvalue: f64,
    qvalue: f64,
    significant: bool,
}

#[derive(Serialize)]
struct DimAdjustRow<'a> {
    chrom: &'a str,
    pos: u64,
    samples: usize,
    pooled_pvalue: f64,
    rejected: bool,
    cutoff: f64,
    passing_samples: String,
}

#[derive(Serialize)]
struct VariantTallyRow<'a> {
    chrom: &'a str,
    pos: u64,
    biallelic: usize,
    significant: usize,
    significant_ref_higher: usize,
    significant_alt_higher: usize,
    biallelic_not_significant: usize,
    homozygous_ref: usize,
    homozygous_alt: usize,
    non_testable: usize,
}

#[derive(Serialize)]
struct SampleTallyRow<'a> {
    sample: &'a str,
    testable: usize,
    biallelic: usize,
    significant: usize,
    significant_ref_higher: usize,
    significant_alt_higher: usize,
    biallelic_not_significant: usize,
    homozygous_ref: usize,
    homozygous_alt: usize,
    non_testable: usize,
}

#[derive(Serialize)]
struct ReferenceBiasRow<'a> {
    chrom: &'a str,
    pos: u64,
    ref_count: u64,
    alt_count: u64,
    ref_ratio: f64,
    status: String,
}

#[derive(Serialize)]
struct EngineSummary<'a> {
    significance: &'a GlobalTally,
    mean_reference_ratio: Option<f64>,
    /// Variants without any tested sample, as `chrom:pos`.
    non_testable: Vec<String>,
    /// Per-sample calls that are not corrected for multiple testing.
    sample_calls_are_estimates: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    config: &'a Config,
    samples: &'a [String],
    filtering: &'a FilterStats,
    indels: &'a IndelStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    tested_variants: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_failures: Option<&'a [TestFailure]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta_analysis: Option<EngineSummary<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    multi_dim: Option<EngineSummary<'a>>,
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("unable to create {}", path.display()))
}

fn write_tsv<T: Serialize, I: IntoIterator<Item = T>>(path: &Path, rows: I) -> Result<()> {
    let mut writer = tsv_writer(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn alt_alleles(alleles: &[String]) -> String {
    alleles.join(",")
}

/// Writes the reports of a run into an output directory that must not exist yet.
#[derive(new, Debug)]
pub struct Reporter<'a> {
    callset: &'a Callset,
    output: PathBuf,
}

impl<'a> Reporter<'a> {
    /// Write all files through `write` into a staging directory, then move it to the output path.
    fn staged<F>(&self, write: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if self.output.exists() {
            bail!(Error::OutputDirectoryExists {
                path: self.output.clone()
            });
        }
        let parent = match self.output.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
            Some(parent) => parent,
            None => bail!(Error::InvalidOutputDirectory {
                path: self.output.clone()
            }),
        };
        let staging = tempfile::Builder::new()
            .prefix(".ase-caller-")
            .tempdir_in(parent)
            .with_context(|| {
                format!(
                    "unable to create staging directory in {}",
                    parent.display()
                )
            })?;

        // a failing write leaves the removal of the staging directory to the guard
        write(staging.path())?;

        let staging = staging.into_path();
        if let Err(e) = fs::rename(&staging, &self.output) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(
                    "Unable to remove staging directory {}: {}",
                    staging.display(),
                    cleanup
                );
            }
            return Err(e)
                .with_context(|| format!("unable to move results into {}", self.output.display()));
        }
        info!("Results written to {}.", self.output.display());
        Ok(())
    }

    fn write_filtering_reports(&self, dir: &Path, filtration: &FiltrationResult) -> Result<()> {
        let dir = dir.join(FILTERING_DIR);
        fs::create_dir_all(&dir)?;

        write_tsv(
            &dir.join("indel_regions.tsv"),
            filtration.indels().regions().iter().map(|region| IndelRegionRow {
                chrom: region.chrom(),
                pos: region.pos(),
                start: region.start(),
                end: region.end(),
            }),
        )?;

        write_tsv(
            &dir.join("failed_variants.tsv"),
            filtration
                .verdicts()
                .iter()
                .filter(|verdict| !verdict.is_testable())
                .map(|verdict| {
                    let variant = self.callset.variant(verdict.variant());
                    FailedVariantRow {
                        chrom: variant.chrom(),
                        pos: variant.pos(),
                        ref_allele: variant.ref_allele(),
                        alt: alt_alleles(variant.alt_alleles()),
                        qual: variant.qual(),
                        filter: variant.filter(),
                        verdict: verdict.verdict(),
                    }
                }),
        )?;

        let failed_samples = filtration.verdicts().iter().flat_map(|verdict| {
            let record = &self.callset.records()[verdict.variant().0];
            verdict
                .samples()
                .iter()
                .filter(|sample| !sample.verdict().is_pass())
                .map(move |sample| {
                    let sample_record = record
                        .samples()
                        .iter()
                        .find(|s| s.sample() == sample.sample());
                    let counts = sample_record.and_then(|s| s.counts());
                    FailedSampleRow {
                        chrom: record.variant().chrom(),
                        pos: record.variant().pos(),
                        sample: self.callset.sample_name(sample.sample()),
                        genotype: sample_record
                            .map_or_else(|| ".".to_owned(), |s| s.genotype().to_string()),
                        ref_count: counts.map(|c| c.ref_count()),
                        alt_count: counts.map(|c| c.alt_count()),
                        verdict: sample.verdict(),
                    }
                })
        });
        write_tsv(&dir.join("failed_samples.tsv"), failed_samples)?;

        write_tsv(
            &dir.join("testable_variants.tsv"),
            filtration.testable().iter().map(|testable| {
                let variant = self.callset.variant(testable.variant());
                TestableVariantRow {
                    chrom: variant.chrom(),
                    pos: variant.pos(),
                    ref_allele: variant.ref_allele(),
                    alt: alt_alleles(variant.alt_alleles()),
                    testable_samples: testable.samples().len(),
                    samples: testable
                        .samples()
                        .iter()
                        .map(|s| self.callset.sample_name(s.sample()))
                        .join(","),
                }
            }),
        )?;
        Ok(())
    }

    fn write_engine_reports<C: SignificanceCalls>(
        &self,
        dir: &Path,
        engine: &EngineOutcome<C>,
    ) -> Result<()> {
        fs::create_dir_all(dir)?;
        let tally = engine.tally();

        write_tsv(
            &dir.join("variant_tally.tsv"),
            tally.variants().iter().map(|entry| {
                let variant = self.callset.variant(entry.variant());
                let c: &CategoryCounts = entry.counts();
                VariantTallyRow {
                    chrom: variant.chrom(),
                    pos: variant.pos(),
                    biallelic: c.biallelic,
                    significant: c.significant,
                    significant_ref_higher: c.significant_ref_higher,
                    significant_alt_higher: c.significant_alt_higher,
                    biallelic_not_significant: c.biallelic_not_significant,
                    homozygous_ref: c.homozygous_ref,
                    homozygous_alt: c.homozygous_alt,
                    non_testable: c.non_testable,
                }
            }),
        )?;

        write_tsv(
            &dir.join("sample_tally.tsv"),
            tally.samples().iter().map(|entry| {
                let c: &CategoryCounts = entry.counts();
                SampleTallyRow {
                    sample: self.callset.sample_name(entry.sample()),
                    testable: entry.testable(),
                    biallelic: c.biallelic,
                    significant: c.significant,
                    significant_ref_higher: c.significant_ref_higher,
                    significant_alt_higher: c.significant_alt_higher,
                    biallelic_not_significant: c.biallelic_not_significant,
                    homozygous_ref: c.homozygous_ref,
                    homozygous_alt: c.homozygous_alt,
                    non_testable: c.non_testable,
                }
            }),
        )?;

        write_tsv(
            &dir.join("reference_bias.tsv"),
            engine.reference_bias().ratios().iter().map(|ratio| {
                let variant = self.callset.variant(ratio.variant());
                ReferenceBiasRow {
                    chrom: variant.chrom(),
                    pos: variant.pos(),
                    ref_count: ratio.ref_count(),
                    alt_count: ratio.alt_count(),
                    ref_ratio: ratio.ratio(),
                    status: ratio.status().to_string(),
                }
            }),
        )?;
        Ok(())
    }

    fn write_meta_results(&self, dir: &Path, analysis: &MetaAnalysis) -> Result<()> {
        write_tsv(
            &dir.join("variant_results.tsv"),
            analysis.results().iter().map(|result| {
                let variant = self.callset.variant(result.variant());
                MetaResultRow {
                    chrom: variant.chrom(),
                    pos: variant.pos(),
                    samples: result.n_samples(),
                    fisher_statistic: result.statistic(),
                    degrees_of_freedom: result.degrees_of_freedom(),
                    pvalue: result.pvalue(),
                    qvalue: result.qvalue(),
                    significant: result.significant(),
                }
            }),
        )
    }

    fn write_multi_dim_results(&self, dir: &Path, adjustment: &MultiDimAdjustment) -> Result<()> {
        write_tsv(
            &dir.join("variant_results.tsv"),
            adjustment.results().iter().map(|result| {
                let variant = self.callset.variant(result.variant());
                DimAdjustRow {
                    chrom: variant.chrom(),
                    pos: variant.pos(),
                    samples: result.samples().len(),
                    pooled_pvalue: result.pooled_pvalue(),
                    rejected: result.rejected(),
                    cutoff: result.cutoff(),
                    passing_samples: result
                        .samples()
                        .iter()
                        .filter(|call| call.pass())
                        .map(|call| self.callset.sample_name(call.sample()))
                        .join(","),
                }
            }),
        )
    }

    fn non_testable<I: IntoIterator<Item = VariantId>>(&self, variants: I) -> Vec<String> {
        variants
            .into_iter()
            .map(|variant| self.callset.variant(variant).to_string())
            .collect()
    }

    fn write_summary(&self, dir: &Path, summary: &Summary) -> Result<()> {
        let file = fs::File::create(dir.join(SUMMARY_FILE))?;
        serde_json::to_writer_pretty(file, summary)?;
        Ok(())
    }

    /// Write the reports of a filtering-only run.
    pub fn write_filtering(&self, config: &Config, filtration: &FiltrationResult) -> Result<()> {
        self.staged(|dir| {
            self.write_filtering_reports(dir, filtration)?;
            self.write_summary(
                dir,
                &Summary {
                    config,
                    samples: self.callset.sample_names(),
                    filtering: filtration.stats(),
                    indels: filtration.indels().stats(),
                    tested_variants: None,
                    test_failures: None,
                    meta_analysis: None,
                    multi_dim: None,
                },
            )
        })
    }

    /// Write the reports of a complete analysis.
    pub fn write_analysis(&self, outcome: &AnalysisOutcome) -> Result<()> {
        self.staged(|dir| {
            self.write_filtering_reports(dir, outcome.filtration())?;

            let meta_dir = dir.join(META_ANALYSIS_DIR);
            self.write_engine_reports(&meta_dir, outcome.meta_analysis())?;
            self.write_meta_results(&meta_dir, outcome.meta_analysis().calls())?;

            let multi_dim_dir = dir.join(MULTI_DIM_DIR);
            self.write_engine_reports(&multi_dim_dir, outcome.multi_dim())?;
            self.write_multi_dim_results(&multi_dim_dir, outcome.multi_dim().calls())?;

            self.write_summary(
                dir,
                &Summary {
                    config: outcome.config(),
                    samples: self.callset.sample_names(),
                    filtering: outcome.filtration().stats(),
                    indels: outcome.filtration().indels().stats(),
                    tested_variants: Some(outcome.matrix().len()),
                    test_failures: Some(outcome.test_failures().as_slice()),
                    meta_analysis: Some(EngineSummary {
                        significance: outcome.meta_analysis().tally().global(),
                        mean_reference_ratio: outcome
                            .meta_analysis()
                            .reference_bias()
                            .mean_ratio(),
                        non_testable: self.non_testable(
                            outcome.meta_analysis().calls().non_testable().iter().cloned(),
                        ),
                        sample_calls_are_estimates: true,
                    }),
                    multi_dim: Some(EngineSummary {
                        significance: outcome.multi_dim().tally().global(),
                        mean_reference_ratio: outcome.multi_dim().reference_bias().mean_ratio(),
                        non_testable: self.non_testable(
                            outcome
                                .matrix()
                                .rows()
                                .iter()
                                .filter(|row| {
                                    outcome.multi_dim().calls().result(row.variant()).is_none()
                                })
                                .map(|row| row.variant()),
                        ),
                        sample_calls_are_estimates: false,
                    }),
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtration::filter_callset;
    use crate::filtration::tests::record;
    use crate::variants::tests::variant;

    fn callset() -> Callset {
        Callset::new(
            vec!["s1".to_owned(), "s2".to_owned()],
            vec![
                record(
                    variant(0, "chr1", 100, "AT", "A"),
                    &[("0/1", "30,30"), ("0/1", "30,30")],
                ),
                record(
                    variant(1, "chr1", 1000, "A", "G"),
                    &[("0/1", "40,10"), ("0/0", "30,0")],
                ),
            ],
        )
    }

    #[test]
    fn test_write_filtering() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out");
        let callset = callset();
        let config = Config::default();
        let filtration = filter_callset(&callset, &config);
        Reporter::new(&callset, output.clone())
            .write_filtering(&config, &filtration)
            .unwrap();

        let failed = fs::read_to_string(output.join(FILTERING_DIR).join("failed_samples.tsv"))
            .unwrap();
        let lines: Vec<&str> = failed.lines().collect();
        assert_eq!(
            lines[0],
            "chrom\tpos\tsample\tgenotype\tref_count\talt_count\tverdict"
        );
        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&"chr1\t1000\ts2\t0/0\t30\t0\thomozygous"));

        let summary: serde_json::Value =
            serde_json::from_reader(fs::File::open(output.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["filtering"]["testable_variants"], 1);
        assert_eq!(summary["indels"]["exclusion_regions"], 1);
        assert!(summary.get("meta_analysis").is_none());

        // no staging directory is left behind
        let entries = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out");
        let callset = callset();
        let reporter = Reporter::new(&callset, output.clone());
        assert!(reporter
            .staged(|dir| {
                fs::write(dir.join("partial.tsv"), "chrom\tpos\n")?;
                bail!("interrupted")
            })
            .is_err());
        assert!(!output.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);

        reporter.staged(|_| Ok(())).unwrap();
        assert!(output.is_dir());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_non_testable_positions() {
        let callset = callset();
        let reporter = Reporter::new(&callset, PathBuf::from("out"));
        assert_eq!(
            reporter.non_testable(vec![VariantId(1)]),
            vec!["chr1:1000".to_owned()]
        );
    }

    #[test]
    fn test_refuse_existing_output() {
        let tmp = tempfile::tempdir().unwrap();
        let callset = callset();
        let config = Config::default();
        let filtration = filter_callset(&callset, &config);
        let err = Reporter::new(&callset, tmp.path().to_owned())
            .write_filtering(&config, &filtration)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::OutputDirectoryExists {
                path: tmp.path().to_owned()
            })
        );
    }
}
