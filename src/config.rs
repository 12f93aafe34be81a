// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use bio::stats::Prob;
use derive_builder::Builder;

use crate::errors::{self, Error};

/// Parameters of an analysis run. A `Config` is immutable once built and handed to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder, CopyGetters)]
#[serde(default, deny_unknown_fields)]
#[builder(pattern = "owned", default)]
#[getset(get_copy = "pub")]
pub struct Config {
    /// Half-width of the window around indels in which other variants are excluded.
    #[serde(alias = "Indel_Exclusion_Region_Length")]
    indel_exclusion_width: u64,
    /// Minimum QUAL of a variant.
    #[serde(alias = "Quality_Score_Minimum_for_Variants")]
    min_quality: f64,
    /// Minimum number of reference plus alternate reads of a sample.
    #[serde(alias = "Minimum_Read_Counts")]
    min_read_count: u64,
    #[serde(alias = "Meta_BH_adj_p_value_cutoff")]
    meta_bh_qvalue_cutoff: f64,
    /// Uncorrected per-sample cutoff, only used for estimated sample tallies.
    #[serde(alias = "Meta_sample_p_value_cutoff")]
    meta_sample_pvalue_cutoff: f64,
    #[serde(alias = "Multi_Dim_adjust_pvalue_cutoff")]
    multidim_fdr_alpha: f64,
    /// Success probability of the binomial null hypothesis (0.5 = no allelic imbalance).
    #[serde(alias = "Binomial_Probability_Value")]
    binomial_success_probability: f64,
    threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            indel_exclusion_width: 1,
            min_quality: 20.0,
            min_read_count: 20,
            meta_bh_qvalue_cutoff: 0.05,
            meta_sample_pvalue_cutoff: 0.05,
            multidim_fdr_alpha: 0.05,
            binomial_success_probability: 0.5,
            threads: 1,
        }
    }
}

impl Config {
    /// Load parameters from a YAML file. Parameters that are not given keep their defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config: Config = serde_yaml::from_reader(
            File::open(path)
                .with_context(|| format!("unable to open parameter file {}", path.display()))?,
        )
        .with_context(|| format!("unable to parse parameter file {}", path.display()))?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check all parameters before anything is processed.
    pub fn validate(&self) -> Result<(), Error> {
        if self.indel_exclusion_width < 1 {
            return Err(errors::invalid_config(
                "indel_exclusion_width",
                "must be at least 1, a width of 0 would not exclude anything",
            ));
        }
        if !self.min_quality.is_finite() {
            return Err(errors::invalid_config(
                "min_quality",
                &format!("must be a finite number, got {}", self.min_quality),
            ));
        }
        check_cutoff("meta_bh_qvalue_cutoff", self.meta_bh_qvalue_cutoff)?;
        check_cutoff("meta_sample_pvalue_cutoff", self.meta_sample_pvalue_cutoff)?;
        check_cutoff("multidim_fdr_alpha", self.multidim_fdr_alpha)?;
        match Prob::checked(self.binomial_success_probability) {
            Ok(p) if *p > 0.0 && *p < 1.0 => (),
            _ => {
                return Err(errors::invalid_config(
                    "binomial_success_probability",
                    &format!(
                        "must lie in (0, 1), got {}",
                        self.binomial_success_probability
                    ),
                ))
            }
        }
        if self.threads < 1 {
            return Err(errors::invalid_config("threads", "must be at least 1"));
        }
        Ok(())
    }
}

impl From<Config> for ConfigBuilder {
    fn from(config: Config) -> Self {
        ConfigBuilder::default()
            .indel_exclusion_width(config.indel_exclusion_width)
            .min_quality(config.min_quality)
            .min_read_count(config.min_read_count)
            .meta_bh_qvalue_cutoff(config.meta_bh_qvalue_cutoff)
            .meta_sample_pvalue_cutoff(config.meta_sample_pvalue_cutoff)
            .multidim_fdr_alpha(config.multidim_fdr_alpha)
            .binomial_success_probability(config.binomial_success_probability)
            .threads(config.threads)
    }
}

fn check_cutoff(param: &str, value: f64) -> Result<(), Error> {
    match Prob::checked(value) {
        Ok(p) if *p > 0.0 => Ok(()),
        _ => Err(errors::invalid_config(
            param,
            &format!("must lie in (0, 1], got {}", value),
        )),
    }
}
