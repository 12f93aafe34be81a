// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use crate::calling::CallerBuilder;
use crate::config::{Config, ConfigBuilder};
use crate::reporting::Reporter;
use crate::utils::read_callset;

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    name = "ase-caller",
    about = "Detection of allele-specific expression from multi-sample RNA-seq variant calls.",
    setting = structopt::clap::AppSettings::ColoredHelp
)]
pub struct AseCaller {
    #[structopt(long, short, global = true, help = "Print debug information.")]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt, Clone)]
pub enum Command {
    #[structopt(
        name = "call",
        about = "Filter variants, test them for allelic imbalance and control the false discovery \
                 rate with a meta-analysis and a multi-dimensional procedure.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Call {
        #[structopt(
            parse(from_os_str),
            help = "VCF/BCF file with genotypes (GT) and allele depths (AD) of all samples."
        )]
        vcf: PathBuf,
        #[structopt(
            long,
            short,
            parse(from_os_str),
            help = "Output directory. Must not exist yet."
        )]
        output: PathBuf,
        #[structopt(flatten)]
        params: ConfigOptions,
    },
    #[structopt(
        name = "filter",
        about = "Only run the filters and report which variants and samples are testable.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Filter {
        #[structopt(
            parse(from_os_str),
            help = "VCF/BCF file with genotypes (GT) and allele depths (AD) of all samples."
        )]
        vcf: PathBuf,
        #[structopt(
            long,
            short,
            parse(from_os_str),
            help = "Output directory. Must not exist yet."
        )]
        output: PathBuf,
        #[structopt(flatten)]
        params: ConfigOptions,
    },
    #[structopt(
        name = "print-config",
        about = "Print the configuration as YAML, e.g. as a template for a parameter file.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    PrintConfig {
        #[structopt(flatten)]
        params: ConfigOptions,
    },
}

/// Parameter file and command line overrides of single parameters.
#[derive(Debug, StructOpt, Clone, Default)]
pub struct ConfigOptions {
    #[structopt(
        long = "config",
        parse(from_os_str),
        help = "YAML file with parameters. Parameters not given keep their defaults."
    )]
    config: Option<PathBuf>,
    #[structopt(
        long,
        help = "Half-width of the window around indels in which variants are excluded [default: 1]."
    )]
    indel_exclusion_width: Option<u64>,
    #[structopt(long, help = "Minimum variant quality (QUAL) [default: 20].")]
    min_quality: Option<f64>,
    #[structopt(
        long,
        help = "Minimum number of reference plus alternate reads of a sample [default: 20]."
    )]
    min_read_count: Option<u64>,
    #[structopt(
        long,
        help = "BH-adjusted p-value cutoff of the meta-analysis [default: 0.05]."
    )]
    meta_bh_qvalue_cutoff: Option<f64>,
    #[structopt(
        long,
        help = "Uncorrected p-value cutoff for estimated ASE samples within significant \
                meta-analysis variants [default: 0.05]."
    )]
    meta_sample_pvalue_cutoff: Option<f64>,
    #[structopt(
        long,
        help = "FDR level of the multi-dimensional procedure [default: 0.05]."
    )]
    multidim_fdr_alpha: Option<f64>,
    #[structopt(
        long,
        help = "Success probability of the binomial null hypothesis [default: 0.5]."
    )]
    binomial_success_probability: Option<f64>,
    #[structopt(long, short, help = "Number of threads to use [default: 1].")]
    threads: Option<usize>,
}

impl ConfigOptions {
    /// Load the parameter file (if any) and apply the overrides given on the command line.
    pub fn resolve(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::from_yaml(path)?,
            None => Config::default(),
        };
        let mut builder = ConfigBuilder::from(config);
        if let Some(value) = self.indel_exclusion_width {
            builder = builder.indel_exclusion_width(value);
        }
        if let Some(value) = self.min_quality {
            builder = builder.min_quality(value);
        }
        if let Some(value) = self.min_read_count {
            builder = builder.min_read_count(value);
        }
        if let Some(value) = self.meta_bh_qvalue_cutoff {
            builder = builder.meta_bh_qvalue_cutoff(value);
        }
        if let Some(value) = self.meta_sample_pvalue_cutoff {
            builder = builder.meta_sample_pvalue_cutoff(value);
        }
        if let Some(value) = self.multidim_fdr_alpha {
            builder = builder.multidim_fdr_alpha(value);
        }
        if let Some(value) = self.binomial_success_probability {
            builder = builder.binomial_success_probability(value);
        }
        if let Some(value) = self.threads {
            builder = builder.threads(value);
        }
        let config = builder.build()?;
        config.validate()?;
        Ok(config)
    }
}

pub fn run(opt: AseCaller) -> Result<()> {
    match opt.command {
        Command::Call {
            vcf,
            output,
            params,
        } => {
            let config = params.resolve()?;
            let caller = CallerBuilder::default().checked_config(config)?.build()?;
            let callset = read_callset(&vcf)?;
            let outcome = caller.call(&callset)?;
            Reporter::new(&callset, output).write_analysis(&outcome)?;
        }
        Command::Filter {
            vcf,
            output,
            params,
        } => {
            let config = params.resolve()?;
            let caller = CallerBuilder::default()
                .checked_config(config.clone())?
                .build()?;
            let callset = read_callset(&vcf)?;
            let filtration = caller.filter(&callset)?;
            Reporter::new(&callset, output).write_filtering(&config, &filtration)?;
        }
        Command::PrintConfig { params } => {
            print!("{}", params.resolve()?.to_yaml()?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let opt = AseCaller::from_iter(&[
            "ase-caller",
            "call",
            "calls.vcf",
            "--output",
            "out",
            "--min-read-count",
            "10",
            "--threads",
            "2",
        ]);
        match opt.command {
            Command::Call { params, output, .. } => {
                assert_eq!(output, PathBuf::from("out"));
                let config = params.resolve().unwrap();
                assert_eq!(config.min_read_count(), 10);
                assert_eq!(config.threads(), 2);
                assert_eq!(config.indel_exclusion_width(), 1);
            }
            _ => panic!("unexpected subcommand"),
        }
    }

    #[test]
    fn test_invalid_override() {
        let opt = AseCaller::from_iter(&["ase-caller", "print-config", "--multidim-fdr-alpha", "2"]);
        match opt.command {
            Command::PrintConfig { params } => assert!(params.resolve().is_err()),
            _ => panic!("unexpected subcommand"),
        }
    }
}
