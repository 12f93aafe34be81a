// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid configuration: {param} {msg}")]
    InvalidConfiguration { param: String, msg: String },
    #[error("invalid VCF/BCF record at {chrom}:{pos}: {msg}")]
    MalformedRecord { chrom: String, pos: i64, msg: String },
    #[error("record {i} in VCF/BCF does not define a chromosome")]
    RecordMissingChrom { i: usize },
    #[error("degenerate binomial test input (k={k}, n={n}), records with zero total reads must be filtered upstream")]
    DegenerateInput { k: u64, n: u64 },
    #[error("multi-dimensional FDR adjustment did not converge within {iterations} iterations")]
    Convergence { iterations: usize },
    #[error("output directory {path:?} already exists, refusing to overwrite it")]
    OutputDirectoryExists { path: PathBuf },
    #[error("output directory {path:?} has no parent directory to stage results in")]
    InvalidOutputDirectory { path: PathBuf },
}

pub(crate) fn invalid_config(param: &str, msg: &str) -> Error {
    Error::InvalidConfiguration {
        param: param.to_owned(),
        msg: msg.to_owned(),
    }
}

pub(crate) fn malformed_record(chrom: &str, pos: i64, msg: &str) -> Error {
    Error::MalformedRecord {
        chrom: chrom.to_owned(),
        pos,
        msg: msg.to_owned(),
    }
}
