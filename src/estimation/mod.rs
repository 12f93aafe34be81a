// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

pub mod binomial;
pub mod fdr_bh;
pub mod meta_analysis;
pub mod multi_dim;
pub mod pvalue_matrix;
pub mod reference_bias;
pub mod tally;

pub use binomial::{binomial_test, TestFailure};
pub use meta_analysis::{MetaAnalysis, MetaAnalyzer, MetaResult};
pub use multi_dim::{DimAdjustResult, MultiDimAdjuster, MultiDimAdjustment};
pub use pvalue_matrix::{PValueEntry, PValueMatrix, PValueRow};
pub use reference_bias::ReferenceBias;
pub use tally::{SignificanceCalls, Tally};
