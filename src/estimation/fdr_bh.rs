// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Benjamini-Hochberg step-up procedure for controlling the false discovery rate.

use anyhow::{Context, Result};
use itertools::Itertools;
use ordered_float::NotNan;

use crate::variants::VariantId;

/// Compute BH q-values for the given p-values.
///
/// p-values are ranked in ascending order. Ties are broken by `VariantId`, which makes the
/// ranking deterministic regardless of input order.
///
/// # Arguments
///
/// * `pvalues` - p-value of each variant
///
/// # Returns
///
/// q-values in the order of the input.
pub fn benjamini_hochberg(pvalues: &[(VariantId, f64)]) -> Result<Vec<f64>> {
    let n = pvalues.len();
    let keys = pvalues
        .iter()
        .map(|(variant, p)| {
            NotNan::new(*p)
                .map(|p| (p, *variant))
                .with_context(|| format!("p-value of variant {} is NaN", variant))
        })
        .collect::<Result<Vec<_>>>()?;
    let order = (0..n).sorted_by_key(|i| keys[*i]).collect_vec();

    let mut qvalues = vec![1.0; n];
    let mut running_min = 1.0f64;
    for (rank, &i) in order.iter().enumerate().rev() {
        let q = (*keys[i].0 * n as f64 / (rank + 1) as f64).min(1.0);
        running_min = running_min.min(q);
        qvalues[i] = running_min;
    }
    Ok(qvalues)
}
