//! Reference allele ratios of tested variants, a quick indicator of reference mapping bias.

use strum_macros::{Display, EnumString};

use crate::estimation::pvalue_matrix::PValueMatrix;
use crate::estimation::tally::SignificanceCalls;
use crate::variants::VariantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
pub enum AseStatus {
    #[strum(serialize = "Sig_ASE")]
    #[serde(rename = "Sig_ASE")]
    Significant,
    #[strum(serialize = "No_ASE")]
    #[serde(rename = "No_ASE")]
    NotSignificant,
}

#[derive(new, Debug, Clone, Copy, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct ReferenceRatio {
    variant: VariantId,
    ref_count: u64,
    alt_count: u64,
    ratio: f64,
    status: AseStatus,
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct ReferenceBias {
    #[getset(get = "pub")]
    ratios: Vec<ReferenceRatio>,
    #[getset(get_copy = "pub")]
    mean_ratio: Option<f64>,
}

impl ReferenceBias {
    /// Summed reads of the tested samples of each variant, with the engine's verdict.
    pub fn compute<C: SignificanceCalls>(matrix: &PValueMatrix, calls: &C) -> Self {
        let ratios: Vec<ReferenceRatio> = matrix
            .rows()
            .iter()
            .filter_map(|row| {
                let (ref_count, alt_count) = row.total_counts();
                let total = ref_count + alt_count;
                if total == 0 {
                    return None;
                }
                let status = if calls.is_significant(row.variant()).unwrap_or(false) {
                    AseStatus::Significant
                } else {
                    AseStatus::NotSignificant
                };
                Some(ReferenceRatio::new(
                    row.variant(),
                    ref_count,
                    alt_count,
                    ref_count as f64 / total as f64,
                    status,
                ))
            })
            .collect();

        let mean_ratio = if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().map(|r| r.ratio()).sum::<f64>() / ratios.len() as f64)
        };
        if let Some(mean) = mean_ratio {
            info!(
                "Mean reference allele ratio over {} variants: {:.4}",
                ratios.len(),
                mean
            );
        }

        ReferenceBias { ratios, mean_ratio }
    }
}
