use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::variants::{AlleleCounts, Genotype, SampleId, VariantId};

/// Terminal classification of a variant or of a sample record at a variant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FilterVerdict {
    /// Passed all filters, the record is testable.
    Biallelic,
    Homozygous,
    NearIndel,
    LowQuality,
    MultiAllelic,
    LowReadCount,
    LowAlleleFraction,
    NoData,
    /// Samples under the variant failed for different reasons.
    ComboFail,
    /// FILTER column is not PASS.
    FailedFilter,
    Malformed,
}

impl FilterVerdict {
    pub fn is_pass(&self) -> bool {
        *self == FilterVerdict::Biallelic
    }
}

#[derive(new, Debug, Clone, Copy, PartialEq, Eq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct SampleVerdict {
    sample: SampleId,
    verdict: FilterVerdict,
}

/// Verdict of a variant together with the verdicts of all of its sample records.
#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct VariantVerdict {
    #[getset(get_copy = "pub")]
    variant: VariantId,
    #[getset(get_copy = "pub")]
    verdict: FilterVerdict,
    #[getset(get = "pub")]
    samples: Vec<SampleVerdict>,
}

impl VariantVerdict {
    pub fn is_testable(&self) -> bool {
        self.verdict.is_pass()
    }

    pub fn sample_verdict(&self, sample: SampleId) -> Option<FilterVerdict> {
        self.samples
            .iter()
            .find(|s| s.sample() == sample)
            .map(|s| s.verdict())
    }
}

/// A sample record that passed all filters.
#[derive(new, Debug, Clone, Copy, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct TestableSample {
    sample: SampleId,
    genotype: Genotype,
    counts: AlleleCounts,
}

/// A variant with at least one testable sample record, carrying only those records.
#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct TestableVariant {
    #[getset(get_copy = "pub")]
    variant: VariantId,
    #[getset(get = "pub")]
    samples: Vec<TestableSample>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tag_names() {
        assert_eq!(FilterVerdict::NearIndel.to_string(), "near_indel");
        let tag: &'static str = FilterVerdict::LowAlleleFraction.into();
        assert_eq!(tag, "low_allele_fraction");
        assert_eq!(
            FilterVerdict::from_str("combo_fail").unwrap(),
            FilterVerdict::ComboFail
        );
    }
}
