// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::str::FromStr;

use bio_types::genome::Locus;

use crate::errors;

pub mod genotype;

pub use genotype::Genotype;

/// Dense identifier of a variant site, given by its position in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantId(pub usize);

/// Column index of a sample in the input callset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleId(pub usize);

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single variant site as reported by the upstream caller.
#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct Variant {
    #[getset(get_copy = "pub")]
    id: VariantId,
    #[getset(get = "pub")]
    chrom: String,
    /// 1-based position.
    #[getset(get_copy = "pub")]
    pos: u64,
    #[getset(get = "pub")]
    ref_allele: String,
    #[getset(get = "pub")]
    alt_alleles: Vec<String>,
    #[getset(get_copy = "pub")]
    qual: Option<f64>,
    /// Raw FILTER column, `.` if no filter has been applied.
    #[getset(get = "pub")]
    filter: String,
}

impl Variant {
    pub fn locus(&self) -> Locus {
        Locus::new(self.chrom.clone(), self.pos)
    }

    pub fn is_pass(&self) -> bool {
        self.filter == "PASS"
    }

    pub fn is_multiallelic(&self) -> bool {
        self.alt_alleles.len() > 1 || self.ref_allele.contains(',')
    }

    /// Whether any allele at this site is an insertion or deletion (including the spanning
    /// deletion allele `*`).
    pub fn is_indel(&self) -> bool {
        let ref_len = self.ref_allele.len();
        ref_len > 1
            || self
                .alt_alleles
                .iter()
                .any(|alt| alt == "*" || alt.len() > 1 || alt.len() != ref_len)
    }

    /// Lengths of all indel alleles at this site. The spanning deletion allele `*` has no
    /// length and yields `None`.
    pub fn indel_allele_lengths(&self) -> Vec<Option<usize>> {
        let mut lengths = Vec::new();
        if self.ref_allele.len() > 1 {
            lengths.push(Some(self.ref_allele.len()));
        }
        for alt in &self.alt_alleles {
            if alt == "*" {
                lengths.push(None);
            } else if alt.len() > 1 {
                lengths.push(Some(alt.len()));
            }
        }
        lengths
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.chrom, self.pos)
    }
}

/// Reference and alternate read counts of one sample (FORMAT/AD).
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct AlleleCounts {
    ref_count: u32,
    alt_count: u32,
}

impl AlleleCounts {
    pub fn total(&self) -> u64 {
        self.ref_count as u64 + self.alt_count as u64
    }

    /// Fraction of reads supporting the less frequent allele.
    pub fn minor_fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.ref_count.min(self.alt_count) as f64 / total as f64
        }
    }

    pub fn is_ref_biased(&self) -> bool {
        self.ref_count > self.alt_count
    }
}

impl fmt::Display for AlleleCounts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.ref_count, self.alt_count)
    }
}

impl FromStr for AlleleCounts {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split(',');
        let mut parse = || -> Result<u32, String> {
            fields
                .next()
                .ok_or_else(|| format!("missing read count in '{}'", s))?
                .trim()
                .parse()
                .map_err(|_| format!("invalid read count in '{}'", s))
        };
        let ref_count = parse()?;
        let alt_count = parse()?;
        Ok(AlleleCounts::new(ref_count, alt_count))
    }
}

/// Genotype and allele counts of one sample at one variant.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct SampleRecord {
    #[getset(get_copy = "pub")]
    variant: VariantId,
    #[getset(get_copy = "pub")]
    sample: SampleId,
    #[getset(get_copy = "pub")]
    genotype: Genotype,
    #[getset(get_copy = "pub")]
    counts: Option<AlleleCounts>,
    /// Reason why the sample fields could not be interpreted.
    #[getset(get = "pub")]
    malformed: Option<String>,
}

impl SampleRecord {
    pub fn new(
        variant: VariantId,
        sample: SampleId,
        genotype: Genotype,
        counts: Option<AlleleCounts>,
    ) -> Self {
        SampleRecord {
            variant,
            sample,
            genotype,
            counts,
            malformed: None,
        }
    }

    pub fn new_malformed(
        variant: VariantId,
        sample: SampleId,
        reason: impl Into<String>,
    ) -> Self {
        SampleRecord {
            variant,
            sample,
            genotype: Genotype::Missing,
            counts: None,
            malformed: Some(reason.into()),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }
}

/// A variant together with the records of all samples at that site.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct VariantRecord {
    variant: Variant,
    samples: Vec<SampleRecord>,
    malformed: Option<String>,
}

impl VariantRecord {
    pub fn new(variant: Variant, samples: Vec<SampleRecord>) -> Self {
        VariantRecord {
            variant,
            samples,
            malformed: None,
        }
    }

    /// A site that could not be interpreted. It is kept so that it receives a verdict.
    pub fn new_malformed(variant: Variant, error: &errors::Error) -> Self {
        VariantRecord {
            variant,
            samples: Vec::new(),
            malformed: Some(error.to_string()),
        }
    }

    pub fn id(&self) -> VariantId {
        self.variant.id()
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }

    /// Move the record and its samples to the given id.
    fn reindex(&mut self, id: VariantId) {
        self.variant.id = id;
        for sample in &mut self.samples {
            sample.variant = id;
        }
    }
}

/// All sites of an input file along with the sample names of its columns.
///
/// The id of each variant is its index in `records`.
#[derive(Debug, Clone, Default, Getters, Serialize)]
#[getset(get = "pub")]
pub struct Callset {
    sample_names: Vec<String>,
    records: Vec<VariantRecord>,
}

impl Callset {
    /// Records are renumbered densely in the given order, ids set by the caller are replaced.
    pub fn new(sample_names: Vec<String>, mut records: Vec<VariantRecord>) -> Self {
        for (i, record) in records.iter_mut().enumerate() {
            if record.id() != VariantId(i) {
                debug!("Renumbering variant {} at {} to {}.", record.id(), record.variant(), i);
                record.reindex(VariantId(i));
            }
        }
        Callset {
            sample_names,
            records,
        }
    }

    pub fn sample_name(&self, sample: SampleId) -> &str {
        self.sample_names
            .get(sample.0)
            .map(|name| name.as_str())
            .unwrap_or("unknown")
    }

    pub fn variant(&self, id: VariantId) -> &Variant {
        self.records[id.0].variant()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_names.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
