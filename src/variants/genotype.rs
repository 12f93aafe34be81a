use std::fmt;
use std::str::FromStr;

use rust_htslib::bcf::record::GenotypeAllele;

/// Unordered diploid genotype call of a sample at a biallelic site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genotype {
    HomRef,
    HomAlt,
    Het,
    Missing,
}

impl Genotype {
    /// Classify a call from its allele indices. Any missing allele makes the whole call missing.
    /// Haploid calls are treated as homozygous.
    pub fn from_allele_indices(alleles: &[Option<u32>]) -> Self {
        if alleles.is_empty() || alleles.iter().any(|a| a.is_none()) {
            return Genotype::Missing;
        }
        let first = alleles[0];
        if alleles.iter().all(|a| *a == first) {
            if first == Some(0) {
                Genotype::HomRef
            } else {
                Genotype::HomAlt
            }
        } else {
            Genotype::Het
        }
    }

    pub fn from_htslib(alleles: &[GenotypeAllele]) -> Self {
        let indices: Vec<Option<u32>> = alleles
            .iter()
            .map(|allele| match allele {
                GenotypeAllele::Unphased(i) | GenotypeAllele::Phased(i) => Some(*i as u32),
                GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => None,
            })
            .collect();
        Genotype::from_allele_indices(&indices)
    }

    pub fn is_homozygous(&self) -> bool {
        matches!(self, Genotype::HomRef | Genotype::HomAlt)
    }

    pub fn is_missing(&self) -> bool {
        *self == Genotype::Missing
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Genotype::HomRef => "0/0",
            Genotype::HomAlt => "1/1",
            Genotype::Het => "0/1",
            Genotype::Missing => "./.",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Genotype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let indices = s
            .split(|c| c == '/' || c == '|')
            .map(|allele| match allele {
                "." => Ok(None),
                _ => allele
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| format!("invalid genotype '{}'", s)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Genotype::from_allele_indices(&indices))
    }
}
