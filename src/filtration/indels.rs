use std::collections::HashMap;

use itertools::Itertools;

use crate::variants::Variant;

/// Window around an indel in which other variants are not trusted.
#[derive(new, Debug, Clone, PartialEq, Eq, Getters, CopyGetters, Serialize)]
pub struct IndelRegion {
    #[getset(get = "pub")]
    chrom: String,
    #[getset(get_copy = "pub")]
    pos: u64,
    #[getset(get_copy = "pub")]
    width: u64,
}

impl IndelRegion {
    pub fn start(&self) -> u64 {
        self.pos.saturating_sub(self.width)
    }

    pub fn end(&self) -> u64 {
        self.pos.saturating_add(self.width)
    }

    /// Both window boundaries are part of the region.
    pub fn contains(&self, chrom: &str, pos: u64) -> bool {
        self.chrom == chrom && self.start() <= pos && pos <= self.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndelStats {
    pub exclusion_regions: usize,
    /// Sites can carry several indel alleles, so this may exceed the number of regions.
    pub indel_alleles: usize,
    pub longest: Option<usize>,
    pub shortest: Option<usize>,
    pub mean_length: Option<f64>,
}

/// All indel exclusion regions of a callset, indexed by chromosome for fast lookup.
#[derive(Debug, Clone, Getters)]
pub struct IndelIndex {
    #[getset(get = "pub")]
    regions: Vec<IndelRegion>,
    #[getset(get = "pub")]
    stats: IndelStats,
    width: u64,
    anchors: HashMap<String, Vec<u64>>,
}

impl IndelIndex {
    /// First filtering pass: every site with an indel allele becomes an anchor.
    pub fn build<'a, I>(variants: I, width: u64) -> Self
    where
        I: IntoIterator<Item = &'a Variant>,
    {
        let mut regions = Vec::new();
        let mut lengths = Vec::new();
        let mut anchors: HashMap<String, Vec<u64>> = HashMap::new();

        for variant in variants.into_iter().filter(|variant| variant.is_indel()) {
            lengths.extend(variant.indel_allele_lengths());
            regions.push(IndelRegion::new(
                variant.chrom().to_owned(),
                variant.pos(),
                width,
            ));
            anchors
                .entry(variant.chrom().to_owned())
                .or_insert_with(Vec::new)
                .push(variant.pos());
        }
        for positions in anchors.values_mut() {
            positions.sort_unstable();
            positions.dedup();
        }

        let known_lengths = lengths.iter().filter_map(|l| *l).collect_vec();
        let stats = IndelStats {
            exclusion_regions: regions.len(),
            indel_alleles: lengths.len(),
            longest: known_lengths.iter().max().cloned(),
            shortest: known_lengths.iter().min().cloned(),
            mean_length: if known_lengths.is_empty() {
                None
            } else {
                Some(known_lengths.iter().sum::<usize>() as f64 / known_lengths.len() as f64)
            },
        };

        IndelIndex {
            regions,
            stats,
            width,
            anchors,
        }
    }

    pub fn is_near_indel(&self, chrom: &str, pos: u64) -> bool {
        if let Some(positions) = self.anchors.get(chrom) {
            let start = pos.saturating_sub(self.width);
            let i = positions.partition_point(|anchor| *anchor < start);
            positions
                .get(i)
                .map_or(false, |anchor| *anchor <= pos.saturating_add(self.width))
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::tests::variant;

    #[test]
    fn test_exclusion_boundaries() {
        let variants = vec![variant(0, "chr1", 500, "AT", "A")];
        let index = IndelIndex::build(&variants, 75);
        assert!(index.is_near_indel("chr1", 500));
        assert!(index.is_near_indel("chr1", 425));
        assert!(index.is_near_indel("chr1", 575));
        assert!(!index.is_near_indel("chr1", 424));
        assert!(!index.is_near_indel("chr1", 576));
        assert!(!index.is_near_indel("chr2", 500));
        assert!(index.regions()[0].contains("chr1", 575));
        assert!(!index.regions()[0].contains("chr1", 576));
    }

    #[test]
    fn test_window_near_contig_start() {
        let variants = vec![variant(0, "chr1", 3, "A", "AG")];
        let index = IndelIndex::build(&variants, 10);
        assert!(index.is_near_indel("chr1", 1));
        assert_eq!(index.regions()[0].start(), 0);
    }

    #[test]
    fn test_stats() {
        let variants = vec![
            variant(0, "chr1", 100, "ATTT", "A"),
            variant(1, "chr1", 200, "A", "G"),
            variant(2, "chr2", 300, "A", "AGG,*"),
        ];
        let index = IndelIndex::build(&variants, 1);
        let stats = index.stats();
        assert_eq!(stats.exclusion_regions, 2);
        assert_eq!(stats.indel_alleles, 3);
        assert_eq!(stats.longest, Some(4));
        assert_eq!(stats.shortest, Some(3));
        assert_relative_eq!(stats.mean_length.unwrap(), 3.5);
    }
}
