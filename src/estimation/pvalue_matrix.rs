use crate::variants::{AlleleCounts, SampleId, VariantId};

/// Raw binomial p-value of one tested sample record.
#[derive(new, Debug, Clone, Copy, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct PValueEntry {
    variant: VariantId,
    sample: SampleId,
    pvalue: f64,
    counts: AlleleCounts,
}

/// All tested sample records of one variant.
#[derive(new, Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct PValueRow {
    #[getset(get_copy = "pub")]
    variant: VariantId,
    #[getset(get = "pub")]
    entries: Vec<PValueEntry>,
}

impl PValueRow {
    /// Number of tested samples.
    pub fn m(&self) -> usize {
        self.entries.len()
    }

    pub fn pvalues(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|entry| entry.pvalue())
    }

    pub fn min_pvalue(&self) -> Option<f64> {
        self.pvalues().fold(None, |min, p| match min {
            Some(min) if min <= p => Some(min),
            _ => Some(p),
        })
    }

    /// Summed reference and alternate reads over all tested samples.
    pub fn total_counts(&self) -> (u64, u64) {
        self.entries.iter().fold((0, 0), |(r, a), entry| {
            (
                r + entry.counts().ref_count() as u64,
                a + entry.counts().alt_count() as u64,
            )
        })
    }
}

/// Sparse variants x samples matrix of binomial p-values. Rows are sorted by variant, missing
/// cells are samples that were not tested.
#[derive(Debug, Clone, Default, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct PValueMatrix {
    rows: Vec<PValueRow>,
}

impl PValueMatrix {
    pub fn new(mut rows: Vec<PValueRow>) -> Self {
        rows.sort_by_key(|row| row.variant());
        PValueMatrix { rows }
    }

    pub fn row(&self, variant: VariantId) -> Option<&PValueRow> {
        self.rows
            .binary_search_by_key(&variant, |row| row.variant())
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn entries(&self) -> impl Iterator<Item = &PValueEntry> {
        self.rows.iter().flat_map(|row| row.entries().iter())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_tests(&self) -> usize {
        self.rows.iter().map(|row| row.m()).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a matrix from rows of (ref, alt, p-value), one row per variant.
    pub(crate) fn matrix(rows: &[&[(u32, u32, f64)]]) -> PValueMatrix {
        PValueMatrix::new(
            rows.iter()
                .enumerate()
                .map(|(i, entries)| {
                    PValueRow::new(
                        VariantId(i),
                        entries
                            .iter()
                            .enumerate()
                            .map(|(j, (r, a, p))| {
                                PValueEntry::new(
                                    VariantId(i),
                                    SampleId(j),
                                    *p,
                                    AlleleCounts::new(*r, *a),
                                )
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_row_access() {
        let matrix = matrix(&[&[(10, 10, 1.0), (40, 10, 0.001)], &[], &[(5, 20, 0.01)]]);
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.n_tests(), 3);
        let row = matrix.row(VariantId(0)).unwrap();
        assert_relative_eq!(row.min_pvalue().unwrap(), 0.001);
        assert_eq!(row.total_counts(), (50, 20));
        assert!(matrix.row(VariantId(1)).unwrap().min_pvalue().is_none());
        assert!(matrix.row(VariantId(7)).is_none());
    }
}
