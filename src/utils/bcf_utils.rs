//! bcf_utils.rs
//!
//! Reading of VCF/BCF callsets with per-sample genotypes and allele depths.
//!
//! This module provides:
//! 1. Sample information extraction
//! 2. Record field extraction (chromosome, alleles, QUAL, FILTER, GT, AD)
//! 3. Conversion of whole files into a `Callset`

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use progress_logger::ProgressLogger;
use rust_htslib::bcf::{self, header::HeaderView, record::Numeric, Read};

use crate::errors::{self, Error};
use crate::variants::{
    AlleleCounts, Callset, Genotype, SampleId, SampleRecord, Variant, VariantId, VariantRecord,
};

/// htslib marker for the end of a per-sample vector shorter than the maximum.
const VECTOR_END_INTEGER: i32 = i32::MIN + 1;

/* ========= BCF Extraction Functions ============= */

/// Extract sample names from VCF header
///
/// # Arguments
/// * `vcf` - VCF reader
///
/// # Returns
/// Vector of sample names as Strings
pub(crate) fn extract_sample_names(vcf: &bcf::Reader) -> Vec<String> {
    vcf.header()
        .samples()
        .iter()
        .map(|s| String::from_utf8_lossy(s).to_string())
        .collect()
}

/// Get chromosome name from a VCF record
///
/// # Arguments
/// * `record` - VCF record
/// * `header` - VCF header (for resolving RID to name)
/// * `i` - index of the record in the file (for error messages)
///
/// # Errors
/// Returns error if the RID is missing or cannot be resolved.
pub(crate) fn get_chrom(record: &bcf::Record, header: &HeaderView, i: usize) -> Result<String> {
    let rid = record.rid().ok_or(Error::RecordMissingChrom { i })?;
    let chrom_bytes = header
        .rid2name(rid)
        .map_err(|_| Error::RecordMissingChrom { i })?;
    Ok(String::from_utf8_lossy(chrom_bytes).to_string())
}

/// FILTER names of a record joined by `;`, or `.` if no filter is set.
pub(crate) fn get_filter(record: &bcf::Record, header: &HeaderView) -> String {
    let names: Vec<String> = record
        .filters()
        .map(|id| String::from_utf8_lossy(&header.id_to_name(id)).to_string())
        .collect();
    if names.is_empty() {
        ".".to_owned()
    } else {
        names.join(";")
    }
}

/// Interpret the AD values of one sample.
///
/// The first value belongs to the reference allele, the second to the first alternate allele.
/// A single value is assigned to the called allele of a homozygous genotype.
///
/// # Returns
/// `None` if the values are missing.
///
/// # Errors
/// Returns a description of the problem if the values cannot be interpreted.
pub(crate) fn allele_counts(
    values: &[i32],
    genotype: Genotype,
) -> std::result::Result<Option<AlleleCounts>, String> {
    let values: Vec<i32> = values
        .iter()
        .cloned()
        .take_while(|v| *v != VECTOR_END_INTEGER)
        .collect();
    if values.is_empty() || values.iter().any(|v| v.is_missing()) {
        return Ok(None);
    }
    if let Some(v) = values.iter().find(|v| **v < 0) {
        return Err(format!("negative read count {} in AD", v));
    }
    let counts = match (values.as_slice(), genotype) {
        ([depth], Genotype::HomRef) => AlleleCounts::new(*depth as u32, 0),
        ([depth], Genotype::HomAlt) => AlleleCounts::new(0, *depth as u32),
        ([_], _) => {
            return Err(format!(
                "single AD value for genotype {}, expected one value per allele",
                genotype
            ))
        }
        ([ref_count, alt_count, ..], _) => {
            AlleleCounts::new(*ref_count as u32, *alt_count as u32)
        }
        ([], _) => return Ok(None),
    };
    Ok(Some(counts))
}

fn parse_variant(
    record: &bcf::Record,
    header: &HeaderView,
    i: usize,
) -> Result<Variant, (Variant, Error)> {
    let pos = record.pos() as u64 + 1;
    let qual = record.qual();
    let qual = if qual.is_missing() || qual.is_nan() {
        None
    } else {
        Some(qual as f64)
    };
    let filter = get_filter(record, header);
    let alleles = record
        .alleles()
        .into_iter()
        .map(|allele| String::from_utf8_lossy(allele).to_string())
        .collect::<Vec<_>>();

    let chrom = match get_chrom(record, header, i) {
        Ok(chrom) => chrom,
        Err(_) => {
            let variant = Variant::new(
                VariantId(i),
                ".".to_owned(),
                pos,
                ".".to_owned(),
                Vec::new(),
                qual,
                filter,
            );
            return Err((variant, Error::RecordMissingChrom { i }));
        }
    };
    match alleles.split_first() {
        Some((ref_allele, alt_alleles)) if !alt_alleles.is_empty() => Ok(Variant::new(
            VariantId(i),
            chrom,
            pos,
            ref_allele.clone(),
            alt_alleles.to_vec(),
            qual,
            filter,
        )),
        _ => {
            let error =
                errors::malformed_record(&chrom, pos as i64, "record has no alternate allele");
            let variant = Variant::new(
                VariantId(i),
                chrom,
                pos,
                alleles.first().cloned().unwrap_or_else(|| ".".to_owned()),
                Vec::new(),
                qual,
                filter,
            );
            Err((variant, error))
        }
    }
}

fn parse_samples(record: &bcf::Record, id: VariantId, n_samples: usize) -> Vec<SampleRecord> {
    let genotypes = record.genotypes().ok();
    let depths = match record.format(b"AD").integer() {
        Ok(depths) => Some(
            depths
                .iter()
                .map(|values| values.to_vec())
                .collect::<Vec<_>>(),
        ),
        Err(e) => {
            debug!("No usable AD field in record {}: {}", id, e);
            None
        }
    };

    (0..n_samples)
        .map(|s| {
            let sample = SampleId(s);
            let genotype = genotypes
                .as_ref()
                .map_or(Genotype::Missing, |genotypes| {
                    Genotype::from_htslib(&genotypes.get(s))
                });
            let values = depths.as_ref().and_then(|depths| depths.get(s));
            match values.map(|values| allele_counts(values, genotype)) {
                Some(Ok(counts)) => SampleRecord::new(id, sample, genotype, counts),
                Some(Err(reason)) => SampleRecord::new_malformed(id, sample, reason),
                None => SampleRecord::new(id, sample, genotype, None),
            }
        })
        .collect()
}

/// Read a VCF/BCF file into a `Callset`.
///
/// Records that cannot be interpreted are kept as malformed records so that they are
/// accounted for by the filters.
///
/// # Arguments
/// * `path` - path to the VCF/BCF file
///
/// # Errors
/// Returns error if the file cannot be opened or a record cannot be read.
pub fn read_callset<P: AsRef<Path>>(path: P) -> Result<Callset> {
    let path = path.as_ref();
    let mut reader = bcf::Reader::from_path(path)
        .with_context(|| format!("unable to open VCF/BCF file {}", path.display()))?;
    let sample_names = extract_sample_names(&reader);
    let header = reader.header().clone();

    let mut progress_logger = ProgressLogger::builder()
        .with_items_name("records")
        .with_frequency(std::time::Duration::from_secs(20))
        .start();
    let mut records = Vec::new();
    let mut seen_loci = HashSet::new();
    let mut record = reader.empty_record();
    while let Some(result) = reader.read(&mut record) {
        result.with_context(|| {
            format!(
                "error reading record {} of {}",
                records.len(),
                path.display()
            )
        })?;
        let i = records.len();
        let variant_record = match parse_variant(&record, &header, i) {
            Ok(variant) => {
                if !seen_loci.insert(variant.locus()) {
                    warn!(
                        "Record {} repeats the site {}:{}, it is tested as a separate variant.",
                        i,
                        variant.chrom(),
                        variant.pos()
                    );
                }
                let samples = parse_samples(&record, variant.id(), sample_names.len());
                VariantRecord::new(variant, samples)
            }
            Err((variant, error)) => {
                warn!("Malformed record, kept and tagged as malformed: {}", error);
                VariantRecord::new_malformed(variant, &error)
            }
        };
        records.push(variant_record);
        progress_logger.update(1u64);
    }
    progress_logger.stop();

    info!(
        "Read {} variants of {} samples from {}.",
        records.len(),
        sample_names.len(),
        path.display()
    );
    Ok(Callset::new(sample_names, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allele_counts() {
        assert_eq!(
            allele_counts(&[40, 10], Genotype::Het).unwrap(),
            Some(AlleleCounts::new(40, 10))
        );
        assert_eq!(
            allele_counts(&[30, VECTOR_END_INTEGER], Genotype::HomAlt).unwrap(),
            Some(AlleleCounts::new(0, 30))
        );
        assert_eq!(
            allele_counts(&[30], Genotype::HomRef).unwrap(),
            Some(AlleleCounts::new(30, 0))
        );
        assert_eq!(allele_counts(&[i32::missing()], Genotype::Het).unwrap(), None);
        assert!(allele_counts(&[30], Genotype::Het).is_err());
        assert!(allele_counts(&[-3, 5], Genotype::Het).is_err());
    }
}
