use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;

const HEADER: &str = "##fileformat=VCFv4.2
##FILTER=<ID=PASS,Description=\"All filters passed\">
##FILTER=<ID=LowQual,Description=\"Low quality\">
##contig=<ID=chr1,length=1000000>
##contig=<ID=chr2,length=1000000>
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths for the ref and alt alleles\">";

/// A VCF line: chrom, pos, ref, alt, qual, filter and one (GT, AD) pair per sample.
pub(crate) struct Site<'a> {
    pub chrom: &'a str,
    pub pos: u64,
    pub ref_allele: &'a str,
    pub alt: &'a str,
    pub qual: &'a str,
    pub filter: &'a str,
    pub samples: Vec<(&'a str, &'a str)>,
}

pub(crate) fn site<'a>(pos: u64, samples: Vec<(&'a str, &'a str)>) -> Site<'a> {
    Site {
        chrom: "chr1",
        pos,
        ref_allele: "A",
        alt: "G",
        qual: "100",
        filter: "PASS",
        samples,
    }
}

pub(crate) fn write_vcf(dir: &Path, sample_names: &[&str], sites: &[Site]) -> PathBuf {
    let path = dir.join("calls.vcf");
    let mut lines = vec![HEADER.to_owned()];
    lines.push(
        [
            "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
        ]
        .iter()
        .chain(sample_names.iter())
        .join("\t"),
    );
    for site in sites {
        let mut fields = vec![
            site.chrom.to_owned(),
            site.pos.to_string(),
            ".".to_owned(),
            site.ref_allele.to_owned(),
            site.alt.to_owned(),
            site.qual.to_owned(),
            site.filter.to_owned(),
            ".".to_owned(),
            "GT:AD".to_owned(),
        ];
        fields.extend(site.samples.iter().map(|(gt, ad)| format!("{}:{}", gt, ad)));
        lines.push(fields.join("\t"));
    }
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

/// One variant with allelic imbalance at chr1:1000 among balanced sites, plus sites failing
/// each variant level filter.
pub(crate) fn scenario<'a>() -> Vec<Site<'a>> {
    let mut sites = vec![site(1000, vec![("0/1", "40,10"), ("0/1", "25,25")])];
    for i in 0..10 {
        let counts = match i % 3 {
            0 => ("0/1", "25,25"),
            1 => ("0/1", "24,26"),
            _ => ("0/1", "26,24"),
        };
        sites.push(site(2000 + i * 100, vec![counts, ("0/1", "25,25")]));
    }
    sites.push(Site {
        ref_allele: "AT",
        alt: "A",
        ..site(5000, vec![("0/1", "20,20"), ("0/1", "20,20")])
    });
    sites.push(site(5001, vec![("0/1", "40,10"), ("0/1", "40,10")]));
    sites.push(Site {
        qual: ".",
        ..site(6000, vec![("0/1", "40,10"), ("0/1", "40,10")])
    });
    sites.push(Site {
        filter: "LowQual",
        ..site(7000, vec![("0/1", "40,10"), ("0/1", "40,10")])
    });
    sites.push(Site {
        alt: "G,T",
        ..site(8000, vec![("1/2", "0,20,20"), ("0/1", "20,20,0")])
    });
    sites.push(site(9000, vec![("1/1", "30"), ("./.", ".")]));
    sites
}
