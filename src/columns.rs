//! Conventional column names used across the workflow.
//!
//! Every transform takes its column names as parameters; these constants are
//! the defaults the configuration structs fall back to.

/// Feature identifier
pub const ID: &str = "ID";
/// Feature mass-to-charge ratio
pub const MZ: &str = "MZ";
/// Feature retention time in minutes
pub const RT: &str = "RT";
/// Combined feature label such as `12_301.1412mz_5.32min`
pub const FILENAME_PATTERN: &str = "Filename";

// Source A: spectral library matching (FBMN)
/// Library hit compound name
pub const COMPOUND_NAME: &str = "compoundName";
/// Library match score (0-1)
pub const MQ_SCORE: &str = "mqScore";
/// Library spectrum quality tier ("Gold", "Silver", ...)
pub const LIBRARY_QUALITY: &str = "libraryQuality";
/// Number of shared fragment peaks
pub const SHARED_PEAKS: &str = "sharedPeaks";
/// Precursor mass error in ppm
pub const MZ_ERROR_PPM: &str = "mzErrorPpm";

// Source B: in-silico structure prediction (Sirius)
/// Predicted compound name
pub const NAME: &str = "name";
/// Prediction confidence (0-1)
pub const CONFIDENCE_SCORE: &str = "confidenceScore";

/// Arbitrated compound label
pub const RESOLVED_ANNOTATION: &str = "Resolved_Annotation";
/// Per-row dereplication outcome
pub const DEREPLICATION_STATUS: &str = "Dereplication_Status";

/// Default QC sample column prefix
pub const QC_PREFIX: &str = "QC";
/// Default biological sample column prefixes
pub const BIOLOGICAL_PREFIXES: &[&str] = &["Sample", "Bio"];

/// Case-insensitive prefix test used for sample column classification.
pub fn has_prefix_ignore_case(header: &str, prefix: &str) -> bool {
    header.len() >= prefix.len()
        && header.is_char_boundary(prefix.len())
        && header[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_ignores_case() {
        assert!(has_prefix_ignore_case("qc_01", "QC"));
        assert!(has_prefix_ignore_case("SAMPLE_A", "sample"));
        assert!(!has_prefix_ignore_case("Q", "QC"));
        assert!(!has_prefix_ignore_case("Blank_1", "QC"));
    }
}
