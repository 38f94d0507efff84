//! tfbind-test-data
//!
//! Test files embedded in the crate for use in testing.
//!
//! The test files are represented as `TestFile` objects which package the raw
//! data and create temporary files for programs to operate on.
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

/// Example TF amino-acid sequence.
pub const EXAMPLE_PROTEIN: &str =
    "GRGRHPGKGVKSPGEKSRYETSLNLTTKRFLELLSHSADGVVDLNWAAEVLKVQKRRIYDITNVLEGIQLIAKKSKNHIQWLGS";

/// Example 100bp DNA window.
pub const EXAMPLE_DNA: &str = "agagggcggagcactcccgtgccccggggcaggagtgcagggagctcccgcgcccggaacgttgcgagcaaggcttgcgagcgtcgcaggggggcactcg";

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use tfbind_test_data::TestFile;
/// let (cfg_file, _temp) = TestFile::app_config_01().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// 600bp synthetic chromosome, 60 columns per line, soft-masked block and
    /// a trailing run of `N`.
    pub fn chromosome_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/genome/chrT.fa"),
            suffix: "fa",
        }
    }
    /// Application config pointing at the 3B ESM-2 checkpoint.
    pub fn app_config_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/config/tfbind.json"),
            suffix: "json",
        }
    }
    /// A small `TFBindingModel` config (embedding width 16) for CPU tests.
    pub fn tfbinding_config_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/config/tfbinding_small.json"),
            suffix: "json",
        }
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }

    /// Write as `{dir}/{stem}.{suffix}`, for loaders that resolve files by name.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P, stem: &str) -> std::io::Result<PathBuf> {
        let path = dir.as_ref().join(format!("{}.{}", stem, self.suffix));
        fs::write(&path, self.filebinary)?;
        Ok(path)
    }
}
