use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::classifier::{normalize, PathClassifier};
use super::languages::{Extractors, Language};
use super::tree::{dirs_first, TreeBuilder};
use super::{Extraction, FileFailure, ScanResult};
use crate::config::ScanConfig;
use crate::error::{Result, TreedocError};

/// Walks a source tree, runs the matching extractor on each file and
/// aggregates the results.
///
/// Only a missing or non-directory root fails the scan. Unreadable entries
/// and files that fail to extract are logged and recorded in
/// [`ScanResult::failures`].
pub struct Scanner {
    config: ScanConfig,
    classifier: PathClassifier,
    extractors: Extractors,
}

impl Scanner {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            classifier: PathClassifier::new(config)?,
            extractors: Extractors::new()?,
        })
    }

    pub fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    pub fn scan<P: AsRef<Path>>(&mut self, root: P) -> Result<ScanResult> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(TreedocError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(TreedocError::NotADirectory(root.to_path_buf()));
        }

        info!("Scanning {}", root.display());

        let mut result = ScanResult {
            tree: TreeBuilder::new(&self.classifier).build(root),
            ..ScanResult::default()
        };

        let classifier = &self.classifier;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by(|a, b| {
                dirs_first(
                    a.file_type().is_dir(),
                    a.file_name(),
                    b.file_type().is_dir(),
                    b.file_name(),
                )
            })
            .into_iter()
            .filter_entry(|entry| {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                entry.depth() == 0 || !classifier.should_ignore(relative)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let Some(language) = Language::from_path(path) else {
                continue;
            };
            if !self.classifier.is_included(relative) {
                debug!("Not included: {}", relative.display());
                continue;
            }

            let file = normalize(relative);
            result.files_scanned += 1;

            let extracted = Self::extract_file(
                &mut self.extractors,
                self.config.max_file_size,
                path,
                &file,
                language,
            );
            match extracted {
                Ok(extraction) => {
                    debug!(
                        "{}: {} models, {} functions",
                        file,
                        extraction.models.len(),
                        extraction.functions.len()
                    );
                    result.models.extend(extraction.models);
                    result.functions.extend(extraction.functions);
                }
                Err(e) => {
                    warn!("Error parsing {}: {}", file, e);
                    result.failures.push(FileFailure {
                        file,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Found {} models/classes and {} functions in {} files",
            result.models.len(),
            result.functions.len(),
            result.files_scanned
        );
        if !result.failures.is_empty() {
            warn!("{} files could not be parsed", result.failures.len());
        }

        Ok(result)
    }

    fn extract_file(
        extractors: &mut Extractors,
        max_file_size: u64,
        path: &Path,
        file: &str,
        language: Language,
    ) -> Result<Extraction> {
        let size = fs::metadata(path)?.len();
        if size > max_file_size {
            return Err(TreedocError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: max_file_size,
            });
        }

        let content = fs::read_to_string(path)?;
        let extractor = extractors.for_language(language);
        debug!("Extracting {} as {}", file, extractor.language_name());
        extractor.extract(&content, file)
    }
}
