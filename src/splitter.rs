//! The split orchestrator: analysis, candidate generation, selection,
//! application, and learning feedback behind one entry point.
//!
//! `split` is total over operational failures. A bad configuration is the
//! caller's bug and surfaces as `Err`; everything else (parse failure,
//! write failure, rollback) is folded into the returned [`SplitResult`]
//! with `success == false` and the original file untouched.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analyzers::analyzer_for;
use crate::config::SplitConfig;
use crate::core::{Language, RationaleSource, SplitResult, StrategyKind, StructuralTree};
use crate::errors::{Result, SplitError};
use crate::io::{BackupManager, FileSystem, RealFileSystem};
use crate::learning::{FileSignature, LearningMemory};
use crate::scoring::{self, CompletionProvider};
use crate::strategies::{generate_candidates, SplitContext};

/// Progress markers recorded while a split attempt runs, consulted when an
/// error is folded into the result.
#[derive(Default)]
struct Attempt {
    signature: Option<FileSignature>,
    strategy: Option<StrategyKind>,
}

pub struct Splitter {
    fs: Arc<dyn FileSystem>,
    learning: Arc<LearningMemory>,
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Splitter {
    pub fn new() -> Self {
        Self {
            fs: Arc::new(RealFileSystem::new()),
            learning: Arc::new(LearningMemory::new()),
            provider: None,
        }
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_learning(mut self, learning: Arc<LearningMemory>) -> Self {
        self.learning = learning;
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn learning(&self) -> &LearningMemory {
        &self.learning
    }

    /// Split one file. The caller supplies the content; `file_path` names
    /// the file, determines the language, and anchors backup and component
    /// writes. Returns `Err` only for a self-contradictory configuration;
    /// every operational failure comes back as a result with
    /// `success == false`.
    pub fn split(
        &self,
        file_path: &Path,
        source: &str,
        config: &SplitConfig,
    ) -> Result<SplitResult> {
        self.run(file_path, source, config, None)
    }

    /// Like [`split`](Self::split), but abandons the operation once `budget`
    /// has elapsed. Expiry between stages is an ordinary failed result;
    /// writes already made are rolled back by the backup manager.
    pub fn split_with_deadline(
        &self,
        file_path: &Path,
        source: &str,
        config: &SplitConfig,
        budget: Duration,
    ) -> Result<SplitResult> {
        self.run(file_path, source, config, Some(Instant::now() + budget))
    }

    fn run(
        &self,
        file_path: &Path,
        source: &str,
        config: &SplitConfig,
        deadline: Option<Instant>,
    ) -> Result<SplitResult> {
        let started = Instant::now();
        config.validate()?;

        let mut attempt = Attempt::default();
        match self.try_split(file_path, source, config, deadline, started, &mut attempt) {
            Ok(result) => Ok(result),
            Err(SplitError::Config(message)) => Err(SplitError::Config(message)),
            Err(e) => {
                let elapsed = started.elapsed().as_millis() as u64;
                log::warn!("split of {} failed: {e}", file_path.display());
                if config.enable_learning {
                    if let (Some(signature), Some(strategy)) =
                        (&attempt.signature, attempt.strategy)
                    {
                        self.learning.record_outcome(signature, strategy, false);
                    }
                }
                Ok(SplitResult::failure(
                    attempt.strategy,
                    format!("{}: {e}", e.stage()),
                    elapsed,
                ))
            }
        }
    }

    fn try_split(
        &self,
        file_path: &Path,
        source: &str,
        config: &SplitConfig,
        deadline: Option<Instant>,
        started: Instant,
        attempt: &mut Attempt,
    ) -> Result<SplitResult> {
        check_deadline(deadline)?;
        let language = Language::from_path(file_path).ok_or_else(|| {
            SplitError::UnsupportedLanguage {
                path: file_path.to_path_buf(),
            }
        })?;
        let analyzer = analyzer_for(language);
        let tree = analyzer.analyze(source)?;

        if within_thresholds(&tree, config) {
            log::debug!(
                "{} is within every threshold, nothing to split",
                file_path.display()
            );
            return Ok(trivial_result(file_path, &tree, started));
        }

        let signature = FileSignature::of(&tree);
        attempt.signature = Some(signature.clone());

        check_deadline(deadline)?;
        let file_stem = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("component");
        let ctx = SplitContext::new(&tree, config, file_stem);
        let candidates =
            generate_candidates(&ctx, &self.learning, &signature, config.enable_learning);

        check_deadline(deadline)?;
        let scored = scoring::select(
            &candidates,
            config,
            &self.learning,
            &signature,
            self.provider.clone(),
        )?;
        attempt.strategy = Some(scored.candidate.strategy);
        log::info!(
            "selected {} with confidence {:.2} ({:?})",
            scored.candidate.strategy.tag(),
            scored.confidence,
            scored.rationale,
        );

        if scored.candidate.strategy == StrategyKind::NoSplit {
            // No applicable multi-component partitioning; leave the file
            // whole rather than force a bad split. Still a completed
            // attempt, so the outcome is recorded.
            if config.enable_learning {
                self.learning
                    .record_outcome(&signature, StrategyKind::NoSplit, true);
            }
            let mut result = trivial_result(file_path, &tree, started);
            result.confidence = scored.confidence;
            result.rationale = scored.rationale;
            return Ok(result);
        }

        check_deadline(deadline)?;
        let outcome = BackupManager::new(&*self.fs).apply_split(
            file_path,
            source,
            &tree,
            &scored.candidate.components,
            config,
        )?;

        if config.enable_learning {
            self.learning
                .record_outcome(&signature, scored.candidate.strategy, true);
        }

        Ok(SplitResult {
            success: true,
            strategy: Some(scored.candidate.strategy),
            components: outcome.components,
            confidence: scored.confidence,
            rationale: scored.rationale,
            backup_created: outcome.backup_created,
            backup_path: outcome.backup_path,
            validation_passed: outcome.validation_passed,
            processing_time_ms: started.elapsed().as_millis() as u64,
            error_message: None,
        })
    }
}

fn check_deadline(deadline: Option<Instant>) -> Result<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(SplitError::DeadlineExceeded),
        _ => Ok(()),
    }
}

fn within_thresholds(tree: &StructuralTree, config: &SplitConfig) -> bool {
    use crate::core::UnitKind;
    tree.total_lines <= config.max_lines_per_file
        && tree.count_of(UnitKind::Function) <= config.max_functions_per_file
        && tree.count_of(UnitKind::Class) <= config.max_classes_per_file
}

/// Success with no writes: the file stays as one piece, reported as a
/// single component covering every unit.
fn trivial_result(file_path: &Path, tree: &StructuralTree, started: Instant) -> SplitResult {
    let file_name = file_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("original")
        .to_string();
    let mut component = crate::core::ComponentSpec::new(file_name);
    component.unit_ids = (0..tree.units.len()).collect();
    component.line_count = tree.total_lines;
    component.path = Some(file_path.to_path_buf());
    SplitResult {
        success: true,
        strategy: Some(StrategyKind::NoSplit),
        components: vec![component],
        confidence: 1.0,
        rationale: RationaleSource::Heuristic,
        backup_created: false,
        backup_path: None,
        validation_passed: true,
        processing_time_ms: started.elapsed().as_millis() as u64,
        error_message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn many_functions(count: usize) -> String {
        let mut source = String::new();
        for i in 0..count {
            source.push_str(&format!("fn handler_{i}() {{\n    let _ = {i};\n}}\n\n"));
        }
        source
    }

    #[test]
    fn config_error_escapes_as_err() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "small.rs", "fn a() {}\n");
        let config = SplitConfig {
            max_lines_per_file: 0,
            ..Default::default()
        };
        let err = Splitter::new()
            .split(&path, "fn a() {}\n", &config)
            .unwrap_err();
        assert!(matches!(err, SplitError::Config(_)));
    }

    #[test]
    fn file_within_thresholds_is_trivial_success() {
        let dir = TempDir::new().unwrap();
        let source = "fn a() {}\n\nfn b() {}\n";
        let path = write_fixture(&dir, "small.rs", source);
        let result = Splitter::new()
            .split(&path, source, &SplitConfig::default())
            .unwrap();
        assert!(result.success);
        assert_eq!(result.strategy, Some(StrategyKind::NoSplit));
        assert_eq!(result.components.len(), 1);
        assert_eq!(result.components[0].line_count, 3);
        assert!(!result.backup_created);
        // Original untouched.
        assert_eq!(fs::read_to_string(&path).unwrap(), source);
    }

    #[test]
    fn unsupported_extension_folds_into_result() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "notes.txt", "just text\n");
        let result = Splitter::new()
            .split(&path, "just text\n", &SplitConfig::default())
            .unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().starts_with("analysis:"));
    }

    #[test]
    fn parse_error_folds_into_result() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "broken.rs", "fn broken( {\n");
        let result = Splitter::new()
            .split(&path, "fn broken( {\n", &SplitConfig::default())
            .unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().starts_with("analysis:"));
    }

    #[test]
    fn oversized_file_is_split_and_backed_up() {
        let dir = TempDir::new().unwrap();
        let source = many_functions(12);
        let path = write_fixture(&dir, "handlers.rs", &source);
        let config = SplitConfig {
            max_functions_per_file: 4,
            ..Default::default()
        };
        let result = Splitter::new().split(&path, &source, &config).unwrap();
        assert!(result.success, "{:?}", result.error_message);
        assert!(result.components.len() >= 2);
        assert!(result.backup_created);
        assert!(result.validation_passed);
        for component in &result.components {
            let written = component.path.as_ref().unwrap();
            assert!(written.exists());
            syn::parse_file(&fs::read_to_string(written).unwrap()).unwrap();
        }
    }

    #[test]
    fn successful_split_records_learning_outcome() {
        let dir = TempDir::new().unwrap();
        let source = many_functions(12);
        let path = write_fixture(&dir, "handlers.rs", &source);
        let config = SplitConfig {
            max_functions_per_file: 4,
            ..Default::default()
        };
        let splitter = Splitter::new();
        assert!(splitter.learning().is_empty());
        let result = splitter.split(&path, &source, &config).unwrap();
        assert!(result.success);
        assert_eq!(splitter.learning().len(), 1);
    }

    #[test]
    fn no_split_winner_records_learning_outcome() {
        let dir = TempDir::new().unwrap();
        // One giant function: over the line limit, but no strategy can make
        // two components out of it.
        let mut source = String::from("fn monolith() {\n");
        for i in 0..60 {
            source.push_str(&format!("    let _m{i} = {i};\n"));
        }
        source.push_str("}\n");
        let path = write_fixture(&dir, "monolith.rs", &source);
        let config = SplitConfig {
            max_lines_per_file: 40,
            ..Default::default()
        };
        let splitter = Splitter::new();
        let result = splitter.split(&path, &source, &config).unwrap();
        assert!(result.success);
        assert_eq!(result.strategy, Some(StrategyKind::NoSplit));
        assert_eq!(splitter.learning().len(), 1);
        // Original untouched, nothing written.
        assert_eq!(fs::read_to_string(&path).unwrap(), source);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn expired_deadline_is_a_failed_result() {
        let dir = TempDir::new().unwrap();
        let source = many_functions(12);
        let path = write_fixture(&dir, "handlers.rs", &source);
        let result = Splitter::new()
            .split_with_deadline(&path, &source, &SplitConfig::default(), Duration::ZERO)
            .unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().starts_with("deadline:"));
    }
}
