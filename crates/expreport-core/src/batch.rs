//! Parallel extraction over a batch of documents.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{info, warn};

use crate::error::ReportError;
use crate::invoice::RecordExtractor;
use crate::models::record::LineItemRecord;

/// Extract every document on a bounded worker pool.
///
/// `jobs == 0` uses one worker per logical CPU. Documents that fail, or
/// whose extraction panics, are logged and left out. `progress` is called from worker threads once per
/// finished document with `(completed, total)`. The order of the returned
/// records is not significant.
pub fn process_documents<E>(
    paths: &[PathBuf],
    extractor: &E,
    jobs: usize,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> crate::Result<Vec<LineItemRecord>>
where
    E: RecordExtractor + ?Sized,
{
    let total = paths.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("extract-{}", i))
        .build()
        .map_err(|e| ReportError::Config(format!("failed to build worker pool: {}", e)))?;

    let completed = AtomicUsize::new(0);
    let per_document: Vec<Vec<LineItemRecord>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let records = match catch_unwind(AssertUnwindSafe(|| extractor.extract_path(path))) {
                    Ok(Ok(records)) => records,
                    Ok(Err(e)) => {
                        warn!("Skipping {}: {}", path.display(), e);
                        Vec::new()
                    }
                    Err(payload) => {
                        warn!("Skipping {}: extraction panicked: {}", path.display(), panic_message(payload.as_ref()));
                        Vec::new()
                    }
                };
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress(done, total);
                records
            })
            .collect()
    });

    let records: Vec<LineItemRecord> = per_document.into_iter().flatten().collect();
    info!("Extracted {} records from {} documents", records.len(), total);
    Ok(records)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::models::record::fixtures::record;
    use std::path::Path;
    use std::sync::Mutex;

    /// Fails on paths containing "bad", panics on paths containing "broken",
    /// otherwise yields one record per path.
    struct FakeExtractor;

    impl RecordExtractor for FakeExtractor {
        fn extract_path(&self, path: &Path) -> crate::Result<Vec<LineItemRecord>> {
            let name = path.to_string_lossy();
            if name.contains("broken") {
                panic!("unsupported font encoding in {}", name);
            }
            if name.contains("bad") {
                return Err(PdfError::NoPages.into());
            }
            let invoice = name.trim_end_matches(".pdf").parse().unwrap_or(0);
            Ok(vec![record("DE1", invoice, 3, "87082990")])
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_failures_are_excluded() {
        let files = paths(&["1.pdf", "bad.pdf", "2.pdf", "3.pdf"]);
        let records = process_documents(&files, &FakeExtractor, 2, &|_, _| {}).unwrap();

        let mut numbers: Vec<i64> = records.iter().map(|r| r.invoice_number).collect();
        numbers.sort();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_progress_reports_every_document() {
        let files = paths(&["1.pdf", "bad.pdf", "2.pdf"]);
        let seen = Mutex::new(Vec::new());
        process_documents(&files, &FakeExtractor, 0, &|done, total| {
            seen.lock().unwrap().push((done, total));
        })
        .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_panicking_document_is_skipped() {
        let files = paths(&["1.pdf", "broken.pdf", "2.pdf"]);
        let seen = Mutex::new(Vec::new());
        let records = process_documents(&files, &FakeExtractor, 2, &|done, _| {
            seen.lock().unwrap().push(done);
        })
        .unwrap();

        let mut numbers: Vec<i64> = records.iter().map(|r| r.invoice_number).collect();
        numbers.sort();
        assert_eq!(numbers, vec![1, 2]);

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"bad glyph"), "bad glyph");
        assert_eq!(panic_message(&String::from("bad font")), "bad font");
        assert_eq!(panic_message(&7_u8), "unknown panic");
    }

    #[test]
    fn test_empty_batch() {
        let records = process_documents(&[], &FakeExtractor, 4, &|_, _| {}).unwrap();
        assert!(records.is_empty());
    }
}
