//! Parallel parsing of several documents.
//!
//! Every document is parsed independently on the rayon pool. A failure is
//! recorded on that document's item and never affects the others.

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use rayon::prelude::*;

use crate::error::{ErrorKind, Result};
use crate::model::ParseResult;
use crate::parser::{DocumentParser, ParseOptions};

/// Outcome of one document in a batch.
#[derive(Debug)]
pub struct BatchItem {
    /// Input path
    pub path: PathBuf,
    /// Parse outcome for this path
    pub result: Result<ParseResult>,
}

impl BatchItem {
    /// Whether this document parsed successfully.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Progress notification sent when a document finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Parsed {
        /// Position in the input list
        index: usize,
        path: PathBuf,
        elements: usize,
    },
    Failed {
        index: usize,
        path: PathBuf,
        kind: ErrorKind,
        message: String,
    },
}

impl BatchEvent {
    /// Position of the document in the input list.
    pub fn index(&self) -> usize {
        match self {
            BatchEvent::Parsed { index, .. } | BatchEvent::Failed { index, .. } => *index,
        }
    }
}

/// Parse documents in parallel. Output order equals input order.
pub fn parse_documents<P>(paths: &[P], options: &ParseOptions) -> Vec<BatchItem>
where
    P: AsRef<Path> + Sync,
{
    run(paths, options, None)
}

/// Parse documents in parallel, reporting each finished document.
pub fn parse_documents_with_progress<P>(
    paths: &[P],
    options: &ParseOptions,
    progress: &Sender<BatchEvent>,
) -> Vec<BatchItem>
where
    P: AsRef<Path> + Sync,
{
    run(paths, options, Some(progress))
}

fn run<P>(paths: &[P], options: &ParseOptions, progress: Option<&Sender<BatchEvent>>) -> Vec<BatchItem>
where
    P: AsRef<Path> + Sync,
{
    log::info!(
        "parsing {} documents on {} threads",
        paths.len(),
        rayon::current_num_threads()
    );

    paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| {
            let path = path.as_ref().to_path_buf();
            let result = DocumentParser::open_with_options(&path, options.clone())
                .and_then(|parser| parser.parse());

            if let Err(e) = &result {
                log::warn!("{}: {}", path.display(), e);
            }

            if let Some(sender) = progress {
                let event = match &result {
                    Ok(parsed) => BatchEvent::Parsed {
                        index,
                        path: path.clone(),
                        elements: parsed.len(),
                    },
                    Err(e) => BatchEvent::Failed {
                        index,
                        path: path.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                };
                if sender.send(event).is_err() {
                    log::debug!("progress receiver dropped");
                }
            }

            BatchItem { path, result }
        })
        .collect()
}
