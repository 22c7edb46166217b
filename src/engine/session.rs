// Input selection state: ties detection, probing and compilation together

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::core::{
    CompileError, EncodeOptions, EncodePlan, MediaInfo, ProbeError, SequenceInfo, compile,
    derive_output_path, detect,
};
use super::probe::Prober;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no input selected")]
    NoInput,

    #[error("cannot encode this input: {0}")]
    Probe(ProbeError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// The current input and what is known about it
#[derive(Debug, Clone)]
pub struct Selection {
    pub path: PathBuf,
    pub sequence: SequenceInfo,
    pub media: Result<MediaInfo, ProbeError>,
}

/// Holds at most one selected input. A new selection replaces the old one wholesale.
#[derive(Debug, Default)]
pub struct EncodeSession {
    selection: Option<Selection>,
}

impl EncodeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect sequence naming, then probe. A probe failure is kept on the
    /// selection (it blocks `prepare`) and also returned.
    pub fn select_input(
        &mut self,
        path: impl AsRef<Path>,
        prober: &dyn Prober,
    ) -> Result<&MediaInfo, ProbeError> {
        let path = path.as_ref();
        let sequence = detect(path);
        debug!(
            input = %path.display(),
            is_sequence = sequence.is_sequence,
            pattern = %sequence.pattern_path.display(),
            "input selected"
        );

        let media = prober.probe(&sequence.pattern_path);
        if let Err(e) = &media {
            warn!(input = %path.display(), error = %e, "probe failed");
        }

        let selection = self.selection.insert(Selection {
            path: path.to_path_buf(),
            sequence,
            media,
        });
        selection.media.as_ref().map_err(Clone::clone)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn clear(&mut self) {
        self.selection = None;
    }

    /// Default output path for the current options, or `None` without an input
    pub fn default_output_path(&self, options: &EncodeOptions, dir: &Path) -> Option<PathBuf> {
        self.selection
            .as_ref()
            .map(|s| derive_output_path(options, &s.sequence, dir))
    }

    /// Compile the current selection. Never reaches the compiler without a
    /// successfully probed input.
    pub fn prepare(&self, options: &EncodeOptions) -> Result<EncodePlan, SessionError> {
        let selection = self.selection.as_ref().ok_or(SessionError::NoInput)?;
        let media = selection
            .media
            .as_ref()
            .map_err(|e| SessionError::Probe(e.clone()))?;
        Ok(compile(options, media, &selection.sequence)?)
    }
}
