use super::types::SequenceInfo;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const SEQUENCE_EXTENSIONS: &str = "png|jpg|jpeg|tiff";

static SEQUENCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(.*?)(?:(\d+)|%(\d+)d)\.({})$",
        SEQUENCE_EXTENSIONS
    ))
    .expect("sequence name regex is valid")
});

static FRAME_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%0?(\d+)d").expect("placeholder regex is valid"));

/// Detect a numbered image sequence from one of its frames (`shot_00001.png`)
/// or from an existing frame pattern (`shot_%05d.png`).
///
/// Sequences are rewritten to a `%0Nd` pattern where N is the digit width, so
/// running `detect` on its own `pattern_path` yields the same pattern.
pub fn detect(path: &Path) -> SequenceInfo {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let matched = SEQUENCE_NAME.captures(&file_name).and_then(|caps| {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let ext = caps.get(4).map_or("", |m| m.as_str());
        let width = match (caps.get(2), caps.get(3)) {
            (Some(digits), _) => digits.as_str().len(),
            (None, Some(explicit)) => explicit.as_str().parse::<usize>().ok()?,
            (None, None) => return None,
        };
        // %0d has no width to pad to
        (width > 0).then(|| (prefix.to_string(), width, ext.to_string()))
    });

    match matched {
        Some((prefix, width, ext)) => {
            let pattern_name = format!("{}%0{}d.{}", prefix, width, ext);
            let pattern_path = match path.parent() {
                Some(dir) => dir.join(pattern_name),
                None => PathBuf::from(pattern_name),
            };
            SequenceInfo {
                is_sequence: true,
                pattern_path,
                base_name: sequence_base_name(&prefix, path),
                digits: Some(width),
            }
        }
        None => SequenceInfo {
            is_sequence: false,
            pattern_path: path.to_path_buf(),
            base_name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            digits: None,
        },
    }
}

fn sequence_base_name(prefix: &str, path: &Path) -> String {
    let trimmed = prefix.trim_end_matches(['_', '-', '.', ' ']);
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    // Bare frame numbers (0001.png): name after the containing directory
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "sequence".to_string())
}

/// True if the path contains a `%0Nd` frame placeholder
pub fn has_frame_placeholder(path: &Path) -> bool {
    path.file_name()
        .map(|n| FRAME_PLACEHOLDER.is_match(&n.to_string_lossy()))
        .unwrap_or(false)
}

/// Regex matching the file names a frame pattern expands to, with the
/// placeholder widened to any run of digits
pub fn frame_name_regex(pattern_file_name: &str) -> Option<Regex> {
    let placeholder = FRAME_PLACEHOLDER.find(pattern_file_name)?;
    let prefix = regex::escape(&pattern_file_name[..placeholder.start()]);
    let suffix = regex::escape(&pattern_file_name[placeholder.end()..]);
    Regex::new(&format!(r"(?i)^{}\d+{}$", prefix, suffix)).ok()
}
