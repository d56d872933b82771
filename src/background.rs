use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use rand::{Rng, RngCore};

use crate::{
    core::TimeWindow,
    error::{BumpgenError, BumpgenResult},
    probe::DurationProbe,
};

/// Flat directory of background video files.
#[derive(Clone, Debug)]
pub struct ContentLibrary {
    root: PathBuf,
}

/// One library file: absolute path plus its library-relative name, which
/// is the key used by window configuration and channel allow-lists.
#[derive(Clone, Debug)]
pub struct ContentEntry {
    pub path: PathBuf,
    pub name: String,
}

/// The selector's output: one file and one sub-window of exactly the
/// requested length.
#[derive(Clone, Debug)]
pub struct Selection {
    pub file_path: PathBuf,
    pub window: TimeWindow,
}

impl ContentLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate library files, sorted by name for deterministic
    /// candidate ordering. Hidden files and subdirectories are skipped.
    pub fn entries(&self) -> BumpgenResult<Vec<ContentEntry>> {
        let read = std::fs::read_dir(&self.root).map_err(|e| {
            BumpgenError::NoContentAvailable(format!(
                "cannot read background content folder '{}': {e}",
                self.root.display()
            ))
        })?;

        let mut entries = Vec::new();
        for item in read {
            let item = item.map_err(|e| {
                BumpgenError::NoContentAvailable(format!(
                    "cannot read background content folder '{}': {e}",
                    self.root.display()
                ))
            })?;
            let path = item.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            entries.push(ContentEntry {
                path: path.clone(),
                name: name.to_string(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Windows that satisfy `end <= file_duration` and are at least
/// `required_seconds` long.
pub fn fitting_windows(
    windows: &[TimeWindow],
    required_seconds: f64,
    file_duration: f64,
) -> Vec<TimeWindow> {
    windows
        .iter()
        .copied()
        .filter(|w| w.end_seconds <= file_duration && w.len_seconds() >= required_seconds)
        .collect()
}

/// Pick a sub-window of exactly `required_seconds` at a uniformly random
/// integer-second offset within `window` (inclusive bounds).
pub fn random_sub_window(
    window: TimeWindow,
    required_seconds: f64,
    rng: &mut dyn RngCore,
) -> BumpgenResult<TimeWindow> {
    if required_seconds <= 0.0 {
        return Err(BumpgenError::validation("required length must be > 0"));
    }
    if window.len_seconds() < required_seconds {
        return Err(BumpgenError::validation(
            "window is shorter than the required length",
        ));
    }

    let lo = window.start_seconds.ceil() as i64;
    let hi = (window.end_seconds - required_seconds).floor() as i64;
    // Fractional windows can leave no whole-second offset; fall back to
    // the window start, which always fits.
    let offset = if hi < lo {
        window.start_seconds
    } else {
        rng.gen_range(lo..=hi) as f64
    };
    TimeWindow::new(offset, offset + required_seconds)
}

struct Candidate {
    entry: ContentEntry,
    windows: Vec<TimeWindow>,
}

/// Select one background file and one sub-window of exactly
/// `required_seconds` from the library.
///
/// `allowed_windows` maps library-relative names to configured allowed
/// windows; unconfigured files are treated as one whole-file window.
/// `allow_list`, when present, restricts candidates to the named files.
/// Files whose duration cannot be probed are skipped, not fatal.
pub fn select_background(
    library: &ContentLibrary,
    allowed_windows: &HashMap<String, Vec<TimeWindow>>,
    required_seconds: f64,
    allow_list: Option<&[String]>,
    probe: &dyn DurationProbe,
    rng: &mut dyn RngCore,
) -> BumpgenResult<Selection> {
    if required_seconds <= 0.0 {
        return Err(BumpgenError::validation("required length must be > 0"));
    }

    let all = library.entries()?;
    if all.is_empty() {
        return Err(BumpgenError::NoContentAvailable(format!(
            "background content folder '{}' is empty",
            library.root().display()
        )));
    }

    let filtered: Vec<ContentEntry> = match allow_list {
        Some(names) => {
            let kept: Vec<ContentEntry> = all
                .into_iter()
                .filter(|e| names.iter().any(|n| n == &e.name))
                .collect();
            if kept.len() != names.len() {
                tracing::debug!(
                    configured = names.len(),
                    present = kept.len(),
                    "some files configured for the channel are missing from the library"
                );
            }
            if kept.is_empty() {
                return Err(BumpgenError::NoContentAvailable(
                    "no background content left once the channel filter is applied".to_string(),
                ));
            }
            kept
        }
        None => all,
    };

    let mut candidates: Vec<Candidate> = Vec::new();
    for entry in filtered {
        let duration = match probe.duration_seconds(&entry.path) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(file = %entry.path.display(), error = %e, "skipping unprobeable file");
                continue;
            }
        };

        let windows = match allowed_windows.get(&entry.name) {
            Some(configured) => fitting_windows(configured, required_seconds, duration),
            None if duration >= required_seconds => {
                vec![TimeWindow::new(0.0, duration)?]
            }
            None => Vec::new(),
        };

        if windows.is_empty() {
            tracing::debug!(
                file = %entry.name,
                duration,
                required_seconds,
                "file has no window long enough for the requested length"
            );
            continue;
        }
        candidates.push(Candidate { entry, windows });
    }

    if candidates.is_empty() {
        return Err(BumpgenError::NoFittingContent { required_seconds });
    }

    let pick = &candidates[rng.gen_range(0..candidates.len())];
    let window = pick.windows[rng.gen_range(0..pick.windows.len())];
    let sub = random_sub_window(window, required_seconds, rng)?;

    tracing::info!(
        file = %pick.entry.name,
        start = sub.start_seconds,
        end = sub.end_seconds,
        "selected background window"
    );

    Ok(Selection {
        file_path: pick.entry.path.clone(),
        window: sub,
    })
}
