use std::{collections::HashMap, path::Path};

use fontdue::{Font, FontSettings};

use crate::error::{BumpgenError, BumpgenResult};

/// Explicit font registry: fontdue faces keyed by family name.
///
/// Constructed once at startup and passed by reference into rendering,
/// so there is no process-wide font state. Templates look faces up by
/// the family names they were registered under.
#[derive(Default)]
pub struct FontRegistry {
    faces: HashMap<String, Font>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face from raw font bytes (TTF/OTF).
    pub fn register_bytes(&mut self, family: impl Into<String>, bytes: &[u8]) -> BumpgenResult<()> {
        let family = family.into();
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| BumpgenError::validation(format!("failed to parse font '{family}': {e}")))?;
        self.faces.insert(family, font);
        Ok(())
    }

    /// Register a face from a font file on disk.
    pub fn register_file(&mut self, family: impl Into<String>, path: &Path) -> BumpgenResult<()> {
        let family = family.into();
        let bytes = std::fs::read(path).map_err(|e| {
            BumpgenError::validation(format!(
                "failed to read font file '{}': {e}",
                path.display()
            ))
        })?;
        self.register_bytes(family, &bytes)
    }

    /// Look up a registered face. Missing families are an error so a
    /// misconfigured template fails the render instead of silently
    /// rendering nothing.
    pub fn get(&self, family: &str) -> BumpgenResult<&Font> {
        self.faces.get(family).ok_or_else(|| {
            BumpgenError::validation(format!("font family '{family}' is not registered"))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }
}
