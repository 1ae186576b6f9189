//! Font discovery and face resolution.
//!
//! Faces are found with `fontdb` (system fonts plus any configured font
//! directories) and loaded into `ab_glyph` on first use. Loaded faces are
//! cached for the lifetime of the book, so a batch parses each face once.

use ab_glyph::{FontArc, FontVec};
use fontdb::{Database, Family, ID, Query, Stretch, Style, Weight};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::LaurelError;
use crate::layer::{FontStyle, FontWeight};

/// Families tried, in order, when a generic family has no configured face.
const SANS_SERIF_CANDIDATES: &[&str] = &[
    "Arial",
    "Helvetica",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
    "Roboto",
    "FreeSans",
];
const SERIF_CANDIDATES: &[&str] = &[
    "Times New Roman",
    "Liberation Serif",
    "DejaVu Serif",
    "Noto Serif",
    "FreeSerif",
];
const MONOSPACE_CANDIDATES: &[&str] = &[
    "Courier New",
    "Liberation Mono",
    "DejaVu Sans Mono",
    "Noto Sans Mono",
    "FreeMono",
];

/// Collection of available font faces.
pub struct FontBook {
    db: Database,
    loaded: Mutex<HashMap<ID, FontArc>>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.db.len())
            .finish()
    }
}

impl FontBook {
    /// Build a book from extra font directories, optionally adding system fonts.
    pub fn new(font_dirs: &[PathBuf], include_system: bool) -> Self {
        let mut db = Database::new();
        if include_system {
            db.load_system_fonts();
        }
        for dir in font_dirs {
            db.load_fonts_dir(dir);
        }

        let mut book = Self {
            db,
            loaded: Mutex::new(HashMap::new()),
        };
        book.configure_generic_families();

        tracing::debug!(faces = book.face_count(), "font book ready");
        book
    }

    /// System fonts only.
    pub fn system() -> Self {
        Self::new(&[], true)
    }

    /// A book with no faces. Useful for rendering layer-free templates.
    pub fn empty() -> Self {
        Self::new(&[], false)
    }

    /// Register a font file's bytes (TTF/OTF/collection).
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
        self.configure_generic_families();
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Sorted, de-duplicated family names.
    pub fn families(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .db
            .faces()
            .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .collect();
        names.sort_by_key(|n| n.to_lowercase());
        names.dedup();
        names
    }

    /// Resolve a family/weight/style request to a loaded face.
    ///
    /// Unknown families fall back to sans-serif, then to any installed face.
    pub fn resolve(
        &self,
        family: &str,
        weight: FontWeight,
        style: FontStyle,
    ) -> Result<FontArc, LaurelError> {
        let requested = family_for(family);
        let families = [requested, Family::SansSerif];
        let query = Query {
            families: &families,
            weight: Weight(weight.0),
            stretch: Stretch::Normal,
            style: match style {
                FontStyle::Normal => Style::Normal,
                FontStyle::Italic => Style::Italic,
            },
        };

        let id = self
            .db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|face| face.id))
            .ok_or_else(|| {
                LaurelError::Font(format!(
                    "No fonts available to render family '{}'",
                    family
                ))
            })?;

        self.load(id)
    }

    fn load(&self, id: ID) -> Result<FontArc, LaurelError> {
        let mut loaded = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(font) = loaded.get(&id) {
            return Ok(font.clone());
        }

        let font = self
            .db
            .with_face_data(id, |data, index| {
                FontVec::try_from_vec_and_index(data.to_vec(), index)
            })
            .ok_or_else(|| LaurelError::Font("Font face data is unavailable".to_string()))?
            .map_err(|e| LaurelError::Font(format!("Failed to parse font face: {}", e)))?;

        let font = FontArc::new(font);
        loaded.insert(id, font.clone());
        Ok(font)
    }

    /// Point the generic families at faces that are actually installed.
    fn configure_generic_families(&mut self) {
        if let Some(name) = self.first_installed(SANS_SERIF_CANDIDATES) {
            self.db.set_sans_serif_family(name);
        }
        if let Some(name) = self.first_installed(SERIF_CANDIDATES) {
            self.db.set_serif_family(name);
        }
        if let Some(name) = self.first_installed(MONOSPACE_CANDIDATES) {
            self.db.set_monospace_family(name);
        }
    }

    fn first_installed(&self, candidates: &[&str]) -> Option<String> {
        candidates.iter().find_map(|candidate| {
            self.db.faces().find_map(|face| {
                face.families
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(candidate))
                    .map(|(name, _)| name.clone())
            })
        })
    }
}

fn family_for(name: &str) -> Family<'_> {
    match name.trim().to_lowercase().as_str() {
        "" | "sans-serif" | "sans serif" | "sans" => Family::SansSerif,
        "serif" => Family::Serif,
        "monospace" | "mono" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name.trim()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::OnceLock;

    /// Shared system font book for tests. `None` when the host has no fonts,
    /// in which case glyph-dependent tests return early.
    pub(crate) fn system_fonts() -> Option<&'static FontBook> {
        static BOOK: OnceLock<FontBook> = OnceLock::new();
        let book = BOOK.get_or_init(FontBook::system);
        if book.is_empty() {
            eprintln!("no system fonts installed; skipping glyph test");
            None
        } else {
            Some(book)
        }
    }

    #[test]
    fn test_empty_book_reports_font_error() {
        let book = FontBook::empty();
        assert!(book.is_empty());
        assert!(book.families().is_empty());
        let err = book
            .resolve("Arial", FontWeight::BOLD, FontStyle::Normal)
            .unwrap_err();
        assert!(matches!(err, LaurelError::Font(_)));
    }

    #[test]
    fn test_generic_family_mapping() {
        assert!(matches!(family_for("serif"), Family::Serif));
        assert!(matches!(family_for("Sans-Serif"), Family::SansSerif));
        assert!(matches!(family_for(""), Family::SansSerif));
        assert!(matches!(family_for(" Roboto "), Family::Name("Roboto")));
    }

    #[test]
    fn test_unknown_family_falls_back() {
        let Some(book) = system_fonts() else { return };
        assert!(
            book.resolve("No Such Family 12345", FontWeight::NORMAL, FontStyle::Normal)
                .is_ok()
        );
    }

    #[test]
    fn test_resolve_is_cached() {
        if system_fonts().is_none() {
            return;
        }
        let book = FontBook::system();
        book.resolve("sans-serif", FontWeight::BOLD, FontStyle::Normal)
            .unwrap();
        let cached = book.loaded.lock().unwrap().len();
        book.resolve("sans-serif", FontWeight::BOLD, FontStyle::Normal)
            .unwrap();
        assert_eq!(book.loaded.lock().unwrap().len(), cached);
        assert!(!book.families().is_empty());
    }
}
