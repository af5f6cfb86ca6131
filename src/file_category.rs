//! File categorization by extension.
//!
//! This module maps a file extension to one of a fixed set of categories
//! (photos, ebooks, documents, movies, music, other). The extension tables are
//! compiled in; `other` is the fallback for anything unmatched.
//!
//! # Examples
//!
//! ```
//! use filecat::file_category::{Category, classify};
//!
//! assert_eq!(classify(".jpg"), Category::Photos);
//! assert_eq!(classify(".EPUB"), Category::Ebooks);
//! assert_eq!(classify(".xyz"), Category::Other);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Represents a broad file category.
///
/// The declaration order is the order categories appear in exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Still images and camera raw files (JPG, PNG, CR2, HEIC, etc.)
    Photos,
    /// Electronic books and comics (PDF, EPUB, MOBI, CBZ, etc.)
    Ebooks,
    /// Text and office documents (TXT, DOCX, XLSX, etc.)
    Documents,
    /// Video files and disc images (MP4, MKV, VOB, ISO, etc.)
    Movies,
    /// Audio files (MP3, FLAC, WAV, etc.)
    Music,
    /// Everything that matches no other category
    Other,
}

const PHOTOS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".raw", ".cr2", ".nef",
    ".arw", ".dng", ".heic", ".heif",
];

const EBOOKS: &[&str] = &[
    ".pdf", ".epub", ".mobi", ".azw", ".azw3", ".fb2", ".lit", ".pdb", ".cbr", ".cbz",
];

const DOCUMENTS: &[&str] = &[".txt", ".rtf", ".doc", ".docx", ".xls", ".xlsx"];

const MOVIES: &[&str] = &[
    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".3gp", ".ogv", ".ts",
    ".m2ts", ".vob", ".iso",
];

const MUSIC: &[&str] = &[
    ".mp3", ".flac", ".wav", ".aac", ".ogg", ".wma", ".m4a", ".opus", ".ape", ".ac3", ".dts",
    ".aiff",
];

impl Category {
    /// All categories, in export order.
    pub const ALL: [Category; 6] = [
        Category::Photos,
        Category::Ebooks,
        Category::Documents,
        Category::Movies,
        Category::Music,
        Category::Other,
    ];

    /// Order used by the human-readable summary.
    pub const SUMMARY_ORDER: [Category; 6] = [
        Category::Photos,
        Category::Music,
        Category::Movies,
        Category::Ebooks,
        Category::Documents,
        Category::Other,
    ];

    /// Returns the directory name for this category.
    ///
    /// This is also the name used in reports and accepted by [`FromStr`].
    ///
    /// # Examples
    ///
    /// ```
    /// use filecat::file_category::Category;
    ///
    /// assert_eq!(Category::Photos.dir_name(), "photos");
    /// assert_eq!(Category::Other.dir_name(), "other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Photos => "photos",
            Category::Ebooks => "ebooks",
            Category::Documents => "documents",
            Category::Movies => "movies",
            Category::Music => "music",
            Category::Other => "other",
        }
    }

    /// Returns a human-readable label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Photos => "Photos",
            Category::Ebooks => "Ebooks",
            Category::Documents => "Documents",
            Category::Movies => "Movies",
            Category::Music => "Music",
            Category::Other => "Other",
        }
    }

    /// Returns the lowercase extensions (with leading dot) owned by this category.
    ///
    /// `Other` owns no extensions; it catches whatever the others do not.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Photos => PHOTOS,
            Category::Ebooks => EBOOKS,
            Category::Documents => DOCUMENTS,
            Category::Movies => MOVIES,
            Category::Music => MUSIC,
            Category::Other => &[],
        }
    }

    /// Returns true if a file with this extension belongs to this category.
    ///
    /// For `Other` this means the extension belongs to no other category.
    pub fn accepts(&self, extension: &str) -> bool {
        classify(extension) == *self
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Error returned when a category name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized file type '{0}' (valid types: photos, ebooks, documents, movies, music, other)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.dir_name() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Maps a file extension to its category.
///
/// The extension is matched case-insensitively and is expected to carry its
/// leading dot (".jpg"). An empty extension is `Other`.
pub fn classify(extension: &str) -> Category {
    if extension.is_empty() {
        return Category::Other;
    }
    let ext = extension.to_lowercase();
    Category::ALL
        .into_iter()
        .find(|category| category.extensions().contains(&ext.as_str()))
        .unwrap_or(Category::Other)
}

/// Returns the lowercase extension of `path` including the leading dot,
/// or an empty string when the file has none.
///
/// # Examples
///
/// ```
/// use filecat::file_category::extension_of;
/// use std::path::Path;
///
/// assert_eq!(extension_of(Path::new("/a/Photo.JPG")), ".jpg");
/// assert_eq!(extension_of(Path::new("/a/README")), "");
/// ```
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Photos.dir_name(), "photos");
        assert_eq!(Category::Ebooks.dir_name(), "ebooks");
        assert_eq!(Category::Documents.dir_name(), "documents");
        assert_eq!(Category::Movies.dir_name(), "movies");
        assert_eq!(Category::Music.dir_name(), "music");
        assert_eq!(Category::Other.dir_name(), "other");
    }

    #[test]
    fn test_every_listed_extension_classifies_to_its_category() {
        for category in Category::ALL {
            for ext in category.extensions() {
                assert_eq!(classify(ext), category, "extension {ext}");
            }
        }
    }

    #[test]
    fn test_extension_tables_do_not_overlap() {
        for a in Category::ALL {
            for b in Category::ALL {
                if a == b {
                    continue;
                }
                for ext in a.extensions() {
                    assert!(!b.extensions().contains(ext), "{ext} in {a} and {b}");
                }
            }
        }
    }

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify(".JPG"), Category::Photos);
        assert_eq!(classify(".Mp3"), Category::Music);
        assert_eq!(classify(".MKV"), Category::Movies);
    }

    #[test]
    fn test_classify_defaults_to_other() {
        assert_eq!(classify(""), Category::Other);
        assert_eq!(classify(".xyz"), Category::Other);
        assert_eq!(classify(".rs"), Category::Other);
    }

    #[test]
    fn test_classify_requires_leading_dot() {
        assert_eq!(classify("jpg"), Category::Other);
    }

    #[test]
    fn test_accepts_other_means_unmatched() {
        assert!(Category::Other.accepts(".zip"));
        assert!(Category::Other.accepts(""));
        assert!(!Category::Other.accepts(".jpg"));
        assert!(Category::Photos.accepts(".JPEG"));
    }

    #[test]
    fn test_parse_category_names() {
        assert_eq!("photos".parse::<Category>(), Ok(Category::Photos));
        assert_eq!("Movies".parse::<Category>(), Ok(Category::Movies));
        assert_eq!(" MUSIC ".parse::<Category>(), Ok(Category::Music));
        assert!("pictures".parse::<Category>().is_err());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b/clip.MP4")), ".mp4");
        assert_eq!(extension_of(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new("Makefile")), "");
        assert_eq!(extension_of(Path::new(".bashrc")), "");
    }
}
