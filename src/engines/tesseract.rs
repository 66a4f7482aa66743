//! Tesseract engine implementation
//!
//! Uses tesseract-static for static linking (no system dependencies).
//! Language data (`<lang>.traineddata`) is read from a configured tessdata
//! directory, or downloaded into a cache directory the first time a language
//! is requested.

use crate::config::Config;
use crate::engine::{OcrEngine, RawToken};
use crate::error::OcrError;
use image::DynamicImage;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tesseract_static::tesseract::{OcrEngineMode, PageSegMode, Tesseract};

/// Upper bound for a single traineddata download
const MAX_TRAINEDDATA_BYTES: u64 = 100 * 1024 * 1024;

/// Number of columns in a Tesseract TSV row
const TSV_COLUMNS: usize = 12;
const TSV_CONF_COLUMN: usize = 10;
const TSV_TEXT_COLUMN: usize = 11;

/// Tesseract OCR Engine
pub struct TesseractEngine {
    tessdata: TessdataStore,
}

impl TesseractEngine {
    /// Create the engine. No language data is touched until the first request.
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let tessdata = match &config.tessdata_path {
            Some(path) => TessdataStore::fixed(PathBuf::from(path)),
            None => TessdataStore::cached(default_cache_dir(), config.download_language_data)?,
        };

        tracing::info!(
            "Tesseract engine initialized (tessdata: {}, downloads: {})",
            tessdata.dir.display(),
            tessdata.download
        );

        Ok(Self { tessdata })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine (LSTM, single uniform text block)"
    }

    fn recognize(&self, image: &DynamicImage, lang: &str) -> Result<Vec<RawToken>, OcrError> {
        let tessdata_dir = self.tessdata.ensure(lang)?;
        let tessdata_dir = tessdata_dir
            .to_str()
            .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))?;

        // Convert to BMP in memory (BMP is always supported by leptonica)
        let rgb_img = image.to_rgb8();
        let (width, height) = rgb_img.dimensions();
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Recognizing {}x{} image with lang '{}', BMP size: {} bytes",
            width,
            height,
            lang,
            bmp_data.len()
        );

        let mut tess = Tesseract::new_with_oem(Some(tessdata_dir), Some(lang), OcrEngineMode::Default)
            .map_err(|e| {
                OcrError::ProcessingError(format!(
                    "Failed to initialize Tesseract for '{}': {}",
                    lang, e
                ))
            })?;
        tess.set_page_seg_mode(PageSegMode::PsmSingleBlock);

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::ProcessingError(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        let tsv = tess
            .get_tsv_text(0)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to get TSV output: {}", e)))?;

        Ok(parse_tsv(&tsv))
    }
}

/// Convert Tesseract's TSV table into raw tokens, one per row, in output order.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Rows above word level carry
/// `conf = -1` and empty text. A header row and short rows are skipped.
pub fn parse_tsv(tsv: &str) -> Vec<RawToken> {
    tsv.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
            if fields.len() < TSV_COLUMNS || fields[0] == "level" {
                return None;
            }
            Some(RawToken::new(fields[TSV_TEXT_COLUMN], fields[TSV_CONF_COLUMN]))
        })
        .collect()
}

// ============================================================================
// Tessdata helpers
// ============================================================================

/// Location of `.traineddata` files, optionally filled on demand
struct TessdataStore {
    dir: PathBuf,
    download: bool,
    download_lock: Mutex<()>,
}

impl TessdataStore {
    fn fixed(dir: PathBuf) -> Self {
        Self {
            dir,
            download: false,
            download_lock: Mutex::new(()),
        }
    }

    fn cached(dir: PathBuf, download: bool) -> Result<Self, OcrError> {
        fs::create_dir_all(&dir).map_err(|e| {
            OcrError::InitializationError(format!("Failed to create tessdata directory: {}", e))
        })?;

        Ok(Self {
            dir,
            download,
            download_lock: Mutex::new(()),
        })
    }

    /// Make sure every language in `lang` (e.g. "eng+vie") has its data file,
    /// downloading missing ones when allowed. Returns the tessdata directory.
    fn ensure(&self, lang: &str) -> Result<&Path, OcrError> {
        for language in lang.split('+') {
            let traineddata_path = self.dir.join(format!("{}.traineddata", language));
            if traineddata_path.exists() {
                continue;
            }

            if !self.download {
                return Err(OcrError::LanguageDataUnavailable(format!(
                    "'{}' not found in {}",
                    language,
                    self.dir.display()
                )));
            }

            let _guard = self
                .download_lock
                .lock()
                .map_err(|_| OcrError::Internal("Tessdata download lock poisoned".to_string()))?;

            // Another request may have fetched it while we waited
            if traineddata_path.exists() {
                continue;
            }

            tracing::info!(
                "Downloading tessdata for '{}' (this may take a moment)...",
                language
            );
            download_file(&tessdata_url(language), &traineddata_path)?;
            tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
        }

        Ok(&self.dir)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ocr-service")
        .join("tessdata")
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

/// Download a file from URL to path using ureq, via a `.part` file
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let unavailable = |what: &str, e: &dyn std::fmt::Display| {
        OcrError::LanguageDataUnavailable(format!("{}: {}", what, e))
    };

    let response = ureq::get(url)
        .call()
        .map_err(|e| unavailable("Failed to download tessdata", &e))?;

    let buffer = response
        .into_body()
        .with_config()
        .limit(MAX_TRAINEDDATA_BYTES)
        .read_to_vec()
        .map_err(|e| unavailable("Failed to read tessdata response", &e))?;

    // Names like "script/Latin" live in a subdirectory
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| unavailable("Failed to create tessdata directory", &e))?;
    }

    let partial_path = path.with_extension("traineddata.part");
    let mut file = File::create(&partial_path)
        .map_err(|e| unavailable("Failed to create tessdata file", &e))?;
    file.write_all(&buffer)
        .map_err(|e| unavailable("Failed to write tessdata file", &e))?;
    drop(file);

    fs::rename(&partial_path, path).map_err(|e| unavailable("Failed to move tessdata file", &e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "\
1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t
2\t1\t1\t0\t0\t0\t36\t92\t582\t269\t-1\t
5\t1\t1\t1\t1\t1\t36\t92\t120\t40\t96.063751\tXin
5\t1\t1\t1\t1\t2\t170\t92\t110\t40\t95.512\tchào
5\t1\t1\t1\t1\t3\t290\t92\t30\t40\t41.2\t 
";

    #[test]
    fn test_parse_tsv_keeps_rows_in_order() {
        let tokens = parse_tsv(SAMPLE_TSV);

        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], RawToken::new("", "-1"));
        assert_eq!(tokens[2], RawToken::new("Xin", "96.063751"));
        assert_eq!(tokens[3], RawToken::new("chào", "95.512"));
        assert_eq!(tokens[4].text, " ");
    }

    #[test]
    fn test_parse_tsv_skips_header_and_short_rows() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   garbage\n\
                   5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t88\tok\n";

        let tokens = parse_tsv(tsv);

        assert_eq!(tokens, vec![RawToken::new("ok", "88")]);
    }

    #[test]
    fn test_parse_tsv_shapes_like_engine_output() {
        let result = crate::recognition::shape_tokens(parse_tsv(SAMPLE_TSV), 50);
        assert_eq!(result.text, vec!["Xin", "chào"]);
    }

    #[test]
    fn test_fixed_store_without_data_reports_unavailable_language() {
        let dir = std::env::temp_dir().join(format!("ocr-service-empty-{}", std::process::id()));
        let store = TessdataStore::fixed(dir);

        let err = store.ensure("eng+vie").unwrap_err();

        assert!(matches!(err, OcrError::LanguageDataUnavailable(msg) if msg.contains("eng")));
    }

    #[test]
    fn test_store_finds_existing_languages() {
        let dir = std::env::temp_dir().join(format!("ocr-service-tessdata-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("eng.traineddata"), b"stub").unwrap();
        fs::write(dir.join("vie.traineddata"), b"stub").unwrap();

        let store = TessdataStore::cached(dir.clone(), false).unwrap();

        assert_eq!(store.ensure("eng+vie").unwrap(), dir.as_path());
        assert!(store.ensure("deu").is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_store_finds_script_languages_in_subdirectory() {
        let dir = std::env::temp_dir().join(format!("ocr-service-script-{}", std::process::id()));
        fs::create_dir_all(dir.join("script")).unwrap();
        fs::write(dir.join("script").join("Latin.traineddata"), b"stub").unwrap();
        fs::write(dir.join("eng.traineddata"), b"stub").unwrap();

        let store = TessdataStore::cached(dir.clone(), false).unwrap();

        assert!(store.ensure("script/Latin").is_ok());
        assert!(store.ensure("eng+script/Latin").is_ok());
        assert!(store.ensure("script/Cyrillic").is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_download_failure_leaves_no_partial_file() {
        let dir = std::env::temp_dir().join(format!("ocr-service-dl-{}", std::process::id()));
        let path = dir.join("script").join("Latin.traineddata");

        let err = download_file("http://127.0.0.1:9/Latin.traineddata", &path).unwrap_err();

        assert!(matches!(err, OcrError::LanguageDataUnavailable(_)));
        assert!(!path.exists());
        assert!(!path.with_extension("traineddata.part").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tessdata_url_uses_fast_models() {
        assert!(tessdata_url("vie").ends_with("/tessdata_fast/raw/main/vie.traineddata"));
        assert!(tessdata_url("script/Latin").ends_with("/raw/main/script/Latin.traineddata"));
    }
}
