//! On-disk cache for the fitted lexical index and the keyword embeddings.
//!
//! Both artifacts are CBOR envelopes carrying a format version, a fingerprint
//! of the vocabulary/country order they were built for, and the embedding
//! model id. The lexical index also records a hash of the counts it was fit
//! on, so changed data with an unchanged vocabulary refits it while the
//! embeddings stay valid. An envelope that fails to decode or does not match is treated
//! as absent. Writes go to a temp file in the same directory and are renamed
//! into place, so readers never see a half-written file.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    aggregate::FrequencyTable, country::Country, embedding::store::EmbeddingMap,
    vectorizer::serde::LexicalIndexData,
};

/// Bumped whenever the layout of a cached payload changes.
pub const CACHE_FORMAT_VERSION: u32 = 2;

const LEXICAL_FILE: &str = "lexical_index.cbor";
const EMBEDDINGS_FILE: &str = "embeddings.cbor";

/// Serializes load-modify-store sequences within the process.
static CACHE_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("{path} has format version {found}, expected {expected}")]
    VersionMismatch { path: PathBuf, found: u32, expected: u32 },
    #[error("{path} was built for a different vocabulary or model")]
    FingerprintMismatch { path: PathBuf },
    #[error("{path} was fit on different keyword counts")]
    ContentMismatch { path: PathBuf },
}

/// Versioned wrapper around a cached payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub format_version: u32,
    pub fingerprint: String,
    pub model_id: String,
    /// Hash of the frequency table; empty for embeddings.
    pub content: String,
    pub payload: T,
}

/// Fingerprint of a vocabulary (in column order) and the country row order.
pub fn fingerprint<'a, I>(vocabulary: I, countries: &[Country]) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = blake3::Hasher::new();
    for term in vocabulary {
        hasher.update(term.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(b"\0");
    for country in countries {
        hasher.update(country.code().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Hash of every country's keyword counts, independent of row order.
pub fn table_fingerprint(table: &FrequencyTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for (country, freq) in table.iter() {
        hasher.update(country.code().as_bytes());
        hasher.update(b"\0");
        let mut counts: Vec<(&str, u64)> = freq.iter().collect();
        counts.sort_unstable();
        for (term, count) in counts {
            hasher.update(term.as_bytes());
            hasher.update(b"\t");
            hasher.update(&count.to_le_bytes());
        }
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Directory holding both cache artifacts.
#[derive(Debug, Clone)]
pub struct CacheDir {
    dir: PathBuf,
}

impl CacheDir {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn lexical_path(&self) -> PathBuf {
        self.dir.join(LEXICAL_FILE)
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.dir.join(EMBEDDINGS_FILE)
    }

    /// Hold this while loading, updating and storing artifacts.
    pub fn lock(&self) -> MutexGuard<'static, ()> {
        CACHE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove both artifacts. Missing files are fine.
    pub fn clear(&self) -> Result<(), CacheError> {
        for path in [self.lexical_path(), self.embeddings_path()] {
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed cache artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Io { path, source }),
            }
        }
        Ok(())
    }

    /// Cached lexical index, if present and fit on the table hashed as
    /// `content` with vocabulary `fingerprint`.
    pub fn load_lexical(&self, fingerprint: &str, content: &str) -> Option<LexicalIndexData> {
        let path = self.lexical_path();
        accept(read_envelope(&path).and_then(|env| check(&path, env, fingerprint, None, Some(content))))
    }

    pub fn store_lexical(&self, fingerprint: &str, content: &str, data: &LexicalIndexData) -> Result<(), CacheError> {
        write_envelope(&self.lexical_path(), fingerprint, "", content, data)
    }

    /// Cached embeddings, if present and built for `fingerprint` with `model_id`.
    pub fn load_embeddings(&self, fingerprint: &str, model_id: &str) -> Option<EmbeddingMap> {
        let path = self.embeddings_path();
        accept(read_envelope(&path).and_then(|env| check(&path, env, fingerprint, Some(model_id), None)))
    }

    pub fn store_embeddings(&self, fingerprint: &str, map: &EmbeddingMap) -> Result<(), CacheError> {
        write_envelope(&self.embeddings_path(), fingerprint, map.model_id(), "", map)
    }
}

/// `Ok(None)` when the file does not exist.
fn read_envelope<T: DeserializeOwned>(path: &Path) -> Result<Option<Envelope<T>>, CacheError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_cbor::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| CacheError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn check<T>(
    path: &Path,
    envelope: Option<Envelope<T>>,
    fingerprint: &str,
    model_id: Option<&str>,
    content: Option<&str>,
) -> Result<Option<Envelope<T>>, CacheError> {
    let Some(envelope) = envelope else {
        return Ok(None);
    };
    if envelope.format_version != CACHE_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            found: envelope.format_version,
            expected: CACHE_FORMAT_VERSION,
        });
    }
    let model_ok = model_id.map_or(true, |id| envelope.model_id == id);
    if envelope.fingerprint != fingerprint || !model_ok {
        return Err(CacheError::FingerprintMismatch {
            path: path.to_path_buf(),
        });
    }
    if content.is_some_and(|c| envelope.content != c) {
        return Err(CacheError::ContentMismatch {
            path: path.to_path_buf(),
        });
    }
    Ok(Some(envelope))
}

/// Corrupt or stale caches are logged and read as absent.
fn accept<T>(result: Result<Option<Envelope<T>>, CacheError>) -> Option<T> {
    match result {
        Ok(Some(envelope)) => Some(envelope.payload),
        Ok(None) => {
            debug!("no cache artifact found");
            None
        }
        Err(e) => {
            warn!(error = %e, "ignoring cache artifact");
            None
        }
    }
}

fn write_envelope<T: Serialize>(
    path: &Path,
    fingerprint: &str,
    model_id: &str,
    content: &str,
    payload: &T,
) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(io_err)?;

    let envelope = Envelope {
        format_version: CACHE_FORMAT_VERSION,
        fingerprint: fingerprint.to_string(),
        model_id: model_id.to_string(),
        content: content.to_string(),
        payload,
    };
    let temp_file = NamedTempFile::new_in(parent).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        serde_cbor::to_writer(&mut writer, &envelope).map_err(|e| CacheError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        writer.flush().map_err(io_err)?;
    }
    temp_file.persist(path).map_err(|e| io_err(e.error))?;
    debug!(path = %path.display(), "wrote cache artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::{token::TermFrequency, LexicalIndex};

    fn table(vegan: u64) -> FrequencyTable {
        let mut a = TermFrequency::new();
        a.add_count("vegan", vegan);
        let mut b = TermFrequency::new();
        b.add_count("toner", 2);
        let mut t = FrequencyTable::new();
        t.insert(Country::Usa, a).insert(Country::Uk, b);
        t
    }

    fn index() -> LexicalIndex {
        LexicalIndex::fit(&table(3))
    }

    #[test]
    fn fingerprint_depends_on_order_and_countries() {
        let a = fingerprint(["a", "b"], &[Country::Usa]);
        assert_eq!(a, fingerprint(["a", "b"], &[Country::Usa]));
        assert_ne!(a, fingerprint(["b", "a"], &[Country::Usa]));
        assert_ne!(a, fingerprint(["a", "b"], &[Country::Uk]));
        assert_ne!(fingerprint(["ab"], &[]), fingerprint(["a", "b"], &[]));
    }

    #[test]
    fn lexical_roundtrip_and_fingerprint_check() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let index = index();
        let fp = index.fingerprint();

        let content = table_fingerprint(&table(3));

        assert!(cache.load_lexical(&fp, &content).is_none());
        cache.store_lexical(&fp, &content, &LexicalIndexData::from(&index)).unwrap();
        let data = cache.load_lexical(&fp, &content).unwrap();
        assert_eq!(data.vocabulary, vec!["toner", "vegan"]);
        assert!(cache.load_lexical("other", &content).is_none());
    }

    #[test]
    fn changed_counts_reject_lexical_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let fp = index().fingerprint();
        let before = table_fingerprint(&table(3));
        let after = table_fingerprint(&table(7));
        assert_ne!(before, after);
        assert_eq!(table(3).vocabulary(), table(7).vocabulary());

        cache.store_lexical(&fp, &before, &LexicalIndexData::from(&index())).unwrap();
        assert!(cache.load_lexical(&fp, &after).is_none());
        assert!(matches!(
            read_envelope::<LexicalIndexData>(&cache.lexical_path())
                .and_then(|env| check(&cache.lexical_path(), env, &fp, None, Some(&after))),
            Err(CacheError::ContentMismatch { .. })
        ));
    }

    #[test]
    fn table_fingerprint_ignores_row_order() {
        let mut a = TermFrequency::new();
        a.add_count("vegan", 3).add_count("toner", 1);
        let mut b = TermFrequency::new();
        b.add_count("toner", 1).add_count("vegan", 3);
        let mut first = FrequencyTable::new();
        first.insert(Country::Usa, a);
        let mut second = FrequencyTable::new();
        second.insert(Country::Usa, b);
        assert_eq!(table_fingerprint(&first), table_fingerprint(&second));
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        fs::write(cache.lexical_path(), b"definitely not cbor").unwrap();
        assert!(cache.load_lexical("anything", "").is_none());
        assert!(matches!(
            read_envelope::<LexicalIndexData>(&cache.lexical_path()),
            Err(CacheError::Decode { .. })
        ));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        let stale = Envelope {
            format_version: CACHE_FORMAT_VERSION + 1,
            fingerprint: "fp".to_string(),
            model_id: String::new(),
            content: "c".to_string(),
            payload: LexicalIndexData::from(&index()),
        };
        fs::write(cache.lexical_path(), serde_cbor::to_vec(&stale).unwrap()).unwrap();
        assert!(cache.load_lexical("fp", "c").is_none());
    }

    #[test]
    fn embeddings_check_model_id() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path().join("nested"));
        let mut map = EmbeddingMap::new("model-a");
        map.insert("vegan".to_string(), vec![1.0, 0.0]);
        cache.store_embeddings("fp", &map).unwrap();

        assert_eq!(cache.load_embeddings("fp", "model-a"), Some(map));
        assert!(cache.load_embeddings("fp", "model-b").is_none());
        assert!(cache.load_embeddings("other", "model-a").is_none());
    }

    #[test]
    fn clear_removes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path());
        cache.store_embeddings("fp", &EmbeddingMap::new("m")).unwrap();
        cache.store_lexical("fp", "c", &LexicalIndexData::from(&index())).unwrap();
        cache.clear().unwrap();
        assert!(!cache.lexical_path().exists());
        assert!(!cache.embeddings_path().exists());
        // idempotent
        cache.clear().unwrap();
    }
}
