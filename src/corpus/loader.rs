//! Reading a corpus from disk.
//!
//! Two layouts are supported:
//!
//! - a single `.json` file holding `{"documents": [...], "glossary": [...]}`
//! - a directory of Markdown pages (`**/*.md`) with an optional
//!   `glossary.json` next to them
//!
//! Markdown pages may start with a `---` delimited front matter block of
//! `key: value` lines. `title`, `description`, `status`, `tags` and
//! `category` are recognised; every other key lands in the document's
//! metadata map as a string.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::document::{DocStatus, Document, GlossaryTerm};
use super::error::{CorpusError, CorpusResult};

/// Glossary file name looked up inside a corpus directory.
pub const GLOSSARY_FILE: &str = "glossary.json";

const FRONT_MATTER_DELIMITER: &str = "---";

/// Documents and glossary read from one source.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    /// Documents in stable order.
    pub documents: Vec<Document>,
    /// Glossary terms in file order.
    pub glossary: Vec<GlossaryTerm>,
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    glossary: Vec<GlossaryTerm>,
}

/// Loads a corpus from a `.json` file or a Markdown directory.
///
/// # Errors
///
/// Returns an error if the path does not exist, a file cannot be read or
/// parsed, front matter is invalid, or two documents share a slug.
pub fn load_path(path: &Path) -> CorpusResult<LoadedCorpus> {
    if !path.exists() {
        return Err(CorpusError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let loaded = if path.is_dir() {
        load_directory(path)?
    } else if has_extension(path, "json") {
        load_json_file(path)?
    } else {
        return Err(CorpusError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    };

    ensure_unique_slugs(&loaded.documents)?;

    tracing::info!(
        path = %path.display(),
        documents = loaded.documents.len(),
        glossary = loaded.glossary.len(),
        "Loaded corpus"
    );
    Ok(loaded)
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

fn read_file(path: &Path) -> CorpusResult<String> {
    std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_json_file(path: &Path) -> CorpusResult<LoadedCorpus> {
    let contents = read_file(path)?;
    let file: CorpusFile =
        serde_json::from_str(&contents).map_err(|source| CorpusError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(LoadedCorpus {
        documents: file.documents,
        glossary: file.glossary,
    })
}

fn load_directory(dir: &Path) -> CorpusResult<LoadedCorpus> {
    let pattern = format!(
        "{}/**/*.md",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern).map_err(|e| CorpusError::Scan {
        message: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CorpusError::Scan {
            message: e.to_string(),
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        let slug = slug_for(dir, path);
        let contents = read_file(path)?;
        let document = parse_markdown(&slug, &contents).map_err(|message| {
            CorpusError::InvalidDocument {
                path: path.clone(),
                message,
            }
        })?;
        tracing::debug!(slug = %document.slug, "Parsed document");
        documents.push(document);
    }
    documents.sort_by(|a, b| a.slug.cmp(&b.slug));

    let glossary_path = dir.join(GLOSSARY_FILE);
    let glossary = if glossary_path.is_file() {
        let contents = read_file(&glossary_path)?;
        serde_json::from_str(&contents).map_err(|source| CorpusError::Parse {
            path: glossary_path,
            source,
        })?
    } else {
        Vec::new()
    };

    Ok(LoadedCorpus {
        documents,
        glossary,
    })
}

/// Relative path without extension, always `/`-separated.
fn slug_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parses one Markdown page into a document.
///
/// # Errors
///
/// Returns a description of the problem if the front matter is unterminated
/// or holds an unknown status.
pub fn parse_markdown(slug: &str, contents: &str) -> Result<Document, String> {
    let (front_matter, body) = split_front_matter(contents)?;

    let mut document = Document::new(slug, String::new());
    document.body = body.trim().to_string();

    for (key, value) in front_matter {
        match key.as_str() {
            "title" => document.title = value,
            "description" => document.description = value,
            "status" => document.status = value.parse::<DocStatus>()?,
            "tags" => document.tags = parse_list(&value),
            "category" => document.category = Some(value).filter(|c| !c.is_empty()),
            _ => {
                document.metadata.insert(key, Value::String(value));
            }
        }
    }

    if document.title.is_empty() {
        document.title = first_heading(&document.body).unwrap_or_else(|| slug.to_string());
    }

    Ok(document)
}

type FrontMatter = Vec<(String, String)>;

fn split_front_matter(contents: &str) -> Result<(FrontMatter, &str), String> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut lines = contents.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return Ok((Vec::new(), contents));
    };
    if first.trim_end() != FRONT_MATTER_DELIMITER {
        return Ok((Vec::new(), contents));
    }

    let mut consumed = first.len();
    let mut fields = Vec::new();
    for line in lines {
        consumed += line.len();
        let line = line.trim_end();
        if line == FRONT_MATTER_DELIMITER {
            return Ok((fields, &contents[consumed..]));
        }
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| format!("front matter line is not 'key: value': {line}"))?;
        fields.push((key.trim().to_lowercase(), unquote(value.trim()).to_string()));
    }

    Err("front matter is not terminated by '---'".to_string())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Accepts `[a, b]` or `a, b`.
fn parse_list(value: &str) -> Vec<String> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    inner
        .split(',')
        .map(|item| unquote(item.trim()).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.trim_start().strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn ensure_unique_slugs(documents: &[Document]) -> CorpusResult<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    for document in documents {
        if !seen.insert(document.slug.as_str()) {
            return Err(CorpusError::DuplicateSlug {
                slug: document.slug.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_fields_are_applied() {
        let page = "---\ntitle: Forms\ndescription: \"Collect input\"\nstatus: beta\ntags: [input, validation]\ncategory: components\nowner: ui-team\n---\n\nBody text.\n";
        let doc = parse_markdown("components/forms", page).unwrap();
        assert_eq!(doc.title, "Forms");
        assert_eq!(doc.description, "Collect input");
        assert_eq!(doc.status, DocStatus::Beta);
        assert_eq!(doc.tags, vec!["input", "validation"]);
        assert_eq!(doc.category.as_deref(), Some("components"));
        assert_eq!(doc.metadata["owner"], Value::String("ui-team".into()));
        assert_eq!(doc.body, "Body text.");
    }

    #[test]
    fn title_falls_back_to_heading_then_slug() {
        let doc = parse_markdown("tabs", "# Tab panels\n\nText").unwrap();
        assert_eq!(doc.title, "Tab panels");

        let doc = parse_markdown("tabs", "No heading here").unwrap();
        assert_eq!(doc.title, "tabs");
    }

    #[test]
    fn unterminated_front_matter_is_rejected() {
        let err = parse_markdown("x", "---\ntitle: X\nbody").unwrap_err();
        assert!(err.contains("not terminated"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = parse_markdown("x", "---\nstatus: retired\n---\n").unwrap_err();
        assert!(err.contains("retired"));
    }

    #[test]
    fn list_parsing_accepts_both_forms() {
        assert_eq!(parse_list("[a, 'b']"), vec!["a", "b"]);
        assert_eq!(parse_list("a,b,"), vec!["a", "b"]);
        assert!(parse_list("[]").is_empty());
    }

    #[test]
    fn slug_uses_forward_slashes() {
        let root = Path::new("/docs");
        let path = root.join("components").join("forms.md");
        assert_eq!(slug_for(root, &path), "components/forms");
    }

    #[test]
    fn duplicate_slugs_are_rejected() {
        let docs = vec![Document::new("a", "A"), Document::new("a", "Again")];
        assert!(matches!(
            ensure_unique_slugs(&docs),
            Err(CorpusError::DuplicateSlug { .. })
        ));
    }
}
