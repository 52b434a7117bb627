//! core::classify
//!
//! Classification of a translation unit from its textual preamble.
//!
//! # Algorithm
//!
//! The file is read line by line. Everything after `//` is dropped and
//! preprocessor lines (`#`) are skipped. Every other line is split into `;`-terminated
//! statements, and each trimmed, non-empty statement is matched against the
//! module-declaring forms:
//!
//! - `module Name` - implementation unit of `Name`
//! - `export module Name` - interface (or partition, if `Name` contains `:`)
//! - `import Name` / `export import Name` - module, partition or header unit
//! - `module` - global module fragment marker, inert
//! - `module :private` - private module fragment, ends the preamble
//!
//! The first statement that matches none of these ends the preamble. Module
//! declarations and imports must precede ordinary code, so nothing after that
//! statement is inspected, even if it looks like an import.
//!
//! # Example
//!
//! ```
//! use baker::core::classify::classify_source;
//! use baker::core::types::Role;
//!
//! let source = "export module image;\nimport logger;\nimport <vector>;\n";
//! let record = classify_source("image.cppm", source).unwrap();
//!
//! assert_eq!(record.role, Role::ModuleInterface);
//! assert_eq!(record.name, "image");
//! assert_eq!(record.imports, vec!["logger".to_string()]);
//! assert!(record.header_units.contains("vector"));
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::types::Role;

/// Errors from classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to read source '{path}': {source}")]
    ReadError { path: PathBuf, source: io::Error },

    #[error("{filename}: '{statement}' redeclares the module (already a {role} of '{name}')")]
    DuplicateDeclaration {
        filename: String,
        statement: String,
        role: Role,
        name: String,
    },

    #[error("{filename}: partition import '{partition}' appears before any module declaration")]
    RelativeImportOutsideModule { filename: String, partition: String },
}

/// Module role and dependencies of one source file.
///
/// Produced once per source file and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationRecord {
    /// Path relative to the source root.
    pub filename: String,
    /// Declared role.
    pub role: Role,
    /// Declared module or partition name; empty for plain units.
    pub name: String,
    /// Module and partition names this unit imports, in order.
    pub imports: Vec<String>,
    /// Header units this unit imports, quoting stripped.
    pub header_units: BTreeSet<String>,
    /// For implementation units, the module or partition implemented.
    pub owner_module: Option<String>,
}

impl ClassificationRecord {
    /// The module this unit belongs to.
    ///
    /// For partitions this is the part before the `:`; for plain units it is
    /// empty.
    pub fn module_name(&self) -> &str {
        module_of(&self.name)
    }
}

/// The owning module of a module or partition name (`Foo:Part` -> `Foo`).
pub fn module_of(name: &str) -> &str {
    name.split_once(':').map_or(name, |(module, _)| module)
}

/// Classify the source file at `path`.
///
/// `filename` is the name recorded in the result (relative to the source root).
pub fn classify(path: &Path, filename: &str) -> Result<ClassificationRecord, ClassifyError> {
    let read_error = |source| ClassifyError::ReadError {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    classify_reader(filename, BufReader::new(file)).map_err(|e| match e {
        ClassifyError::ReadError { source, .. } => read_error(source),
        other => other,
    })
}

/// Classify source text held in memory.
pub fn classify_source(filename: &str, source: &str) -> Result<ClassificationRecord, ClassifyError> {
    classify_reader(filename, source.as_bytes())
}

/// Classify source text from any buffered reader.
///
/// Reading stops at the end of the preamble.
pub fn classify_reader<R: BufRead>(
    filename: &str,
    reader: R,
) -> Result<ClassificationRecord, ClassifyError> {
    let mut record = ClassificationRecord {
        filename: filename.to_string(),
        ..Default::default()
    };

    for line in reader.lines() {
        let line = line.map_err(|source| ClassifyError::ReadError {
            path: PathBuf::from(filename),
            source,
        })?;
        let line = strip_comment(&line).trim();
        if line.starts_with('#') {
            continue;
        }

        for statement in line.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if !apply_statement(&mut record, statement)? {
                tracing::trace!(filename, statement, "preamble ends");
                return Ok(record);
            }
        }
    }

    Ok(record)
}

/// The part of a line before any `//` comment.
fn strip_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(code, _)| code)
}

/// Apply one statement to the record.
///
/// Returns `false` when the statement is ordinary code, which ends the preamble.
fn apply_statement(record: &mut ClassificationRecord, statement: &str) -> Result<bool, ClassifyError> {
    if statement == "module" {
        return Ok(true);
    }

    // `module :private;` opens the private fragment; no imports follow it.
    if after_keyword(statement, "module").is_some_and(|name| name.starts_with(':')) {
        return Ok(false);
    }

    if let Some(name) = after_keyword(statement, "module") {
        declare(record, statement, Role::ModuleImplementation, name)?;
        record.owner_module = Some(name.to_string());
        return Ok(true);
    }

    if let Some(rest) = after_keyword(statement, "export") {
        if let Some(name) = after_keyword(rest, "module") {
            let role = if name.contains(':') {
                Role::ModulePartition
            } else {
                Role::ModuleInterface
            };
            declare(record, statement, role, name)?;
            return Ok(true);
        }
        if let Some(name) = after_keyword(rest, "import") {
            add_import(record, name)?;
            return Ok(true);
        }
        return Ok(false);
    }

    if let Some(name) = after_keyword(statement, "import") {
        add_import(record, name)?;
        return Ok(true);
    }

    Ok(false)
}

/// Strip `keyword` and the whitespace after it.
///
/// Matches only whole words followed by a non-empty remainder.
fn after_keyword<'a>(statement: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = statement.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    (!rest.is_empty()).then_some(rest)
}

fn declare(
    record: &mut ClassificationRecord,
    statement: &str,
    role: Role,
    name: &str,
) -> Result<(), ClassifyError> {
    if record.role != Role::Plain {
        return Err(ClassifyError::DuplicateDeclaration {
            filename: record.filename.clone(),
            statement: statement.to_string(),
            role: record.role,
            name: record.name.clone(),
        });
    }
    record.role = role;
    record.name = name.to_string();
    Ok(())
}

fn add_import(record: &mut ClassificationRecord, name: &str) -> Result<(), ClassifyError> {
    if let Some(header) = header_unit_name(name) {
        record.header_units.insert(header.to_string());
        return Ok(());
    }

    if name.starts_with(':') {
        let module = record.module_name();
        if module.is_empty() {
            return Err(ClassifyError::RelativeImportOutsideModule {
                filename: record.filename.clone(),
                partition: name.to_string(),
            });
        }
        let full = format!("{module}{name}");
        record.imports.push(full);
    } else {
        record.imports.push(name.to_string());
    }
    Ok(())
}

/// Header identifier of an angle-bracketed or quoted import, if it is one.
fn header_unit_name(name: &str) -> Option<&str> {
    let inner = name
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .or_else(|| name.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
    let inner = inner.trim();
    (!inner.is_empty()).then_some(inner)
}
