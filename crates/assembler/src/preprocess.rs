//! Macro and conditional expansion (`#define`, `#include`, `#ifdef`).
//!
//! The preprocessor runs once per source file, before tokenization, and
//! produces a flat stream of lines with includes spliced in place. It
//! never touches the symbol table and never emits bytes. Macro state
//! persists across files of one assembly session, so later inputs see
//! earlier definitions.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// One expanded source line with its origin for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Line text after comment stripping and macro substitution.
    pub text: String,
    /// File the line came from.
    pub file: PathBuf,
    /// 1-indexed line number in that file.
    pub line: usize,
}

/// Preprocessing error with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessError {
    /// File in which the error occurred.
    pub file: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
    /// Kind of error.
    pub kind: PreprocessErrorKind,
}

/// Classification of preprocessing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessErrorKind {
    /// An include chain visited the same file twice.
    CyclicInclude(PathBuf),
    /// A conditional block was never closed; carries the opening line.
    UnterminatedConditional {
        /// Line where the unclosed block was opened.
        opened_line: usize,
    },
    /// `#endif` without a matching `#ifdef`/`#ifndef`.
    UnmatchedEndif,
    /// `#include` target does not exist or cannot be read.
    MissingInclude(PathBuf),
    /// Directive is syntactically malformed.
    MalformedDirective(String),
    /// `#` directive that is not part of the language.
    UnknownDirective(String),
}

impl std::fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PreprocessErrorKind::CyclicInclude(path) => {
                write!(f, "cyclic include of {}", path.display())
            }
            PreprocessErrorKind::UnterminatedConditional { opened_line } => {
                write!(
                    f,
                    "conditional opened at line {opened_line} is never closed"
                )
            }
            PreprocessErrorKind::UnmatchedEndif => {
                write!(f, "#endif without a matching #ifdef/#ifndef")
            }
            PreprocessErrorKind::MissingInclude(path) => {
                write!(f, "cannot include {}", path.display())
            }
            PreprocessErrorKind::MalformedDirective(line) => {
                write!(f, "malformed preprocessor directive: {line}")
            }
            PreprocessErrorKind::UnknownDirective(name) => {
                write!(f, "unknown preprocessor directive: {name}")
            }
        }
    }
}

impl std::error::Error for PreprocessError {}

/// Textual macro and conditional expander.
///
/// Macros are object-like (no parameters); redefinition silently
/// overwrites, matching the documented policy.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    defines: HashMap<String, String>,
}

impl Preprocessor {
    /// Creates a preprocessor with no definitions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or redefines a macro from the host side.
    pub fn define(&mut self, name: &str, value: &str) {
        self.defines.insert(name.to_string(), value.to_string());
    }

    /// Returns `true` when `name` is currently defined.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.defines.contains_key(name)
    }

    /// Expands a source file, splicing `#include`s recursively.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessError`] for unreadable or cyclic includes,
    /// unterminated or unbalanced conditionals, and malformed directives.
    pub fn expand_file(&mut self, path: &Path) -> Result<Vec<SourceLine>, PreprocessError> {
        let mut visited = HashSet::new();
        let mut output = Vec::new();
        self.expand_file_inner(path, &mut visited, &mut output)?;
        Ok(output)
    }

    /// Expands in-memory source text. `name` labels diagnostics and
    /// `base_dir` anchors relative `#include` paths.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Preprocessor::expand_file`].
    pub fn expand_text(
        &mut self,
        name: &Path,
        text: &str,
        base_dir: Option<&Path>,
    ) -> Result<Vec<SourceLine>, PreprocessError> {
        let mut visited = HashSet::new();
        let mut output = Vec::new();
        self.expand_lines(name, base_dir, text, &mut visited, &mut output)?;
        Ok(output)
    }

    fn expand_file_inner(
        &mut self,
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        output: &mut Vec<SourceLine>,
    ) -> Result<(), PreprocessError> {
        let canonical = path.canonicalize().map_err(|_| PreprocessError {
            file: path.to_path_buf(),
            line: 0,
            kind: PreprocessErrorKind::MissingInclude(path.to_path_buf()),
        })?;

        if !visited.insert(canonical.clone()) {
            return Err(PreprocessError {
                file: path.to_path_buf(),
                line: 0,
                kind: PreprocessErrorKind::CyclicInclude(canonical),
            });
        }

        let text = fs::read_to_string(path).map_err(|_| PreprocessError {
            file: path.to_path_buf(),
            line: 0,
            kind: PreprocessErrorKind::MissingInclude(path.to_path_buf()),
        })?;

        let base_dir = path.parent().map(Path::to_path_buf);
        self.expand_lines(path, base_dir.as_deref(), &text, visited, output)?;

        visited.remove(&canonical);
        Ok(())
    }

    fn expand_lines(
        &mut self,
        file: &Path,
        base_dir: Option<&Path>,
        text: &str,
        visited: &mut HashSet<PathBuf>,
        output: &mut Vec<SourceLine>,
    ) -> Result<(), PreprocessError> {
        // Conditional nesting is scoped per file: (active, opened_line).
        let mut conditions: Vec<(bool, usize)> = Vec::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let stripped = raw_line.split(';').next().unwrap_or_default().trim();
            if stripped.is_empty() {
                continue;
            }

            let active = conditions.iter().all(|(cond, _)| *cond);

            if let Some(rest) = stripped.strip_prefix('#') {
                self.handle_directive(
                    rest,
                    DirectiveContext {
                        file,
                        base_dir,
                        line_number,
                        active,
                    },
                    &mut conditions,
                    visited,
                    output,
                )?;
                continue;
            }

            if active {
                output.push(SourceLine {
                    text: self.substitute(stripped),
                    file: file.to_path_buf(),
                    line: line_number,
                });
            }
        }

        if let Some((_, opened_line)) = conditions.pop() {
            return Err(PreprocessError {
                file: file.to_path_buf(),
                line: opened_line,
                kind: PreprocessErrorKind::UnterminatedConditional { opened_line },
            });
        }

        Ok(())
    }

    fn handle_directive(
        &mut self,
        rest: &str,
        ctx: DirectiveContext<'_>,
        conditions: &mut Vec<(bool, usize)>,
        visited: &mut HashSet<PathBuf>,
        output: &mut Vec<SourceLine>,
    ) -> Result<(), PreprocessError> {
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let err = |kind| PreprocessError {
            file: ctx.file.to_path_buf(),
            line: ctx.line_number,
            kind,
        };

        match name {
            "define" => {
                if ctx.active {
                    let macro_name = parts.next().ok_or_else(|| {
                        err(PreprocessErrorKind::MalformedDirective(rest.to_string()))
                    })?;
                    let value = parts.collect::<Vec<_>>().join(" ");
                    self.defines.insert(macro_name.to_string(), value);
                }
            }
            "include" => {
                if ctx.active {
                    let argument = rest["include".len()..].trim();
                    let path_text = argument
                        .strip_prefix('"')
                        .and_then(|s| s.strip_suffix('"'))
                        .ok_or_else(|| {
                            err(PreprocessErrorKind::MalformedDirective(rest.to_string()))
                        })?;
                    let resolved = resolve_include(path_text, ctx.base_dir);
                    self.expand_file_inner(&resolved, visited, output)
                        .map_err(|e| {
                            // Report a failure to open the target against
                            // the including line, not the missing file.
                            if e.line == 0 {
                                err(e.kind)
                            } else {
                                e
                            }
                        })?;
                }
            }
            "ifdef" | "ifndef" => {
                let macro_name = parts.next().ok_or_else(|| {
                    err(PreprocessErrorKind::MalformedDirective(rest.to_string()))
                })?;
                let defined = self.defines.contains_key(macro_name);
                let holds = if name == "ifdef" { defined } else { !defined };
                conditions.push((ctx.active && holds, ctx.line_number));
            }
            "endif" => {
                if conditions.pop().is_none() {
                    return Err(err(PreprocessErrorKind::UnmatchedEndif));
                }
            }
            other => {
                if ctx.active {
                    return Err(err(PreprocessErrorKind::UnknownDirective(format!(
                        "#{other}"
                    ))));
                }
            }
        }

        Ok(())
    }

    /// Substitutes defined macros as whole identifier tokens, skipping
    /// quoted literals. One pass; no recursive re-expansion.
    fn substitute(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();

        while let Some(&ch) = chars.peek() {
            if ch == '\'' || ch == '"' {
                let quote = ch;
                out.push(chars.next().unwrap_or(quote));
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == quote {
                        break;
                    }
                }
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        token.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match self.defines.get(&token) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&token),
                }
            } else {
                out.push(ch);
                chars.next();
            }
        }

        out
    }
}

struct DirectiveContext<'a> {
    file: &'a Path,
    base_dir: Option<&'a Path>,
    line_number: usize,
    active: bool,
}

fn resolve_include(path_text: &str, base_dir: Option<&Path>) -> PathBuf {
    let include = PathBuf::from(path_text);
    if include.is_absolute() {
        include
    } else {
        base_dir.map_or(include.clone(), |dir| dir.join(include))
    }
}
