//! Include expansion for pass files
//!
//! Pass files may pull shared declarations from sibling files with
//! `#include "common.hlsli"`. Each directive is replaced by the complete text of
//! the referenced file. Inclusion is a single level: directives inside included
//! text are left as they are.

use regex::Regex;

/// Errors raised while expanding includes
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("'{file}' includes '{include}', which could not be read: {source}")]
    MissingInclude {
        file: String,
        include: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid include pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A located `#include` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    /// Byte range of the whole directive in the including file
    pub range: std::ops::Range<usize>,
    /// Referenced file name
    pub name: String,
}

pub struct Preprocessor {
    include_re: Regex,
}

impl Preprocessor {
    pub fn new() -> Result<Self, PreprocessError> {
        Ok(Self {
            include_re: Regex::new(r#"#include[ \t]+"?(?<name>[\w./\\-]+)"?"#)?,
        })
    }

    /// Finds all include directives, ordered by their offset in `src`
    pub fn find_includes(&self, src: &str) -> Vec<IncludeDirective> {
        let mut includes: Vec<IncludeDirective> = self
            .include_re
            .captures_iter(src)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.name("name")?;
                Some(IncludeDirective {
                    range: whole.range(),
                    name: name.as_str().to_string(),
                })
            })
            .collect();
        includes.sort_by_key(|include| include.range.start);
        includes
    }

    /// Expands the includes of one pass file
    ///
    /// # Arguments
    /// * `file` - Name of the pass file, used in error messages
    /// * `src` - Pass file text
    /// * `load_file` - Reads a file from the pass directory by name
    ///
    /// # Returns
    /// The pass text with every include directive replaced by the included file's content
    pub fn expand(&self, file: &str, src: &str, load_file: impl Fn(&str) -> Result<String, std::io::Error>) -> Result<String, PreprocessError> {
        let includes = self.find_includes(src);
        if includes.is_empty() {
            return Ok(src.to_string());
        }

        tracing::debug!("Expanding {} include(s) in {file}", includes.len());

        let mut expanded = String::with_capacity(src.len());
        let mut cursor = 0;
        for include in includes {
            let content = load_file(&include.name).map_err(|source| PreprocessError::MissingInclude {
                file: file.to_string(),
                include: include.name.clone(),
                source,
            })?;
            expanded.push_str(&src[cursor..include.range.start]);
            expanded.push_str(&content);
            cursor = include.range.end;
        }
        expanded.push_str(&src[cursor..]);

        Ok(expanded)
    }
}
