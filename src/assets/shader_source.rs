//! GLSL include resolution.
//!
//! Two directives are understood, each at the start of a line:
//!
//! - `#include "path"` is replaced by the resolved contents of `path` (read
//!   through the same [`AssetReaderVariant`]), followed by a `#line` directive
//!   restoring this file's numbering.
//! - `#pragma once` is removed and the whole file is wrapped in an
//!   `#ifndef`/`#define` guard derived from its path.
//!
//! Every file gets a source-string number for `#line`: the entry file is 0 and
//! each include level adds 10, so compiler logs point at the right file. A file
//! that does not start with `#version` is prefixed with `#line 1 <n>`.

use futures::future::{FutureExt, LocalBoxFuture};

use super::io::AssetReaderVariant;
use crate::errors::Result;

const INCLUDE: &str = "#include ";
const PRAGMA_ONCE: &str = "#pragma once";

/// Source-string number added per include level.
pub const FILE_ID_STEP: u32 = 10;

/// Guard macro for `path`: `X` followed by the path with every character
/// outside `[A-Za-z0-9_]` replaced by `_`.
#[must_use]
pub fn include_guard(path: &str) -> String {
    std::iter::once('X')
        .chain(path.chars().map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        }))
        .collect()
}

/// Loads `path` as the entry file (source-string 0) and resolves its includes.
pub async fn load_and_resolve(reader: &AssetReaderVariant, path: &str) -> Result<String> {
    let resolved = load_with_id(reader, path, 0).await?;
    log::debug!("Resolved shader {path}:\n{resolved}");
    Ok(resolved)
}

fn load_with_id<'a>(
    reader: &'a AssetReaderVariant,
    path: &'a str,
    file_id: u32,
) -> LocalBoxFuture<'a, Result<String>> {
    async move {
        let contents = reader.read_text(path).await?;
        resolve_includes(reader, path, &contents, file_id).await
    }
    .boxed_local()
}

/// Resolves the directives in already-loaded `contents`.
pub async fn resolve_includes(
    reader: &AssetReaderVariant,
    path: &str,
    contents: &str,
    file_id: u32,
) -> Result<String> {
    let mut lines: Vec<String> = contents
        .replace("\r\n", "\n")
        .split('\n')
        .map(str::to_owned)
        .collect();
    if !lines.first().is_some_and(|line| line.starts_with("#version")) {
        lines.insert(0, format!("#line 1 {file_id}"));
    }

    let mut guarded = false;
    for i in 0..lines.len() {
        if let Some(target) = lines[i].strip_prefix(INCLUDE) {
            let target = target.replace('"', "");
            let target = target.trim();
            let included = load_with_id(reader, target, file_id + FILE_ID_STEP).await?;
            // Line number of the next line, counting the guard's extra line.
            let next = i + if guarded { 3 } else { 2 };
            lines[i] = format!("{included}\n#line {next} {file_id}");
        } else if lines[i].contains(PRAGMA_ONCE) {
            lines[i].clear();
            guarded = true;
        }
    }

    let body = lines.join("\n");
    if guarded {
        let guard = include_guard(path);
        Ok(format!("#ifndef {guard}\n#define {guard}\n{body}\n#endif"))
    } else {
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::io::MemoryAssetReader;

    fn reader(entries: &[(&str, &str)]) -> AssetReaderVariant {
        let mut memory = MemoryAssetReader::new();
        for (uri, text) in entries {
            memory.insert(*uri, text.as_bytes());
        }
        AssetReaderVariant::memory(memory)
    }

    #[test]
    fn guard_sanitizes_path() {
        assert_eq!(include_guard("common/math.glsl"), "Xcommon_math_glsl");
    }

    #[test]
    fn version_line_stays_first() {
        let reader = reader(&[("a.frag", "#version 300 es\nvoid main() {}")]);
        let out = pollster::block_on(load_and_resolve(&reader, "a.frag")).unwrap();
        assert_eq!(out, "#version 300 es\nvoid main() {}");
    }

    #[test]
    fn include_is_inlined_with_line_directives() {
        let reader = reader(&[
            ("main.frag", "#version 300 es\n#include \"lib.glsl\"\nvoid main() {}"),
            ("lib.glsl", "float f() { return 1.0; }"),
        ]);
        let out = pollster::block_on(load_and_resolve(&reader, "main.frag")).unwrap();
        assert_eq!(
            out,
            "#version 300 es\n#line 1 10\nfloat f() { return 1.0; }\n#line 3 0\nvoid main() {}"
        );
    }

    #[test]
    fn pragma_once_wraps_in_guard() {
        let reader = reader(&[("lib.glsl", "#pragma once\nfloat g;")]);
        let out = pollster::block_on(load_and_resolve(&reader, "lib.glsl")).unwrap();
        assert_eq!(out, "#ifndef Xlib_glsl\n#define Xlib_glsl\n#line 1 0\n\nfloat g;\n#endif");
    }

    #[test]
    fn html_include_is_rejected() {
        let mut memory = MemoryAssetReader::new();
        memory.insert("main.frag", "#include \"missing.glsl\"".as_bytes());
        memory.insert_typed("missing.glsl", "<html></html>".as_bytes(), Some("text/html"));
        let reader = AssetReaderVariant::memory(memory);
        let err = pollster::block_on(load_and_resolve(&reader, "main.frag")).unwrap_err();
        assert!(matches!(err, crate::errors::UmbraError::HtmlInsteadOfAsset(_)));
    }
}
