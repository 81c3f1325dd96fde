use crate::error::{AmalgamError, Result};
use serde::Serialize;
use std::path::Path;

/// Include marker used by C and C++ sources
pub const DEFAULT_MARKER: &str = "#include";

/// How an include directive is treated during amalgamation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    /// Quoted path, part of the project and inlined
    Local,
    /// Anything else (`<stdio.h>`, macros...), left to the build environment
    External,
}

/// An include directive found on one line of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeReference {
    /// The directive line, without its terminator
    pub raw: String,
    /// The path token as written, delimiters included
    pub target: String,
    pub kind: IncludeKind,
    /// 1-based line number
    pub line: usize,
}

impl IncludeReference {
    /// Path of a local include with the quotes removed
    #[must_use]
    pub fn local_path(&self) -> Option<String> {
        match self.kind {
            IncludeKind::Local => Some(self.target.replace('"', "")),
            IncludeKind::External => None,
        }
    }
}

/// Classifies a path token.
///
/// Any token containing a double quote counts as local, even a malformed one
/// such as `<foo".h>`. Existing amalgamations depend on this rule.
#[must_use]
pub fn classify(target: &str) -> IncludeKind {
    if target.contains('"') {
        IncludeKind::Local
    } else {
        IncludeKind::External
    }
}

/// Parses one line of `file`.
///
/// Returns `Ok(None)` when the line does not start with `marker`. The path
/// token is the second whitespace-separated token of the line.
///
/// # Errors
///
/// `AmalgamError::MalformedDirective` if the line starts with the marker but
/// has no path token.
pub fn parse_directive(
    line: &str,
    line_number: usize,
    marker: &str,
    file: &Path,
) -> Result<Option<IncludeReference>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if !line.starts_with(marker) {
        return Ok(None);
    }

    let Some(target) = line.split_whitespace().nth(1) else {
        return Err(AmalgamError::MalformedDirective {
            file: file.to_path_buf(),
            line: line_number,
        });
    };

    Ok(Some(IncludeReference {
        raw: line.to_string(),
        target: target.to_string(),
        kind: classify(target),
        line: line_number,
    }))
}

/// Finds every include directive of a single file, in order, without
/// following local includes
///
/// # Errors
///
/// `AmalgamError::MalformedDirective` on the first directive without a path.
pub fn find_directives(text: &str, marker: &str, file: &Path) -> Result<Vec<IncludeReference>> {
    let mut directives = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if let Some(directive) = parse_directive(line, index + 1, marker, file)? {
            directives.push(directive);
        }
    }
    Ok(directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<IncludeReference>> {
        parse_directive(line, 1, DEFAULT_MARKER, Path::new("main.c"))
    }

    #[test]
    fn test_parse_local_directive() {
        let directive = parse("#include \"headers/interface.h\"\n").unwrap().unwrap();
        assert_eq!(directive.raw, "#include \"headers/interface.h\"");
        assert_eq!(directive.target, "\"headers/interface.h\"");
        assert_eq!(directive.kind, IncludeKind::Local);
        assert_eq!(directive.local_path().as_deref(), Some("headers/interface.h"));
    }

    #[test]
    fn test_parse_external_directive() {
        let directive = parse("#include <stdio.h>").unwrap().unwrap();
        assert_eq!(directive.kind, IncludeKind::External);
        assert_eq!(directive.target, "<stdio.h>");
        assert_eq!(directive.local_path(), None);

        // Macro includes are external too
        let directive = parse("#include CONFIG_HEADER").unwrap().unwrap();
        assert_eq!(directive.kind, IncludeKind::External);
    }

    #[test]
    fn test_parse_not_a_directive() {
        assert_eq!(parse("int x;").unwrap(), None);
        assert_eq!(parse("").unwrap(), None);
        // The marker has to open the line
        assert_eq!(parse("  #include \"a.h\"").unwrap(), None);
        assert_eq!(parse("// #include \"a.h\"").unwrap(), None);
    }

    #[test]
    fn test_parse_extra_whitespace() {
        let directive = parse("#include\t  \"a.h\"   // comment").unwrap().unwrap();
        assert_eq!(directive.target, "\"a.h\"");
        assert_eq!(directive.kind, IncludeKind::Local);

        let directive = parse("#include \"a.h\"\r\n").unwrap().unwrap();
        assert_eq!(directive.raw, "#include \"a.h\"");
        assert_eq!(directive.local_path().as_deref(), Some("a.h"));
    }

    #[test]
    fn test_parse_malformed_directive() {
        let result = parse_directive("#include", 12, DEFAULT_MARKER, Path::new("main.c"));
        assert!(matches!(
            result,
            Err(AmalgamError::MalformedDirective { line: 12, .. })
        ));

        let result = parse("#include   \n");
        assert!(matches!(result, Err(AmalgamError::MalformedDirective { .. })));

        // Glued to the marker, the path is the first token
        let result = parse("#include\"a.h\"");
        assert!(matches!(result, Err(AmalgamError::MalformedDirective { .. })));
    }

    #[test]
    fn test_quote_anywhere_is_local() {
        assert_eq!(classify("\"a.h\""), IncludeKind::Local);
        assert_eq!(classify("<odd\".h>"), IncludeKind::Local);
        assert_eq!(classify("<a.h>"), IncludeKind::External);
    }

    #[test]
    fn test_custom_marker() {
        let directive = parse_directive("%include \"lib.asm\"", 3, "%include", Path::new("x"))
            .unwrap()
            .unwrap();
        assert_eq!(directive.line, 3);
        assert_eq!(directive.kind, IncludeKind::Local);

        assert_eq!(parse("%include \"lib.asm\"").unwrap(), None);
    }

    #[test]
    fn test_find_directives() {
        let text = "#include <stdio.h>\nint x;\n#include \"a.h\"\n\n#include \"b/c.h\"\n";
        let directives = find_directives(text, DEFAULT_MARKER, Path::new("main.c")).unwrap();
        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0].line, 1);
        assert_eq!(directives[0].kind, IncludeKind::External);
        assert_eq!(directives[1].line, 3);
        assert_eq!(directives[2].line, 5);
        assert_eq!(directives[2].local_path().as_deref(), Some("b/c.h"));

        assert!(
            find_directives("", DEFAULT_MARKER, Path::new("main.c"))
                .unwrap()
                .is_empty()
        );

        let result = find_directives("int x;\n#include\n", DEFAULT_MARKER, Path::new("main.c"));
        assert!(matches!(
            result,
            Err(AmalgamError::MalformedDirective { line: 2, .. })
        ));
    }
}
