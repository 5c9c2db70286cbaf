//! Classification of toolchain output lines into errors and warnings.

pub const MAX_ERRORS: usize = 10;
pub const MAX_WARNINGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Decides whether a single line of toolchain output is a diagnostic.
pub trait DiagnosticParser: Send + Sync {
    fn classify(&self, line: &str) -> Option<Severity>;
}

/// TeX conventions: errors start with `!`, warnings mention `Warning`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TexLogParser;

impl DiagnosticParser for TexLogParser {
    fn classify(&self, line: &str) -> Option<Severity> {
        if line.starts_with('!') {
            Some(Severity::Error)
        } else if line.contains("Warning") {
            Some(Severity::Warning)
        } else {
            None
        }
    }
}

/// Diagnostics gathered across passes, in first-seen order. A line repeated by
/// a later pass is kept once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn scan(&mut self, parser: &dyn DiagnosticParser, output: &str) {
        for line in output.lines() {
            let line = line.trim_end();
            let bucket = match parser.classify(line) {
                Some(Severity::Error) => &mut self.errors,
                Some(Severity::Warning) => &mut self.warnings,
                None => continue,
            };
            if !bucket.iter().any(|seen| seen == line) {
                bucket.push(line.to_string());
            }
        }
    }

    pub fn capped_errors(&self) -> Vec<String> {
        self.errors.iter().take(MAX_ERRORS).cloned().collect()
    }

    pub fn capped_warnings(&self) -> Vec<String> {
        self.warnings.iter().take(MAX_WARNINGS).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
This is pdfTeX, Version 3.141592653
(./resume.tex
LaTeX Warning: Reference `sec:intro' on page 1 undefined on input line 12.
! Undefined control sequence.
l.14 \\foo
Package hyperref Warning: Token not allowed in a PDF string.
";

    #[test]
    fn test_tex_log_parser_classifies_lines() {
        let parser = TexLogParser;
        assert_eq!(
            parser.classify("! Missing $ inserted."),
            Some(Severity::Error)
        );
        assert_eq!(
            parser.classify("LaTeX Warning: Label(s) may have changed."),
            Some(Severity::Warning)
        );
        assert_eq!(parser.classify("l.14 \\foo"), None);
        // Errors must start the line.
        assert_eq!(parser.classify(" ! indented"), None);
    }

    #[test]
    fn test_scan_collects_in_order() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.scan(&TexLogParser, LOG);

        assert_eq!(diagnostics.errors, vec!["! Undefined control sequence."]);
        assert_eq!(diagnostics.warnings.len(), 2);
        assert!(diagnostics.warnings[0].starts_with("LaTeX Warning: Ref"));
        assert!(diagnostics.warnings[1].starts_with("Package hyperref"));
    }

    #[test]
    fn test_second_pass_does_not_duplicate() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.scan(&TexLogParser, LOG);
        diagnostics.scan(&TexLogParser, LOG);
        assert_eq!(diagnostics.errors.len(), 1);
        assert_eq!(diagnostics.warnings.len(), 2);
    }

    #[test]
    fn test_caps() {
        let mut diagnostics = Diagnostics::default();
        let output: String = (0..20)
            .map(|i| format!("! error {i}\nWarning {i}\n"))
            .collect();
        diagnostics.scan(&TexLogParser, &output);

        let errors = diagnostics.capped_errors();
        assert_eq!(errors.len(), MAX_ERRORS);
        assert_eq!(errors[0], "! error 0");
        assert_eq!(diagnostics.capped_warnings().len(), MAX_WARNINGS);
    }

    struct Shouty;

    impl DiagnosticParser for Shouty {
        fn classify(&self, line: &str) -> Option<Severity> {
            line.starts_with("ERROR").then_some(Severity::Error)
        }
    }

    #[test]
    fn test_custom_parser() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.scan(&Shouty, "ERROR: boom\n! not an error here\n");
        assert_eq!(diagnostics.errors, vec!["ERROR: boom"]);
        assert!(diagnostics.warnings.is_empty());
    }
}
