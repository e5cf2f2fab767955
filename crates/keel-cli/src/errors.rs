use colored::*;
use keel_syntax::{Diagnostic, DiagnosticError, LexError, ParseError, Span};
use std::fmt::Write;

/// A diagnostic prepared for terminal output, with source context and a hint.
pub struct Report<'a> {
    pub diagnostic: &'a Diagnostic,
    pub source: &'a str,
    pub help: Option<&'static str>,
}

impl<'a> Report<'a> {
    pub fn new(diagnostic: &'a Diagnostic, source: &'a str) -> Self {
        Self {
            diagnostic,
            source,
            help: help_for(&diagnostic.error),
        }
    }

    /// Render the report with colored output and two lines of context.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let span = self.diagnostic.span();

        let _ = writeln!(
            out,
            "{} {}",
            format!("{}:", self.diagnostic.label()).red().bold(),
            self.diagnostic.message().bold()
        );
        let _ = writeln!(
            out,
            "  {} {}:{}:{}",
            "-->".blue().bold(),
            self.diagnostic.file,
            span.line,
            span.col
        );

        let excerpt = self.excerpt(&span);
        if !excerpt.is_empty() {
            out.push('\n');
            out.push_str(&excerpt);
        }

        if let Some(help) = self.help {
            out.push('\n');
            let _ = writeln!(out, "{} {}", "help:".cyan().bold(), help);
        }

        out
    }

    fn excerpt(&self, span: &Span) -> String {
        let mut out = String::new();
        let lines: Vec<&str> = self.source.lines().collect();

        let line_idx = span.line.saturating_sub(1);
        if line_idx >= lines.len() {
            return out;
        }

        let max_line = (span.line + 2).min(lines.len());
        let width = max_line.to_string().len();

        let start = line_idx.saturating_sub(2);
        let end = (line_idx + 3).min(lines.len());

        for (i, line) in lines.iter().enumerate().take(end).skip(start) {
            let line_num = i + 1;

            if line_num == span.line {
                let _ = writeln!(
                    out,
                    "{:>width$} {} {}",
                    line_num.to_string().blue().bold(),
                    "|".blue().bold(),
                    line,
                    width = width
                );

                let spaces = " ".repeat(span.col.saturating_sub(1));
                let remaining = line.chars().count().saturating_sub(span.col.saturating_sub(1));
                let caret_len = span
                    .end
                    .saturating_sub(span.start)
                    .clamp(1, remaining.max(1));
                let _ = writeln!(
                    out,
                    "{:>width$} {} {}{}",
                    "",
                    "|".blue().bold(),
                    spaces,
                    "^".repeat(caret_len).red().bold(),
                    width = width
                );
            } else {
                let _ = writeln!(
                    out,
                    "{:>width$} {} {}",
                    line_num.to_string().dimmed(),
                    "|".blue().bold(),
                    line,
                    width = width
                );
            }
        }

        out
    }
}

fn help_for(error: &DiagnosticError) -> Option<&'static str> {
    match error {
        DiagnosticError::Lex(LexError::UnterminatedString { .. }) => {
            Some("close the string with a matching '\"'")
        }
        DiagnosticError::Lex(LexError::InvalidNumber { .. }) => {
            Some("integer literals must fit in a signed 64-bit value")
        }
        DiagnosticError::Lex(_) => None,
        DiagnosticError::Parse(ParseError::MissingNullability { .. }) => {
            Some("every field needs '!' (required) or '?' (optional) after its type")
        }
        DiagnosticError::Parse(ParseError::LowercaseResourceName { .. }) => {
            Some("resource names start with an uppercase letter; primitive types are lowercase keywords")
        }
        DiagnosticError::Parse(ParseError::EmptyEnum { .. }) => {
            Some("list at least one value, e.g. enum[\"draft\", \"published\"]")
        }
        DiagnosticError::Parse(ParseError::EmptyStruct { .. }) => {
            Some("inline structs need at least one field")
        }
        DiagnosticError::Parse(ParseError::InvalidConstraintArgument { .. }) => {
            Some("constraint arguments must be integer, float, string or boolean literals")
        }
        DiagnosticError::Parse(ParseError::UnknownMetadataKey { .. }) => {
            Some("relationship options are foreign_key, on_delete and on_update")
        }
        DiagnosticError::Parse(ParseError::NestingTooDeep { .. }) => {
            Some("raise max_depth in .keelrc if this nesting is intended")
        }
        DiagnosticError::Parse(ParseError::UnterminatedBody { .. }) => {
            Some("check that every '{' in the block has a matching '}'")
        }
        DiagnosticError::Parse(_) => None,
    }
}
