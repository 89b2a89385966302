//! Splitting an artifact into executable statements.
//!
//! The text is tokenized with the DuckDB dialect so that semicolons inside
//! string literals, quoted identifiers and comments never end a statement.

use crate::error::{BackupError, BackupResult};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

/// Leading keywords of statements that open or close a transaction.
const TRANSACTION_KEYWORDS: &[&str] = &["BEGIN", "START", "COMMIT", "END", "ROLLBACK", "ABORT"];

/// One statement of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStatement {
    /// Statement text without the terminating `;` or comments
    pub sql: String,
    /// Opens or closes a transaction
    pub transaction_control: bool,
}

/// Split `script` into statements, dropping comments and empty statements.
pub fn split_statements(script: &str) -> BackupResult<Vec<ScriptStatement>> {
    let dialect = DuckDbDialect {};
    let tokens = Tokenizer::new(&dialect, script)
        .with_unescape(false)
        .tokenize()
        .map_err(|e| BackupError::Tokenize(e.to_string()))?;

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut leading: Option<String> = None;

    for token in tokens {
        match token {
            Token::SemiColon => finish(&mut statements, &mut current, leading.take()),
            Token::Whitespace(Whitespace::SingleLineComment { .. }) => current.push('\n'),
            Token::Whitespace(Whitespace::MultiLineComment(_)) => current.push(' '),
            Token::Whitespace(ws) => current.push_str(&ws.to_string()),
            other => {
                if leading.is_none() {
                    leading = Some(match &other {
                        Token::Word(word) if word.quote_style.is_none() => {
                            word.value.to_ascii_uppercase()
                        }
                        _ => String::new(),
                    });
                }
                current.push_str(&other.to_string());
            }
        }
    }
    finish(&mut statements, &mut current, leading.take());
    Ok(statements)
}

fn finish(statements: &mut Vec<ScriptStatement>, current: &mut String, leading: Option<String>) {
    let sql = current.trim();
    if !sql.is_empty() {
        let transaction_control = leading
            .as_deref()
            .is_some_and(|kw| TRANSACTION_KEYWORDS.contains(&kw));
        statements.push(ScriptStatement {
            sql: sql.to_string(),
            transaction_control,
        });
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_of(script: &str) -> Vec<String> {
        split_statements(script)
            .unwrap()
            .into_iter()
            .map(|s| s.sql)
            .collect()
    }

    #[test]
    fn test_splits_on_semicolons() {
        assert_eq!(
            sql_of("DELETE FROM t;\nINSERT INTO t VALUES (1);"),
            vec!["DELETE FROM t", "INSERT INTO t VALUES (1)"]
        );
    }

    #[test]
    fn test_semicolon_inside_string_literal() {
        let script = "INSERT INTO t VALUES ('a;b', '{\"k\":\"x;y\"}');\nSELECT 1;";
        assert_eq!(
            sql_of(script),
            vec![
                "INSERT INTO t VALUES ('a;b', '{\"k\":\"x;y\"}')",
                "SELECT 1"
            ]
        );
    }

    #[test]
    fn test_doubled_quotes_survive() {
        assert_eq!(
            sql_of("INSERT INTO t VALUES ('it''s; fine');"),
            vec!["INSERT INTO t VALUES ('it''s; fine')"]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        let script = "-- header; with a semicolon\nDELETE FROM t; /* a; b */\nSELECT 2;";
        assert_eq!(sql_of(script), vec!["DELETE FROM t", "SELECT 2"]);
    }

    #[test]
    fn test_comment_marker_inside_string_is_data() {
        assert_eq!(
            sql_of("INSERT INTO t VALUES ('-- not a comment');"),
            vec!["INSERT INTO t VALUES ('-- not a comment')"]
        );
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        assert_eq!(sql_of("SELECT 1;\nSELECT 2\n"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_empty_script() {
        assert!(sql_of("-- only a comment\n\n;;").is_empty());
    }

    #[test]
    fn test_transaction_control_detected() {
        let statements =
            split_statements("BEGIN TRANSACTION;\nDELETE FROM t;\ncommit;\nROLLBACK;").unwrap();
        let flags: Vec<_> = statements.iter().map(|s| s.transaction_control).collect();
        assert_eq!(flags, vec![true, false, true, true]);
    }

    #[test]
    fn test_quoted_begin_is_not_transaction_control() {
        let statements = split_statements("\"begin\";").unwrap();
        assert!(!statements[0].transaction_control);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let err = split_statements("INSERT INTO t VALUES ('oops);").unwrap_err();
        assert!(matches!(err, BackupError::Tokenize(_)));
    }
}
