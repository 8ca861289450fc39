use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?").unwrap());

/// Collapse whitespace and rewrite `?` placeholders into Postgres `$n` form.
pub fn sql(query: &str) -> String {
    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");
    let mut param_index = 0;
    PLACEHOLDER
        .replace_all(&cleaned, |_: &regex::Captures| {
            param_index += 1;
            format!("${}", param_index)
        })
        .into_owned()
}

/// Escape `%` and `_` and wrap the term for an ILIKE match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_rewrites_placeholders() {
        let query = sql(
            r#"
            SELECT id
            FROM workers
            WHERE company_id = ? AND status = ?
        "#,
        );
        assert_eq!(
            query,
            "SELECT id FROM workers WHERE company_id = $1 AND status = $2"
        );
    }

    #[test]
    fn test_sql_without_placeholders() {
        assert_eq!(sql("SELECT   1"), "SELECT 1");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }
}
