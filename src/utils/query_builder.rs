use sqlx::Sqlite;
use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    I64(i64),
    Text(String),
}

/// ===============================
/// WHERE clause collector
/// ===============================
/// Column names are always compile-time literals; only values are bound.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = ?` when the filter is present
    pub fn eq_i64(&mut self, column: &'static str, value: Option<i64>) -> &mut Self {
        if let Some(v) = value {
            self.conditions.push(format!("{column} = ?"));
            self.values.push(SqlValue::I64(v));
        }
        self
    }

    pub fn eq_text(&mut self, column: &'static str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.conditions.push(format!("{column} = ?"));
            self.values.push(SqlValue::Text(v.to_string()));
        }
        self
    }

    /// `(a LIKE ? ESCAPE '\' OR ...)` over every column, blank terms are ignored.
    /// Wildcards in the term match literally.
    pub fn search(&mut self, columns: &[&'static str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };

        let like = format!("%{}%", escape_like(term));
        let clause = columns
            .iter()
            .map(|c| format!("{c} LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({clause})"));
        self.values
            .extend(columns.iter().map(|_| SqlValue::Text(like.clone())));
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn bind_all<'q, O>(
        &self,
        mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
        for value in &self.values {
            query = match value {
                SqlValue::I64(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.clone()),
            };
        }
        query
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// skip/limit as the list endpoints accept them: skip >= 0, limit in 1..=1000
pub fn page_window(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let offset = skip.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(100).clamp(1, 1000);
    (limit, offset)
}
