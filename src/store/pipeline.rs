// src/store/pipeline.rs

//! Composable listing queries.
//!
//! A [`Pipeline`] is a source (table plus joins), predicate fragments with their
//! bound values, optional projected annotations and sort keys. The same stages
//! render both the count query and the page query, so the reported total and
//! the returned rows are always filtered identically.

use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, postgres::PgRow};
use uuid::Uuid;

use crate::models::pagination::PageRequest;

/// A value bound into a fragment.
#[derive(Debug, Clone)]
pub enum Value {
    Uuid(Uuid),
    Uuids(Vec<Uuid>),
    Text(String),
}

#[derive(Debug, Clone)]
enum Part {
    Sql(String),
    Bind(Value),
}

/// A piece of SQL interleaved with bound values.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    parts: Vec<Part>,
}

impl Fragment {
    pub fn sql(text: impl Into<String>) -> Self {
        Fragment::default().push(text)
    }

    pub fn push(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Sql(text.into()));
        self
    }

    pub fn bind(mut self, value: Value) -> Self {
        self.parts.push(Part::Bind(value));
        self
    }

    fn write_to(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        for part in &self.parts {
            match part {
                Part::Sql(text) => {
                    qb.push(text);
                }
                Part::Bind(Value::Uuid(id)) => {
                    qb.push_bind(*id);
                }
                Part::Bind(Value::Uuids(ids)) => {
                    qb.push_bind(ids.clone());
                }
                Part::Bind(Value::Text(text)) => {
                    qb.push_bind(text.clone());
                }
            }
        }
    }
}

/// Case-insensitive "any token is a substring" predicate over `column`.
/// `tokens` must already be lowercased. `None` when there is nothing to match.
pub fn name_search(column: &str, tokens: &[String]) -> Option<Fragment> {
    if tokens.is_empty() {
        return None;
    }
    let mut fragment = Fragment::sql("(");
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            fragment = fragment.push(" OR ");
        }
        fragment = fragment
            .push(format!("strpos(lower({}), ", column))
            .bind(Value::Text(token.clone()))
            .push(") > 0");
    }
    Some(fragment.push(")"))
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    source: &'static str,
    columns: &'static str,
    annotations: Vec<Fragment>,
    filters: Vec<Fragment>,
    sort: Vec<&'static str>,
}

impl Pipeline {
    pub fn from(source: &'static str, columns: &'static str) -> Self {
        Pipeline {
            source,
            columns,
            annotations: Vec::new(),
            filters: Vec::new(),
            sort: Vec::new(),
        }
    }

    /// Adds a computed column. Annotations are never evaluated by the count query.
    pub fn annotate(mut self, expr: Fragment) -> Self {
        self.annotations.push(expr);
        self
    }

    /// Adds a predicate; all predicates are AND-ed.
    pub fn filter(mut self, predicate: Fragment) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn filter_opt(self, predicate: Option<Fragment>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    pub fn sort_by(mut self, key: &'static str) -> Self {
        self.sort.push(key);
        self
    }

    fn write_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        for (i, predicate) in self.filters.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.write_to(qb);
        }
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(self.source);
        self.write_where(&mut qb);
        qb
    }

    pub fn page_query(&self, page: &PageRequest) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.columns);
        for annotation in &self.annotations {
            qb.push(", ");
            annotation.write_to(&mut qb);
        }
        qb.push(" FROM ");
        qb.push(self.source);
        self.write_where(&mut qb);
        if !self.sort.is_empty() {
            qb.push(" ORDER BY ");
            qb.push(self.sort.join(", "));
        }
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());
        qb
    }

    /// Count and page from one read-only snapshot.
    pub async fn fetch_page<T>(&self, pool: &PgPool, page: &PageRequest) -> Result<(Vec<T>, i64), sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let total: i64 = self
            .count_query()
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        let rows = if total > page.offset() {
            self.page_query(page)
                .build_query_as::<T>()
                .fetch_all(&mut *tx)
                .await?
        } else {
            Vec::new()
        };

        tx.commit().await?;
        Ok((rows, total))
    }
}
