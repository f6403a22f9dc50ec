//! PostgreSQL storage backend
//!
//! Each resource lives in its own table: metadata columns plus the business fields as one
//! JSONB document. Unique rules become partial expression indexes over active rows, so the
//! database rejects a duplicate key even when two writers pass the repository check at once.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;
use std::str::FromStr;

use super::{
    Criteria, FilterCondition, FilterOperator, Storage, StorageError, StorageErrorKind,
    StorageOperation, StorageResult, Visibility,
};
use crate::ids::EntityId;
use crate::repository::{
    FieldKind, OrderBy, Record, Resource, Schema, SortOrder, CREATED_AT_FIELD, ID_FIELD,
    UPDATED_AT_FIELD,
};

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*$").expect("table name regex is valid")
});

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name regex is valid")
});

const COLUMNS: &str = "id, data, created_at, updated_at, deleted_at";

/// PostgreSQL-backed [`Storage`] for one resource type
pub struct PgStorage<T> {
    pool: PgPool,
    _resource: PhantomData<fn() -> T>,
}

impl<T: Resource> PgStorage<T> {
    /// Create a backend over a caller-owned pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _resource: PhantomData,
        }
    }

    /// Create the resource table and one partial unique index per unique rule
    ///
    /// Should be called once during application startup. Rules using a custom transform have
    /// no SQL form and are enforced by the repository check only.
    pub async fn initialize(&self) -> StorageResult<()> {
        let schema = T::schema();
        let table = table_name(schema)?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                deleted_at TIMESTAMPTZ
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::from(e).during(StorageOperation::Initialize))?;

        for rule in &schema.unique {
            let mut columns = Vec::with_capacity(rule.fields.len());
            for field in &rule.fields {
                let column = json_field(field)?;
                match rule.transform {
                    None => columns.push(format!("({})", column)),
                    Some(transform) => match transform.sql_expression(&column) {
                        Some(expr) => columns.push(format!("({})", expr)),
                        None => break,
                    },
                }
            }
            if columns.len() != rule.fields.len() {
                tracing::warn!(
                    table,
                    fields = ?rule.fields,
                    "Unique rule has no SQL form; skipping index"
                );
                continue;
            }

            sqlx::query(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({}) WHERE deleted_at IS NULL",
                rule.constraint_name(table),
                table,
                columns.join(", ")
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::from(e).during(StorageOperation::Initialize))?;
        }

        tracing::info!(table, rules = schema.unique.len(), "Storage table ready");
        Ok(())
    }

    fn select(criteria: &Criteria) -> StorageResult<QueryBuilder<'static, Postgres>> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            COLUMNS,
            table_name(T::schema())?
        ));
        push_where(&mut qb, criteria)?;
        Ok(qb)
    }

    async fn count_matching(
        &self,
        criteria: &Criteria,
        operation: StorageOperation,
    ) -> StorageResult<u64> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {}",
            table_name(T::schema())?
        ));
        push_where(&mut qb, criteria)?;

        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::from(e).during(operation))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

impl<T: Resource> Storage<T> for PgStorage<T> {
    async fn create(&self, id: EntityId, data: T) -> StorageResult<Record<T>> {
        let op = StorageOperation::Create;
        let document = serde_json::to_value(&data).map_err(|e| StorageError::from(e).during(op))?;

        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "INSERT INTO {} (id, data, created_at, updated_at) VALUES ($1, $2, now(), now()) \
             RETURNING {}",
            table_name(T::schema())?,
            COLUMNS
        ))
        .bind(id.to_string())
        .bind(document)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::from(e).during(op))?;

        row.into_record(op)
    }

    async fn find_one(&self, criteria: &Criteria) -> StorageResult<Option<Record<T>>> {
        let op = StorageOperation::FindOne;
        let mut qb = Self::select(criteria)?;
        qb.push(" ORDER BY seq ASC LIMIT 1");

        let row = qb
            .build_query_as::<RecordRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::from(e).during(op))?;

        row.map(|r| r.into_record(op)).transpose()
    }

    async fn find_many(
        &self,
        criteria: &Criteria,
        order: &OrderBy,
        offset: u64,
        limit: Option<u64>,
    ) -> StorageResult<(Vec<Record<T>>, u64)> {
        let op = StorageOperation::FindMany;
        let total = self.count_matching(criteria, op).await?;

        let mut qb = Self::select(criteria)?;
        push_order(&mut qb, T::schema(), order)?;
        if let Some(limit) = limit {
            qb.push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        qb.push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<RecordRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::from(e).during(op))?;

        let records = rows
            .into_iter()
            .map(|r| r.into_record(op))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok((records, total))
    }

    async fn update(&self, id: &EntityId, data: T) -> StorageResult<bool> {
        let op = StorageOperation::Update;
        let document = serde_json::to_value(&data).map_err(|e| StorageError::from(e).during(op))?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET data = $1, updated_at = GREATEST(now(), updated_at) \
             WHERE id = $2 AND deleted_at IS NULL",
            table_name(T::schema())?
        ))
        .bind(document)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::from(e).during(op))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_deleted(&self, id: &EntityId, at: DateTime<Utc>) -> StorageResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
            table_name(T::schema())?
        ))
        .bind(at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::from(e).during(StorageOperation::MarkDeleted))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, criteria: &Criteria) -> StorageResult<u64> {
        self.count_matching(criteria, StorageOperation::Count).await
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    data: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl RecordRow {
    fn into_record<T: Resource>(self, operation: StorageOperation) -> StorageResult<Record<T>> {
        let id = EntityId::from_str(&self.id).map_err(|e| {
            StorageError::new(
                operation,
                StorageErrorKind::Serialization,
                format!("Stored id '{}' is malformed: {}", self.id, e),
            )
        })?;
        let data = serde_json::from_value(self.data)
            .map_err(|e| StorageError::from(e).during(operation))?;

        Ok(Record {
            id,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn table_name(schema: &Schema) -> StorageResult<&str> {
    if TABLE_NAME.is_match(&schema.table) {
        Ok(&schema.table)
    } else {
        Err(StorageError::query_failed(
            StorageOperation::Query,
            format!("Invalid table name '{}'", schema.table),
        ))
    }
}

fn json_field(field: &str) -> StorageResult<String> {
    if FIELD_NAME.is_match(field) {
        Ok(format!("data->>'{}'", field))
    } else {
        Err(StorageError::query_failed(
            StorageOperation::Query,
            format!("Invalid field name '{}'", field),
        ))
    }
}

fn condition_column(condition: &FilterCondition) -> StorageResult<String> {
    let column = if condition.field == ID_FIELD {
        "id".to_string()
    } else {
        json_field(&condition.field)?
    };
    match condition.transform {
        None => Ok(column),
        Some(transform) => transform.sql_expression(&column).ok_or_else(|| {
            StorageError::new(
                StorageOperation::Query,
                StorageErrorKind::Other,
                format!("Transform on '{}' has no SQL form", condition.field),
            )
        }),
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_condition(
    qb: &mut QueryBuilder<'_, Postgres>,
    condition: &FilterCondition,
) -> StorageResult<()> {
    let column = condition_column(condition)?;
    match condition.operator {
        FilterOperator::Equal => {
            qb.push(column)
                .push(" = ")
                .push_bind(condition.value.to_storage_text());
        }
        FilterOperator::NotEqual => {
            qb.push(column)
                .push(" IS DISTINCT FROM ")
                .push_bind(condition.value.to_storage_text());
        }
        FilterOperator::Contains => {
            let pattern = format!("%{}%", escape_like(&condition.value.to_storage_text()));
            qb.push(column)
                .push(" ILIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\'");
        }
    }
    Ok(())
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, criteria: &Criteria) -> StorageResult<()> {
    qb.push(" WHERE TRUE");
    if criteria.visibility == Visibility::Active {
        qb.push(" AND deleted_at IS NULL");
    }
    if let Some(id) = &criteria.id {
        qb.push(" AND id = ").push_bind(id.to_string());
    }
    if let Some(id) = &criteria.exclude_id {
        qb.push(" AND id <> ").push_bind(id.to_string());
    }
    for condition in &criteria.all {
        qb.push(" AND ");
        push_condition(qb, condition)?;
    }
    if !criteria.any.is_empty() {
        qb.push(" AND (");
        for (i, condition) in criteria.any.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_condition(qb, condition)?;
        }
        qb.push(")");
    }
    Ok(())
}

fn sort_column(schema: &Schema, field: &str) -> StorageResult<String> {
    Ok(match field {
        ID_FIELD => "id COLLATE \"C\"".to_string(),
        CREATED_AT_FIELD => "created_at".to_string(),
        UPDATED_AT_FIELD => "updated_at".to_string(),
        _ => {
            let column = json_field(field)?;
            match schema.field(field).map(|f| f.kind) {
                Some(FieldKind::Integer) => format!("({})::bigint", column),
                Some(FieldKind::Boolean) => format!("({})::boolean", column),
                _ => format!("({}) COLLATE \"C\"", column),
            }
        }
    })
}

fn push_order(
    qb: &mut QueryBuilder<'_, Postgres>,
    schema: &Schema,
    order: &OrderBy,
) -> StorageResult<()> {
    let column = sort_column(schema, &order.field)?;
    match order.order {
        SortOrder::Asc => qb.push(format!(" ORDER BY {} ASC NULLS FIRST, seq ASC", column)),
        SortOrder::Desc => qb.push(format!(" ORDER BY {} DESC NULLS LAST, seq DESC", column)),
    };
    Ok(())
}
