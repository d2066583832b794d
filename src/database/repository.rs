use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Id-keyed reads and deletes for tables whose rows map onto `T`.
///
/// Owner-scoped variants exist because almost every protected endpoint must
/// treat "belongs to someone else" exactly like "does not exist".
pub struct Repository<T> {
    table_name: &'static str,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
{
    pub fn new(table_name: &'static str, pool: PgPool) -> Self {
        Self {
            table_name,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Row with `id` whose `owner_column` equals `owner_id`
    pub async fn select_owned(
        &self,
        id: Uuid,
        owner_column: &'static str,
        owner_id: Uuid,
    ) -> Result<Option<T>, DatabaseError> {
        let query = format!(
            "SELECT * FROM {} WHERE id = $1 AND {} = $2",
            self.table_name, owner_column
        );
        Ok(sqlx::query_as::<_, T>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Returns whether a row was removed
    pub async fn delete_owned(
        &self,
        id: Uuid,
        owner_column: &'static str,
        owner_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let query = format!(
            "DELETE FROM {} WHERE id = $1 AND {} = $2",
            self.table_name, owner_column
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
