use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cars::repo_types::{Car, CarPatch, NewCar};
use crate::error::RepoError;

/// Raw car persistence. Ownership rules live in `cars::services`, not here.
#[async_trait]
pub trait CarStore: Send + Sync {
    async fn insert(&self, car: NewCar) -> Result<Car, RepoError>;
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Car>, RepoError>;
    /// Case-insensitive substring match on company, model, description and
    /// tags, across every owner.
    async fn search(&self, keyword: &str) -> Result<Vec<Car>, RepoError>;
    async fn get(&self, id: Uuid) -> Result<Option<Car>, RepoError>;
    /// `None` when no car has this id.
    async fn update(&self, id: Uuid, patch: CarPatch) -> Result<Option<Car>, RepoError>;
    /// `false` when no car has this id.
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[derive(Clone)]
pub struct PgCarStore {
    db: PgPool,
}

impl PgCarStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// `%keyword%` with LIKE wildcards in the keyword taken literally.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len() + 2);
    out.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl CarStore for PgCarStore {
    async fn insert(&self, car: NewCar) -> Result<Car, RepoError> {
        let row = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (id, user_id, company, model, description, images, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, company, model, description, images, tags, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(car.user_id)
        .bind(&car.company)
        .bind(&car.model)
        .bind(&car.description)
        .bind(&car.images)
        .bind(&car.tags)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Car>, RepoError> {
        let rows = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, user_id, company, model, description, images, tags, created_at
            FROM cars
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Car>, RepoError> {
        let rows = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, user_id, company, model, description, images, tags, created_at
            FROM cars
            WHERE company ILIKE $1
               OR model ILIKE $1
               OR description ILIKE $1
               OR EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE t.tag ILIKE $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(like_pattern(keyword))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Car>, RepoError> {
        let row = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, user_id, company, model, description, images, tags, created_at
            FROM cars
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: CarPatch) -> Result<Option<Car>, RepoError> {
        let row = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars
               SET company     = COALESCE($2, company),
                   model       = COALESCE($3, model),
                   description = CASE WHEN $4::text IS NULL THEN description
                                      ELSE NULLIF($4, '') END,
                   images      = COALESCE($5, images),
                   tags        = COALESCE($6, tags)
             WHERE id = $1
            RETURNING id, user_id, company, model, description, images, tags, created_at
            "#,
        )
        .bind(id)
        .bind(&patch.company)
        .bind(&patch.model)
        .bind(&patch.description)
        .bind(&patch.images)
        .bind(&patch.tags)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("suv"), "%suv%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
