use anyhow::{Context, Result};
use billhub_models::Bill;
use sqlx::{query, query_as, PgPool};

pub struct BillRepository {
    pool: PgPool,
}

impl BillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, bill: &Bill) -> Result<()> {
        query(
            r#"
            INSERT INTO bills (id, linked_account_id, provider_id, amount, due_date, bill_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.linked_account_id)
        .bind(&bill.provider_id)
        .bind(bill.amount)
        .bind(bill.due_date)
        .bind(bill.bill_date)
        .bind(bill.status)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to create bill {}", bill.id))?;

        Ok(())
    }

    /// Update a bill in place. Only rows owned by the bill's account match.
    pub async fn update(&self, bill: &Bill) -> Result<bool> {
        let result = query(
            r#"
            UPDATE bills
            SET amount = $1, due_date = $2, bill_date = $3, status = $4, updated_at = CURRENT_TIMESTAMP
            WHERE id = $5 AND linked_account_id = $6 AND provider_id = $7
            "#,
        )
        .bind(bill.amount)
        .bind(bill.due_date)
        .bind(bill.bill_date)
        .bind(bill.status)
        .bind(&bill.id)
        .bind(&bill.linked_account_id)
        .bind(&bill.provider_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update bill {}", bill.id))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<Bill>> {
        let bills = query_as::<_, Bill>(
            r#"
            SELECT b.id, b.linked_account_id, b.provider_id, b.amount, b.due_date,
                   b.bill_date, b.status, b.created_at, b.updated_at
            FROM bills b
            JOIN linked_accounts la ON b.linked_account_id = la.id
            WHERE la.user_id = $1
            ORDER BY b.due_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to find bills by user")?;

        Ok(bills)
    }
}
