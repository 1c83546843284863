//! Company directory
//!
//! Read access to companies and their portal branding in the primary data
//! store. Company rows change rarely, so lookups go through a TTL cache.

use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

use mrm_common::db::{BrandingUpdate, Company, CompanyBranding};
use mrm_common::{Clock, Error, Result, TtlCache};

pub struct CompanyDirectory {
    db: SqlitePool,
    companies: TtlCache<String, Company>,
}

impl CompanyDirectory {
    pub fn new(db: SqlitePool, cache_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            companies: TtlCache::new(cache_ttl, clock),
        }
    }

    pub async fn company(&self, company_id: &str) -> Result<Option<Company>> {
        if let Some(company) = self.companies.get(&company_id.to_string()) {
            return Ok(Some(company));
        }

        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, representative_user_id FROM companies WHERE id = ?",
        )
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?;

        match &company {
            Some(found) => {
                debug!(company_id, "Company loaded from database");
                self.companies.insert(found.id.clone(), found.clone());
            }
            None => debug!(company_id, "Company not found"),
        }

        Ok(company)
    }

    pub async fn branding(&self, company_id: &str) -> Result<Option<CompanyBranding>> {
        let branding = sqlx::query_as::<_, CompanyBranding>(
            "SELECT company_id, display_name, primary_color, logo_url FROM company_branding WHERE company_id = ?",
        )
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(branding)
    }

    /// Apply a partial branding update, creating the row on first write
    pub async fn update_branding(
        &self,
        company_id: &str,
        update: &BrandingUpdate,
    ) -> Result<CompanyBranding> {
        if update.is_empty() {
            return Err(Error::InvalidInput("branding update has no fields".to_string()));
        }

        let company = self
            .company(company_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("company {}", company_id)))?;

        sqlx::query(
            r#"
            INSERT INTO company_branding (company_id, display_name, primary_color, logo_url)
            VALUES (?1, COALESCE(?2, ?5), COALESCE(?3, '#1f2937'), ?4)
            ON CONFLICT(company_id) DO UPDATE SET
                display_name = COALESCE(?2, display_name),
                primary_color = COALESCE(?3, primary_color),
                logo_url = COALESCE(?4, logo_url),
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(company_id)
        .bind(&update.display_name)
        .bind(&update.primary_color)
        .bind(&update.logo_url)
        .bind(&company.name)
        .execute(&self.db)
        .await?;

        info!(company_id, "Branding updated");

        self.branding(company_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("branding for {} missing after write", company_id)))
    }

    /// Add or replace a company row
    ///
    /// Companies are owned by the primary data store; this is used for
    /// seeding and keeps the cache coherent.
    pub async fn upsert_company(&self, company: &Company) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO companies (id, name, representative_user_id) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                representative_user_id = excluded.representative_user_id
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(&company.representative_user_id)
        .execute(&self.db)
        .await?;

        self.companies.remove(&company.id);
        Ok(())
    }
}
