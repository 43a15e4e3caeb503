//! # Report Repository
//!
//! Read-side projections over settlements and the visit log.
//!
//! Every report that sums the log prunes duplicate entries for its scope
//! first, so a retried visit is never counted twice.
//!
//! ```text
//! day_results ──────────► dedup(agent, zone, date) ─► log + aggregate ─► DayResults
//! day_movements ────────► dedup(agent, zone, date) ─► log + customers ─► by customer
//! monthly_summary ──────► settlements in [month start, next month) × prices
//! ```

use chrono::NaiveDate;
use reparto_core::report::{
    group_by_customer, CustomerDayMovements, DayResults, MonthlySummary, PriceList,
};
use reparto_core::settlement::SettlementKey;
use reparto_core::validation::month_range;
use reparto_core::Customer;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::price::PriceRepository;
use crate::repository::settlement::SettlementRepository;
use crate::repository::visit_log::{DedupScope, VisitLogRepository};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    fn visit_log(&self) -> VisitLogRepository {
        VisitLogRepository::new(self.pool.clone())
    }

    async fn dedup_day(&self, agent_code: i64, zone_code: i64, date: NaiveDate) -> DbResult<()> {
        self.visit_log()
            .dedup(Some(DedupScope {
                agent_code,
                zone_code,
                visit_date: date,
            }))
            .await?;
        Ok(())
    }

    /// The stored aggregate for (agent, date, zone) next to the totals of
    /// the de-duplicated log.
    pub async fn day_results(
        &self,
        agent_code: i64,
        zone_code: i64,
        date: NaiveDate,
    ) -> DbResult<DayResults> {
        debug!(agent_code, zone_code, %date, "Building day results");
        self.dedup_day(agent_code, zone_code, date).await?;

        let key = SettlementKey::new(agent_code, date, zone_code);
        let settlement = SettlementRepository::new(self.pool.clone()).get(&key).await?;
        let entries = self
            .visit_log()
            .entries_for_day(agent_code, zone_code, date)
            .await?;

        let results = DayResults::build(key, settlement, entries)?;
        Ok(results)
    }

    /// Customers of the zone (route order) that have log entries for the
    /// agent on `date`, each with those entries.
    pub async fn day_movements(
        &self,
        agent_code: i64,
        zone_code: i64,
        date: NaiveDate,
    ) -> DbResult<Vec<CustomerDayMovements>> {
        debug!(agent_code, zone_code, %date, "Building day movements");
        self.dedup_day(agent_code, zone_code, date).await?;

        let entries = self
            .visit_log()
            .entries_for_day(agent_code, zone_code, date)
            .await?;

        let customers = sqlx::query_as::<_, Customer>(
            "SELECT DISTINCT c.customer_code, c.name, c.address, c.locality, c.phone,
                    c.zone_code, c.route_sequence, c.visited, c.balance_a3, c.balance_a4
             FROM customers c
             JOIN visit_log l ON l.customer_code = c.customer_code
             WHERE l.agent_code = ?1 AND l.zone_code = ?2 AND l.visit_date = ?3
             ORDER BY c.route_sequence, c.customer_code",
        )
        .bind(agent_code)
        .bind(zone_code)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_by_customer(customers, entries))
    }

    /// Collections per (date, zone) for one agent's calendar month, priced.
    pub async fn monthly_summary(
        &self,
        agent_code: i64,
        year: i32,
        month: u32,
    ) -> DbResult<MonthlySummary> {
        let (start, end) = month_range(year, month)?;
        debug!(agent_code, year, month, "Building monthly summary");

        let settlements = SettlementRepository::new(self.pool.clone())
            .list_for_agent_between(agent_code, start, end)
            .await?;
        let prices = PriceList::new(PriceRepository::new(self.pool.clone()).list().await?);

        Ok(MonthlySummary::build(agent_code, year, month, &settlements, &prices)?)
    }
}
