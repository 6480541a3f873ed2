use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;

use crate::error::ClockError;
use crate::model::employee::Employee;
use crate::store::EmployeeDirectory;

/// Employee directory fronted by an in-memory TTL cache.
///
/// Only hits are cached; an unknown identifier always falls through to the
/// backing directory so newly entered staff show up immediately.
pub struct CachedDirectory {
    inner: Arc<dyn EmployeeDirectory>,
    cache: Cache<String, Employee>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn EmployeeDirectory>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(50_000) // tune based on head count
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    /// Batch insert employees into the cache
    async fn batch_insert(&self, employees: &[Employee]) {
        let futures: Vec<_> = employees
            .iter()
            .map(|e| self.cache.insert(e.identifier.clone(), e.clone()))
            .collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }

    /// Loads the whole directory into the cache in batches.
    pub async fn warmup(&self, batch_size: usize) -> Result<usize> {
        let employees = self.inner.all_employees().await?;
        for batch in employees.chunks(batch_size.max(1)) {
            self.batch_insert(batch).await;
        }

        tracing::info!(
            total = employees.len(),
            "Employee cache warmup complete"
        );
        Ok(employees.len())
    }
}

#[async_trait]
impl EmployeeDirectory for CachedDirectory {
    async fn find_employee(&self, identifier: &str) -> Result<Option<Employee>, ClockError> {
        if let Some(hit) = self.cache.get(identifier).await {
            return Ok(Some(hit));
        }

        let found = self.inner.find_employee(identifier).await?;
        if let Some(employee) = &found {
            self.cache
                .insert(employee.identifier.clone(), employee.clone())
                .await;
        }
        Ok(found)
    }

    async fn all_employees(&self) -> Result<Vec<Employee>, ClockError> {
        self.inner.all_employees().await
    }
}
