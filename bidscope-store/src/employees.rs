//! Employee roster.
//!
//! Employees and their shift windows are kept in one JSON array. Ids are
//! assigned by the store and never reused while a higher id exists.

use bidscope_core::Employee;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::StoreError;
use crate::persistence::{default_employees_path, load_json_or_default, save_json};

/// Persistent employee roster.
#[derive(Debug, Clone)]
pub struct EmployeeStore {
    employees: Arc<RwLock<Vec<Employee>>>,
    path: PathBuf,
}

impl EmployeeStore {
    /// Loads the roster at `path`; a missing file is an empty roster.
    pub async fn load(path: PathBuf) -> Self {
        let employees: Vec<Employee> = load_json_or_default(&path).await;
        Self {
            employees: Arc::new(RwLock::new(employees)),
            path,
        }
    }

    /// Loads the roster from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_employees_path()).await
    }

    /// Where the roster is saved.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All employees, ordered by id.
    pub async fn list(&self) -> Vec<Employee> {
        let mut employees = self.employees.read().await.clone();
        employees.sort_by_key(|e| e.id);
        employees
    }

    /// One employee.
    pub async fn get(&self, id: u64) -> Option<Employee> {
        self.employees
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Adds an employee under the next free id and saves.
    pub async fn add(&self, mut employee: Employee) -> Result<Employee, StoreError> {
        employee.validate()?;

        let mut employees = self.employees.write().await;
        employee.id = employees.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        employees.push(employee.clone());
        save_json(&self.path, &*employees).await?;

        info!(id = employee.id, name = %employee.name, "Added employee");
        Ok(employee)
    }

    /// Replaces the employee with the same id and saves.
    pub async fn update(&self, employee: Employee) -> Result<(), StoreError> {
        employee.validate()?;

        let mut employees = self.employees.write().await;
        let slot = employees
            .iter_mut()
            .find(|e| e.id == employee.id)
            .ok_or(StoreError::EmployeeNotFound(employee.id))?;
        *slot = employee;
        save_json(&self.path, &*employees).await
    }

    /// Removes an employee and saves.
    pub async fn remove(&self, id: u64) -> Result<Employee, StoreError> {
        let mut employees = self.employees.write().await;
        let index = employees
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::EmployeeNotFound(id))?;
        let removed = employees.remove(index);
        save_json(&self.path, &*employees).await?;

        info!(id, name = %removed.name, "Removed employee");
        Ok(removed)
    }
}
