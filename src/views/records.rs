use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::authz::Owned;

/// Populated employee reference carried by attendance, leave and payroll records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    pub base: f64,
    pub allowance: f64,
    pub deductions: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: Uuid,
    /// Account the employee profile belongs to.
    pub user: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    /// Job title, unrelated to the account role.
    pub role: String,
    pub joining_date: Option<OffsetDateTime>,
    pub documents: Vec<String>,
    pub salary: Option<Salary>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Owned for Employee {
    fn owner_id(&self) -> Option<Uuid> {
        self.user
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attendance {
    pub id: Uuid,
    pub employee: Option<EmployeeRef>,
    pub date: OffsetDateTime,
    pub clock_in: Option<OffsetDateTime>,
    pub clock_out: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Owned for Attendance {
    fn owner_id(&self) -> Option<Uuid> {
        self.employee.as_ref().map(|e| e.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leave {
    pub id: Uuid,
    pub employee: Option<EmployeeRef>,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub reason: String,
    pub status: LeaveStatus,
    pub rejection_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Owned for Leave {
    fn owner_id(&self) -> Option<Uuid> {
        self.employee.as_ref().map(|e| e.id)
    }
}

impl Leave {
    /// Inclusive day count; order of the two dates does not matter.
    pub fn duration_days(&self) -> i64 {
        const DAY_MS: i128 = 86_400_000;
        let ms = (self.end_date - self.start_date).whole_milliseconds().abs();
        let days = (ms + DAY_MS - 1) / DAY_MS;
        days as i64 + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payroll {
    pub id: Uuid,
    pub employee: Option<EmployeeRef>,
    pub month: u8,
    pub year: i32,
    pub basic: f64,
    pub allowance: f64,
    pub deductions: f64,
    pub tax: f64,
    pub net_salary: f64,
    pub payslip_url: Option<String>,
    pub paid_on: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Owned for Payroll {
    fn owner_id(&self) -> Option<Uuid> {
        self.employee.as_ref().map(|e| e.id)
    }
}
