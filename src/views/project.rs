use serde::Serialize;
use time::OffsetDateTime;
use tracing::trace;
use uuid::Uuid;

use super::records::{Attendance, Employee, EmployeeRef, Leave, LeaveStatus, Payroll, Salary};
use crate::authz::{policy, Principal};

/// Role-filtered output shape of a record.
pub trait Project {
    type View: Serialize;

    fn project(&self, principal: Option<&Principal>) -> Self::View;
}

/// Element-wise projection; absent input yields an empty list.
pub fn project_list<T: Project>(records: Option<&[T]>, principal: Option<&Principal>) -> Vec<T::View> {
    records
        .unwrap_or_default()
        .iter()
        .map(|r| r.project(principal))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    pub id: Uuid,
    pub user: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub joining_date: Option<OffsetDateTime>,
    pub documents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<Salary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Project for Employee {
    type View = EmployeeView;

    fn project(&self, principal: Option<&Principal>) -> EmployeeView {
        let salary = if policy::can_view_salary(principal, self) {
            self.salary.clone()
        } else {
            trace!(employee_id = %self.id, "salary withheld");
            None
        };
        EmployeeView {
            id: self.id,
            user: self.user,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            department: self.department.clone(),
            role: self.role.clone(),
            joining_date: self.joining_date,
            documents: self.documents.clone(),
            salary,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub id: Uuid,
    pub employee: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub clock_in: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub clock_out: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_details: Option<EmployeeRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn employee_details<R: crate::authz::Owned>(
    principal: Option<&Principal>,
    record: &R,
    employee: Option<&EmployeeRef>,
) -> Option<EmployeeRef> {
    if policy::can_view_employee_details(principal, record) {
        employee.cloned()
    } else {
        None
    }
}

impl Project for Attendance {
    type View = AttendanceView;

    fn project(&self, principal: Option<&Principal>) -> AttendanceView {
        AttendanceView {
            id: self.id,
            employee: self.employee.as_ref().map(|e| e.id),
            date: self.date,
            clock_in: self.clock_in,
            clock_out: self.clock_out,
            employee_details: employee_details(principal, self, self.employee.as_ref()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveView {
    pub id: Uuid,
    pub employee: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    pub reason: String,
    pub status: LeaveStatus,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_details: Option<EmployeeRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Project for Leave {
    type View = LeaveView;

    fn project(&self, principal: Option<&Principal>) -> LeaveView {
        // Only rejected leave carries a reason worth showing.
        let rejection_reason = match (&self.status, &self.rejection_reason) {
            (LeaveStatus::Rejected, Some(reason))
                if !reason.is_empty() && policy::can_view_rejection_reason(principal, self) =>
            {
                Some(reason.clone())
            }
            _ => None,
        };
        LeaveView {
            id: self.id,
            employee: self.employee.as_ref().map(|e| e.id),
            start_date: self.start_date,
            end_date: self.end_date,
            reason: self.reason.clone(),
            status: self.status,
            duration: self.duration_days(),
            rejection_reason,
            employee_details: employee_details(principal, self, self.employee.as_ref()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryBreakdown {
    pub basic: f64,
    pub allowance: f64,
    pub deductions: f64,
    pub tax: f64,
    pub net_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollView {
    pub id: Uuid,
    pub employee: Option<Uuid>,
    pub month: u8,
    pub year: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paid_on: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub salary: Option<SalaryBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payslip_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_details: Option<EmployeeRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Project for Payroll {
    type View = PayrollView;

    fn project(&self, principal: Option<&Principal>) -> PayrollView {
        let salary = policy::can_view_salary_details(principal, self).then(|| SalaryBreakdown {
            basic: self.basic,
            allowance: self.allowance,
            deductions: self.deductions,
            tax: self.tax,
            net_salary: self.net_salary,
        });
        let payslip_url = if policy::can_view_payslip(principal, self) {
            self.payslip_url.clone()
        } else {
            None
        };
        PayrollView {
            id: self.id,
            employee: self.employee.as_ref().map(|e| e.id),
            month: self.month,
            year: self.year,
            paid_on: self.paid_on,
            salary,
            payslip_url,
            employee_details: employee_details(principal, self, self.employee.as_ref()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
