mod project;
mod records;
mod user;

pub use project::{
    project_list, AttendanceView, EmployeeView, LeaveView, PayrollView, Project, SalaryBreakdown,
};
pub use records::{Attendance, Employee, EmployeeRef, Leave, LeaveStatus, Payroll, Salary};
pub use user::PublicUser;
