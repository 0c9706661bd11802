//! Field-level visibility and route admission decisions.
//!
//! Every gated field follows the same table: privileged principals (admin
//! flag, `admin` or `hr` role) and managers see everything, other principals
//! only see records they own. Managers are not scoped to a department.

use uuid::Uuid;

use super::Principal;
use crate::users::Role;

/// Anything carrying an owning-employee reference.
pub trait Owned {
    fn owner_id(&self) -> Option<Uuid>;
}

/// Why a gated field was disclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Privileged,
    Manager,
    Owner,
}

/// The single decision behind every `can_view_*` predicate.
pub fn grant(principal: Option<&Principal>, owner: Option<Uuid>) -> Option<Grant> {
    let principal = principal?;
    if principal.is_admin || matches!(principal.role, Role::Admin | Role::Hr) {
        return Some(Grant::Privileged);
    }
    if principal.role == Role::Manager {
        return Some(Grant::Manager);
    }
    match owner {
        Some(owner) if owner == principal.id => Some(Grant::Owner),
        _ => None,
    }
}

fn visible<R: Owned + ?Sized>(principal: Option<&Principal>, record: &R) -> bool {
    grant(principal, record.owner_id()).is_some()
}

pub fn can_view_salary<R: Owned + ?Sized>(principal: Option<&Principal>, record: &R) -> bool {
    visible(principal, record)
}

pub fn can_view_employee_details<R: Owned + ?Sized>(
    principal: Option<&Principal>,
    record: &R,
) -> bool {
    visible(principal, record)
}

pub fn can_view_rejection_reason<R: Owned + ?Sized>(
    principal: Option<&Principal>,
    record: &R,
) -> bool {
    visible(principal, record)
}

pub fn can_view_salary_details<R: Owned + ?Sized>(
    principal: Option<&Principal>,
    record: &R,
) -> bool {
    visible(principal, record)
}

pub fn can_view_payslip<R: Owned + ?Sized>(principal: Option<&Principal>, record: &R) -> bool {
    visible(principal, record)
}

/// Admin-only routes check the role literally; the `is_admin` flag is not consulted.
pub fn require_admin(principal: Option<&Principal>) -> bool {
    principal.is_some_and(|p| p.role == Role::Admin)
}

pub fn permit(principal: Option<&Principal>, allowed: &[Role]) -> bool {
    principal.is_some_and(|p| allowed.contains(&p.role))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Record(Option<Uuid>);

    impl Owned for Record {
        fn owner_id(&self) -> Option<Uuid> {
            self.0
        }
    }

    type Predicate = fn(Option<&Principal>, &Record) -> bool;

    const PREDICATES: [(&str, Predicate); 5] = [
        ("salary", can_view_salary::<Record>),
        ("employee_details", can_view_employee_details::<Record>),
        ("rejection_reason", can_view_rejection_reason::<Record>),
        ("salary_details", can_view_salary_details::<Record>),
        ("payslip", can_view_payslip::<Record>),
    ];

    const ROLES: [Role; 4] = [Role::Admin, Role::Hr, Role::Manager, Role::User];

    #[test]
    fn absent_principal_sees_nothing() {
        let record = Record(Some(Uuid::new_v4()));
        for (name, pred) in PREDICATES {
            assert!(!pred(None, &record), "{name}");
        }
        assert!(!require_admin(None));
        assert!(!permit(None, &ROLES));
    }

    #[test]
    fn owner_sees_gated_fields_regardless_of_role() {
        for role in ROLES {
            let me = Principal::new(Uuid::new_v4(), role);
            let record = Record(Some(me.id));
            for (name, pred) in PREDICATES {
                assert!(pred(Some(&me), &record), "{name} for {role}");
            }
        }
    }

    #[test]
    fn admin_hr_and_admin_flag_see_everything() {
        let strangers = [Record(Some(Uuid::new_v4())), Record(None)];
        let principals = [
            Principal::new(Uuid::new_v4(), Role::Admin),
            Principal::new(Uuid::new_v4(), Role::Hr),
            Principal::new(Uuid::new_v4(), Role::User).with_admin_flag(true),
        ];
        for p in &principals {
            for record in &strangers {
                assert_eq!(grant(Some(p), record.0), Some(Grant::Privileged));
                for (name, pred) in PREDICATES {
                    assert!(pred(Some(p), record), "{name} for {p:?}");
                }
            }
        }
    }

    #[test]
    fn manager_is_not_department_scoped() {
        let manager = Principal::new(Uuid::new_v4(), Role::Manager);
        let record = Record(Some(Uuid::new_v4()));
        assert_eq!(grant(Some(&manager), record.0), Some(Grant::Manager));
        for (name, pred) in PREDICATES {
            assert!(pred(Some(&manager), &record), "{name}");
        }
    }

    #[test]
    fn plain_user_is_denied_foreign_and_unowned_records() {
        let user = Principal::new(Uuid::new_v4(), Role::User);
        for record in [Record(Some(Uuid::new_v4())), Record(None)] {
            assert_eq!(grant(Some(&user), record.0), None);
            for (name, pred) in PREDICATES {
                assert!(!pred(Some(&user), &record), "{name}");
            }
        }
    }

    #[test]
    fn require_admin_ignores_admin_flag() {
        let flagged = Principal::new(Uuid::new_v4(), Role::User).with_admin_flag(true);
        assert!(!require_admin(Some(&flagged)));
        assert!(require_admin(Some(&Principal::new(Uuid::new_v4(), Role::Admin))));
        assert!(!require_admin(Some(&Principal::new(Uuid::new_v4(), Role::Hr))));
    }

    #[test]
    fn permit_checks_set_membership() {
        let hr = Principal::new(Uuid::new_v4(), Role::Hr);
        assert!(permit(Some(&hr), &[Role::Admin, Role::Hr]));
        assert!(!permit(Some(&hr), &[Role::Admin, Role::User]));
        assert!(!permit(Some(&hr), &[]));
    }
}
