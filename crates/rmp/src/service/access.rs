use serde::Serialize;
use staffing::permission::{Actions, Module, PermissionMatrix, Role, Scope};
use staffing::{EmployeeId, UserId};

use crate::common::error::RmpError;
use crate::repo::project::Project;

/// Authenticated caller of an operation.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Option<UserId>,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
}

impl Principal {
    /// Used by the CLI and background jobs, which act with full rights.
    pub fn system() -> Self {
        Principal {
            user_id: None,
            username: "system".to_string(),
            role: Role::Admin,
            employee_id: None,
        }
    }
}

/// A principal together with the permission matrix in effect.
#[derive(Debug, Clone)]
pub struct Access {
    pub principal: Principal,
    pub matrix: PermissionMatrix,
}

impl Access {
    pub fn new(principal: Principal, matrix: PermissionMatrix) -> Self {
        Access { principal, matrix }
    }

    pub fn system() -> Self {
        Access::new(Principal::system(), PermissionMatrix::default())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn can(&self, module: Module, action: Actions) -> bool {
        self.matrix.allows(self.principal.role, module, action)
    }

    fn forbidden(&self, module: Module, action: Actions) -> RmpError {
        RmpError::Forbidden {
            role: self.principal.role,
            module,
            action: action.single_name(),
        }
    }

    pub fn require(&self, module: Module, action: Actions) -> crate::Result<Scope> {
        self.matrix
            .scope(self.principal.role, module, action)
            .ok_or_else(|| self.forbidden(module, action))
    }

    /// Requires the action on a record that belongs to `employee_id`.
    pub fn require_for_employee(
        &self,
        module: Module,
        action: Actions,
        employee_id: EmployeeId,
    ) -> crate::Result<()> {
        match self.require(module, action)? {
            Scope::Any => Ok(()),
            Scope::Own if self.principal.employee_id == Some(employee_id) => Ok(()),
            Scope::Own => Err(self.forbidden(module, action)),
        }
    }

    /// Requires the action on a record that belongs to `project`.
    pub fn require_for_project(
        &self,
        module: Module,
        action: Actions,
        project: &Project,
    ) -> crate::Result<()> {
        match self.require(module, action)? {
            Scope::Any => Ok(()),
            Scope::Own
                if project.manager_id.is_some()
                    && project.manager_id == self.principal.employee_id =>
            {
                Ok(())
            }
            Scope::Own => Err(self.forbidden(module, action)),
        }
    }

    /// The employee record linked to the caller, required for self-service.
    pub fn own_employee(&self) -> crate::Result<EmployeeId> {
        self.principal.employee_id.ok_or_else(|| {
            RmpError::validation(format!(
                "User `{}` is not linked to an employee",
                self.principal.username
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use staffing::permission::{Actions, Module, Role};

    use crate::tests::utils::{access_for, project_data, seed_staff, test_db};

    #[test]
    fn test_employee_can_edit_only_own_skills() {
        let access = access_for(Role::Employee, Some(1.into()));
        assert!(
            access
                .require_for_employee(Module::Skills, Actions::UPDATE, 1.into())
                .is_ok()
        );
        let error = access
            .require_for_employee(Module::Skills, Actions::UPDATE, 2.into())
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Role `employee` is not allowed to update skills"
        );
    }

    #[test]
    fn test_project_manager_scope() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, _) = seed_staff(conn)?;
            let mut data = project_data("PX", "2024-01-01", None);
            data.manager_id = Some(employees[1]);
            let id = crate::repo::project::insert(conn, &data, None)?;
            let project = crate::repo::project::get(conn, id)?;

            let manager = access_for(Role::ProjectManager, Some(employees[1]));
            assert!(
                manager
                    .require_for_project(Module::Allocations, Actions::CREATE, &project)
                    .is_ok()
            );
            let other = access_for(Role::ProjectManager, Some(employees[0]));
            assert!(
                other
                    .require_for_project(Module::Allocations, Actions::CREATE, &project)
                    .is_err()
            );
            Ok(())
        })
        .unwrap();
    }
}
