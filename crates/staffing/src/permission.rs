//! Role based authorization.
//!
//! Every role has a set of allowed [`Actions`] per [`Module`]. The built-in
//! grants can be replaced per `(role, module)` cell by overrides, except for
//! [`Role::Admin`] which always holds every action.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::Serialize;

use crate::common::error::StaffingError;
use crate::named_enum;

named_enum!(Role, "role", {
    Admin => "admin",
    ResourceManager => "resource_manager",
    ProjectManager => "project_manager",
    Employee => "employee",
});

named_enum!(Module, "module", {
    Employees => "employees",
    Projects => "projects",
    Allocations => "allocations",
    Skills => "skills",
    Training => "training",
    Quizzes => "quizzes",
    Reports => "reports",
    Permissions => "permissions",
    Integrations => "integrations",
    Audit => "audit",
});

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Actions: u8 {
        const VIEW = 0b0001;
        const CREATE = 0b0010;
        const UPDATE = 0b0100;
        const DELETE = 0b1000;
    }
}

const ACTION_NAMES: [(Actions, &str); 4] = [
    (Actions::VIEW, "view"),
    (Actions::CREATE, "create"),
    (Actions::UPDATE, "update"),
    (Actions::DELETE, "delete"),
];

impl Actions {
    pub fn names(&self) -> Vec<&'static str> {
        ACTION_NAMES
            .iter()
            .filter(|(action, _)| self.contains(*action))
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, StaffingError> {
        names.iter().try_fold(Actions::empty(), |acc, name| {
            let name = name.as_ref();
            ACTION_NAMES
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(action, _)| acc | *action)
                .ok_or_else(|| StaffingError::UnknownName {
                    kind: "action",
                    value: name.to_string(),
                })
        })
    }

    pub fn single_name(&self) -> &'static str {
        self.names().first().copied().unwrap_or("none")
    }
}

/// Which records a granted action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    /// Only records owned by the caller: their own employee record for
    /// employees, projects they manage for project managers.
    Own,
}

fn default_actions(role: Role, module: Module) -> Actions {
    use Module::*;
    let all = Actions::all();
    let view = Actions::VIEW;
    match role {
        Role::Admin => all,
        Role::ResourceManager => match module {
            Employees | Projects | Allocations | Skills | Training | Quizzes => all,
            Reports | Permissions | Audit => view,
            Integrations => view | Actions::UPDATE,
        },
        Role::ProjectManager => match module {
            Employees | Skills | Training | Reports => view,
            Projects => view | Actions::UPDATE,
            Allocations => all,
            Quizzes => view | Actions::CREATE,
            Permissions | Integrations | Audit => Actions::empty(),
        },
        Role::Employee => match module {
            Employees | Projects | Allocations => view,
            Skills => all,
            Training => view | Actions::UPDATE,
            Quizzes => view | Actions::CREATE,
            Reports | Permissions | Integrations | Audit => Actions::empty(),
        },
    }
}

fn ownership_scope(role: Role, module: Module, action: Actions) -> Scope {
    if action == Actions::VIEW {
        return Scope::Any;
    }
    match (role, module) {
        (Role::Employee, Module::Skills | Module::Training | Module::Quizzes) => Scope::Own,
        (Role::ProjectManager, Module::Allocations | Module::Projects) => Scope::Own,
        (Role::ProjectManager, Module::Quizzes) if action == Actions::CREATE => Scope::Own,
        _ => Scope::Any,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionCell {
    pub role: Role,
    pub module: Module,
    pub actions: Vec<&'static str>,
    pub overridden: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionMatrix {
    overrides: BTreeMap<(Role, Module), Actions>,
}

impl PermissionMatrix {
    pub fn with_overrides<I: IntoIterator<Item = (Role, Module, Actions)>>(
        overrides: I,
    ) -> Result<Self, StaffingError> {
        let mut matrix = PermissionMatrix::default();
        for (role, module, actions) in overrides {
            matrix.set_override(role, module, actions)?;
        }
        Ok(matrix)
    }

    pub fn set_override(
        &mut self,
        role: Role,
        module: Module,
        actions: Actions,
    ) -> Result<(), StaffingError> {
        if role == Role::Admin {
            return Err(StaffingError::ImmutableRole);
        }
        self.overrides.insert((role, module), actions);
        Ok(())
    }

    pub fn clear_override(&mut self, role: Role, module: Module) -> bool {
        self.overrides.remove(&(role, module)).is_some()
    }

    pub fn actions(&self, role: Role, module: Module) -> Actions {
        self.overrides
            .get(&(role, module))
            .copied()
            .unwrap_or_else(|| default_actions(role, module))
    }

    pub fn allows(&self, role: Role, module: Module, action: Actions) -> bool {
        self.actions(role, module).contains(action)
    }

    /// Returns `None` when the action is not granted at all.
    pub fn scope(&self, role: Role, module: Module, action: Actions) -> Option<Scope> {
        self.allows(role, module, action)
            .then(|| ownership_scope(role, module, action))
    }

    pub fn cells(&self) -> Vec<PermissionCell> {
        let mut cells = Vec::with_capacity(Role::ALL.len() * Module::ALL.len());
        for role in Role::ALL {
            for module in Module::ALL {
                cells.push(PermissionCell {
                    role: *role,
                    module: *module,
                    actions: self.actions(*role, *module).names(),
                    overridden: self.overrides.contains_key(&(*role, *module)),
                });
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        let matrix = PermissionMatrix::default();
        for module in Module::ALL {
            assert_eq!(matrix.actions(Role::Admin, *module), Actions::all());
        }
    }

    #[test]
    fn test_admin_cannot_be_overridden() {
        let mut matrix = PermissionMatrix::default();
        assert_eq!(
            matrix.set_override(Role::Admin, Module::Reports, Actions::empty()),
            Err(StaffingError::ImmutableRole)
        );
    }

    #[test]
    fn test_employee_defaults() {
        let matrix = PermissionMatrix::default();
        assert!(matrix.allows(Role::Employee, Module::Projects, Actions::VIEW));
        assert!(!matrix.allows(Role::Employee, Module::Projects, Actions::UPDATE));
        assert!(!matrix.allows(Role::Employee, Module::Reports, Actions::VIEW));
        assert_eq!(
            matrix.scope(Role::Employee, Module::Skills, Actions::UPDATE),
            Some(Scope::Own)
        );
        assert_eq!(
            matrix.scope(Role::Employee, Module::Skills, Actions::VIEW),
            Some(Scope::Any)
        );
        assert_eq!(
            matrix.scope(Role::Employee, Module::Allocations, Actions::CREATE),
            None
        );
    }

    #[test]
    fn test_project_manager_scoped_to_own_projects() {
        let matrix = PermissionMatrix::default();
        assert_eq!(
            matrix.scope(Role::ProjectManager, Module::Allocations, Actions::CREATE),
            Some(Scope::Own)
        );
        assert_eq!(
            matrix.scope(Role::ResourceManager, Module::Allocations, Actions::CREATE),
            Some(Scope::Any)
        );
    }

    #[test]
    fn test_override_and_clear() {
        let mut matrix = PermissionMatrix::default();
        matrix
            .set_override(Role::Employee, Module::Reports, Actions::VIEW)
            .unwrap();
        assert!(matrix.allows(Role::Employee, Module::Reports, Actions::VIEW));
        assert!(matrix.cells().iter().any(|c| c.role == Role::Employee
            && c.module == Module::Reports
            && c.overridden));
        assert!(matrix.clear_override(Role::Employee, Module::Reports));
        assert!(!matrix.allows(Role::Employee, Module::Reports, Actions::VIEW));
        assert!(!matrix.clear_override(Role::Employee, Module::Reports));
    }

    #[test]
    fn test_action_names() {
        let actions = Actions::from_names(&["view", "delete"]).unwrap();
        assert_eq!(actions, Actions::VIEW | Actions::DELETE);
        assert_eq!(actions.names(), vec!["view", "delete"]);
        assert!(Actions::from_names(&["fly"]).is_err());
        assert_eq!(Actions::from_names::<&str>(&[]).unwrap(), Actions::empty());
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("resource_manager".parse::<Role>().unwrap(), Role::ResourceManager);
        assert_eq!("audit".parse::<Module>().unwrap(), Module::Audit);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Module::Integrations.to_string(), "integrations");
    }
}
