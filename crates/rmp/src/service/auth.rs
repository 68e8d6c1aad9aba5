//! API tokens.
//!
//! A token is a random alphanumeric string handed to the user once. Only its
//! BLAKE2b digest is stored, so a leaked database does not leak credentials.

use rand::Rng;
use rand::distr::Alphanumeric;
use rusqlite::Connection;
use staffing::EmployeeId;
use staffing::permission::Role;

use crate::common::error::RmpError;
use crate::repo::{employee, user};
use crate::service::access::Principal;

const TOKEN_LENGTH: usize = 40;

pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn hash_token(token: &str) -> crate::Result<String> {
    let digest = orion::hash::digest(token.as_bytes())
        .map_err(|e| RmpError::GenericError(format!("Cannot hash token: {e}")))?;
    Ok(hex::encode(digest.as_ref()))
}

/// Creates a user and returns it together with its plain-text token.
pub fn create_user(
    conn: &Connection,
    username: &str,
    role: Role,
    employee_id: Option<EmployeeId>,
) -> crate::Result<(user::User, String)> {
    let username = username.trim();
    if username.is_empty() {
        return Err(RmpError::validation("Username cannot be empty"));
    }
    if let Some(employee_id) = employee_id {
        employee::get(conn, employee_id)?;
    }
    let token = generate_token();
    let id = user::insert(conn, username, role, employee_id, &hash_token(&token)?)?;
    log::info!("Created user `{username}` ({role}) with id {id}");
    let user = user::list(conn)?
        .into_iter()
        .find(|u| u.id == id)
        .ok_or_else(|| RmpError::not_found("User", id))?;
    Ok((user, token))
}

pub fn authenticate(conn: &Connection, token: &str) -> crate::Result<Principal> {
    let user = user::find_by_token_hash(conn, &hash_token(token)?)?
        .ok_or(RmpError::Unauthenticated)?;
    Ok(Principal {
        user_id: Some(user.id),
        username: user.username,
        role: user.role,
        employee_id: user.employee_id,
    })
}

#[cfg(test)]
mod tests {
    use staffing::permission::Role;

    use super::{authenticate, create_user, generate_token, hash_token};
    use crate::common::error::RmpError;
    use crate::tests::utils::test_db;

    #[test]
    fn test_tokens_are_random() {
        let a = generate_token();
        assert_eq!(a.len(), 40);
        assert_ne!(a, generate_token());
        assert_eq!(hash_token(&a).unwrap(), hash_token(&a).unwrap());
        assert_eq!(hash_token(&a).unwrap().len(), 64);
    }

    #[test]
    fn test_authenticate() {
        let db = test_db();
        db.with_conn(|conn| {
            let (user, token) = create_user(conn, "alice", Role::ResourceManager, None)?;
            assert_eq!(user.username, "alice");
            let principal = authenticate(conn, &token)?;
            assert_eq!(principal.role, Role::ResourceManager);
            assert_eq!(principal.user_id, Some(user.id));
            assert!(matches!(
                authenticate(conn, "wrong"),
                Err(RmpError::Unauthenticated)
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unknown_employee_link() {
        let db = test_db();
        let result = db.with_conn(|conn| create_user(conn, "bob", Role::Employee, Some(9.into())));
        assert!(matches!(result, Err(RmpError::NotFound { .. })));
    }
}
