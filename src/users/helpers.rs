use rusqlite::Connection;

use crate::internal_error::{InternalError, InternalResult};
use crate::store::{delete_document, get_document, list_documents, set_document, Document, USERS};
use crate::todo::data::new_id;

use super::data::*;

pub fn get_users_from_db(db_connection: &Connection) -> InternalResult<Vec<User>> {
    list_documents(USERS, "name", db_connection)?
        .iter()
        .map(Document::decode)
        .collect()
}

pub fn find_user_by_token(token: &str, db_connection: &Connection) -> InternalResult<Option<User>> {
    Ok(get_users_from_db(db_connection)?
        .into_iter()
        .find(|user| user.token == token))
}

pub fn add_user_to_db(
    name: &str,
    role: Role,
    db_connection: &Connection,
) -> InternalResult<AddUserResult> {
    if get_users_from_db(db_connection)?
        .iter()
        .any(|user| user.name == name)
    {
        return Err(InternalError::DuplicateUser(name.to_string()));
    }

    let user = User {
        id: new_id(),
        name: name.to_string(),
        role,
        token: new_id(),
    };
    set_document(USERS, &user.id, &user, db_connection)?;

    Ok(AddUserResult {
        user: UserSummary::from(&user),
        token: user.token,
    })
}

pub fn set_user_role(id: &str, role: Role, db_connection: &Connection) -> InternalResult<UserSummary> {
    let mut user: User = match get_document(USERS, id, db_connection)? {
        Some(document) => document.decode()?,
        None => return Err(InternalError::UnknownUser(id.to_string())),
    };

    user.role = role;
    set_document(USERS, id, &user, db_connection)?;

    Ok(UserSummary::from(&user))
}

pub fn delete_user_from_db(id: &str, db_connection: &Connection) -> InternalResult<()> {
    if delete_document(USERS, id, db_connection)? {
        Ok(())
    } else {
        Err(InternalError::UnknownUser(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_connection;

    #[test]
    fn users_are_found_by_token() {
        let connection = memory_connection();
        let added = add_user_to_db("sam", Role::User, &connection).unwrap();

        let found = find_user_by_token(&added.token, &connection).unwrap().unwrap();
        assert_eq!(found.name, "sam");
        assert_eq!(find_user_by_token("nope", &connection).unwrap(), None);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let connection = memory_connection();
        add_user_to_db("sam", Role::User, &connection).unwrap();

        assert!(matches!(
            add_user_to_db("sam", Role::Admin, &connection),
            Err(InternalError::DuplicateUser(_))
        ));
    }

    #[test]
    fn roles_change_and_users_go() {
        let connection = memory_connection();
        let added = add_user_to_db("sam", Role::User, &connection).unwrap();

        let updated = set_user_role(&added.user.id, Role::Admin, &connection).unwrap();
        assert_eq!(updated.role, Role::Admin);

        delete_user_from_db(&added.user.id, &connection).unwrap();
        assert!(matches!(
            delete_user_from_db(&added.user.id, &connection),
            Err(InternalError::UnknownUser(_))
        ));
        assert!(matches!(
            set_user_role(&added.user.id, Role::User, &connection),
            Err(InternalError::UnknownUser(_))
        ));
    }
}
