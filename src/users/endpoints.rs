use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::data::DBConnection;
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::*;
use super::session::AdminSession;

#[get("/get_users")]
pub fn get_users(
    _admin: AdminSession,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<Vec<UserSummary>>> {
    let db_connection = db_connection.lock()?;

    let users = get_users_from_db(&db_connection)?;

    Ok(Json(users.iter().map(UserSummary::from).collect()))
}

#[post("/add_user", format = "json", data = "<add_user_request>")]
pub fn add_user(
    admin: AdminSession,
    add_user_request: Json<AddUserRequest>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<AddUserResult>> {
    let db_connection = db_connection.lock()?;

    let result = add_user_to_db(&add_user_request.name, add_user_request.role, &db_connection)?;
    tracing::info!(by = %admin.0.user_id, user = %result.user.id, role = ?result.user.role, "user added");

    Ok(Json(result))
}

#[post("/set_user_role", format = "json", data = "<set_user_role_request>")]
pub fn update_user_role(
    admin: AdminSession,
    set_user_role_request: Json<SetUserRoleRequest>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<UserSummary>> {
    let db_connection = db_connection.lock()?;

    let user = set_user_role(&set_user_role_request.id, set_user_role_request.role, &db_connection)?;
    tracing::info!(by = %admin.0.user_id, user = %user.id, role = ?user.role, "user role changed");

    Ok(Json(user))
}

#[post("/delete_user", format = "json", data = "<delete_user_request>")]
pub fn delete_user(
    admin: AdminSession,
    delete_user_request: Json<DeleteUserRequest>,
    db_connection: &State<DBConnection>,
) -> InternalResult<()> {
    let db_connection = db_connection.lock()?;

    delete_user_from_db(&delete_user_request.id, &db_connection)?;
    tracing::info!(by = %admin.0.user_id, user = %delete_user_request.id, "user deleted");

    Ok(())
}
