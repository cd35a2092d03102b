use serde::{Deserialize, Serialize};

pub type UserID = String;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserID,
    pub name: String,
    pub role: Role,
    pub token: String,
}

/// What the admin listing shows; tokens are only returned once, on creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserID,
    pub name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> UserSummary {
        UserSummary {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct AddUserRequest {
    pub name: String,
    pub role: Role,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AddUserResult {
    pub user: UserSummary,
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct SetUserRoleRequest {
    pub id: UserID,
    pub role: Role,
}

#[derive(Deserialize, Debug)]
pub struct DeleteUserRequest {
    pub id: UserID,
}
