use chrono::NaiveDateTime;
use diesel::{dsl::auto_type, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    schema::{group_members, groups, users},
    user::{User, UserView},
};

#[derive(Debug, Queryable, Serialize, Clone, Hash, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
}

impl Group {
    pub fn validate_name(name: &str) -> bool {
        !name.trim().is_empty() && name.chars().count() <= 100
    }
}

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRole {
    Owner,
    Admin,
    Member,
}

impl GroupRole {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupRole::Owner => "OWNER",
            GroupRole::Admin => "ADMIN",
            GroupRole::Member => "MEMBER",
        }
    }
}

impl GroupMember {
    /// Whether this membership row grants group-management rights.
    pub fn can_manage(&self) -> bool {
        self.role == GroupRole::Owner.as_str()
            || self.role == GroupRole::Admin.as_str()
    }

    #[auto_type(no_type_alias)]
    pub fn of_user_in_group(user_id: i64, group_id: i64) -> _ {
        group_members::user_id
            .eq(user_id)
            .and(group_members::group_id.eq(group_id))
    }
}

#[derive(Debug, Serialize)]
pub struct GroupMemberSerializer {
    pub user: UserView,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct GroupSerializer {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub members: Vec<GroupMemberSerializer>,
    pub created_at: NaiveDateTime,
}

impl GroupSerializer {
    pub fn from_db_ty(
        group: Group,
        conn: &mut SqliteConnection,
    ) -> QueryResult<GroupSerializer> {
        let owner_public_id = users::table
            .filter(users::id.eq(group.owner_id))
            .select(users::public_id)
            .get_result::<String>(conn)?;

        let members = group_members::table
            .filter(group_members::group_id.eq(group.id))
            .inner_join(users::table)
            .order_by(group_members::created_at.asc())
            .load::<(GroupMember, User)>(conn)?
            .into_iter()
            .map(|(member, user)| GroupMemberSerializer {
                user: UserView::from_db_ty(user),
                role: member.role,
                created_at: member.created_at,
            })
            .collect();

        Ok(GroupSerializer {
            id: group.public_id,
            name: group.name,
            owner_id: owner_public_id,
            members,
            created_at: group.created_at,
        })
    }
}
