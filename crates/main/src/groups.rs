use db::{
    group::{Group, GroupMember, GroupMemberSerializer, GroupRole, GroupSerializer},
    schema::{group_members, groups, invites, meetings, users},
    user::{User, UserView},
    DbConn,
};
use diesel::{insert_into, prelude::*};
use rocket::{http::Status, serde::json::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;

fn group_by_public_id(
    public_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Group, ApiError> {
    groups::table
        .filter(groups::public_id.eq(public_id))
        .first::<Group>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))
}

fn membership_of(
    group: &Group,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> QueryResult<Option<GroupMember>> {
    group_members::table
        .filter(GroupMember::of_user_in_group(user_id, group.id))
        .first::<GroupMember>(conn)
        .optional()
}

fn user_by_public_id(
    public_id: &str,
    conn: &mut SqliteConnection,
) -> QueryResult<Option<User>> {
    users::table
        .filter(users::public_id.eq(public_id))
        .first::<User>(conn)
        .optional()
}

#[get("/groups")]
pub async fn list_groups(
    user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let member_group_ids = group_members::table
            .filter(group_members::user_id.eq(user.id))
            .select(group_members::group_id);

        let listed = groups::table
            .filter(groups::id.eq_any(member_group_ids))
            .order_by(groups::created_at.desc())
            .load::<Group>(conn)?
            .into_iter()
            .map(|group| GroupSerializer::from_db_ty(group, conn))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Json(json!({ "groups": listed })))
    })
    .await
}

#[get("/groups/<group_id>")]
pub async fn get_group(
    group_id: String,
    user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let group = group_by_public_id(&group_id, conn)?;
        if membership_of(&group, user.id, conn)?.is_none() {
            return Err(ApiError::Forbidden(
                "You are not a member of this group".to_string(),
            ));
        }
        let serialized = GroupSerializer::from_db_ty(group, conn)?;
        Ok(Json(json!({ "group": serialized })))
    })
    .await
}

#[derive(Deserialize)]
pub struct CreateGroupPayload {
    pub name: String,
}

#[post("/groups", data = "<payload>", format = "json")]
pub async fn create_group(
    user: User,
    payload: Json<CreateGroupPayload>,
    db: DbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let payload = payload.into_inner();
    if !Group::validate_name(&payload.name) {
        return Err(ApiError::Validation(
            "Name must be between 1 and 100 characters".to_string(),
        ));
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let group = insert_into(groups::table)
                .values((
                    groups::public_id.eq(Uuid::now_v7().to_string()),
                    groups::name.eq(payload.name.trim()),
                    groups::owner_id.eq(user.id),
                    groups::created_at.eq(diesel::dsl::now),
                ))
                .get_result::<Group>(conn)?;

            // The creator is the one and only OWNER, from day one.
            insert_into(group_members::table)
                .values((
                    group_members::group_id.eq(group.id),
                    group_members::user_id.eq(user.id),
                    group_members::role.eq(GroupRole::Owner.as_str()),
                    group_members::created_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

            let serialized = GroupSerializer::from_db_ty(group, conn)?;
            Ok((Status::Created, Json(json!({ "group": serialized }))))
        })
    })
    .await
}

#[derive(Deserialize)]
pub struct UpdateGroupPayload {
    pub name: Option<String>,
}

#[put("/groups/<group_id>", data = "<payload>", format = "json")]
pub async fn update_group(
    group_id: String,
    user: User,
    payload: Json<UpdateGroupPayload>,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    let payload = payload.into_inner();
    let name = payload.name.ok_or_else(|| {
        ApiError::Validation("At least one field must be provided".to_string())
    })?;
    if !Group::validate_name(&name) {
        return Err(ApiError::Validation(
            "Name must be between 1 and 100 characters".to_string(),
        ));
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let group = group_by_public_id(&group_id, conn)?;

            let may_update = membership_of(&group, user.id, conn)?
                .map(|membership| membership.can_manage())
                .unwrap_or(false);
            if !may_update {
                return Err(ApiError::Forbidden(
                    "Only group admins can update the group".to_string(),
                ));
            }

            let updated =
                diesel::update(groups::table.filter(groups::id.eq(group.id)))
                    .set(groups::name.eq(name.trim()))
                    .get_result::<Group>(conn)?;

            let serialized = GroupSerializer::from_db_ty(updated, conn)?;
            Ok(Json(json!({ "group": serialized })))
        })
    })
    .await
}

#[delete("/groups/<group_id>")]
pub async fn delete_group(
    group_id: String,
    user: User,
    db: DbConn,
) -> Result<Status, ApiError> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let group = group_by_public_id(&group_id, conn)?;
            if group.owner_id != user.id {
                return Err(ApiError::Forbidden(
                    "Only the group owner can delete the group".to_string(),
                ));
            }

            diesel::delete(
                group_members::table
                    .filter(group_members::group_id.eq(group.id)),
            )
            .execute(conn)?;
            diesel::update(
                meetings::table.filter(meetings::group_id.eq(group.id)),
            )
            .set(meetings::group_id.eq(None::<i64>))
            .execute(conn)?;
            diesel::update(
                invites::table.filter(invites::group_id.eq(group.id)),
            )
            .set(invites::group_id.eq(None::<i64>))
            .execute(conn)?;
            diesel::delete(groups::table.filter(groups::id.eq(group.id)))
                .execute(conn)?;

            Ok(Status::NoContent)
        })
    })
    .await
}

#[derive(Deserialize)]
pub struct AddMemberPayload {
    pub user_id: String,
    pub role: Option<GroupRole>,
}

#[post("/groups/<group_id>/members", data = "<payload>", format = "json")]
pub async fn add_member(
    group_id: String,
    user: User,
    payload: Json<AddMemberPayload>,
    db: DbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let payload = payload.into_inner();
    let role = payload.role.unwrap_or(GroupRole::Member);
    if role == GroupRole::Owner {
        return Err(ApiError::Validation(
            "Role must be ADMIN or MEMBER".to_string(),
        ));
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let group = group_by_public_id(&group_id, conn)?;

            let may_add = membership_of(&group, user.id, conn)?
                .map(|membership| membership.can_manage())
                .unwrap_or(false);
            if !may_add {
                return Err(ApiError::Forbidden(
                    "Only group admins can add members".to_string(),
                ));
            }

            let target = user_by_public_id(&payload.user_id, conn)?
                .ok_or_else(|| {
                    ApiError::NotFound("User not found".to_string())
                })?;

            if target.id == group.owner_id {
                return Err(ApiError::Validation(
                    "Cannot change the owner's role".to_string(),
                ));
            }

            let prev = group_members::table
                .filter(GroupMember::of_user_in_group(target.id, group.id))
                .first::<GroupMember>(conn)
                .optional()?;

            let member = match prev {
                Some(prev) => diesel::update(
                    group_members::table
                        .filter(group_members::id.eq(prev.id)),
                )
                .set(group_members::role.eq(role.as_str()))
                .get_result::<GroupMember>(conn)?,
                None => insert_into(group_members::table)
                    .values((
                        group_members::group_id.eq(group.id),
                        group_members::user_id.eq(target.id),
                        group_members::role.eq(role.as_str()),
                        group_members::created_at.eq(diesel::dsl::now),
                    ))
                    .get_result::<GroupMember>(conn)?,
            };

            let serialized = GroupMemberSerializer {
                user: UserView::from_db_ty(target),
                role: member.role,
                created_at: member.created_at,
            };
            Ok((Status::Created, Json(json!({ "member": serialized }))))
        })
    })
    .await
}

#[derive(Deserialize)]
pub struct UpdateMemberRolePayload {
    pub role: GroupRole,
}

#[put(
    "/groups/<group_id>/members/<member_id>",
    data = "<payload>",
    format = "json"
)]
pub async fn update_member_role(
    group_id: String,
    member_id: String,
    user: User,
    payload: Json<UpdateMemberRolePayload>,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    let role = payload.into_inner().role;
    if role == GroupRole::Owner {
        return Err(ApiError::Validation(
            "Role must be ADMIN or MEMBER".to_string(),
        ));
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let group = group_by_public_id(&group_id, conn)?;

            if group.owner_id != user.id {
                return Err(ApiError::Forbidden(
                    "Only the group owner can change roles".to_string(),
                ));
            }
            if member_id == user.public_id {
                return Err(ApiError::Validation(
                    "Cannot change your own role".to_string(),
                ));
            }

            let target = user_by_public_id(&member_id, conn)?;
            let membership = match &target {
                Some(target) => group_members::table
                    .filter(GroupMember::of_user_in_group(
                        target.id, group.id,
                    ))
                    .first::<GroupMember>(conn)
                    .optional()?,
                None => None,
            };
            let (target, membership) = match (target, membership) {
                (Some(target), Some(membership)) => (target, membership),
                _ => {
                    return Err(ApiError::NotFound(
                        "Member not found in group".to_string(),
                    ))
                }
            };

            let updated = diesel::update(
                group_members::table
                    .filter(group_members::id.eq(membership.id)),
            )
            .set(group_members::role.eq(role.as_str()))
            .get_result::<GroupMember>(conn)?;

            let serialized = GroupMemberSerializer {
                user: UserView::from_db_ty(target),
                role: updated.role,
                created_at: updated.created_at,
            };
            Ok(Json(json!({ "member": serialized })))
        })
    })
    .await
}

#[delete("/groups/<group_id>/members/<member_id>")]
pub async fn remove_member(
    group_id: String,
    member_id: String,
    user: User,
    db: DbConn,
) -> Result<Status, ApiError> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let group = group_by_public_id(&group_id, conn)?;

            let is_self = member_id == user.public_id;
            let may_manage = membership_of(&group, user.id, conn)?
                .map(|membership| membership.can_manage())
                .unwrap_or(false);
            if !is_self && !may_manage {
                return Err(ApiError::Forbidden(
                    "You do not have permission to remove this member"
                        .to_string(),
                ));
            }

            let target = user_by_public_id(&member_id, conn)?;

            // The owner's membership is permanent for the group's lifetime,
            // whoever asks.
            if let Some(target) = &target {
                if target.id == group.owner_id {
                    return Err(ApiError::Validation(
                        "Cannot remove the group owner".to_string(),
                    ));
                }
            }

            let membership = match &target {
                Some(target) => group_members::table
                    .filter(GroupMember::of_user_in_group(
                        target.id, group.id,
                    ))
                    .first::<GroupMember>(conn)
                    .optional()?,
                None => None,
            };
            let membership = membership.ok_or_else(|| {
                ApiError::NotFound("Member not found in group".to_string())
            })?;

            diesel::delete(
                group_members::table
                    .filter(group_members::id.eq(membership.id)),
            )
            .execute(conn)?;

            Ok(Status::NoContent)
        })
    })
    .await
}
