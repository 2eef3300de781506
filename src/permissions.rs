use crate::{claims::Claims, Error};

pub const POST_ARTICLES: &str = "post:articles";
pub const PATCH_ARTICLES: &str = "patch:articles";
pub const DELETE_ARTICLES: &str = "delete:articles";
pub const POST_COLLECTIONS: &str = "post:collections";
pub const PATCH_COLLECTIONS: &str = "patch:collections";
pub const DELETE_COLLECTIONS: &str = "delete:collections";

/// Requirement of routes that only need a verified token.
pub const NONE: &str = "";

/// Checks that `claims` grant `permission`.
///
/// An empty `permission` is always satisfied, even by tokens without a permission list. Otherwise the token has to
/// carry a `permissions` array that contains `permission` verbatim.
pub fn check_permission(permission: &str, claims: &Claims) -> Result<(), Error> {
    if permission.is_empty() {
        return Ok(());
    }

    let permissions = claims.permissions().ok_or(Error::PermissionsClaimMissing)?;
    if !permissions.contains(&permission) {
        return Err(Error::PermissionDenied(permission.to_string()));
    }
    Ok(())
}
