//! Access policies for mutating operations

use axum::http::Method;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AuthUser};

/// Methods that never modify state
pub fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Anyone may read; authenticated users may create; only the author may
    /// change or delete an existing object
    AuthorOrReadOnly,
    /// Anyone may read; only administrators may write
    AdminOrReadOnly,
}

impl Policy {
    /// View-level check, before any object is loaded
    pub fn has_permission(self, method: &Method, user: Option<&AuthUser>) -> Result<(), ApiError> {
        if is_safe(method) {
            return Ok(());
        }
        let user = user.ok_or(ApiError::Unauthorized)?;
        match self {
            Policy::AuthorOrReadOnly => Ok(()),
            Policy::AdminOrReadOnly if user.is_admin() => Ok(()),
            Policy::AdminOrReadOnly => Err(ApiError::forbidden(
                "You do not have permission to perform this action",
            )),
        }
    }

    /// Object-level check against the object's author
    pub fn has_object_permission(
        self,
        method: &Method,
        user: Option<&AuthUser>,
        author_id: Uuid,
    ) -> Result<(), ApiError> {
        self.has_permission(method, user)?;
        if is_safe(method) {
            return Ok(());
        }
        let user = user.ok_or(ApiError::Unauthorized)?;
        let allowed = match self {
            Policy::AuthorOrReadOnly => user.id == author_id,
            Policy::AdminOrReadOnly => user.is_admin(),
        };
        if allowed {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::ADMIN_ROLE;

    fn member() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            roles: vec![],
        }
    }

    fn admin() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            roles: vec![ADMIN_ROLE.to_string()],
        }
    }

    #[test]
    fn test_safe_methods_are_open_to_everyone() {
        for policy in [Policy::AuthorOrReadOnly, Policy::AdminOrReadOnly] {
            assert!(policy.has_permission(&Method::GET, None).is_ok());
            assert!(
                policy
                    .has_object_permission(&Method::HEAD, None, Uuid::new_v4())
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_anonymous_writes_are_unauthorized() {
        for policy in [Policy::AuthorOrReadOnly, Policy::AdminOrReadOnly] {
            assert!(matches!(
                policy.has_permission(&Method::POST, None),
                Err(ApiError::Unauthorized)
            ));
        }
    }

    #[test]
    fn test_author_only_mutation() {
        let author = member();
        let other = member();
        let policy = Policy::AuthorOrReadOnly;

        assert!(policy.has_permission(&Method::POST, Some(&other)).is_ok());
        assert!(
            policy
                .has_object_permission(&Method::PATCH, Some(&author), author.id)
                .is_ok()
        );
        assert!(matches!(
            policy.has_object_permission(&Method::DELETE, Some(&other), author.id),
            Err(ApiError::Forbidden(_))
        ));
        assert!(
            policy
                .has_object_permission(&Method::GET, Some(&other), author.id)
                .is_ok()
        );
    }

    #[test]
    fn test_admin_gated_writes() {
        let policy = Policy::AdminOrReadOnly;

        assert!(matches!(
            policy.has_permission(&Method::POST, Some(&member())),
            Err(ApiError::Forbidden(_))
        ));
        assert!(policy.has_permission(&Method::POST, Some(&admin())).is_ok());
        assert!(
            policy
                .has_object_permission(&Method::PUT, Some(&admin()), Uuid::new_v4())
                .is_ok()
        );
    }
}
