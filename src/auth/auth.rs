use crate::{
    config::Config,
    error::AppError,
    model::role::Role,
    models::{Claims, TokenType},
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub tenant_id: u64,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Result<Self, AppError> {
        if claims.token_type != TokenType::Access {
            return Err(AppError::auth("Access token required"));
        }
        let role = Role::from_id(claims.role).ok_or_else(|| AppError::auth("Invalid role"))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            tenant_id: claims.tenant_id,
            employee_id: claims.employee_id,
        })
    }

    /// The employee acting in this session. Every attendance call needs one.
    pub fn acting_employee_id(&self) -> Result<u64, AppError> {
        self.employee_id
            .ok_or_else(|| AppError::auth("No employee profile linked to this session"))
    }

    pub fn require_hr_or_admin(&self) -> Result<(), AppError> {
        if self.role.can_administer() {
            Ok(())
        } else {
            Err(AppError::forbidden("HR/Admin only"))
        }
    }

    /// HR and Admin see everyone in the tenant; anyone else only themself.
    pub fn require_self_or_admin(&self, employee_id: u64) -> Result<(), AppError> {
        if self.role.can_administer() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("You can only view your own attendance"))
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::auth("Missing token"))
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already verified by the middleware.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let result = (|| {
            let token = bearer_token(req)?;
            let config = req
                .app_data::<Data<Config>>()
                .ok_or_else(|| AppError::Storage("App config missing".into()))?;
            let claims = verify_token(token, &config.jwt_secret)
                .map_err(|_| AppError::auth("Invalid token"))?;
            AuthUser::from_claims(claims)
        })();

        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, token_type: TokenType) -> Claims {
        Claims {
            user_id: 1,
            sub: "someone".into(),
            role: role.id(),
            exp: usize::MAX,
            jti: "jti".into(),
            token_type,
            tenant_id: 4,
            employee_id: Some(10),
        }
    }

    #[test]
    fn refresh_tokens_do_not_authenticate() {
        let err = AuthUser::from_claims(claims(Role::Admin, TokenType::Refresh)).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn employees_only_see_themselves() {
        let user = AuthUser::from_claims(claims(Role::Employee, TokenType::Access)).unwrap();
        assert!(user.require_self_or_admin(10).is_ok());
        assert!(matches!(
            user.require_self_or_admin(11).unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(user.require_hr_or_admin().is_err());

        let hr = AuthUser::from_claims(claims(Role::Hr, TokenType::Access)).unwrap();
        assert!(hr.require_self_or_admin(11).is_ok());
        assert!(hr.require_hr_or_admin().is_ok());
    }
}
