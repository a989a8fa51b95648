use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{db::user::User, mongodb::Id};
use crate::store::Db;

use super::rights::{Member, Rights, Role};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token for a specific user, granting at least the
/// rights of role `R`.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<R> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl<R> AuthToken<R> {
    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights >= target
    }

    /// Serialize this token into a signed cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Deserialize and verify a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)?;
        Ok(token)
    }
}

impl AuthToken<Member> {
    /// Create a new [`AuthToken`] carrying the rights the user currently holds.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            rights: Rights::of(user),
            phantom: PhantomData,
        }
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Role + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that it grants the
    /// rights of `R` to a user who still holds them.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Status(Status::Unauthorized, "Not logged in".to_string()),
                ))
            }
        };

        // Decode the token.
        let token: Self = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(_) => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Status(Status::Unauthorized, "Invalid or expired login".to_string()),
                ))
            }
        };

        // Check it represents the correct rights.
        if !token.permits(R::RIGHTS) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::Status(Status::Forbidden, format!("Requires {} rights", R::RIGHTS)),
            ));
        }

        // Check the user still exists and still holds those rights.
        // Unwrap is safe as `Db` is always managed.
        let db = req.guard::<&State<Db>>().await.unwrap();
        match db.user_by_id(token.id).await {
            Ok(Some(user)) if Rights::of(&user) >= R::RIGHTS => Outcome::Success(token),
            Ok(Some(_)) => Outcome::Failure((
                Status::Forbidden,
                Error::Status(Status::Forbidden, format!("Requires {} rights", R::RIGHTS)),
            )),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::Status(Status::Unauthorized, "User no longer exists".to_string()),
            )),
            Err(e) => Outcome::Failure((Status::InternalServerError, e)),
        }
    }
}
