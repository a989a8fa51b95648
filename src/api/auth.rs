use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, LoginCredentials, Member, Registration, AUTH_TOKEN_COOKIE},
        user::UserDescription,
    },
    db::user::NewUser,
};
use crate::store::Db;

use super::common::user_from_token;

pub fn routes() -> Vec<Route> {
    routes![register, login, logout, profile]
}

#[post("/auth/register", data = "<registration>", format = "json")]
pub async fn register(
    cookies: &CookieJar<'_>,
    registration: Json<Registration>,
    db: Db,
    config: &State<Config>,
) -> Result<Json<UserDescription>> {
    let user: NewUser = registration.0.try_into()?;
    let user = db.insert_user(user).await?;
    info!("Registered new user {}", user.username);

    // New members are logged straight in.
    cookies.add(AuthToken::new(&user).into_cookie(config)?);

    Ok(Json(user.into()))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginCredentials>,
    db: Db,
    config: &State<Config>,
) -> Result<()> {
    let user = db
        .user_by_username(&credentials.username)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No user found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&user);
    cookies.add(token.into_cookie(config)?);

    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[get("/auth/profile")]
pub async fn profile(token: AuthToken<Member>, db: Db) -> Result<Json<UserDescription>> {
    let user = user_from_token(&token, &db).await?;
    Ok(Json(user.into()))
}
