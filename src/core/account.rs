//! Account business logic - registration and login.
//!
//! Registration creates the login row and the role's profile row in a single
//! database transaction. Passwords are stored as Argon2id PHC strings.

use crate::{
    core::context::RequestContext,
    entities::{Artisan, Customer, ListingStatus, Role, User, artisan, customer, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{PaginatorTrait, Set, TransactionTrait, prelude::*};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Sign-up form for an artisan or customer.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<Role>,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Only used for customers
    pub address: String,
}

/// The account created by [`register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisteredProfile {
    Artisan(artisan::Model),
    Customer(customer::Model),
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn validate(form: &Registration) -> Result<Role> {
    if form.username.trim().is_empty()
        || form.password.is_empty()
        || form.name.trim().is_empty()
        || form.email.trim().is_empty()
    {
        return Err(Error::invalid_input("Please fill in all required fields"));
    }
    if form.password != form.confirm_password {
        return Err(Error::invalid_input("Passwords do not match"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::invalid_input(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if !looks_like_email(form.email.trim()) {
        return Err(Error::invalid_input("Invalid email format"));
    }

    match form.role {
        Some(role @ (Role::Artisan | Role::Customer)) => Ok(role),
        Some(Role::Admin) => Err(Error::invalid_input(
            "Administrator accounts cannot be self-registered",
        )),
        None => Err(Error::invalid_input("Please choose an account type")),
    }
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| Error::PasswordHash)
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<()> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| Error::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| Error::InvalidCredentials)
}

/// Registers a new artisan or customer.
///
/// # Errors
/// Returns an error if:
/// - A required field is empty, the passwords differ or are too short, or the email is malformed
/// - The role is missing or is `admin`
/// - The username is taken, or the email is taken within the role's profile table
/// - The database transaction fails (nothing is written in that case)
pub async fn register(db: &DatabaseConnection, form: Registration) -> Result<RegisteredProfile> {
    let role = validate(&form)?;
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_lowercase();
    let password_hash = hash_password(&form.password)?;

    let txn = db.begin().await?;

    let username_taken = User::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .count(&txn)
        .await?
        > 0;
    if username_taken {
        return Err(Error::invalid_input("Username already exists"));
    }

    let email_taken = match role {
        Role::Artisan => {
            Artisan::find()
                .filter(artisan::Column::Email.eq(email.as_str()))
                .count(&txn)
                .await?
        }
        Role::Customer => {
            Customer::find()
                .filter(customer::Column::Email.eq(email.as_str()))
                .count(&txn)
                .await?
        }
        Role::Admin => 0,
    } > 0;
    if email_taken {
        return Err(Error::invalid_input("Email already exists"));
    }

    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        username: Set(username),
        password_hash: Set(password_hash),
        role: Set(role),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let profile = match role {
        Role::Customer => RegisteredProfile::Customer(
            customer::ActiveModel {
                user_id: Set(user.id),
                name: Set(form.name.trim().to_string()),
                email: Set(email),
                phone: Set(form.phone.trim().to_string()),
                address: Set(form.address.trim().to_string()),
                ..Default::default()
            }
            .insert(&txn)
            .await?,
        ),
        Role::Artisan => RegisteredProfile::Artisan(
            artisan::ActiveModel {
                user_id: Set(user.id),
                name: Set(form.name.trim().to_string()),
                email: Set(email),
                phone: Set(form.phone.trim().to_string()),
                status: Set(ListingStatus::Active),
                join_date: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?,
        ),
        Role::Admin => {
            return Err(Error::invalid_input(
                "Administrator accounts cannot be self-registered",
            ));
        }
    };

    txn.commit().await?;
    tracing::info!(user_id = user.id, %role, "Registered new account");

    Ok(profile)
}

/// Checks a username and password and returns the context for the session.
///
/// Unknown usernames and wrong passwords produce the same error.
pub async fn login(db: &DatabaseConnection, username: &str, password: &str) -> Result<RequestContext> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(Error::invalid_input("Please fill in all fields"));
    }

    let Some(user) = User::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await?
    else {
        tracing::debug!("Login attempt for unknown username");
        return Err(Error::InvalidCredentials);
    };

    verify_password(password, &user.password_hash).inspect_err(|_| {
        tracing::warn!(user_id = user.id, "Failed login attempt");
    })?;

    Ok(RequestContext::for_user(&user))
}
