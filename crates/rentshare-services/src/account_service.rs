//! Accounts: registration, sign-in and profile management

use bytes::Bytes;
use rentshare_auth::{JwtService, PasswordService};
use rentshare_cache::{keys, CacheLayer, FetchOptions};
use rentshare_core::{
    models::Profile,
    traits::ProfileRepository,
    AppError, AppResult,
};
use rentshare_storage::{Bucket, FileStorage};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Signed-in profile plus its access token
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub profile: Profile,
}

/// Editable profile fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

pub struct AccountService {
    profiles: Arc<dyn ProfileRepository>,
    passwords: PasswordService,
    jwt: Arc<JwtService>,
    cache: Arc<CacheLayer>,
    files: FileStorage,
}

impl AccountService {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        jwt: Arc<JwtService>,
        cache: Arc<CacheLayer>,
        files: FileStorage,
    ) -> Self {
        Self {
            profiles,
            passwords: PasswordService::new(),
            jwt,
            cache,
            files,
        }
    }

    fn session(&self, profile: Profile) -> AppResult<Session> {
        Ok(Session {
            token: self.jwt.create_token_for_profile(&profile)?,
            token_type: "Bearer",
            expires_in: self.jwt.expiration_secs(),
            profile,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> AppResult<Session> {
        PasswordService::check_strength(password)?;
        let email = email.trim().to_lowercase();

        if self.profiles.find_by_email(&email).await?.is_some() {
            return Err(AppError::AlreadyExists(format!("Email {} is already registered", email)));
        }

        let mut profile = Profile::new(email, self.passwords.hash_password(password)?);
        profile.full_name = full_name.filter(|n| !n.trim().is_empty());

        let profile = self.profiles.create(&profile).await?;
        info!("Registered profile {}", profile.id);

        self.session(profile)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        let profile = self
            .profiles
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.passwords.verify_password(password, &profile.password_hash)? {
            warn!("Failed sign-in for profile {}", profile.id);
            return Err(AppError::InvalidCredentials);
        }

        if !profile.can_login() {
            return Err(AppError::AccountSuspended(profile.email));
        }

        info!("Profile {} signed in", profile.id);
        self.session(profile)
    }

    /// Profile by id, cached under `user_<id>`
    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<Profile> {
        let profiles = self.profiles.clone();

        self.cache
            .with_cache(
                &keys::user_key(user_id),
                || async move {
                    profiles
                        .find_by_id(user_id)
                        .await?
                        .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
                },
                FetchOptions::with_ttl_secs(keys::USER_TTL_SECS),
            )
            .await
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> AppResult<Profile> {
        let mut profile = self.load(user_id).await?;

        if let Some(name) = update.full_name {
            profile.full_name = Some(name).filter(|n| !n.trim().is_empty());
        }
        if let Some(bio) = update.bio {
            profile.bio = Some(bio).filter(|b| !b.trim().is_empty());
        }
        if let Some(location) = update.location {
            profile.location = Some(location).filter(|l| !l.trim().is_empty());
        }

        let profile = self.profiles.update(&profile).await?;
        self.cache.invalidate_user(user_id).await;
        Ok(profile)
    }

    /// Replace the caller's avatar; the previous file is removed afterwards
    #[instrument(skip(self, data))]
    pub async fn upload_avatar(
        &self,
        user_id: Uuid,
        content_type: &str,
        data: Bytes,
    ) -> AppResult<Profile> {
        let mut profile = self.load(user_id).await?;
        let stored = self
            .files
            .upload(Bucket::Avatars, user_id, content_type, data)
            .await?;

        let previous = profile.avatar_url.replace(stored.url);
        let profile = match self.profiles.update(&profile).await {
            Ok(profile) => profile,
            Err(e) => {
                self.files.delete_quietly(Bucket::Avatars, &stored.path).await;
                return Err(e);
            }
        };

        if let Some(path) = previous.and_then(|url| self.files.path_from_url(Bucket::Avatars, &url)) {
            self.files.delete_quietly(Bucket::Avatars, &path).await;
        }

        self.cache.invalidate_user(user_id).await;
        Ok(profile)
    }

    async fn load(&self, user_id: Uuid) -> AppResult<Profile> {
        self.profiles
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }
}
