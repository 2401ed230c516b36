use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::configs::CacheStore;
use crate::constants::USER_CACHE_TTL_SECS;
use crate::modules::friend::repository::FriendRepository;
use crate::modules::user::model::{
    PublicUserResponse, SignInModel, SignUpModel, UpdateSettingsModel, UpdateUser,
    UpdateUserModel, UserResponse, UserSettings,
};
use crate::modules::user::schema::UserEntity;
use crate::modules::user::{model::InsertUser, repository::UserRepository};
use crate::utils::{Claims, TokenSettings, TypeClaims, hash_password, verify_password};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    friends: Arc<dyn FriendRepository + Send + Sync>,
    cache: Arc<dyn CacheStore + Send + Sync>,
    tokens: TokenSettings,
}

fn user_key(id: &Uuid) -> String {
    format!("user:{id}")
}

fn refresh_key(jti: &Uuid) -> String {
    format!("refresh_token:{jti}")
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        friends: Arc<dyn FriendRepository + Send + Sync>,
        cache: Arc<dyn CacheStore + Send + Sync>,
        tokens: TokenSettings,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, friends, cache, tokens }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let key = user_key(&id);
        if let Some(cached_user) = self.cache.get::<UserResponse>(&key).await? {
            return Ok(cached_user);
        }
        let entity = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let user = UserResponse::from(entity);
        self.cache.set(&key, &user, USER_CACHE_TTL_SECS).await?;
        Ok(user)
    }

    pub async fn get_settings(&self, id: Uuid) -> Result<UserSettings, error::SystemError> {
        Ok(self.get_by_id(id).await?.settings)
    }

    /// Private profiles are only visible to their owner and the owner's friends.
    pub async fn get_visible_profile(
        &self,
        viewer_id: Uuid,
        user_id: Uuid,
    ) -> Result<PublicUserResponse, error::SystemError> {
        let user = self.get_by_id(user_id).await?;
        if viewer_id != user_id && !user.settings.profile_public {
            let is_friend = self.friends.find_friendship(&viewer_id, &user_id).await?.is_some();
            if !is_friend {
                return Err(error::SystemError::forbidden("This profile is private"));
            }
        }
        Ok(PublicUserResponse::from(user))
    }

    pub async fn search(
        &self,
        query: &str,
        limit: i32,
    ) -> Result<Vec<PublicUserResponse>, error::SystemError> {
        let users = self.repo.search_users(query.trim(), limit).await?;
        Ok(users
            .into_iter()
            .map(|u| PublicUserResponse::from(UserResponse::from(u)))
            .collect())
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        user: UpdateUserModel,
    ) -> Result<UserResponse, error::SystemError> {
        if user.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        let update_user = UpdateUser {
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            bio: user.bio,
        };

        let entity = self.repo.update(&id, &update_user).await?;
        self.cache.delete(&user_key(&id)).await?;
        Ok(UserResponse::from(entity))
    }

    pub async fn update_settings(
        &self,
        id: Uuid,
        settings: UpdateSettingsModel,
    ) -> Result<UserSettings, error::SystemError> {
        if settings.is_empty() {
            return Err(error::SystemError::bad_request("No settings to update"));
        }

        let entity = self.repo.update_settings(&id, &settings).await?;
        self.cache.delete(&user_key(&id)).await?;
        Ok(UserSettings::from(&entity))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), error::SystemError> {
        if !self.repo.delete(&id).await? {
            return Err(error::SystemError::not_found("User not found"));
        }
        self.cache.delete(&user_key(&id)).await?;
        info!("User {} soft-deleted", id);
        Ok(())
    }

    pub async fn sign_up(&self, user: SignUpModel) -> Result<uuid::Uuid, error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            display_name: user.display_name.unwrap_or_else(|| user.username.clone()),
            username: user.username,
            email: user.email.to_lowercase(),
            hash_password,
        };

        let user_id = self.repo.create(&new_user).await?;
        info!("User {} signed up", user_id);
        Ok(user_id)
    }

    pub async fn sign_in(&self, user: SignInModel) -> Result<(String, String), error::SystemError> {
        let user_entity = self
            .repo
            .find_by_username(&user.username)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid username or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid username or password"));
        }

        self.issue_tokens(&user_entity).await
    }

    /// Rotates the refresh token: the presented one is revoked, a new pair is issued.
    pub async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> Result<(String, String), error::SystemError> {
        let token =
            refresh_token.ok_or_else(|| error::SystemError::unauthorized("Missing refresh token"))?;

        let claims = Claims::decode(&token, self.tokens.secret.as_ref())
            .map_err(|_| error::SystemError::unauthorized("Refresh token invalid or expired"))?;

        if claims._type != Some(TypeClaims::RefreshToken) {
            return Err(error::SystemError::forbidden("Refresh token required"));
        }

        let jti =
            claims.jti.ok_or_else(|| error::SystemError::unauthorized("Refresh token invalid"))?;

        if !self.cache.delete(&refresh_key(&jti)).await? {
            return Err(error::SystemError::unauthorized("Refresh token revoked"));
        }

        let user_entity = self
            .repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("User no longer exists"))?;

        self.issue_tokens(&user_entity).await
    }

    pub async fn sign_out(&self, refresh_token: Option<String>) -> Result<(), error::SystemError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        let secret: &[u8] = self.tokens.secret.as_ref();
        if let Ok(Claims { jti: Some(jti), .. }) = Claims::decode(&token, secret) {
            self.cache.delete(&refresh_key(&jti)).await?;
        }
        Ok(())
    }

    async fn issue_tokens(
        &self,
        user_entity: &UserEntity,
    ) -> Result<(String, String), error::SystemError> {
        let access_token =
            Claims::new(&user_entity.id, &user_entity.role, self.tokens.access_ttl)
                .with_type(TypeClaims::AccessToken)
                .encode(self.tokens.secret.as_ref())?;

        let jti = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));

        let refresh_token =
            Claims::new(&user_entity.id, &user_entity.role, self.tokens.refresh_ttl)
                .with_jti(jti)
                .with_type(TypeClaims::RefreshToken)
                .encode(self.tokens.secret.as_ref())?;

        self.cache
            .set(&refresh_key(&jti), &user_entity.id, self.tokens.refresh_ttl as usize)
            .await?;

        Ok((access_token, refresh_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::trade::{
        model::{NewTrade, OfferedCardModel, PricedOffer},
        repository::TradeRepository,
        schema::TradeVisibility,
    };
    use crate::test::{
        MemoryCache, MemoryFriends, MemoryMarket, MemoryUsers, test_tokens, user_card,
    };

    struct Fixture {
        service: UserService,
        users: Arc<MemoryUsers>,
        cache: Arc<MemoryCache>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUsers::default());
        let cache = Arc::new(MemoryCache::default());
        let service = UserService::with_dependencies(
            users.clone(),
            Arc::new(MemoryFriends::new(users.clone())),
            cache.clone(),
            test_tokens(),
        );
        Fixture { service, users, cache }
    }

    fn sign_up(username: &str) -> SignUpModel {
        SignUpModel {
            username: username.into(),
            email: format!("{username}@pallet.town"),
            password: "pikachu42".into(),
            display_name: None,
        }
    }

    fn sign_in(username: &str, password: &str) -> SignInModel {
        SignInModel { username: username.into(), password: password.into() }
    }

    #[actix_web::test]
    async fn test_sign_up_then_sign_in() {
        let f = fixture();
        let id = f.service.sign_up(sign_up("ash")).await.unwrap();

        let err: error::Error = f.service.sign_up(sign_up("ASH")).await.unwrap_err().into();
        assert!(matches!(err, error::Error::Conflict(ref msg) if msg == "Username already exists"));

        let err = f.service.sign_in(sign_in("ash", "raichu42")).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));

        let (access, refresh) = f.service.sign_in(sign_in("ash", "pikachu42")).await.unwrap();
        let claims = Claims::decode(&access, b"test-secret").unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.is_access_token());
        assert!(!Claims::decode(&refresh, b"test-secret").unwrap().is_access_token());
        assert_eq!(f.cache.keys_with_prefix("refresh_token:"), 1);
    }

    #[actix_web::test]
    async fn test_refresh_rotates_and_requires_refresh_token() {
        let f = fixture();
        f.service.sign_up(sign_up("misty")).await.unwrap();
        let (access, refresh) = f.service.sign_in(sign_in("misty", "pikachu42")).await.unwrap();

        let err = f.service.refresh(Some(access)).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let err = f.service.refresh(None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));

        let (_, rotated) = f.service.refresh(Some(refresh.clone())).await.unwrap();
        assert_eq!(f.cache.keys_with_prefix("refresh_token:"), 1);

        // the old token was revoked by the rotation
        let err = f.service.refresh(Some(refresh)).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));

        f.service.sign_out(Some(rotated.clone())).await.unwrap();
        assert_eq!(f.cache.keys_with_prefix("refresh_token:"), 0);
        let err = f.service.refresh(Some(rotated)).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn test_soft_delete_keeps_cards_and_trades() {
        let f = fixture();
        let ash = f.service.sign_up(sign_up("ash")).await.unwrap();
        let misty = f.service.sign_up(sign_up("misty")).await.unwrap();
        let a = user_card(ash, 1, 10.0);
        let m = user_card(misty, 1, 10.0);
        let market = MemoryMarket::with_cards(vec![a.clone(), m.clone()]);

        let pick = |card: &crate::modules::collection::schema::UserCardEntity| {
            PricedOffer::build(
                card.user_id,
                &[OfferedCardModel { user_card_id: card.id, quantity: None }],
                std::slice::from_ref(card),
            )
            .unwrap()
        };
        let trade = market
            .create_trade(&NewTrade {
                initiator_id: ash,
                receiver_id: Some(misty),
                visibility: TradeVisibility::Private,
                initiator_offer: pick(&a),
                receiver_offer: Some(pick(&m)),
                value_difference_percentage: Some(0.0),
                note: None,
            })
            .await
            .unwrap();

        f.service.get_by_id(ash).await.unwrap();
        f.service.delete(ash).await.unwrap();

        assert!(f.users.users.lock().unwrap().iter().any(|u| u.id == ash && u.deleted_at.is_some()));
        assert_eq!(market.cards_of(ash).len(), 1);
        assert!(market.trade(trade.id).is_some());

        // the cached profile is gone with the account
        let err = f.service.get_by_id(ash).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
        let err = f.service.sign_in(sign_in("ash", "pikachu42")).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));
        assert!(matches!(f.service.delete(ash).await, Err(error::SystemError::NotFound(_))));
    }

    #[test]
    fn test_user_foreign_keys_do_not_cascade() {
        let schema = include_str!("../../../migrations/20250101000000_init.sql");
        for line in schema.lines().filter(|l| l.contains("REFERENCES users")) {
            assert!(!line.contains("ON DELETE"), "{line}");
        }
    }

    #[actix_web::test]
    async fn test_private_profile_needs_friendship() {
        let f = fixture();
        let ash = f.service.sign_up(sign_up("ash")).await.unwrap();
        let brock = f.service.sign_up(sign_up("brock")).await.unwrap();
        f.service
            .update_settings(
                brock,
                UpdateSettingsModel { profile_public: Some(false), ..Default::default() },
            )
            .await
            .unwrap();

        let err = f.service.get_visible_profile(ash, brock).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
        f.service.get_visible_profile(brock, brock).await.unwrap();
    }
}
