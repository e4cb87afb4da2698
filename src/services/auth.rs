//! Authentication flow
//!
//! Launch payload -> verification -> identity -> profile -> session token,
//! and session token -> authenticated request context.

use std::sync::Arc;
use tracing::{debug, warn};

use super::identity::IdentityResolver;
use crate::auth::{extract_token_from_header, SessionIssuer};
use crate::config::AuthConfig;
use crate::db::FarmStore;
use crate::domain::dto::{UserAuthResponse, UserDto};
use crate::domain::{AuthIdentity, ProfileUpdate, User};
use crate::telegram::{parse_fields, validate_init_data, InitDataError, TELEGRAM_METHOD};
use crate::types::{FarmError, Result};

/// The caller behind a verified session token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: AuthIdentity,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn FarmStore>,
    resolver: IdentityResolver,
    issuer: SessionIssuer,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn FarmStore>, issuer: SessionIssuer, config: AuthConfig) -> Self {
        Self {
            resolver: IdentityResolver::new(store.clone()),
            store,
            issuer,
            config,
        }
    }

    /// Exchange a signed launch payload for a session. `now` is unix seconds.
    pub async fn authenticate_with_payload(
        &self,
        method: &str,
        data: &str,
        now: i64,
    ) -> Result<UserAuthResponse> {
        if method.is_empty() || data.is_empty() {
            return Err(FarmError::WrongBody("method and data are required".into()));
        }

        let (identity, user) = match method {
            TELEGRAM_METHOD => self.authenticate_telegram(data, now).await?,
            other => return Err(FarmError::WrongMethod(format!("unsupported method '{}'", other))),
        };

        let token = self.issuer.issue(identity.id)?;
        Ok(UserAuthResponse {
            user: UserDto::from_user(&user, &self.config.bot_link),
            token,
        })
    }

    async fn authenticate_telegram(&self, data: &str, now: i64) -> Result<(AuthIdentity, User)> {
        let fields = validate_init_data(data, &self.config.bot_token, &self.config.init_data, now)
            .map_err(|e| match e {
                InitDataError::UnexpectedFormat => FarmError::InvalidRequest(e.to_string()),
                other => {
                    warn!("Rejected init data: {}", other);
                    FarmError::Unauthorized(String::new())
                }
            })?;

        let init = parse_fields(&fields).map_err(|e| FarmError::InvalidRequest(e.to_string()))?;
        if init.user.id == 0 {
            return Err(FarmError::InvalidRequest("init data carries no user".into()));
        }

        let (identity, created) = self
            .resolver
            .get_or_create(&init.user.id.to_string(), TELEGRAM_METHOD)
            .await?;

        // Attributed before the profile write so a failed write cannot drop it
        if created {
            self.resolver
                .attribute_referral(identity.user_id, &init.start_param)
                .await;
        }

        let update = ProfileUpdate {
            tg_id: init.user.id,
            first_name: ProfileUpdate::optional(&init.user.first_name),
            last_name: ProfileUpdate::optional(&init.user.last_name),
            username: ProfileUpdate::optional(&init.user.username),
            icon: ProfileUpdate::optional(&init.user.photo_url),
            language_code: ProfileUpdate::optional(&init.user.language_code),
        };
        let user = self.store.update_profile(identity.user_id, &update).await?;

        Ok((identity, user))
    }

    /// Resolve the `Authorization` header into the calling user
    pub async fn authorize(&self, auth_header: Option<&str>) -> Result<AuthContext> {
        let token = extract_token_from_header(auth_header)
            .ok_or_else(|| FarmError::Unauthorized(String::new()))?;
        let identity_id = self.issuer.verify(token)?;

        let identity = match self.store.find_identity_by_id(identity_id).await? {
            Some(identity) => identity,
            None => {
                debug!("Session subject {} does not resolve", identity_id);
                return Err(FarmError::Unauthorized(String::new()));
            }
        };
        let user = match self.store.get_user(identity.user_id).await? {
            Some(user) => user,
            None => {
                debug!("Identity {} has no user", identity.id);
                return Err(FarmError::Unauthorized(String::new()));
            }
        };

        Ok(AuthContext { identity, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InitDataPolicy, VerifyMode};
    use crate::db::MemoryStore;
    use crate::telegram::{encode_referral, sign_init_data, InitDataFields};
    use std::time::Duration;

    const BOT_TOKEN: &str = "1234567:test-bot-token";
    const NOW: i64 = 1_700_000_000;

    fn service(ttl: Option<Duration>) -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = AuthConfig {
            bot_token: BOT_TOKEN.into(),
            bot_link: "https://t.me/farm_bot/app".into(),
            jwt_secret: String::new(),
            token_ttl: Duration::from_secs(86400),
            init_data: InitDataPolicy {
                ttl,
                mode: VerifyMode::Enforce,
            },
        };
        (
            AuthService::new(store.clone(), SessionIssuer::new_dev(), config),
            store,
        )
    }

    fn payload(tg_id: i64, start_param: Option<&str>, auth_date: i64) -> String {
        let mut fields = InitDataFields::new();
        fields.insert("query_id", "AAHdF6IQAAAAAN0XohDhrOrc");
        fields.insert(
            "user",
            format!(r#"{{"id":{},"first_name":"Vlad","last_name":"","username":"vdkfrost","language_code":"en"}}"#, tg_id),
        );
        fields.insert("auth_date", auth_date.to_string());
        if let Some(param) = start_param {
            fields.insert("start_param", param);
        }
        let hash = sign_init_data(&fields, BOT_TOKEN, auth_date);
        fields.insert("hash", hash);
        fields.to_query()
    }

    #[tokio::test]
    async fn test_authenticate_and_authorize() {
        let (service, _) = service(None);

        let response = service
            .authenticate_with_payload("telegram", &payload(42, None, NOW), NOW)
            .await
            .unwrap();
        assert_eq!(response.user.first_name.as_deref(), Some("Vlad"));
        // Empty strings become null
        assert_eq!(response.user.last_name, None);

        let header = format!("Bearer {}", response.token);
        let context = service.authorize(Some(&header)).await.unwrap();
        assert_eq!(context.user.id, response.user.id);
        assert_eq!(context.user.tg_id, 42);
        assert_eq!(context.identity.external_id, "42");
    }

    #[tokio::test]
    async fn test_repeat_login_keeps_user() {
        let (service, _) = service(None);
        let first = service
            .authenticate_with_payload("telegram", &payload(42, None, NOW), NOW)
            .await
            .unwrap();
        let second = service
            .authenticate_with_payload("telegram", &payload(42, None, NOW + 5), NOW + 5)
            .await
            .unwrap();
        assert_eq!(first.user.id, second.user.id);
    }

    #[tokio::test]
    async fn test_request_shape_errors() {
        let (service, _) = service(None);

        assert!(matches!(
            service.authenticate_with_payload("", "x", NOW).await,
            Err(FarmError::WrongBody(_))
        ));
        assert!(matches!(
            service.authenticate_with_payload("telegram", "", NOW).await,
            Err(FarmError::WrongBody(_))
        ));
        assert!(matches!(
            service.authenticate_with_payload("email", "x=1", NOW).await,
            Err(FarmError::WrongMethod(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_signature_is_unauthorized() {
        let (service, store) = service(None);
        let tampered = payload(42, None, NOW).replace("Vlad", "Vova");

        assert!(matches!(
            service.authenticate_with_payload("telegram", &tampered, NOW).await,
            Err(FarmError::Unauthorized(_))
        ));
        assert!(store.find_identity("42", "telegram").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_payload_is_unauthorized() {
        let (service, _) = service(Some(Duration::from_secs(60)));
        assert!(matches!(
            service
                .authenticate_with_payload("telegram", &payload(42, None, NOW - 3600), NOW)
                .await,
            Err(FarmError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_referral_only_on_creation() {
        let (service, store) = service(None);
        let referrer = service
            .authenticate_with_payload("telegram", &payload(1, None, NOW), NOW)
            .await
            .unwrap();
        let param = encode_referral(referrer.user.id);

        service
            .authenticate_with_payload("telegram", &payload(2, Some(&param), NOW), NOW)
            .await
            .unwrap();
        assert_eq!(store.count_referrals(referrer.user.id).await.unwrap(), 1);

        // An existing user logging in through a referral link is not re-attributed
        let other = service
            .authenticate_with_payload("telegram", &payload(3, None, NOW), NOW)
            .await
            .unwrap();
        let param = encode_referral(other.user.id);
        service
            .authenticate_with_payload("telegram", &payload(2, Some(&param), NOW), NOW)
            .await
            .unwrap();
        assert_eq!(store.count_referrals(other.user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_garbage_referral_does_not_fail_auth() {
        let (service, _) = service(None);
        assert!(service
            .authenticate_with_payload("telegram", &payload(5, Some("%%%"), NOW), NOW)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_authorize_rejections() {
        let (service, _) = service(None);

        assert!(matches!(service.authorize(None).await, Err(FarmError::Unauthorized(_))));
        assert!(matches!(
            service.authorize(Some("Bearer not.a.jwt")).await,
            Err(FarmError::Unauthorized(_))
        ));

        // Well-signed token for an identity that does not exist
        let orphan = SessionIssuer::new_dev().issue(uuid::Uuid::new_v4()).unwrap();
        assert!(matches!(
            service.authorize(Some(&orphan)).await,
            Err(FarmError::Unauthorized(_))
        ));
    }
}
