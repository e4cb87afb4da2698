//! Authentication and referral flow over the in-memory store

use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::FlakyStore;
use crazyfarm::auth::SessionIssuer;
use crazyfarm::config::{AuthConfig, InitDataPolicy, VerifyMode};
use crazyfarm::db::{FarmStore, MemoryStore};
use crazyfarm::services::{AuthService, IdentityResolver, UserService};
use crazyfarm::telegram::{sign_init_data, InitDataFields};

const BOT_TOKEN: &str = "7654321:integration-token";
const BOT_LINK: &str = "https://t.me/crazyfarm_bot/app";

fn auth_service(store: Arc<dyn FarmStore>) -> AuthService {
    let config = AuthConfig {
        bot_token: BOT_TOKEN.into(),
        bot_link: BOT_LINK.into(),
        jwt_secret: String::new(),
        token_ttl: Duration::from_secs(3600),
        init_data: InitDataPolicy {
            ttl: Some(Duration::from_secs(300)),
            mode: VerifyMode::Enforce,
        },
    };
    AuthService::new(store, SessionIssuer::new_dev(), config)
}

fn launch_payload(tg_id: i64, first_name: &str, start_param: Option<&str>, auth_date: i64) -> String {
    let mut fields = InitDataFields::new();
    fields.insert(
        "user",
        format!(r#"{{"id":{},"first_name":"{}","language_code":"ru"}}"#, tg_id, first_name),
    );
    fields.insert("chat_type", "private");
    fields.insert("auth_date", auth_date.to_string());
    if let Some(param) = start_param {
        fields.insert("start_param", param);
    }
    let hash = sign_init_data(&fields, BOT_TOKEN, auth_date);
    fields.insert("hash", hash);
    fields.to_query()
}

#[tokio::test]
async fn referral_scenario() {
    let store = Arc::new(MemoryStore::new());
    let auth = auth_service(store.clone());
    let users = UserService::new(store.clone(), BOT_LINK);
    let now = chrono::Utc::now().timestamp();

    let referrer = auth
        .authenticate_with_payload("telegram", &launch_payload(10, "Olga", None, now), now)
        .await
        .unwrap();

    let start_param = STANDARD.encode(format!("ref|{}", referrer.user.id));
    let invited = auth
        .authenticate_with_payload(
            "telegram",
            &launch_payload(11, "Petr", Some(&start_param), now),
            now,
        )
        .await
        .unwrap();

    let header = format!("Bearer {}", referrer.token);
    let ctx = auth.authorize(Some(&header)).await.unwrap();
    let referrals = users.referrals(&ctx.user).await.unwrap();
    assert_eq!(referrals.len(), 1);
    assert_eq!(referrals[0].id, invited.user.id);
    assert_eq!(referrals[0].first_name.as_deref(), Some("Petr"));
}

#[tokio::test]
async fn get_or_create_is_stable() {
    let store = Arc::new(MemoryStore::new());
    let resolver = IdentityResolver::new(store.clone());

    let (first, created) = resolver.get_or_create("999", "telegram").await.unwrap();
    assert!(created);
    let (second, created) = resolver.get_or_create("999", "telegram").await.unwrap();
    assert!(!created);

    assert_eq!(first.id, second.id);
    assert_eq!(first.user_id, second.user_id);
    assert!(store.get_user(first.user_id).await.unwrap().is_some());
}

#[tokio::test]
async fn stale_launch_data_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let auth = auth_service(store.clone());
    let now = chrono::Utc::now().timestamp();

    let stale = launch_payload(12, "Ivan", None, now - 3600);
    assert!(auth
        .authenticate_with_payload("telegram", &stale, now)
        .await
        .is_err());
    assert!(store.find_identity("12", "telegram").await.unwrap().is_none());
}

#[tokio::test]
async fn referral_survives_failed_profile_write() {
    let store = Arc::new(FlakyStore::new());
    let auth = auth_service(store.clone());
    let now = chrono::Utc::now().timestamp();

    let referrer = auth
        .authenticate_with_payload("telegram", &launch_payload(20, "Anna", None, now), now)
        .await
        .unwrap();
    let start_param = STANDARD.encode(format!("ref|{}", referrer.user.id));
    let invite = launch_payload(21, "Boris", Some(&start_param), now);

    FlakyStore::set(&store.fail_profile, true);
    assert!(auth
        .authenticate_with_payload("telegram", &invite, now)
        .await
        .is_err());
    assert_eq!(store.count_referrals(referrer.user.id).await.unwrap(), 1);

    FlakyStore::set(&store.fail_profile, false);
    let invited = auth
        .authenticate_with_payload("telegram", &invite, now)
        .await
        .unwrap();
    assert_eq!(invited.user.first_name.as_deref(), Some("Boris"));
    assert_eq!(store.count_referrals(referrer.user.id).await.unwrap(), 1);
}
