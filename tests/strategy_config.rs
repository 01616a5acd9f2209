#![cfg(feature = "reqwest")]

// self
use oauth2_mailru::{
	_preludet::*,
	auth::{ProfileField, ScopeSet},
	flows::ReqwestStrategy,
	provider::{
		AuthorizeOptions, ClientAuthMethod, DEFAULT_PROFILE_URL, PROVIDER_NAME, StrategyConfig,
		StrategyConfigError,
	},
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse test URL.")
}

fn strategy(config: StrategyConfig) -> ReqwestStrategy {
	build_reqwest_test_strategy(config)
}

#[test]
fn strategy_is_named_mailru() {
	let config = StrategyConfig::builder("ABC123")
		.client_secret("secret")
		.build()
		.expect("Strategy config should build.");

	assert_eq!(strategy(config).name(), "mailru");
	assert_eq!(PROVIDER_NAME, "mailru");
}

#[test]
fn missing_client_id_is_rejected() {
	let err = StrategyConfig::builder("").build().expect_err("Empty client IDs must be rejected.");

	assert_eq!(err, StrategyConfigError::MissingClientId);

	let err = serde_json::from_str::<StrategyConfig>("{}")
		.expect_err("Deserializing without a client ID must fail.");

	assert!(err.to_string().contains("Missing client identifier."));
}

#[test]
fn insecure_oauth_endpoints_are_rejected() {
	let err = StrategyConfig::builder("ABC123")
		.token_url(url("http://connect.mail.ru/oauth/token"))
		.build()
		.expect_err("Plain HTTP token endpoints must be rejected.");

	assert!(matches!(err, StrategyConfigError::InsecureEndpoint { endpoint: "token", .. }));

	let err = StrategyConfig::builder("ABC123")
		.pkce(true)
		.build()
		.expect_err("PKCE without state must be rejected.");

	assert_eq!(err, StrategyConfigError::PkceRequiresState);
}

#[test]
fn defaults_point_at_mail_ru() {
	let config = StrategyConfig::builder("ABC123").build().expect("Strategy config should build.");

	assert_eq!(config.authorization_url.as_str(), "https://connect.mail.ru/oauth/authorize");
	assert_eq!(config.token_url.as_str(), "https://connect.mail.ru/oauth/token");
	assert_eq!(config.profile_url.as_str(), DEFAULT_PROFILE_URL);
	assert_eq!(config.scope_separator, ',');
	assert_eq!(config.client_auth_method, ClientAuthMethod::ClientSecretPost);
	assert_eq!(config.profile_fields(), ProfileField::DEFAULT.as_slice());
	assert!(!config.state);
	assert!(!config.skip_user_profile);
}

#[test]
fn config_deserializes_with_defaults() {
	let config = serde_json::from_str::<StrategyConfig>(
		r#"{
			"client_id": "ABC123",
			"client_secret": "secret",
			"callback_url": "https://app.example/auth/mailru/callback",
			"scope": ["photos", "guestbook"],
			"profile_fields": ["id", "emails"],
			"state": true
		}"#,
	)
	.expect("Strategy config should deserialize.");

	assert_eq!(config.client_secret.as_deref(), Some("secret"));
	assert_eq!(config.scope.join(','), Some("photos,guestbook".into()));
	assert_eq!(config.profile_fields(), [ProfileField::Id, ProfileField::Emails].as_slice());
	assert!(config.state);

	let serialized = serde_json::to_value(&config).expect("Strategy config should serialize.");

	assert!(serialized.get("client_secret").is_none());
	assert!(!format!("{config:?}").contains("secret\""));
}

#[test]
fn bare_redirect_carries_only_response_type_and_client_id() {
	let config = StrategyConfig::builder("ABC123").build().expect("Strategy config should build.");
	let request = strategy(config).authorize(&AuthorizeOptions::default());

	assert_eq!(
		request.url.as_str(),
		"https://connect.mail.ru/oauth/authorize?response_type=code&client_id=ABC123"
	);
	assert!(request.session.state.is_none());
	assert!(request.session.redirect_uri.is_none());
}

#[test]
fn redirect_includes_display_and_scope() {
	let config = StrategyConfig::builder("ABC123")
		.callback_url(url("https://app.example/cb"))
		.scope(ScopeSet::new(["photos", "guestbook"]).expect("Scope fixture should be valid."))
		.build()
		.expect("Strategy config should build.");
	let request = strategy(config).authorize(&AuthorizeOptions::default().with_display("touch"));

	assert_eq!(
		request.url.as_str(),
		"https://connect.mail.ru/oauth/authorize?response_type=code&redirect_uri=https%3A%2F%2Fapp.example%2Fcb&scope=photos%2Cguestbook&display=touch&client_id=ABC123"
	);
}
