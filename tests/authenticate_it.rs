#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oauth2_mailru::{
	_preludet::*,
	auth::{Profile, TokenGrant, TokenSecret},
	error::{ProviderErrorKind, TransportError},
	flows::{
		AuthInfo, AuthOutcome, AuthenticateRequest, AuthorizationSession, CallbackParams,
		ReqwestStrategy, Verified,
	},
	provider::{AuthorizeOptions, ClientAuthMethod, StrategyConfig, StrategyConfigBuilder},
};

const CLIENT_ID: &str = "ABC123";
const CLIENT_SECRET: &str = "secret";
const ACCESS_TOKEN: &str = "be6ef89965d58e56dec21acb9b62bdaa";
const SIGNATURE: &str = "0329aa5593343f7d563f68bdac7da778";
const BASIC_AUTHORIZATION: &str = "Basic QUJDMTIzOnNlY3JldA==";
const TOKEN_BODY: &str = "{\"access_token\":\"be6ef89965d58e56dec21acb9b62bdaa\",\"token_type\":\"bearer\",\"expires_in\":86400,\"refresh_token\":\"refresh-1\",\"x_mailru_vid\":\"1\"}";

#[derive(Clone, Debug, PartialEq, Eq)]
struct User {
	id: String,
	display_name: String,
	access_token: String,
}

fn config_builder(server: &MockServer) -> StrategyConfigBuilder {
	StrategyConfig::builder(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.authorization_url(
			Url::parse(&server.url("/oauth/authorize"))
				.expect("Mock authorization endpoint should parse."),
		)
		.token_url(
			Url::parse(&server.url("/oauth/token")).expect("Mock token endpoint should parse."),
		)
		.profile_url(
			Url::parse(&server.url("/platform/api?method=users.getInfo"))
				.expect("Mock profile endpoint should parse."),
		)
		.callback_url(
			Url::parse("https://app.example/auth/mailru/callback")
				.expect("Callback URL should parse."),
		)
}

fn build_strategy(server: &MockServer) -> ReqwestStrategy {
	build_reqwest_test_strategy(config_builder(server).build().expect("Config should build."))
}

async fn verify(grant: TokenGrant, profile: Option<Profile>) -> Result<Verified<User>> {
	let profile = profile.expect("Profile should be fetched before verify.");

	Ok(Verified::User {
		user: User {
			id: profile.id,
			display_name: profile.display_name,
			access_token: grant.access_token.expose().to_owned(),
		},
		info: None,
	})
}

async fn verify_token(
	grant: TokenGrant,
	_profile: Option<Profile>,
) -> Result<Verified<String>> {
	Ok(Verified::User { user: grant.access_token.expose().to_owned(), info: None })
}

fn code_callback(code: &str) -> AuthenticateRequest {
	AuthenticateRequest::new(CallbackParams { code: Some(code.into()), ..Default::default() })
}

#[tokio::test]
async fn access_denied_fails_with_description() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let request = AuthenticateRequest::new(CallbackParams::from_query(
		"error=access_denied&error_description=Permissions%20error",
	));
	let outcome = strategy
		.authenticate(request, &verify)
		.await
		.expect("Denied consent should not be an error.");

	match outcome {
		AuthOutcome::Fail { info, status } => {
			assert_eq!(info, Some(AuthInfo::message("Permissions error")));
			assert_eq!(status, None);
		},
		other => panic!("Unexpected outcome: {other:?}."),
	}
}

#[tokio::test]
async fn other_callback_errors_are_authorization_errors() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let request = AuthenticateRequest::new(CallbackParams::from_query(
		"error=invalid_scope&error_code=3&error_description=Scope%20is%20unknown&error_uri=https%3A%2F%2Fapi.mail.ru%2Fdocs%2Fscopes",
	));
	let err = strategy
		.authenticate(request, &verify)
		.await
		.expect_err("Authorization errors must surface as errors.");
	let provider = err.as_provider().expect("Error should be a provider error.");

	assert_eq!(provider.kind, ProviderErrorKind::Authorization);
	assert_eq!(provider.name(), "MailruAuthorizationError");
	assert_eq!(provider.code, Some(3));
	assert_eq!(provider.error_type.as_deref(), Some("invalid_scope"));
	assert_eq!(provider.uri.as_deref(), Some("https://api.mail.ru/docs/scopes"));
	assert_eq!(provider.status(), 500);
	assert_eq!(err.to_string(), "Scope is unknown");
}

#[tokio::test]
async fn missing_code_redirects_to_provider() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let request = AuthenticateRequest::default()
		.with_options(AuthorizeOptions::default().with_display("popup"));
	let outcome = strategy
		.authenticate(request, &verify)
		.await
		.expect("Initial requests should redirect.");

	match outcome {
		AuthOutcome::Redirect(request) => {
			assert_eq!(request.url.path(), "/oauth/authorize");

			let query = request.url.query_pairs().into_owned().collect::<BTreeMap<_, _>>();

			assert_eq!(query.get("display").map(String::as_str), Some("popup"));
			assert_eq!(query.get("client_id").map(String::as_str), Some(CLIENT_ID));
		},
		other => panic!("Unexpected outcome: {other:?}."),
	}
}

#[tokio::test]
async fn code_is_exchanged_and_profile_normalized() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/platform/api")
				.query_param("method", "users.getInfo")
				.query_param("app_id", CLIENT_ID)
				.query_param("session_key", ACCESS_TOKEN)
				.query_param("secure", "1")
				.query_param("sig", SIGNATURE);
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"uid\":\"1\",\"first_name\":\"A\",\"last_name\":\"B\",\"nick\":\"ab\",\"sex\":1}]");
		})
		.await;
	let outcome = strategy
		.authenticate(code_callback("valid-code"), &verify)
		.await
		.expect("Login should succeed.");

	token.assert_async().await;
	profile.assert_async().await;

	match outcome {
		AuthOutcome::Success { user, info } => {
			assert_eq!(
				user,
				User {
					id: "1".into(),
					display_name: "A B".into(),
					access_token: ACCESS_TOKEN.into(),
				}
			);
			assert!(info.is_none());
		},
		other => panic!("Unexpected outcome: {other:?}."),
	}
}

#[tokio::test]
async fn exchanged_grant_carries_token_fields() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let grant = strategy
		.exchange_code("valid-code", strategy.config.callback_url.as_ref(), None)
		.await
		.expect("Code exchange should succeed.");

	token.assert_async().await;

	assert_eq!(grant.access_token.expose(), ACCESS_TOKEN);
	assert_eq!(grant.refresh_token.as_ref().map(|token| token.expose()), Some("refresh-1"));
	assert_eq!(grant.token_type, "bearer");
	assert_eq!(grant.expires_at, Some(grant.issued_at + Duration::days(1)));
	assert_eq!(grant.extra.get("x_mailru_vid"), Some(&JsonValue::from("1")));
}

#[tokio::test]
async fn profile_error_objects_are_data_errors() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/platform/api");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":{\"message\":\"m\",\"type\":\"t\",\"code\":1,\"error_subcode\":2}}");
		})
		.await;
	let err = strategy
		.user_profile(&TokenSecret::new(ACCESS_TOKEN))
		.await
		.expect_err("Profile errors must surface.");

	profile.assert_async().await;

	let provider = err.as_provider().expect("Error should be a provider error.");

	assert_eq!(provider.name(), "MailruAPIError");
	assert_eq!(provider.message.as_deref(), Some("m"));
	assert_eq!(provider.error_type.as_deref(), Some("t"));
	assert_eq!(provider.code, Some(1));
	assert_eq!(provider.subcode, Some(2));
	assert_eq!(provider.status(), 500);
}

#[tokio::test]
async fn unstructured_profile_failures_are_transport_errors() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/platform/api");
			then.status(502).body("<html>bad gateway</html>");
		})
		.await;
	let err = strategy
		.user_profile(&TokenSecret::new(ACCESS_TOKEN))
		.await
		.expect_err("Gateway failures must surface.");

	profile.assert_async().await;

	assert_eq!(err.to_string(), "Failed to fetch user profile.");
	assert!(matches!(
		err,
		Error::Transport(TransportError::UnexpectedResponse { status: Some(502), .. })
	));
}

#[tokio::test]
async fn structured_token_errors_are_token_errors() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":{\"message\":\"Code expired\",\"type\":\"OAuthException\",\"code\":100,\"fbtrace_id\":\"trace\"}}");
		})
		.await;
	let err = strategy
		.authenticate(code_callback("stale-code"), &verify)
		.await
		.expect_err("Token errors must surface.");

	token.assert_async().await;

	let provider = err.as_provider().expect("Error should be a provider error.");

	assert_eq!(provider.name(), "MailruTokenError");
	assert_eq!(provider.message.as_deref(), Some("Code expired"));
	assert_eq!(provider.code, Some(100));
	assert_eq!(provider.trace_id.as_deref(), Some("trace"));
}

#[tokio::test]
async fn rfc_token_errors_fall_back_to_oauth_errors() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"Code already used\"}");
		})
		.await;
	let err = strategy
		.exchange_code("used-code", None, None)
		.await
		.expect_err("Invalid grants must surface.");

	token.assert_async().await;

	match err {
		Error::OAuth(err) => {
			assert_eq!(err.code, "invalid_grant");
			assert_eq!(err.to_string(), "Code already used");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn unparseable_token_errors_fail_to_obtain_token() {
	let server = MockServer::start_async().await;
	let strategy = build_strategy(&server);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(500).body("<html>oops</html>");
		})
		.await;
	let err = strategy
		.exchange_code("any-code", None, None)
		.await
		.expect_err("Server failures must surface.");

	token.assert_async().await;

	assert_eq!(err.to_string(), "Failed to obtain access token.");
	assert!(matches!(
		err,
		Error::Transport(TransportError::UnexpectedResponse { status: Some(500), .. })
	));
}

#[tokio::test]
async fn state_must_round_trip() {
	let server = MockServer::start_async().await;
	let strategy = build_reqwest_test_strategy(
		config_builder(&server).state(true).build().expect("Config should build."),
	);
	let redirect = strategy.authorize(&AuthorizeOptions::default());
	let state = redirect.session.state.clone().expect("State should be generated.");
	let mismatched = AuthenticateRequest::new(CallbackParams {
		code: Some("code".into()),
		state: Some(format!("{state}-tampered")),
		..Default::default()
	})
	.with_session(redirect.session.clone());
	let outcome =
		strategy.authenticate(mismatched, &verify).await.expect("Mismatch should not error.");

	assert!(matches!(
		outcome,
		AuthOutcome::Fail { info: Some(AuthInfo { message: Some(ref message) }), status: Some(403) }
			if message == "Invalid authorization request state."
	));

	let sessionless = AuthenticateRequest::new(CallbackParams {
		code: Some("code".into()),
		state: Some(state),
		..Default::default()
	});
	let outcome =
		strategy.authenticate(sessionless, &verify).await.expect("Missing session should not error.");

	assert!(matches!(
		outcome,
		AuthOutcome::Fail { info: Some(AuthInfo { message: Some(ref message) }), status: Some(403) }
			if message == "Unable to verify authorization request state."
	));
}

#[tokio::test]
async fn skipped_profiles_reach_verify_as_none() {
	let server = MockServer::start_async().await;
	let strategy = build_reqwest_test_strategy(
		config_builder(&server).skip_user_profile(true).build().expect("Config should build."),
	);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let verify = |grant: TokenGrant, profile: Option<Profile>| async move {
		Ok::<_, std::io::Error>(match profile {
			Some(_) => Verified::User { user: grant.access_token.expose().to_owned(), info: None },
			None => Verified::Rejected { info: Some(AuthInfo::message("Profile skipped.")) },
		})
	};
	let outcome = strategy
		.authenticate(
			code_callback("valid-code").with_session(AuthorizationSession::default()),
			&verify,
		)
		.await
		.expect("Login should complete.");

	token.assert_async().await;

	assert!(matches!(
		outcome,
		AuthOutcome::Fail { info: Some(AuthInfo { message: Some(ref message) }), status: None }
			if message == "Profile skipped."
	));
}

#[tokio::test]
async fn token_request_replays_stored_session() {
	let server = MockServer::start_async().await;
	let strategy = build_reqwest_test_strategy(
		config_builder(&server)
			.state(true)
			.pkce(true)
			.skip_user_profile(true)
			.build()
			.expect("Config should build."),
	);
	let callback_url =
		Url::parse("https://app.example/auth/mailru/popup").expect("Callback URL should parse.");
	let redirect =
		strategy.authorize(&AuthorizeOptions::default().with_callback_url(callback_url.clone()));
	let session = redirect.session;
	let state = session.state.clone().expect("State should be generated.");
	let verifier = session
		.pkce_verifier
		.as_ref()
		.map(|verifier| verifier.expose().to_owned())
		.expect("PKCE verifier should be generated.");

	assert_eq!(session.redirect_uri.as_ref(), Some(&callback_url));

	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "valid-code")
				.form_urlencoded_tuple("code_verifier", verifier.as_str())
				.form_urlencoded_tuple("redirect_uri", callback_url.as_str())
				.form_urlencoded_tuple("client_id", CLIENT_ID)
				.form_urlencoded_tuple("client_secret", CLIENT_SECRET);
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let request = AuthenticateRequest::new(CallbackParams {
		code: Some("valid-code".into()),
		state: Some(state),
		..Default::default()
	})
	.with_session(session);
	let outcome =
		strategy.authenticate(request, &verify_token).await.expect("Login should succeed.");

	token.assert_async().await;

	assert!(matches!(
		outcome,
		AuthOutcome::Success { ref user, info: None } if user == ACCESS_TOKEN
	));
}

#[tokio::test]
async fn basic_client_auth_sends_credentials_in_header() {
	let server = MockServer::start_async().await;
	let strategy = build_reqwest_test_strategy(
		config_builder(&server)
			.client_auth_method(ClientAuthMethod::ClientSecretBasic)
			.skip_user_profile(true)
			.build()
			.expect("Config should build."),
	);
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("authorization", BASIC_AUTHORIZATION)
				.form_urlencoded_tuple("code", "valid-code")
				.form_urlencoded_tuple("redirect_uri", "https://app.example/auth/mailru/callback");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let outcome = strategy
		.authenticate(code_callback("valid-code"), &verify_token)
		.await
		.expect("Login should succeed.");

	token.assert_async().await;

	assert!(matches!(outcome, AuthOutcome::Success { .. }));
}
