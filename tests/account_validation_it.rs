// self
use vault_account::{
	_preludet::*,
	account::{CasMode, NewAccount, ValidationError},
};

#[test]
fn scenario_a_minimum_config_validates() {
	let account = NewAccount {
		vault: Some("http://vault:1111".into()),
		secret_engine_path: "engine".into(),
		secret_path: "secret".into(),
		insecure_skip_cas: true,
		cas_value: 0,
	};
	let request = account.validate().expect("Scenario A should validate.");

	assert_eq!(request.endpoint().host_str(), Some("vault"));
	assert_eq!(request.endpoint().port(), Some(1111));
	assert_eq!(request.cas(), CasMode::SkipCheck);
}

#[test]
fn scenario_b_missing_or_schemeless_endpoint_is_rejected() {
	let mut account = minimum_valid_new_account();

	account.vault = None;

	let err = account.validate().expect_err("Missing endpoint must be rejected.");

	assert_eq!(err, ValidationError::InvalidEndpoint);
	assert_eq!(err.to_string(), "invalid vault url");

	account.vault = Some("noscheme".into());

	assert_eq!(
		account.validate().map_err(|e| e.to_string()),
		Err("invalid vault url".to_owned())
	);
}

#[test]
fn scenario_c_empty_locations_are_rejected() {
	let cases = [("engine", ""), ("", "secret"), ("", "")];

	for (engine, secret) in cases {
		let mut account = minimum_valid_new_account();

		account.secret_engine_path = engine.into();
		account.secret_path = secret.into();

		let err = account.validate().expect_err("Empty locations must be rejected.");

		assert_eq!(err, ValidationError::InvalidSecretLocation);
		assert_eq!(err.to_string(), "invalid secret location");
	}
}

#[test]
fn scenario_d_cas_consistency() {
	let mut account = minimum_valid_new_account();

	account.insecure_skip_cas = true;
	account.cas_value = 1;

	let err = account.validate().expect_err("SkipCheck with a version must be rejected.");

	assert_eq!(err, ValidationError::InvalidCas);
	assert_eq!(err.to_string(), "invalid cas");

	account.insecure_skip_cas = false;

	assert_eq!(account.validate().map(|request| request.cas()), Ok(CasMode::Enforced(1)));

	account.cas_value = 0;

	assert_eq!(account.validate().map(|request| request.cas()), Ok(CasMode::Enforced(0)));

	account.insecure_skip_cas = true;

	assert_eq!(account.validate().map(|request| request.cas()), Ok(CasMode::SkipCheck));
}

#[test]
fn validation_is_idempotent() {
	let mut invalid = minimum_valid_new_account();

	invalid.insecure_skip_cas = true;
	invalid.cas_value = 5;

	for account in [minimum_valid_new_account(), invalid] {
		assert_eq!(account.validate(), account.validate());
	}
}
