// ==============================
// tests/unit/config_tests.rs
// ==============================
//! Settings loading across defaults, file, and environment.
use backend_lib::config::{BackendMode, Settings};

#[test]
fn environment_overrides_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "rehabdesk.toml",
            r#"
log_level = "debug"

[rate_limit]
max_login_attempts = 2
"#,
        )?;
        jail.set_env("REHABDESK_LOG_LEVEL", "trace");

        let settings = Settings::load_from(jail.directory().join("rehabdesk.toml"))
            .expect("settings should load");
        assert_eq!(settings.log_level, "trace");
        assert_eq!(settings.rate_limit.max_login_attempts, 2);
        Ok(())
    });
}

#[test]
fn nested_environment_keys_use_double_underscore() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("REHABDESK_BACKEND__MODE", "hosted");
        jail.set_env("REHABDESK_BACKEND__URL", "https://example.supabase.co");
        jail.set_env("REHABDESK_BACKEND__ANON_KEY", "anon");

        let settings = Settings::load_from("absent.toml").expect("settings should load");
        assert_eq!(settings.backend.mode, BackendMode::Hosted);
        assert_eq!(
            settings.backend.url.as_deref(),
            Some("https://example.supabase.co")
        );
        Ok(())
    });
}

#[test]
fn demo_credentials_default_to_the_known_pair() {
    let settings = Settings::default();
    assert_eq!(settings.demo.email, "tajademeh@outlook.com");
    assert_eq!(settings.demo.password, "admin@123");
}
