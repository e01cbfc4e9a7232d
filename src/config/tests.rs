use clap::Parser;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_local_development_friendly() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.store.backend, StoreBackend::Memory);
    assert_eq!(
        settings.storage.backend,
        StorageBackend::Local {
            directory: PathBuf::from(DEFAULT_UPLOAD_DIR)
        }
    );
    assert_eq!(
        settings.storage.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert_eq!(settings.admin.session_ttl_hours.get(), 24);
    assert_eq!(settings.admin.password, None);
    assert_eq!(settings.site.preview_chars.get(), 150);
    assert_eq!(settings.mail.api_key, None);
}

#[test]
fn store_url_implies_rest_backend_with_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.store.url = Some("https://solar.example-rtdb.test/root".to_string());
    raw.store.auth = Some("  ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    match settings.store.backend {
        StoreBackend::Rest { base_url, auth } => {
            assert_eq!(base_url.as_str(), "https://solar.example-rtdb.test/root/");
            assert_eq!(auth, None);
        }
        other => panic!("unexpected backend {other:?}"),
    }
}

#[test]
fn rest_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.store.backend = Some("rest".to_string());

    let err = Settings::from_raw(raw).expect_err("missing url");
    assert!(matches!(err, LoadError::Invalid { key: "store.url", .. }));
}

#[test]
fn unknown_store_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.store.backend = Some("sqlite".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(matches!(err, LoadError::Invalid { key: "store.backend", .. }));
}

#[test]
fn zero_session_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.admin.session_ttl_hours = Some(0);

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "admin.session_ttl_hours",
            ..
        })
    ));
}

#[test]
fn bucket_url_selects_rest_storage() {
    let mut raw = RawSettings::default();
    raw.storage.bucket_url =
        Some("https://storage.example.test/v0/b/solar.appspot.com".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(
        settings.storage.backend,
        StorageBackend::Rest { .. }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["solar-leveling"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "solar-leveling",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--store-url",
        "https://override.test",
        "--log-json",
        "yes",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.store_url.as_deref(),
                Some("https://override.test")
            );
            assert_eq!(serve.overrides.log_json, Some(true));
        }
    }
}
