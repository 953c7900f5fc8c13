use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.sync.concurrency = Some(4);
    raw.logging.level = Some("info".to_string());

    let overrides = SyncOverrides {
        concurrency: Some(8),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_sync_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.sync.concurrency, 8);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_cover_a_minimal_configuration() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.sync.concurrency, 1);
    assert_eq!(settings.sync.schemas_dir, PathBuf::from("schemas"));
    assert_eq!(settings.output.directory, PathBuf::from("build"));
    assert_eq!(
        settings.output.not_found_image,
        PathBuf::from("media/page-not-found.png")
    );
    assert_eq!(settings.figma.api_base_url, "https://api.figma.com");
    assert_eq!(settings.figma.image_scale, 2);
    assert!(settings.figma.token.is_none());
    assert!(!settings.sync.offline);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut raw = RawSettings::default();
    raw.sync.concurrency = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid { key: "sync.concurrency", .. })
    ));
}

#[test]
fn excessive_concurrency_is_rejected() {
    let mut raw = RawSettings::default();
    raw.sync.concurrency = Some(1000);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn image_scale_is_bounded() {
    let mut raw = RawSettings::default();
    raw.figma.image_scale = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.figma.image_scale = Some(9);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_credentials_normalize_to_absent() {
    let mut raw = RawSettings::default();
    raw.figma.token = Some("   ".to_string());
    raw.confluence.base_url = Some(String::new());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.figma.token.is_none());
    assert!(settings.confluence.base_url.is_none());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = SyncOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_sync_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_sync_command() {
    let args = CliArgs::parse_from(["vetrina"]);
    assert!(args.command.is_none());
}

#[test]
fn parse_sync_arguments() {
    let args = CliArgs::parse_from([
        "vetrina",
        "sync",
        "--schemas-dir",
        "/tmp/schemas",
        "--concurrency",
        "8",
        "--offline",
        "--skip-upload",
        "--only",
        "order",
        "--only",
        "invoice",
    ]);

    match args.command.expect("sync command") {
        Command::Sync(sync) => {
            assert_eq!(
                sync.overrides.schemas_dir.as_deref(),
                Some(std::path::Path::new("/tmp/schemas"))
            );
            assert_eq!(sync.overrides.concurrency, Some(8));
            assert_eq!(sync.overrides.offline, Some(true));
            assert_eq!(sync.overrides.skip_upload, Some(true));
            assert_eq!(sync.overrides.skip_page_update, None);
            assert_eq!(sync.only, ["order", "invoice"]);
        }
        Command::Check(_) => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_check_arguments() {
    let args = CliArgs::parse_from(["vetrina", "check", "--schemas-dir", "/tmp/schemas"]);

    match args.command.expect("check command") {
        Command::Check(check) => {
            assert_eq!(
                check.overrides.schemas_dir.as_deref(),
                Some(std::path::Path::new("/tmp/schemas"))
            );
            assert!(check.only.is_empty());
        }
        Command::Sync(_) => panic!("wrong command parsed"),
    }
}
