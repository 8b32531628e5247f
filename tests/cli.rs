use assert_cmd::Command;

fn halftype() -> Command {
    let mut cmd = Command::cargo_bin("halftype").unwrap();
    cmd.env("HALFTYPE_LOG", std::env::temp_dir().join("halftype-cli-test.log"));
    cmd
}

#[test]
fn help_lists_subcommand_and_flags() {
    let output = halftype().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("settings"));
    assert!(text.contains("--api-url"));
    assert!(text.contains("--registration-number"));
}

#[test]
fn settings_set_rejects_zero_half_time() {
    let output = halftype()
        .args([
            "--api-url",
            "http://127.0.0.1:9/api",
            "settings",
            "set",
            "--half-time",
            "0",
            "--break-time",
            "5",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("half time"));
}

#[test]
fn settings_show_fails_without_backend() {
    let output = halftype()
        .args(["--api-url", "http://127.0.0.1:9/api", "settings", "show"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not fetch settings"));
}

#[test]
fn non_http_url_is_rejected() {
    let output = halftype()
        .args(["--api-url", "ftp://example.org", "settings", "show"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot use backend"));
}

#[test]
fn unknown_department_is_rejected_before_the_tui() {
    let output = halftype()
        .args(["--api-url", "http://127.0.0.1:9/api", "-d", "Astrology"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown department"));
}
