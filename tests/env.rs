use std::fs;

use balista::error::DeployError;
use balista::{Answers, EnvConfig};

#[test]
fn no_template_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();

    let port = EnvConfig::new()
        .configure(dir.path(), None, &mut Answers::new())
        .unwrap();

    assert!(port.is_none());
    assert!(!dir.path().join(".env").exists());
}

#[test]
fn empty_answer_defaults_to_5000() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env_example"), "DB_URL=postgres://db\n").unwrap();

    let port = EnvConfig::new()
        .configure(dir.path(), None, &mut Answers::new().answer(""))
        .unwrap();

    assert_eq!(port, Some(5000));
    let env = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(env.lines().last(), Some("EXTERNAL_PORT=5000"));
}

#[test]
fn template_content_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let template = "# settings\nA=1\n\nB=\"two words\"\n";
    fs::write(dir.path().join(".env_example"), template).unwrap();

    EnvConfig::new()
        .configure(dir.path(), Some("8080"), &mut Answers::new())
        .unwrap();

    let env = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(env, format!("{template}EXTERNAL_PORT=8080\n"));
    assert_eq!(
        fs::read_to_string(dir.path().join(".env_example")).unwrap(),
        template
    );
}

#[test]
fn template_without_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env_example"), "A=1").unwrap();

    EnvConfig::new()
        .configure(dir.path(), Some("3000"), &mut Answers::new())
        .unwrap();

    let env = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(env, "A=1\nEXTERNAL_PORT=3000\n");
}

#[test]
fn prompted_port_is_used() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env_example"), "").unwrap();

    let port = EnvConfig::new()
        .configure(dir.path(), None, &mut Answers::new().answer(" 7000 "))
        .unwrap();

    assert_eq!(port, Some(7000));
    let env = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(env, "EXTERNAL_PORT=7000\n");
}

#[test]
fn invalid_port_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env_example"), "A=1\n").unwrap();

    let err = EnvConfig::new()
        .configure(dir.path(), Some("eighty"), &mut Answers::new())
        .unwrap_err();

    assert!(matches!(err, DeployError::InvalidPort(p) if p == "eighty"));
}

#[test]
fn custom_file_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env.example"), "X=1\n").unwrap();

    let port = EnvConfig::new()
        .template(".env.example")
        .output(".env.production")
        .configure(dir.path(), Some("8000"), &mut Answers::new())
        .unwrap();

    assert_eq!(port, Some(8000));
    assert!(dir.path().join(".env.production").exists());
    assert!(!dir.path().join(".env").exists());
}

#[cfg(unix)]
#[test]
fn output_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env_example"), "SECRET=x\n").unwrap();

    EnvConfig::new()
        .configure(dir.path(), Some("8000"), &mut Answers::new())
        .unwrap();

    let mode = fs::metadata(dir.path().join(".env"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}
