//! Integration tests for the packwright binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const METADATA: &str = r#"
app:
  url: https://nginx.org
pack:
  name: web
  description: Static web server
  version: 0.3.0
dependencies:
  - name: redis
    alias: cache
"#;

const VARIABLES: &str = r#"
variables:
  image:
    type: string
    description: Container image
  port:
    type: number
    default: 80
"#;

fn setup_pack() -> TempDir {
    let temp = TempDir::new().unwrap();
    let web = temp.path().join("web");
    let redis = web.join("deps").join("redis");
    fs::create_dir_all(web.join("templates")).unwrap();
    fs::create_dir_all(&redis).unwrap();
    fs::write(web.join("metadata.yaml"), METADATA).unwrap();
    fs::write(web.join("variables.yaml"), VARIABLES).unwrap();
    fs::write(web.join("templates").join("web.nomad.tpl"), "job \"web\" {}").unwrap();
    fs::write(redis.join("metadata.yaml"), "pack:\n  name: redis\n").unwrap();
    fs::write(
        redis.join("variables.yaml"),
        "variables:\n  port:\n    default: 6379\n",
    )
    .unwrap();
    temp
}

/// A command isolated from the user's config, cache and overrides.
fn packwright(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("packwright"));
    cmd.env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env("XDG_CACHE_HOME", temp.path().join("xdg-cache"))
        .env_remove("PACKWRIGHT_CACHE_DIR")
        .env_remove("RUST_LOG")
        .arg("--cache-dir")
        .arg(temp.path().join("cache"));
    cmd
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("packwright"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("resolve packs and their variables"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("packwright"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn info_describes_pack() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["info", "web", "--ignore-missing-vars", "--path"])
        .arg(temp.path().join("web"));
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("1 required variable(s) left unset"))
        .stdout(predicate::str::contains("Pack Name          web"))
        .stdout(predicate::str::contains("Version            0.3.0"))
        .stdout(predicate::str::contains(
            "\"image\" (string: required) - Container image",
        ))
        .stdout(predicate::str::contains("Pack \"web.cache\" Variables:"));
    Ok(())
}

#[test]
fn info_fails_on_missing_required() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["info", "web", "--path"]).arg(temp.path().join("web"));
    cmd.assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error[missing-required]"));
    Ok(())
}

#[test]
fn info_fails_on_ill_typed_default() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    fs::write(
        temp.path().join("web").join("variables.yaml"),
        "variables:\n  port:\n    type: number\n    default: eighty\n",
    )?;
    let mut cmd = packwright(&temp);
    cmd.args(["info", "web", "--ignore-missing-vars", "--path"])
        .arg(temp.path().join("web"));
    cmd.assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error[type-mismatch]"));
    Ok(())
}

#[test]
fn quiet_hides_warnings() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--quiet", "--ignore-missing-vars", "--path"])
        .arg(temp.path().join("web"))
        .args(["--var", "nope=1"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("value: 80"))
        .stderr(predicate::str::is_empty());
    Ok(())
}

#[test]
fn vars_rejects_malformed_assignment() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--path"])
        .arg(temp.path().join("web"))
        .args(["--var", "image"]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid variable override"))
        .stderr(predicate::str::contains("pack reference").not());
    Ok(())
}

#[test]
fn vars_prints_yaml() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--path"])
        .arg(temp.path().join("web"))
        .args(["--var", "image=nginx", "--var", "cache.port=6380"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("value: nginx"))
        .stdout(predicate::str::contains("source: command-line"))
        .stdout(predicate::str::contains("value: 6380"));
    Ok(())
}

#[test]
fn vars_prints_json() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--format", "json", "--path"])
        .arg(temp.path().join("web"))
        .args(["--var", "image=nginx"])
        .env("PACKWRIGHT_VAR_port", "8080");

    let output = cmd.output()?;
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["web"]["port"]["value"], 8080);
    assert_eq!(json["web"]["port"]["source"], "environment");
    assert_eq!(json["web.cache"]["port"]["value"], 8080);
    assert_eq!(json["web"]["image"]["type"], "string");
    Ok(())
}

#[test]
fn vars_fails_on_missing_required() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--path"]).arg(temp.path().join("web"));
    cmd.assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error[missing-required]"));
    Ok(())
}

#[test]
fn vars_ignore_missing_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--ignore-missing-vars", "--path"])
        .arg(temp.path().join("web"));
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("warning[missing-required]"));
    Ok(())
}

#[test]
fn vars_rejects_ill_typed_value() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--path"])
        .arg(temp.path().join("web"))
        .args(["--var", "image=nginx", "--var", "web.port=[1, 2]"]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("error[type-mismatch]"));
    Ok(())
}

#[test]
fn vars_reads_scoped_var_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_pack();
    let file = temp.path().join("cache.yaml");
    fs::write(&file, "port: 7000\n")?;

    let mut cmd = packwright(&temp);
    cmd.args(["vars", "web", "--format", "json", "--path"])
        .arg(temp.path().join("web"))
        .args(["--var", "image=nginx", "--var-file"])
        .arg(format!("cache={}", file.display()));

    let output = cmd.output()?;
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["web.cache"]["port"]["value"], 7000);
    assert_eq!(json["web.cache"]["port"]["source"], "pack-file");
    assert_eq!(json["web"]["port"]["value"], 80);
    Ok(())
}

#[test]
fn missing_pack_directory_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = packwright(&temp);
    cmd.args(["info", "web", "--path"]).arg(temp.path().join("nope"));
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("error[not-found]"));
    Ok(())
}

#[test]
fn registry_list_uses_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = temp.path().join("packwright.yml");
    fs::write(
        &config,
        "registries:\n  community:\n    url: https://example.com/packs.git\n",
    )?;

    let mut cmd = packwright(&temp);
    cmd.arg("--config").arg(&config).args(["registry", "list"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "community  https://example.com/packs.git (packs)",
        ));
    Ok(())
}

#[test]
fn invalid_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = temp.path().join("packwright.yml");
    fs::write(&config, "workers: 0\n")?;

    let mut cmd = packwright(&temp);
    cmd.arg("--config").arg(&config).args(["registry", "list"]);
    cmd.assert().code(1).stderr(predicate::str::contains("workers"));
    Ok(())
}
