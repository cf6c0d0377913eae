//! Integration tests for Swatch

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

    /// Command isolated from the user's real config and state directories
    fn swatch(home: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("swatch");
        cmd.env_remove("SWATCH_CONFIG")
            .env("HOME", home)
            .env("XDG_CONFIG_HOME", home.join("config"))
            .env("XDG_STATE_HOME", home.join("state"))
            .env("XDG_DATA_HOME", home.join("data"));
        cmd
    }

    /// Write a config using the local store and file backends under `home`
    fn write_local_config(home: &Path) -> std::path::PathBuf {
        let path = home.join("swatch.toml");
        let content = format!(
            r#"
[general]
ledger = true

[cache]
backend = "file"
dir = {cache:?}

[lock]
backend = "file"
dir = {locks:?}

[store]
backend = "local"
dir = {store:?}
gateway = "https://gateway.test/ipfs/"
"#,
            cache = home.join("cache").display().to_string(),
            locks = home.join("locks").display().to_string(),
            store = home.join("store").display().to_string(),
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        swatch(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("content-addressed colour swatches"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        swatch(home.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("swatch"));
    }

    #[test]
    fn render_writes_png_file() {
        let home = TempDir::new().unwrap();
        let out = home.path().join("swatch.png");

        swatch(home.path())
            .args(["render", "#1a2b3c", "-o"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("1A2B3C"));

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn render_to_stdout_is_deterministic() {
        let home = TempDir::new().unwrap();
        let first = swatch(home.path())
            .args(["render", "C0FFEE"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let second = swatch(home.path())
            .args(["render", "c0ffee"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        assert!(first.starts_with(PNG_SIGNATURE));
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_color_fails_with_hint() {
        let home = TempDir::new().unwrap();
        swatch(home.path())
            .args(["render", "not-a-colour"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid colour code"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        swatch(home.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        swatch(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("swatch:img.lock:"));
    }

    #[test]
    fn config_init_then_set() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("custom.toml");

        swatch(home.path())
            .args(["config", "init"])
            .env("SWATCH_CONFIG", &path)
            .assert()
            .success();
        assert!(path.exists());

        swatch(home.path())
            .args(["config", "set", "store.backend", "local"])
            .env("SWATCH_CONFIG", &path)
            .assert()
            .success();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("backend = \"local\""));
    }

    #[test]
    fn config_set_rejects_shared_prefix() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("custom.toml");

        swatch(home.path())
            .args(["config", "set", "mint.lock_prefix", "swatch:img:"])
            .env("SWATCH_CONFIG", &path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("must differ"));
        assert!(!path.exists());
    }

    #[test]
    fn config_set_rejects_upload_timeout_beyond_lease() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("custom.toml");

        swatch(home.path())
            .args(["config", "set", "store.timeout_secs", "30"])
            .env("SWATCH_CONFIG", &path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("mint.lock_ttl_secs"));
        assert!(!path.exists());
    }

    #[test]
    fn invalid_config_file_fails_mint() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("broken.toml");
        std::fs::write(&path, "[mint]\nlock_ttl_secs = 0\n").unwrap();

        swatch(home.path())
            .args(["--config"])
            .arg(&path)
            .args(["mint", "1A2B3C"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("lock_ttl_secs"))
            .stderr(predicate::str::contains("swatch config show"));
    }

    #[test]
    fn lookup_before_mint_fails() {
        let home = TempDir::new().unwrap();
        let config = write_local_config(home.path());

        swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["lookup", "1A2B3C"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No CID cached"));
    }

    #[test]
    fn mint_then_lookup_returns_same_cid() {
        let home = TempDir::new().unwrap();
        let config = write_local_config(home.path());

        let minted = swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["mint", "#1a2b3c"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("bafkrei"))
            .get_output()
            .stdout
            .clone();
        let cid = String::from_utf8(minted).unwrap().trim().to_string();

        // Second mint is served from the cache
        swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["mint", "1A2B3C"])
            .assert()
            .success()
            .stdout(format!("{}\n", cid));

        swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["lookup", "1a2b3c", "--url"])
            .assert()
            .success()
            .stdout(format!("https://gateway.test/ipfs/{}\n", cid));

        assert!(home.path().join("store").join("blobs").join(&cid).exists());
        if !cfg!(target_os = "linux") {
            return;
        }
        let ledger = home.path().join("state").join("swatch").join("ledger.jsonl");
        let lines = std::fs::read_to_string(ledger).unwrap();
        assert_eq!(lines.lines().count(), 1);
        assert!(lines.contains(&cid));
    }

    #[test]
    fn cache_clear_forces_republish_of_same_cid() {
        let home = TempDir::new().unwrap();
        let config = write_local_config(home.path());

        let first = swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["mint", "00FF00"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 cache entry"));

        swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["lookup", "00FF00"])
            .assert()
            .failure();

        swatch(home.path())
            .args(["--config"])
            .arg(&config)
            .args(["mint", "00FF00"])
            .assert()
            .success()
            .stdout(String::from_utf8(first).unwrap());
    }

    #[test]
    fn completions_generate() {
        let home = TempDir::new().unwrap();
        swatch(home.path())
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("swatch"));
    }
}
