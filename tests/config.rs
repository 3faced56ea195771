// ABOUTME: Integration tests for profile parsing and connection config assembly.
// ABOUTME: Tests YAML parsing, env var indirection, discovery, and target merging.

use sshfile::config::*;
use sshfile::error::Error;
use std::path::PathBuf;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_empty_profile() {
        let profile = Profile::from_yaml("").unwrap();
        assert!(profile.user.is_none());
        assert!(profile.password.is_none());
    }

    #[test]
    fn parse_full_profile() {
        let yaml = r#"
user: deploy
port: 2222
password: hunter2
key_path: /keys/id_rsa
host_key:
  policy: known_hosts
  path: /tmp/known_hosts
  trust_on_first_use: false
connect_timeout: 10s
command_timeout: 2m
"#;
        let profile = Profile::from_yaml(yaml).unwrap();
        assert_eq!(profile.user.as_deref(), Some("deploy"));
        assert_eq!(profile.port, Some(2222));
        assert_eq!(
            profile.password,
            Some(EnvValue::Literal("hunter2".to_string()))
        );
        assert_eq!(profile.key_path, Some(PathBuf::from("/keys/id_rsa")));
        assert_eq!(
            profile.host_key,
            Some(HostKeyPolicy::strict_known_hosts(Some(PathBuf::from(
                "/tmp/known_hosts"
            ))))
        );
        assert_eq!(profile.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(profile.command_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn parse_host_key_policies() {
        let profile = Profile::from_yaml("host_key:\n  policy: insecure\n").unwrap();
        assert_eq!(profile.host_key, Some(HostKeyPolicy::Insecure));

        let profile = Profile::from_yaml(
            "host_key:\n  policy: fingerprint\n  fingerprint: SHA256:abc\n",
        )
        .unwrap();
        assert_eq!(profile.host_key, Some(HostKeyPolicy::pinned("SHA256:abc")));

        let profile = Profile::from_yaml("host_key:\n  policy: known_hosts\n").unwrap();
        assert_eq!(profile.host_key, Some(HostKeyPolicy::default()));
    }

    #[test]
    fn reject_unknown_fields() {
        let err = Profile::from_yaml("hostname: typo.example.com\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)), "got {:?}", err);
    }

    #[test]
    fn reject_host_in_profile() {
        // The host is always the command-line target.
        let err = Profile::from_yaml("host: files.example.com\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)), "got {:?}", err);
    }

    #[test]
    fn reject_bad_duration() {
        assert!(Profile::from_yaml("command_timeout: soon\n").is_err());
    }
}

mod env_values {
    use super::*;

    fn target() -> Target {
        "u@h".parse().unwrap()
    }

    #[test]
    fn password_from_env() {
        let profile = Profile::from_yaml(
            "password:\n  env: SSHFILE_TEST_PASSWORD\n",
        )
        .unwrap();
        temp_env::with_var("SSHFILE_TEST_PASSWORD", Some("from_environment"), || {
            let config = profile.connection_config(&target(), "/tmp/x").unwrap();
            assert_eq!(config.password.as_deref(), Some("from_environment"));
        });
    }

    #[test]
    fn password_env_default() {
        let profile = Profile::from_yaml(
            "password:\n  env: SSHFILE_TEST_UNSET\n  default: fallback\n",
        )
        .unwrap();
        temp_env::with_var_unset("SSHFILE_TEST_UNSET", || {
            let config = profile.connection_config(&target(), "/tmp/x").unwrap();
            assert_eq!(config.password.as_deref(), Some("fallback"));
        });
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let profile = Profile::from_yaml(
            "password:\n  env: SSHFILE_TEST_MISSING\n",
        )
        .unwrap();
        temp_env::with_var_unset("SSHFILE_TEST_MISSING", || {
            let err = profile.connection_config(&target(), "/tmp/x").unwrap_err();
            assert!(
                matches!(err, Error::MissingEnvVar(ref var) if var == "SSHFILE_TEST_MISSING"),
                "got {:?}",
                err
            );
        });
    }

    #[test]
    fn debug_does_not_leak_literal_password() {
        let profile = Profile::from_yaml("password: hunter2\n").unwrap();
        assert!(!format!("{:?}", profile).contains("hunter2"));
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_yml_then_yaml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Profile::discover(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(PROFILE_FILENAME_ALT), "user: alt\n").unwrap();
        let profile = Profile::discover(dir.path()).unwrap().unwrap();
        assert_eq!(profile.user.as_deref(), Some("alt"));

        std::fs::write(dir.path().join(PROFILE_FILENAME), "user: main\n").unwrap();
        let profile = Profile::discover(dir.path()).unwrap().unwrap();
        assert_eq!(profile.user.as_deref(), Some("main"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Profile::load(std::path::Path::new("/nonexistent/sshfile.yml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "got {:?}", err);
    }
}

mod merging {
    use super::*;

    #[test]
    fn target_overrides_profile() {
        let profile = Profile::from_yaml("user: alice\nport: 2200\n").unwrap();
        let target: Target = "bob@b:2222".parse().unwrap();
        let config = profile
            .connection_config(&target, "/etc/motd")
            .unwrap();
        assert_eq!(config.host, "b");
        assert_eq!(config.user, "bob");
        assert_eq!(config.port, 2222);
        assert_eq!(config.remote_path, "/etc/motd");
    }

    #[test]
    fn profile_fills_what_target_omits() {
        let profile = Profile::from_yaml(
            "user: alice\nport: 2200\ncommand_timeout: 5s\nhost_key:\n  policy: insecure\n",
        )
        .unwrap();
        let target: Target = "b".parse().unwrap();
        let config = profile.connection_config(&target, "/x").unwrap();
        assert_eq!(config.user, "alice");
        assert_eq!(config.port, 2200);
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, default_connect_timeout());
        assert_eq!(config.host_key, HostKeyPolicy::Insecure);
    }

    #[test]
    fn user_falls_back_to_login_name() {
        let target: Target = "b".parse().unwrap();
        temp_env::with_var("USER", Some("loginname"), || {
            let config = Profile::default()
                .connection_config(&target, "/x")
                .unwrap();
            assert_eq!(config.user, "loginname");
            assert_eq!(config.port, DEFAULT_PORT);
        });
    }

    #[test]
    fn key_path_expands_home() {
        let profile = Profile::from_yaml("key_path: ~/.ssh/id_rsa\n").unwrap();
        let target: Target = "u@h".parse().unwrap();
        temp_env::with_var("HOME", Some("/home/tester"), || {
            let config = profile.connection_config(&target, "/x").unwrap();
            assert_eq!(
                config.key_path,
                Some(PathBuf::from("/home/tester/.ssh/id_rsa"))
            );
        });
    }
}
