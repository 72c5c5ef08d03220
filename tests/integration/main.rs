//! Integration tests for Segforge

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn segforge() -> Command {
        cargo_bin_cmd!("segforge")
    }

    /// Command bound to a config file inside `dir`
    fn isolated(dir: &Path, config: &str) -> Command {
        let path = dir.join("config.toml");
        std::fs::write(&path, config).unwrap();
        let mut cmd = segforge();
        cmd.env("SEGFORGE_CONFIG", &path);
        cmd
    }

    fn artifact_config(dir: &Path, encoder: &str) -> String {
        format!(
            "[cache]\nartifact_dir = {:?}\n\n[encoder]\nbinary = {:?}\n",
            dir.join("artifacts").display().to_string(),
            encoder
        )
    }

    #[test]
    fn help_displays() {
        segforge()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("on-demand media segment transcoder"));
    }

    #[test]
    fn version_displays() {
        segforge()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("segforge"));
    }

    #[test]
    fn config_path() {
        segforge()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        isolated(temp.path(), "")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("capacity = 50"));
    }

    #[test]
    fn invalid_config_rejected() {
        let temp = TempDir::new().unwrap();
        isolated(temp.path(), "[cache]\ncapacity = 0\n")
            .args(["profiles"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn profiles_lists_builtins_and_overrides() {
        let temp = TempDir::new().unwrap();
        let config = "[profiles.1080p]\nwidth = 1920\nheight = 1080\n\
                      video_bitrate_kbps = 4500\naudio_bitrate_kbps = 192\n\
                      video_codec = \"libx264\"\naudio_codec = \"aac\"\n\
                      fps = 30.0\naudio_sample_rate = 48000\n";
        isolated(temp.path(), config)
            .arg("profiles")
            .assert()
            .success()
            .stdout(predicate::str::contains("480p"))
            .stdout(predicate::str::contains("1920x1080"))
            .stdout(predicate::str::contains("Total: 5 profile(s)"));
    }

    #[test]
    fn fingerprint_is_stable() {
        let temp = TempDir::new().unwrap();
        let run = || {
            let output = isolated(temp.path(), "")
                .args(["fingerprint", "https://media.example.com/a.mkv", "-s", "10", "-d", "5"])
                .output()
                .unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap()
        };

        let first = run();
        assert_eq!(first, run());
        let hex = first.lines().next().unwrap();
        assert_eq!(hex.len(), 64);
        assert!(first.contains(&format!("{}.mp4", hex)));
    }

    #[test]
    fn fingerprint_unknown_profile_fails() {
        let temp = TempDir::new().unwrap();
        isolated(temp.path(), "")
            .args(["fingerprint", "x.mkv", "--profile", "8k"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown profile: 8k"))
            .stderr(predicate::str::contains("segforge profiles"));
    }

    #[test]
    fn zero_duration_rejected() {
        let temp = TempDir::new().unwrap();
        isolated(temp.path(), "")
            .args(["fingerprint", "x.mkv", "--start", "4", "--duration", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("duration must be positive"));
    }

    #[test]
    fn missing_encoder_reports_hint() {
        let temp = TempDir::new().unwrap();
        let config = artifact_config(temp.path(), "segforge-no-such-encoder");
        isolated(temp.path(), &config)
            .args(["transcode", "x.mkv", "-s", "0", "-d", "2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to launch encoder"))
            .stderr(predicate::str::contains("encoder.binary"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        let config = artifact_config(temp.path(), "ffmpeg");
        isolated(temp.path(), &config)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No artifacts"));
    }

    #[cfg(unix)]
    #[test]
    fn transcode_then_rehydrate_with_stub_encoder() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let stub = temp.path().join("fake-ffmpeg");
        std::fs::write(
            &stub,
            "#!/bin/sh\nfor last; do :; done\nprintf segment > \"$last\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();
        let config = artifact_config(temp.path(), &stub.display().to_string());

        let args = ["transcode", "file:///movie.mkv", "-s", "10", "-d", "5", "--json"];
        isolated(temp.path(), &config)
            .args(args)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"outcome\": \"encoded\""))
            .stdout(predicate::str::contains("video/mp4"));

        isolated(temp.path(), &config)
            .args(args)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"outcome\": \"rehydrated\""));

        isolated(temp.path(), &config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".mp4"));

        isolated(temp.path(), &config)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("removed 1 file(s)"));
    }
}

mod transcoder_tests {
    use async_trait::async_trait;
    use segforge::config::Config;
    use segforge::encoder::{EncodePlan, Encoder};
    use segforge::job::ProfileRegistry;
    use segforge::{Container, Job, MediaSelector, SegforgeResult, ServeOutcome, Transcoder, Window};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingEncoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Encoder for CountingEncoder {
        async fn encode(&self, plan: &EncodePlan) -> SegforgeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            tokio::fs::write(&plan.output, b"segment").await.unwrap();
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn job(start: f64) -> Job {
        let profile = ProfileRegistry::builtin().get("360p").unwrap().clone();
        Job::new(
            "https://media.example.com/movie.mkv",
            Window::from_parts(start, 4.0).unwrap(),
            profile,
            MediaSelector::Video,
            Container::FragmentedMp4,
            false,
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_encode() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.artifact_dir = Some(temp.path().to_path_buf());
        let encoder = Arc::new(CountingEncoder::default());
        let transcoder = Transcoder::new(&config, encoder.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let transcoder = transcoder.clone();
                tokio::spawn(async move { transcoder.serve(&job(12.0)).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap().unwrap().outcome);
        }

        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcomes.iter().filter(|o| **o == ServeOutcome::Encoded).count(),
            1
        );
    }

    #[tokio::test]
    async fn lease_keeps_file_through_eviction() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.capacity = 1;
        config.cache.artifact_dir = Some(temp.path().to_path_buf());
        let transcoder = Transcoder::new(&config, Arc::new(CountingEncoder::default()));

        let lease = transcoder.checkout(&job(0.0)).await.unwrap();
        transcoder.serve(&job(4.0)).await.unwrap();

        assert!(lease.path().exists());
        assert_eq!(transcoder.stats().cache.spared, 1);
    }
}
