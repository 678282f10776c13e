use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_color_sensor_cli"))
}

/// Config with short timings so the demo finishes quickly on the system clock
fn write_fast_config(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "color-sensor-{}-{}.json",
        name,
        std::process::id()
    ));
    let config = serde_json::json!({
        "timing": {
            "settle_ms": 1,
            "edge_timeout_ms": 20,
            "cycle_delay_ms": 0,
            "stabilization_ms": 0
        }
    });
    std::fs::write(&path, config.to_string()).expect("write config");
    path
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8(stdout.to_vec())
        .expect("stdout utf8")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

#[test]
fn demo_emits_calibration_and_detection_events() {
    let config = write_fast_config("demo");
    let output = cli()
        .args([
            "demo",
            "--samples",
            "red,green,blue,black",
            "--json",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("demo command");

    assert!(
        output.status.success(),
        "demo exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let events = json_lines(&output.stdout);
    let steps: Vec<&Value> = events
        .iter()
        .filter(|e| e["event"] == "calibration")
        .map(|e| &e["step"])
        .collect();
    assert_eq!(steps, vec!["white", "red", "green", "blue"]);

    let colors: Vec<&str> = events
        .iter()
        .filter(|e| e["event"] == "detection")
        .map(|e| e["classification"]["color"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(colors, vec!["red", "green", "blue", "unknown"]);

    let last = events.last().expect("at least one event");
    assert_eq!(last["cycle"], 4);
    assert_eq!(last["ratios"]["red"], 0.0);

    let _ = std::fs::remove_file(config);
}

#[test]
fn demo_cycles_over_samples() {
    let config = write_fast_config("cycles");
    let output = cli()
        .args([
            "demo",
            "--samples",
            "green",
            "--cycles",
            "2",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("demo command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert_eq!(stdout.matches("Detected color: Green").count(), 2);
    assert_eq!(stdout.matches("Normalized ratios:").count(), 2);
    assert!(stdout.contains("WHITE captured:"));
    assert!(stdout.contains("Completed 2 detection cycles"));

    let _ = std::fs::remove_file(config);
}

#[test]
fn interactive_demo_aborts_without_confirmation() {
    let config = write_fast_config("abort");
    let output = cli()
        .args([
            "demo",
            "--interactive",
            "--json",
            "--config",
            config.to_str().unwrap(),
        ])
        .stdin(Stdio::null())
        .output()
        .expect("demo command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Calibration aborted"),
        "unexpected stderr: {stderr}"
    );
    assert!(json_lines(&output.stdout).is_empty());

    let _ = std::fs::remove_file(config);
}

#[cfg(unix)]
#[test]
fn interrupt_during_interactive_calibration_exits() {
    let config = write_fast_config("interrupt");
    let mut child = cli()
        .args(["demo", "--interactive", "--config", config.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn demo");
    // held open so the prompt keeps waiting
    let stdin = child.stdin.take();

    let (tx, rx) = mpsc::channel();
    let stderr = child.stderr.take().expect("stderr piped");
    let reader = std::thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            let _ = tx.send(line);
        }
    });

    let mut lines = Vec::new();
    loop {
        let line = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("prompt before timeout");
        let prompted = line.contains("Place WHITE reference");
        lines.push(line);
        if prompted {
            break;
        }
    }

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("send SIGINT");
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let exit = loop {
        if let Some(exit) = child.try_wait().expect("poll child") {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("demo still running after SIGINT: {:?}", lines);
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    drop(stdin);
    reader.join().expect("stderr reader");
    lines.extend(rx.try_iter());

    assert_eq!(exit.code(), Some(1), "stderr: {:?}", lines);
    let stderr = lines.join("\n");
    assert!(stderr.contains("Calibration aborted at WHITE step"), "{stderr}");
    assert_eq!(stderr.matches("Pin interface released").count(), 1, "{stderr}");

    let _ = std::fs::remove_file(config);
}

#[test]
fn unknown_swatch_is_rejected() {
    let output = cli()
        .args(["demo", "--samples", "purple"])
        .output()
        .expect("demo command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown swatch"), "unexpected stderr: {stderr}");
}

#[test]
fn dump_config_reflects_overrides() {
    let config = write_fast_config("dump");
    let output = cli()
        .args(["dump-config", "--config", config.to_str().unwrap()])
        .output()
        .expect("dump-config command");

    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["timing"]["edge_timeout_ms"], 20);
    assert_eq!(json["timing"]["settle_ms"], 1);
    assert_eq!(json["acquisition"]["samples_per_channel"], 10);
    assert_eq!(json["pins"]["out"], 8);

    let _ = std::fs::remove_file(config);
}
