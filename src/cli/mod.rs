use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::engine::Controller;
use crate::engine::facade::{Channel, EventBus};
use crate::engine::session::{self, Inbound};
use crate::engine::transport::ReplayTransport;
use crate::tws::Event;
use crate::tws::messages::{read_frame, write_frame};

/// Separator between tokens in the plain-text message listings `cmd_frame` reads.
pub const TEXT_SEPARATOR: char = '|';

/// Log a timestamped message. In text mode goes to stdout; in JSON mode goes to stderr.
fn log_line(json: bool, msg: &str) {
    let ts = chrono::Local::now().format("%H:%M:%S");
    let line = format!("[{ts}] [LOG] {msg}");
    if json {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

/// One published event as a printable line.
pub fn format_event(event: &Event, json: bool) -> String {
    if json {
        return serde_json::to_string(event)
            .unwrap_or_else(|e| format!("{{\"event\":\"unserializable\",\"reason\":\"{e}\"}}"));
    }
    let ts = chrono::Local::now().format("%H:%M:%S");
    match event {
        Event::Error(err) => format!("[{ts}] [ERROR] {err}"),
        Event::Info { message, code } => format!("[{ts}] [INFO] [{code}] {message}"),
        other => format!("[{ts}] [{}] {other:?}", other.name()),
    }
}

/// Replay a capture of length-prefixed frames through a controller and print
/// every event it publishes.
pub async fn cmd_decode(path: &Path, server_version: i32, json: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening capture {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut bus = EventBus::new();
    bus.subscribe(Channel::All, move |event| println!("{}", format_event(event, json)));

    let config = Config::from_env()?;
    let controller = Controller::new(
        config,
        Box::new(ReplayTransport::new(server_version)),
        Box::new(bus),
    );

    let (tx, rx) = mpsc::channel(256);
    let handle = tokio::spawn(session::run(controller, rx));

    tx.send(Inbound::Invoke(Box::new(|c: &mut Controller| {
        // Failures are published on the error channel.
        let _ = c.connect(None);
    })))
    .await
    .map_err(|_| anyhow!("session stopped before connect"))?;

    let mut frames = 0usize;
    while let Some(tokens) =
        read_frame(&mut reader).with_context(|| format!("reading frame {}", frames + 1))?
    {
        frames += 1;
        tx.send(Inbound::Message(tokens))
            .await
            .map_err(|_| anyhow!("session stopped early at frame {frames}"))?;
    }
    drop(tx);

    let controller = handle.await.context("session task failed")?;
    info!(frames, server_version = controller.server_version(), "capture replayed");
    log_line(json, &format!("Replayed {frames} frames from {}", path.display()));
    Ok(())
}

/// Turn a text listing (one message per line, tokens separated by `|`) into a
/// capture file `cmd_decode` can replay.
pub fn cmd_frame(input: &Path, output: &Path) -> Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let out = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(out);

    let mut frames = 0usize;
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", lineno + 1))?;
        let Some(tokens) = parse_text_message(&line) else { continue };
        write_frame(&mut writer, tokens.as_slice())
            .with_context(|| format!("writing frame for line {}", lineno + 1))?;
        frames += 1;
    }

    log_line(false, &format!("Wrote {frames} frames to {}", output.display()));
    Ok(())
}

/// Tokens of one listing line. Blank lines and `#` comments yield `None`.
pub fn parse_text_message(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
        return None;
    }
    Some(trimmed.split(TEXT_SEPARATOR).map(str::to_string).collect())
}

/// Print the effective configuration.
pub fn cmd_config() -> Result<()> {
    let config = Config::from_env()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tws::ApiError;

    #[test]
    fn test_parse_text_message() {
        assert_eq!(
            parse_text_message("9|1|1001"),
            Some(vec!["9".to_string(), "1".to_string(), "1001".to_string()])
        );
        assert_eq!(
            parse_text_message("4|2|7|200||"),
            Some(vec!["4", "2", "7", "200", "", ""].into_iter().map(String::from).collect())
        );
        assert_eq!(parse_text_message("   "), None);
        assert_eq!(parse_text_message("# tick price"), None);
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tws-engine-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn test_decode_replays_capture_file() {
        let path = temp_path("replay.bin");
        {
            let mut file = File::create(&path).unwrap();
            write_frame(&mut file, &["9", "1", "1001"]).unwrap();
            write_frame(&mut file, &["49", "1", "1700000000"]).unwrap();
        }
        let result = cmd_decode(&path, 176, true).await;
        let _ = std::fs::remove_file(&path);
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_decode_missing_capture_is_an_error() {
        let err = cmd_decode(&temp_path("missing.bin"), 176, false).await.unwrap_err();
        assert!(err.to_string().contains("opening capture"));
    }

    #[test]
    fn test_frame_then_read_back() {
        let listing = temp_path("listing.txt");
        let capture = temp_path("listing.bin");
        std::fs::write(&listing, "# next id\n9|1|1001\n\n4|2|7|200|No security definition|\n").unwrap();
        cmd_frame(&listing, &capture).unwrap();

        let mut reader = BufReader::new(File::open(&capture).unwrap());
        let first = read_frame(&mut reader).unwrap().unwrap();
        let second = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(first, vec!["9", "1", "1001"]);
        assert_eq!(second.len(), 6);
        assert_eq!(read_frame(&mut reader).unwrap(), None);
        let _ = std::fs::remove_file(&listing);
        let _ = std::fs::remove_file(&capture);
    }

    #[test]
    fn test_format_event_json() {
        let line = format_event(&Event::NextValidId { order_id: 5 }, true);
        assert_eq!(line, r#"{"event":"nextValidId","order_id":5}"#);
    }

    #[test]
    fn test_format_event_text() {
        let line = format_event(&Event::Error(ApiError::new("boom", 508, -1)), false);
        assert!(line.ends_with("[ERROR] [508] boom (req -1)"));
        let line = format_event(&Event::Connected, false);
        assert!(line.ends_with("[connected] Connected"));
    }
}
