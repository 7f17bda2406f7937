//! # Capture Replay
//!
//! Feeds a capture of draw-state payloads through a decoder and prints what
//! each frame did.
//!
//! A capture is a sequence of records, each a big-endian `u32` length
//! followed by that many payload bytes. Frames are replayed 200 ms apart.

use std::process::ExitCode;

use cairn_networking::{DecoderConfig, DrawStateClient, Stage, Timestamp};

const FRAME_SPACING_MS: u64 = 200;

fn usage() {
    println!("Usage: capture_replay <capture_file> [options]");
    println!();
    println!("Options:");
    println!("  --config <file.toml>  Decoder configuration");
    println!("  --verbose             Print every frame, not just failures");
}

/// Splits a capture into payloads. A truncated final record is reported.
fn split_records(data: &[u8]) -> (Vec<&[u8]>, Option<usize>) {
    let mut records = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        if rest.len() < 4 {
            return (records, Some(data.len() - rest.len()));
        }
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let tail = &rest[4..];
        let Some(payload) = tail.get(..len) else {
            return (records, Some(data.len() - rest.len()));
        };
        records.push(payload);
        rest = &tail[len..];
    }
    (records, None)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let Some(capture_path) = args.get(1).filter(|a| !a.starts_with("--")) else {
        usage();
        return ExitCode::FAILURE;
    };
    let verbose = args.iter().any(|a| a == "--verbose");

    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let Some(path) = args.get(i + 1) else {
                println!("Error: --config needs a file");
                return ExitCode::FAILURE;
            };
            match DecoderConfig::from_toml_file(path) {
                Ok(config) => config,
                Err(e) => {
                    println!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => DecoderConfig::default(),
    };

    let data = match std::fs::read(capture_path) {
        Ok(data) => data,
        Err(e) => {
            println!("Error: Could not read {capture_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (records, truncated_at) = split_records(&data);
    println!("Replaying {} frames from {capture_path}", records.len());
    println!();

    let client = DrawStateClient::new(config);
    for (i, payload) in records.iter().enumerate() {
        let now = Timestamp::from_millis(1 + i as u64 * FRAME_SPACING_MS);
        match client.handle_packet_at(payload, now) {
            Ok(report) if verbose => {
                let c = &report.commit;
                println!(
                    "#{i:<6} ack {:>8}  pictures {:>3} (+{:>3} replayed)  mobiles {:>3}  shift {:<12}  bubbles {}  sounds {}",
                    report.counters.ack_frame,
                    c.pictures - c.replayed,
                    c.replayed,
                    c.mobiles,
                    c.shift.map_or_else(|| "-".to_owned(), |(h, v)| format!("({h}, {v})")),
                    report.bubbles,
                    report.sounds,
                );
                for line in &report.info {
                    println!("        info: {line}");
                }
            }
            Ok(_) => {}
            Err(e) => println!("#{i:<6} DROPPED ({} bytes): {e}", payload.len()),
        }
    }

    if let Some(offset) = truncated_at {
        println!();
        println!("Warning: capture ends inside a record at byte {offset}");
    }

    let stats = client.stats();
    println!();
    println!("┌─ SUMMARY ─────────────────────────────────────────┐");
    println!("│ Decoded:  {:<8}", stats.frames_decoded);
    println!("│ Dropped:  {:<8}", stats.frames_dropped);
    println!("│ Bubbles:  {:<8}", stats.bubbles);
    println!("│ Sounds:   {:<8}", stats.sounds);
    for stage in Stage::ALL {
        let drops = stats.dropped_at(stage);
        if drops > 0 {
            println!("│   at {:<16} {drops}", stage.name());
        }
    }
    println!("└───────────────────────────────────────────────────┘");

    if stats.frames_dropped == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
