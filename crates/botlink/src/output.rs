use std::io::{IsTerminal, Write};

use botlink_command::{CommandCode, Pose};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PoseOutput<'a> {
    command: &'a str,
    x: f32,
    y: f32,
    heading: f32,
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    command: &'a str,
    readings: usize,
    min_mm: Option<u16>,
    max_mm: Option<u16>,
    distances_mm: &'a [u16],
}

#[derive(Serialize)]
struct ImageOutput<'a> {
    command: &'a str,
    width: usize,
    height: usize,
    bytes: usize,
    mean_luma: f32,
}

#[derive(Serialize)]
struct AckOutput<'a> {
    command: &'a str,
    sent_bytes: usize,
}

#[derive(Serialize)]
struct TextOutput<'a> {
    reply: &'a str,
}

pub fn print_pose(code: CommandCode, pose: Pose, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PoseOutput {
            command: code.as_str(),
            x: pose.x,
            y: pose.y,
            heading: pose.heading,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "X (mm)", "Y (mm)", "HEADING (rad)"])
                .add_row(vec![
                    code.to_string(),
                    format!("{:.3}", pose.x),
                    format!("{:.3}", pose.y),
                    format!("{:.4}", pose.heading),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{code}: x={:.3} mm y={:.3} mm heading={:.4} rad",
                pose.x, pose.y, pose.heading
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

pub fn print_scan(code: CommandCode, distances: &[u16], raw: &[u8], format: OutputFormat) {
    let min = distances.iter().copied().min();
    let max = distances.iter().copied().max();
    match format {
        OutputFormat::Json => print_json(&ScanOutput {
            command: code.as_str(),
            readings: distances.len(),
            min_mm: min,
            max_mm: max,
            distances_mm: distances,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ANGLE (deg)", "DISTANCE (mm)"]);
            let step = 360.0 / distances.len().max(1) as f32;
            for (i, distance) in distances.iter().enumerate() {
                table.add_row(vec![
                    format!("{:.1}", i as f32 * step),
                    distance.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{code}: {} readings, min={} mm max={} mm",
                distances.len(),
                min.map_or_else(|| "-".to_string(), |v| v.to_string()),
                max.map_or_else(|| "-".to_string(), |v| v.to_string()),
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

/// Summarize an RGB565 frame; `raw` prints the payload for piping to a file.
pub fn print_image(
    code: CommandCode,
    width: usize,
    pixels: &[u16],
    raw: &[u8],
    format: OutputFormat,
) {
    let height = pixels.len() / width.max(1);
    let mean_luma = mean_luma(pixels);
    match format {
        OutputFormat::Json => print_json(&ImageOutput {
            command: code.as_str(),
            width,
            height,
            bytes: raw.len(),
            mean_luma,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "WIDTH", "HEIGHT", "BYTES", "MEAN LUMA"])
                .add_row(vec![
                    code.to_string(),
                    width.to_string(),
                    height.to_string(),
                    raw.len().to_string(),
                    format!("{mean_luma:.1}"),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{code}: {width}x{height} RGB565, {} bytes, mean luma {mean_luma:.1}",
                raw.len()
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

fn mean_luma(pixels: &[u16]) -> f32 {
    if pixels.is_empty() {
        return 0.0;
    }
    let total: f32 = pixels
        .iter()
        .map(|&p| {
            let r = f32::from((p >> 11) & 0x1F) * 255.0 / 31.0;
            let g = f32::from((p >> 5) & 0x3F) * 255.0 / 63.0;
            let b = f32::from(p & 0x1F) * 255.0 / 31.0;
            (r + g + b) / 3.0
        })
        .sum();
    total / pixels.len() as f32
}

pub fn print_ack(code: CommandCode, sent_bytes: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&AckOutput {
            command: code.as_str(),
            sent_bytes,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{code}: sent {sent_bytes} bytes");
        }
        OutputFormat::Raw => {}
    }
}

/// Print an ASCII reply such as a probe echo or `INVALID`.
pub fn print_text(reply: &[u8], format: OutputFormat) {
    let text = String::from_utf8_lossy(reply);
    match format {
        OutputFormat::Json => print_json(&TextOutput {
            reply: text.trim_end(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", text.trim_end()),
        OutputFormat::Raw => print_raw(reply),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
