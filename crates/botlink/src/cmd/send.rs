use std::io::{Read, Write};

use botlink_codec::{receive_block, MAX_BLOCK_PAYLOAD, WIRE_BYTE_ORDER};
use botlink_command::{read_pose, CommandCode, Pose, Request, ResponseKind, SpeedSegment};
use botlink::sim::IMAGE_WIDTH;
use tracing::debug;

use crate::cmd::{open_link, SendArgs};
use crate::exit::{codec_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_ack, print_image, print_pose, print_scan, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let request = build_request(args.code, &args.params)?;
    if args.image && args.code != CommandCode::Picture {
        return Err(CliError::usage("--image only applies to PIC"));
    }
    let mut link = open_link(&args.link)?;

    let frame = request
        .to_bytes()
        .map_err(|err| CliError::new(DATA_INVALID, format!("encode failed: {err}")))?;
    debug!(code = %args.code, bytes = frame.len(), "sending frame");
    link.write_all(&frame)
        .and_then(|()| link.flush())
        .map_err(|err| io_error("send failed", err))?;

    match request.response() {
        ResponseKind::None if args.image => {
            let image = receive_block(&mut link, MAX_BLOCK_PAYLOAD)
                .map_err(|err| codec_error("receive failed", err))?;
            let pixels = decode_u16s(&image);
            print_image(args.code, IMAGE_WIDTH, &pixels, &image, format);
        }
        ResponseKind::None => print_ack(args.code, frame.len(), format),
        ResponseKind::Pose => {
            let mut raw = [0u8; 12];
            link.read_exact(&mut raw)
                .map_err(|err| io_error("receive failed", err))?;
            let pose = read_pose(&mut &raw[..]).map_err(|err| codec_error("decode failed", err))?;
            print_pose(args.code, pose, &raw, format);
        }
        ResponseKind::Block => {
            let block = receive_block(&mut link, MAX_BLOCK_PAYLOAD)
                .map_err(|err| codec_error("receive failed", err))?;
            let distances = decode_u16s(&block);
            print_scan(args.code, &distances, &block, format);
        }
    }

    Ok(SUCCESS)
}

fn decode_u16s(payload: &[u8]) -> Vec<u16> {
    payload
        .chunks_exact(2)
        .map(|pair| WIRE_BYTE_ORDER.u16_from_bytes([pair[0], pair[1]]))
        .collect()
}

/// Turn the positional parameters into a request for `code`.
fn build_request(code: CommandCode, params: &[String]) -> CliResult<Request> {
    let expect = |count: usize, usage: &str| -> CliResult<()> {
        if params.len() == count {
            Ok(())
        } else {
            Err(CliError::usage(format!(
                "{code} takes {count} parameter(s): {usage}"
            )))
        }
    };

    match code {
        CommandCode::Clear => {
            expect(3, "X Y HEADING")?;
            Ok(Request::Clear(Pose::new(
                parse_number(&params[0], "X")?,
                parse_number(&params[1], "Y")?,
                parse_number(&params[2], "HEADING")?,
            )))
        }
        CommandCode::Beep => {
            expect(1, "FREQUENCY")?;
            Ok(Request::Beep(parse_number(&params[0], "FREQUENCY")?))
        }
        CommandCode::Move => {
            if params.is_empty() {
                return Err(CliError::usage(
                    "MOVE takes one or more LEFT:RIGHT:MS segments",
                ));
            }
            if params.len() > SpeedSegment::MAX_PER_INSTRUCTION {
                return Err(CliError::usage(format!(
                    "MOVE takes at most {} segments, got {}",
                    SpeedSegment::MAX_PER_INSTRUCTION,
                    params.len()
                )));
            }
            let segments = params
                .iter()
                .map(String::as_str)
                .map(parse_segment)
                .collect::<CliResult<Vec<_>>>()?;
            Ok(Request::Move(segments))
        }
        CommandCode::Picture => expect(0, "none").map(|()| Request::Picture),
        CommandCode::Position => expect(0, "none").map(|()| Request::Position),
        CommandCode::Stop => expect(0, "none").map(|()| Request::Stop),
        CommandCode::Scan => expect(0, "none").map(|()| Request::Scan),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> CliResult<T> {
    value
        .parse()
        .map_err(|_| CliError::usage(format!("invalid {name}: {value}")))
}

fn parse_segment(value: &str) -> CliResult<SpeedSegment> {
    let parts: Vec<&str> = value.split(':').collect();
    let [left, right, ms] = parts.as_slice() else {
        return Err(CliError::usage(format!(
            "invalid segment {value:?}, expected LEFT:RIGHT:MS"
        )));
    };
    Ok(SpeedSegment {
        left: parse_number(left, "LEFT")?,
        right: parse_number(right, "RIGHT")?,
        duration_ms: parse_number(ms, "MS")?,
    })
}
