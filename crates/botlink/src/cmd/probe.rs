use std::io::Write;

use botlink_codec::receive_u8;
use botlink_command::SENTINEL;

use crate::cmd::{open_link, ProbeArgs};
use crate::exit::{codec_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_text, OutputFormat};

/// Longest echo line: "ASCII x, Hex ff, Dec 255.\r\n" plus slack.
const MAX_ECHO_LEN: usize = 64;

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let byte = parse_byte(&args.byte)?;
    let mut link = open_link(&args.link)?;

    link.write_all(&[byte])
        .and_then(|()| link.flush())
        .map_err(|err| io_error("send failed", err))?;

    let mut reply = Vec::with_capacity(MAX_ECHO_LEN);
    while !reply.ends_with(b"\r\n") && reply.len() < MAX_ECHO_LEN {
        reply.push(receive_u8(&mut link).map_err(|err| codec_error("receive failed", err))?);
    }

    print_text(&reply, format);
    Ok(SUCCESS)
}

fn parse_byte(input: &str) -> CliResult<u8> {
    let byte = if let Some(hex) = input.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
            .map_err(|_| CliError::usage(format!("invalid hex byte: {input}")))?
    } else {
        match input.as_bytes() {
            [byte] => *byte,
            _ => {
                return Err(CliError::usage(format!(
                    "expected one character or 0xNN, got {input:?}"
                )))
            }
        }
    };

    if byte == SENTINEL {
        return Err(CliError::usage(
            "'!' starts a command frame; use `send` instead",
        ));
    }
    Ok(byte)
}
