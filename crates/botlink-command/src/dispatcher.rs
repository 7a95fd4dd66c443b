use std::io::{Read, Write};
use std::time::Duration;

use botlink_codec::{receive_float, receive_u8, receive_uint16, send_bytes};
use tracing::{debug, info};

use crate::code::{CommandCode, SENTINEL};
use crate::collab::{Audio, Imaging, Motion, Scanner, StatusIndicator};
use crate::error::{CommandError, Result};
use crate::request::write_pose;

/// How long `BEEP` holds its tone.
pub const DEFAULT_TONE_DURATION: Duration = Duration::from_millis(100);

/// Written verbatim, without a line ending, for an unknown code.
pub const INVALID_MESSAGE: &[u8] = b"INVALID";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Tone length for `BEEP`. Default: 100 ms.
    pub tone_duration: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tone_duration: DEFAULT_TONE_DURATION,
        }
    }
}

/// What one listen cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// The first byte was not a sentinel; it was echoed back.
    Probe(u8),
    /// A command ran.
    Executed(CommandCode),
    /// Four sentinel-free bytes matched no code.
    Invalid([u8; 4]),
}

enum Matched {
    Code(CommandCode),
    Unmatched([u8; 4]),
}

enum State {
    Idle,
    ProbeByte(u8),
    ReadCode3,
    ReadCode4([u8; 3]),
    Dispatch(Matched),
    Done(Cycle),
}

/// Everything the dispatcher drives, borrowed for as long as the caller
/// keeps running listen cycles.
///
/// Only the dispatcher writes the status indicator.
pub struct Robot<'a> {
    pub motion: &'a mut dyn Motion,
    pub imaging: &'a mut dyn Imaging,
    pub scanner: &'a mut dyn Scanner,
    pub audio: &'a mut dyn Audio,
    pub indicator: &'a mut dyn StatusIndicator,
    pub config: DispatcherConfig,
}

impl<'a> Robot<'a> {
    /// Run one listen cycle: wait for a frame on `input`, execute at most one
    /// command, return.
    ///
    /// Blocks until input arrives. A sentinel inside a command code discards
    /// the bytes read so far and restarts code acquisition, with no limit on
    /// how often that happens. Stream and collaborator failures end the
    /// cycle with an error.
    pub fn listen<R: Read, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<Cycle> {
        let mut state = State::Idle;
        loop {
            state = match state {
                State::Idle => {
                    self.indicator.set(true);
                    State::ProbeByte(receive_u8(input)?)
                }
                State::ProbeByte(k) if k == SENTINEL => State::ReadCode3,
                State::ProbeByte(k) => {
                    debug!(byte = k, "non-sentinel byte, echoing");
                    let line = probe_echo(k);
                    send_bytes(output, &line, line.len())?;
                    State::Done(Cycle::Probe(k))
                }
                State::ReadCode3 => {
                    let mut code = [0u8; 3];
                    for byte in &mut code {
                        *byte = receive_u8(input)?;
                    }
                    if code.contains(&SENTINEL) {
                        debug!(?code, "sentinel inside command code, resynchronizing");
                        State::ReadCode3
                    } else {
                        match CommandCode::from_short(&code) {
                            Some(code) => State::Dispatch(Matched::Code(code)),
                            None => State::ReadCode4(code),
                        }
                    }
                }
                State::ReadCode4([c1, c2, c3]) => {
                    let c4 = receive_u8(input)?;
                    if c4 == SENTINEL {
                        debug!(code = ?[c1, c2, c3, c4], "sentinel inside command code, resynchronizing");
                        State::ReadCode3
                    } else {
                        let code = [c1, c2, c3, c4];
                        match CommandCode::from_long(&code) {
                            Some(code) => State::Dispatch(Matched::Code(code)),
                            None => State::Dispatch(Matched::Unmatched(code)),
                        }
                    }
                }
                State::Dispatch(Matched::Unmatched(code)) => {
                    debug!(?code, "unrecognized command code");
                    send_bytes(output, INVALID_MESSAGE, INVALID_MESSAGE.len())?;
                    State::Done(Cycle::Invalid(code))
                }
                State::Dispatch(Matched::Code(code)) => {
                    info!(%code, "dispatching command");
                    self.execute(code, input, output)?;
                    State::Done(Cycle::Executed(code))
                }
                State::Done(cycle) => return Ok(cycle),
            };
        }
    }

    fn execute<R: Read, W: Write>(
        &mut self,
        code: CommandCode,
        input: &mut R,
        output: &mut W,
    ) -> Result<()> {
        // BEEP reads its payload while still showing "listening".
        if code != CommandCode::Beep {
            self.indicator.set(false);
        }

        match code {
            CommandCode::Clear => {
                let x = receive_float(input)?;
                let y = receive_float(input)?;
                let heading = receive_float(input)?;
                self.motion.set_pose(x, y, heading);
            }
            CommandCode::Picture => self
                .imaging
                .capture()
                .map_err(|source| CommandError::Collaborator { code, source })?,
            CommandCode::Position => write_pose(output, self.motion.pose())?,
            CommandCode::Move => self
                .motion
                .receive_speed_instruction(input, output)
                .map_err(|source| CommandError::Collaborator { code, source })?,
            CommandCode::Stop => {
                self.motion.stop();
                write_pose(output, self.motion.pose())?;
            }
            CommandCode::Scan => self
                .scanner
                .scan(output)
                .map_err(|source| CommandError::Collaborator { code, source })?,
            CommandCode::Beep => {
                let frequency = receive_uint16(input)?;
                self.indicator.set(false);
                self.audio.tone_start();
                self.audio.tone_play(frequency);
                std::thread::sleep(self.config.tone_duration);
                self.audio.tone_stop();
            }
        }
        Ok(())
    }
}

/// `ASCII <byte>, Hex <lowercase hex>, Dec <decimal>.` followed by CR-LF.
fn probe_echo(k: u8) -> Vec<u8> {
    let mut line = b"ASCII ".to_vec();
    line.push(k);
    line.extend_from_slice(format!(", Hex {k:x}, Dec {k}.\r\n").as_bytes());
    line
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::collab::Pose;
    use crate::request::{read_pose, Request};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Indicator(bool),
        SetPose(f32, f32, f32),
        SpeedInstruction,
        Stop,
        Capture,
        Scan,
        ToneStart,
        TonePlay(u16),
        ToneStop,
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        pose: Pose,
        tone_marks: Vec<std::time::Instant>,
    }

    impl Recorder {
        fn commands(&self) -> Vec<Event> {
            self.events
                .iter()
                .filter(|e| !matches!(e, Event::Indicator(_)))
                .cloned()
                .collect()
        }
    }

    // One recorder behind every collaborator trait keeps the call order.
    struct Mock<'r>(&'r std::cell::RefCell<Recorder>);

    impl Motion for Mock<'_> {
        fn set_pose(&mut self, x: f32, y: f32, heading: f32) {
            let mut r = self.0.borrow_mut();
            r.pose = Pose::new(x, y, heading);
            r.events.push(Event::SetPose(x, y, heading));
        }
        fn x(&self) -> f32 {
            self.0.borrow().pose.x
        }
        fn y(&self) -> f32 {
            self.0.borrow().pose.y
        }
        fn heading(&self) -> f32 {
            self.0.borrow().pose.heading
        }
        fn receive_speed_instruction(
            &mut self,
            input: &mut dyn Read,
            _output: &mut dyn Write,
        ) -> std::io::Result<()> {
            let mut byte = [0u8; 1];
            input.read_exact(&mut byte)?;
            self.0.borrow_mut().events.push(Event::SpeedInstruction);
            Ok(())
        }
        fn stop(&mut self) {
            self.0.borrow_mut().events.push(Event::Stop);
        }
    }

    impl Imaging for Mock<'_> {
        fn capture(&mut self) -> std::io::Result<()> {
            self.0.borrow_mut().events.push(Event::Capture);
            Ok(())
        }
    }

    impl Scanner for Mock<'_> {
        fn scan(&mut self, output: &mut dyn Write) -> std::io::Result<()> {
            self.0.borrow_mut().events.push(Event::Scan);
            output.write_all(b"scan")
        }
    }

    impl Audio for Mock<'_> {
        fn tone_start(&mut self) {
            let mut r = self.0.borrow_mut();
            r.events.push(Event::ToneStart);
            r.tone_marks.push(std::time::Instant::now());
        }
        fn tone_play(&mut self, frequency: u16) {
            self.0.borrow_mut().events.push(Event::TonePlay(frequency));
        }
        fn tone_stop(&mut self) {
            let mut r = self.0.borrow_mut();
            r.events.push(Event::ToneStop);
            r.tone_marks.push(std::time::Instant::now());
        }
    }

    impl StatusIndicator for Mock<'_> {
        fn set(&mut self, on: bool) {
            self.0.borrow_mut().events.push(Event::Indicator(on));
        }
    }

    /// Run listen cycles over `input` until it is exhausted.
    fn run(
        input: &[u8],
        recorder: &std::cell::RefCell<Recorder>,
    ) -> (Vec<Result<Cycle>>, Vec<u8>) {
        let config = DispatcherConfig {
            tone_duration: Duration::from_millis(1),
        };
        run_with(input, recorder, config)
    }

    fn run_with(
        input: &[u8],
        recorder: &std::cell::RefCell<Recorder>,
        config: DispatcherConfig,
    ) -> (Vec<Result<Cycle>>, Vec<u8>) {
        let (mut motion, mut imaging, mut scanner, mut audio, mut indicator) = (
            Mock(recorder),
            Mock(recorder),
            Mock(recorder),
            Mock(recorder),
            Mock(recorder),
        );
        let mut robot = Robot {
            motion: &mut motion,
            imaging: &mut imaging,
            scanner: &mut scanner,
            audio: &mut audio,
            indicator: &mut indicator,
            config,
        };

        let mut src = Cursor::new(input.to_vec());
        let mut out = Vec::new();
        let mut results = Vec::new();
        while (src.position() as usize) < input.len() {
            let result = robot.listen(&mut src, &mut out);
            let failed = result.is_err();
            results.push(result);
            if failed {
                break;
            }
        }
        (results, out)
    }

    fn single(input: &[u8]) -> (Cycle, Vec<u8>, Recorder) {
        let recorder = std::cell::RefCell::new(Recorder::default());
        let (mut results, out) = run(input, &recorder);
        assert_eq!(results.len(), 1, "expected exactly one cycle");
        let cycle = results.remove(0).unwrap();
        (cycle, out, recorder.into_inner())
    }

    #[test]
    fn probe_byte_is_echoed() {
        let (cycle, out, rec) = single(b"x");
        assert_eq!(cycle, Cycle::Probe(b'x'));
        assert_eq!(out, b"ASCII x, Hex 78, Dec 120.\r\n");
        assert!(rec.commands().is_empty());
        assert_eq!(rec.events, vec![Event::Indicator(true)]);
    }

    #[test]
    fn probe_echo_for_every_non_sentinel_byte() {
        for k in 0u8..=255 {
            if k == SENTINEL {
                continue;
            }
            let (cycle, out, rec) = single(&[k]);
            assert_eq!(cycle, Cycle::Probe(k));

            let mut expected = b"ASCII ".to_vec();
            expected.push(k);
            expected.extend_from_slice(format!(", Hex {:x}, Dec {}.\r\n", k, k).as_bytes());
            assert_eq!(out, expected);
            assert!(rec.commands().is_empty());
        }
    }

    #[test]
    fn probe_echo_uses_unpadded_lowercase_hex() {
        let (_, out, _) = single(&[0x0A]);
        assert_eq!(out, b"ASCII \n, Hex a, Dec 10.\r\n");
        let (_, out, _) = single(&[0xFF]);
        assert_eq!(out, b"ASCII \xFF, Hex ff, Dec 255.\r\n");
    }

    #[test]
    fn clear_sets_pose_bit_exact() {
        let values = [12.345f32, -0.0, f32::MIN_POSITIVE];
        let mut input = b"!CLR".to_vec();
        for v in values {
            input.extend_from_slice(&v.to_le_bytes());
        }

        let (cycle, out, rec) = single(&input);
        assert_eq!(cycle, Cycle::Executed(CommandCode::Clear));
        assert!(out.is_empty());
        let Event::SetPose(x, y, h) = rec.commands()[0] else {
            panic!("expected set_pose, got {:?}", rec.events);
        };
        assert_eq!(x.to_bits(), values[0].to_bits());
        assert_eq!(y.to_bits(), values[1].to_bits());
        assert_eq!(h.to_bits(), values[2].to_bits());
    }

    #[test]
    fn position_writes_encoded_pose() {
        let recorder = std::cell::RefCell::new(Recorder {
            pose: Pose::new(100.0, -50.5, 1.25),
            ..Recorder::default()
        });
        let (results, out) = run(b"!POS", &recorder);

        assert_eq!(
            results[0].as_ref().unwrap(),
            &Cycle::Executed(CommandCode::Position)
        );
        assert_eq!(out.len(), 12);
        assert_eq!(&out[0..4], &100.0f32.to_le_bytes());
        assert_eq!(&out[4..8], &(-50.5f32).to_le_bytes());
        assert_eq!(&out[8..12], &1.25f32.to_le_bytes());
    }

    #[test]
    fn short_code_never_reads_fourth_byte() {
        // "!POS" followed immediately by a second frame.
        let recorder = std::cell::RefCell::new(Recorder::default());
        let (results, _) = run(b"!POS!PIC", &recorder);
        let cycles: Vec<Cycle> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            cycles,
            vec![
                Cycle::Executed(CommandCode::Position),
                Cycle::Executed(CommandCode::Picture)
            ]
        );
        assert_eq!(recorder.borrow().commands(), vec![Event::Capture]);
    }

    #[test]
    fn sentinel_in_three_byte_window_restarts() {
        // "!C!L" is discarded whole; "CLR" follows.
        let mut input = b"!C!LCLR".to_vec();
        for v in [1.0f32, 2.0, 3.0] {
            input.extend_from_slice(&v.to_le_bytes());
        }
        let (cycle, out, rec) = single(&input);
        assert_eq!(cycle, Cycle::Executed(CommandCode::Clear));
        assert!(out.is_empty());
        assert_eq!(rec.commands(), vec![Event::SetPose(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn sentinel_in_fourth_byte_restarts() {
        let (cycle, out, rec) = single(b"!STO!SCAN");
        assert_eq!(cycle, Cycle::Executed(CommandCode::Scan));
        assert_eq!(out, b"scan");
        assert_eq!(rec.commands(), vec![Event::Scan]);
    }

    #[test]
    fn resync_discards_consumed_bytes() {
        // "!PI" is dropped, then "C!P"; only "OS" is left when input ends, so
        // the real "!PIC" frame is lost with the garbage.
        let recorder = std::cell::RefCell::new(Recorder::default());
        let (results, out) = run(b"!!PIC!POS", &recorder);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(CommandError::Codec(botlink_codec::CodecError::ConnectionClosed))
        ));
        assert!(out.is_empty());
        assert!(recorder.borrow().commands().is_empty());
    }

    #[test]
    fn resync_recovers_on_clean_window() {
        let (cycle, out, _) = single(b"!!!!POS");
        assert_eq!(cycle, Cycle::Executed(CommandCode::Position));
        assert_eq!(out.len(), 12);
    }

    #[test]
    fn resync_without_completion_runs_nothing() {
        let recorder = std::cell::RefCell::new(Recorder::default());
        let (results, out) = run(b"!AB!CD!", &recorder);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(CommandError::Codec(botlink_codec::CodecError::ConnectionClosed))
        ));
        assert!(out.is_empty());
        assert!(recorder.borrow().commands().is_empty());
    }

    #[test]
    fn unmatched_code_reports_invalid() {
        let (cycle, out, rec) = single(b"!XYZQ");
        assert_eq!(cycle, Cycle::Invalid(*b"XYZQ"));
        assert_eq!(out, INVALID_MESSAGE);
        assert!(rec.commands().is_empty());
        // The indicator is left on when nothing runs.
        assert_eq!(rec.events, vec![Event::Indicator(true)]);
    }

    #[test]
    fn lowercase_code_is_invalid() {
        let (cycle, out, _) = single(b"!stop");
        assert_eq!(cycle, Cycle::Invalid(*b"stop"));
        assert_eq!(out, b"INVALID");
    }

    #[test]
    fn beep_plays_tone_with_indicator_off() {
        let recorder = std::cell::RefCell::new(Recorder::default());
        let mut input = b"!BEEP".to_vec();
        input.extend_from_slice(&440u16.to_le_bytes());
        input.extend_from_slice(b"?");

        let (results, _) = run(&input, &recorder);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Cycle::Executed(CommandCode::Beep)
        );
        assert_eq!(
            recorder.borrow().events,
            vec![
                Event::Indicator(true),
                Event::Indicator(false),
                Event::ToneStart,
                Event::TonePlay(440),
                Event::ToneStop,
                // next cycle
                Event::Indicator(true),
            ]
        );
    }

    #[test]
    fn beep_holds_tone_for_configured_duration() {
        let recorder = std::cell::RefCell::new(Recorder::default());
        let config = DispatcherConfig {
            tone_duration: Duration::from_millis(50),
        };

        let (results, out) = run_with(b"!BEEP\xB8\x01", &recorder, config);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Cycle::Executed(CommandCode::Beep)
        );
        assert!(out.is_empty());

        let marks = recorder.into_inner().tone_marks;
        assert_eq!(marks.len(), 2, "tone should start once and stop once");
        let held = marks[1] - marks[0];
        assert!(held >= Duration::from_millis(50), "tone held only {held:?}");
    }

    #[test]
    fn default_tone_lasts_a_tenth_of_a_second() {
        assert_eq!(
            DispatcherConfig::default().tone_duration,
            Duration::from_millis(100)
        );
        assert_eq!(DEFAULT_TONE_DURATION, Duration::from_millis(100));
    }

    #[test]
    fn stop_halts_then_reports_pose() {
        let recorder = std::cell::RefCell::new(Recorder {
            pose: Pose::new(7.0, 8.0, 0.5),
            ..Recorder::default()
        });
        let (results, out) = run(b"!STOP", &recorder);

        assert_eq!(
            results[0].as_ref().unwrap(),
            &Cycle::Executed(CommandCode::Stop)
        );
        assert_eq!(recorder.borrow().commands(), vec![Event::Stop]);
        assert_eq!(
            read_pose(&mut Cursor::new(out)).unwrap(),
            Pose::new(7.0, 8.0, 0.5)
        );
    }

    #[test]
    fn move_delegates_payload_to_motion() {
        let (cycle, _, rec) = single(b"!MOVE\x01");
        assert_eq!(cycle, Cycle::Executed(CommandCode::Move));
        assert_eq!(rec.commands(), vec![Event::SpeedInstruction]);
        assert_eq!(
            rec.events,
            vec![
                Event::Indicator(true),
                Event::Indicator(false),
                Event::SpeedInstruction
            ]
        );
    }

    #[test]
    fn host_requests_dispatch() {
        let recorder = std::cell::RefCell::new(Recorder::default());
        let mut input = Vec::new();
        for request in [
            Request::Clear(Pose::new(1.0, 1.0, 0.0)),
            Request::Picture,
            Request::Beep(880),
            Request::Position,
        ] {
            input.extend_from_slice(&request.to_bytes().unwrap());
        }

        let (results, out) = run(&input, &recorder);
        assert_eq!(results.len(), 4);
        assert_eq!(
            recorder.borrow().commands(),
            vec![
                Event::SetPose(1.0, 1.0, 0.0),
                Event::Capture,
                Event::ToneStart,
                Event::TonePlay(880),
                Event::ToneStop,
            ]
        );
        assert_eq!(
            read_pose(&mut Cursor::new(out)).unwrap(),
            Pose::new(1.0, 1.0, 0.0)
        );
    }

    #[test]
    fn truncated_payload_propagates() {
        let recorder = std::cell::RefCell::new(Recorder::default());
        let (results, _) = run(b"!CLR\x00\x00", &recorder);
        assert!(matches!(
            results[0],
            Err(CommandError::Codec(botlink_codec::CodecError::ConnectionClosed))
        ));
        assert!(recorder.borrow().commands().is_empty());
    }

    #[test]
    fn collaborator_failure_names_command() {
        struct BrokenCamera;
        impl Imaging for BrokenCamera {
            fn capture(&mut self) -> std::io::Result<()> {
                Err(std::io::Error::other("sensor offline"))
            }
        }

        let recorder = std::cell::RefCell::new(Recorder::default());
        let (mut motion, mut scanner, mut audio, mut indicator) = (
            Mock(&recorder),
            Mock(&recorder),
            Mock(&recorder),
            Mock(&recorder),
        );
        let mut camera = BrokenCamera;
        let mut robot = Robot {
            motion: &mut motion,
            imaging: &mut camera,
            scanner: &mut scanner,
            audio: &mut audio,
            indicator: &mut indicator,
            config: DispatcherConfig::default(),
        };

        let err = robot
            .listen(&mut Cursor::new(b"!PIC".to_vec()), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Collaborator {
                code: CommandCode::Picture,
                ..
            }
        ));
        assert_eq!(err.to_string(), "PIC failed: sensor offline");
    }
}
