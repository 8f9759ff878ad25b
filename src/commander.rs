//! Text command session to one robot
//!
//! A [`Commander`] owns one TCP connection to the robot's command port and
//! serializes every exchange through an internal mutex, so at most one
//! request is in flight at any time. Movement commands can block until the
//! robot finishes the motion (the firmware withholds its reply), which
//! stalls unrelated calls on the same instance; callers that need
//! parallelism construct additional Commanders against the same robot.

use crate::discovery;
use crate::error::{Error, Result};
use crate::proto::{
    self, Arg, ArmorEventAttr, LedComp, LedEffect, Mode, SoundEventAttr, CTRL_PORT,
    DEFAULT_BUF_SIZE, TERMINATOR,
};
use crate::proto::push::{ChassisAttitude, ChassisPosition, ChassisStatus, GimbalAttitude};
use crate::transport::{TcpTransport, Transport};
use parking_lot::Mutex;
use std::time::Duration;

/// Default command deadline; sized for long chassis moves
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to reach the robot's command port
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Robot address; `None` waits for the broadcast announcement
    pub host: Option<String>,
    pub port: u16,
    /// Bounds connect, every read, and every write
    pub timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        ConnectConfig {
            host: None,
            port: CTRL_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Chassis velocity report: body frame plus per-wheel rpm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisSpeed {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w1: i32,
    pub w2: i32,
    pub w3: i32,
    pub w4: i32,
}

struct Session {
    transport: Box<dyn Transport>,
    /// Bytes read past the last terminator, kept for the next exchange
    pending: Vec<u8>,
    closed: bool,
}

/// Synchronous, single-flight client for the robot's text command API
pub struct Commander {
    session: Mutex<Session>,
    host: String,
    tag: String,
}

impl std::fmt::Debug for Commander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commander")
            .field("host", &self.host)
            .field("tag", &self.tag)
            .finish()
    }
}

impl Commander {
    /// Connect and enter SDK mode.
    ///
    /// Without a configured host this blocks on IP discovery first.
    pub fn connect(config: ConnectConfig) -> Result<Commander> {
        let host = match config.host {
            Some(host) => host,
            None => discovery::discover_ip(config.timeout)?,
        };
        let transport = TcpTransport::connect((host.as_str(), config.port), config.timeout)?;
        Commander::with_transport(Box::new(transport), host)
    }

    /// Connect to a known host with default port and timeout.
    pub fn dial(host: &str) -> Result<Commander> {
        Commander::connect(ConnectConfig {
            host: Some(host.to_string()),
            ..ConnectConfig::default()
        })
    }

    /// Build a session over an arbitrary transport and perform the
    /// SDK-mode handshake.
    pub fn with_transport(transport: Box<dyn Transport>, host: String) -> Result<Commander> {
        let commander = Commander {
            session: Mutex::new(Session {
                transport,
                pending: Vec::new(),
                closed: false,
            }),
            tag: format!("commander@{}", host),
            host,
        };
        let resp = commander.exec("command", &[])?;
        if resp != "ok" && resp != "Already in SDK mode" {
            return Err(Error::Handshake(resp));
        }
        log::info!("{}: entered SDK mode", commander.tag);
        Ok(commander)
    }

    /// The robot address this session talks to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Close the session without sending `quit;`, leaving any peer
    /// Commanders against the same robot undisturbed.
    pub fn close(&self) {
        let mut session = self.session.lock();
        if !session.closed {
            session.closed = true;
            log::info!("{}: closed", self.tag);
        }
    }

    /// Leave SDK mode explicitly, then close. This tears down push and
    /// event subscriptions for every session on the robot.
    pub fn quit(&self) -> Result<()> {
        let resp = self.exec_ok("quit", "quit", &[]);
        self.close();
        resp.map(|_| ())
    }

    /// Execute one raw exchange: compose `cmd arg... ;`, write it, read
    /// the reply up to its terminator, and return the stripped body.
    ///
    /// Replies beginning with `error` fail with [`Error::Remote`]. There
    /// are no retries: the protocol is not idempotent across moves. A
    /// timed-out or failed exchange poisons the session and every later
    /// call fails with [`Error::Closed`].
    pub fn exec(&self, cmd: &str, args: &[Arg]) -> Result<String> {
        let mut session = self.session.lock();
        if session.closed {
            return Err(Error::Closed);
        }
        let line = proto::compose(cmd, args);
        log::debug!("{}: >> {}", self.tag, line);
        match Self::round_trip(&mut session, line.as_bytes()) {
            Ok(body) => {
                log::debug!("{}: << {}", self.tag, body);
                if is_error_reply(&body) {
                    return Err(Error::Remote(body));
                }
                Ok(body)
            }
            Err(e) => {
                // The stream may still carry a late reply; nothing sane
                // can be exchanged on it anymore.
                session.closed = true;
                log::warn!("{}: session poisoned: {}", self.tag, e);
                Err(e)
            }
        }
    }

    fn round_trip(session: &mut Session, line: &[u8]) -> Result<String> {
        let mut written = 0;
        while written < line.len() {
            let n = session.transport.write(&line[written..])?;
            if n == 0 {
                return Err(Error::Closed);
            }
            written += n;
        }
        session.transport.flush()?;

        let mut reply = std::mem::take(&mut session.pending);
        loop {
            if let Some(pos) = reply.iter().position(|&b| b == TERMINATOR) {
                session.pending = reply.split_off(pos + 1);
                reply.pop();
                let body = String::from_utf8_lossy(&reply);
                return Ok(body.trim_matches(' ').to_string());
            }
            let mut chunk = [0u8; DEFAULT_BUF_SIZE];
            let n = session.transport.read(&mut chunk)?;
            if n == 0 {
                return Err(Error::Closed);
            }
            reply.extend_from_slice(&chunk[..n]);
        }
    }

    /// Exchange that only `ok` satisfies
    fn exec_ok(&self, method: &'static str, cmd: &str, args: &[Arg]) -> Result<String> {
        let resp = self.exec(cmd, args)?;
        if resp != "ok" {
            log::warn!("{}: {} rejected: {}", self.tag, method, resp);
            return Err(Error::Remote(resp));
        }
        Ok(resp)
    }

    // --- session ---

    /// Query the SDK version string, e.g. `version 00.00.00.60`.
    pub fn version(&self) -> Result<String> {
        self.exec("version", &[])
    }

    /// Set the motion mode coupling chassis and gimbal.
    pub fn robot_mode(&self, mode: Mode) -> Result<()> {
        self.exec_ok(
            "robot_mode",
            "robot",
            &[Arg::Token("mode"), Arg::Token(mode.wire_token())],
        )
        .map(|_| ())
    }

    /// Query the current motion mode.
    pub fn get_robot_mode(&self) -> Result<Mode> {
        let resp = self.exec("robot", &[Arg::Token("mode"), Arg::Token("?")])?;
        Mode::from_wire(&resp)
            .ok_or_else(|| Error::Parse(format!("get_robot_mode: unexpected reply {:?}", resp)))
    }

    // --- chassis ---

    /// Set chassis velocity. `x`/`y` in m/s, `z` (rotation) in deg/s.
    pub fn chassis_speed(&self, x: f32, y: f32, z: f32) -> Result<()> {
        range_f32("x", x, -3.5, 3.5)?;
        range_f32("y", y, -3.5, 3.5)?;
        range_f32("z", z, -600.0, 600.0)?;
        self.exec_ok(
            "chassis_speed",
            "chassis",
            &[
                Arg::Token("speed"),
                Arg::Token("x"),
                Arg::Float(x),
                Arg::Token("y"),
                Arg::Float(y),
                Arg::Token("z"),
                Arg::Float(z),
            ],
        )
        .map(|_| ())
    }

    /// Query chassis velocity, body frame and per-wheel.
    pub fn get_chassis_speed(&self) -> Result<ChassisSpeed> {
        let resp = self.exec("chassis", &[Arg::Token("speed"), Arg::Token("?")])?;
        let words: Vec<&str> = resp.split_whitespace().collect();
        if words.len() != 7 {
            return Err(Error::Parse(format!(
                "get_chassis_speed: unexpected reply {:?}",
                resp
            )));
        }
        Ok(ChassisSpeed {
            x: parse_num("get_chassis_speed", words[0], &resp)?,
            y: parse_num("get_chassis_speed", words[1], &resp)?,
            z: parse_num("get_chassis_speed", words[2], &resp)?,
            w1: parse_num("get_chassis_speed", words[3], &resp)?,
            w2: parse_num("get_chassis_speed", words[4], &resp)?,
            w3: parse_num("get_chassis_speed", words[5], &resp)?,
            w4: parse_num("get_chassis_speed", words[6], &resp)?,
        })
    }

    /// Drive individual wheels, rpm. Order: front-right, front-left,
    /// back-right, back-left.
    pub fn chassis_wheel(&self, w1: i32, w2: i32, w3: i32, w4: i32) -> Result<()> {
        range_i32("w1", w1, -1000, 1000)?;
        range_i32("w2", w2, -1000, 1000)?;
        range_i32("w3", w3, -1000, 1000)?;
        range_i32("w4", w4, -1000, 1000)?;
        self.exec_ok(
            "chassis_wheel",
            "chassis",
            &[
                Arg::Token("wheel"),
                Arg::Token("w1"),
                Arg::Int(w1 as i64),
                Arg::Token("w2"),
                Arg::Int(w2 as i64),
                Arg::Token("w3"),
                Arg::Int(w3 as i64),
                Arg::Token("w4"),
                Arg::Int(w4 as i64),
            ],
        )
        .map(|_| ())
    }

    /// Move the chassis relative to its current pose. `x`/`y` in meters,
    /// `z` in degrees. Blocks until the robot reports completion, so the
    /// session timeout must cover the whole motion.
    pub fn chassis_move(
        &self,
        x: f32,
        y: f32,
        z: f32,
        speed_xy: Option<f32>,
        speed_z: Option<f32>,
    ) -> Result<()> {
        range_f32("x", x, -5.0, 5.0)?;
        range_f32("y", y, -5.0, 5.0)?;
        range_f32("z", z, -1800.0, 1800.0)?;
        let mut args = vec![
            Arg::Token("move"),
            Arg::Token("x"),
            Arg::Float(x),
            Arg::Token("y"),
            Arg::Float(y),
            Arg::Token("z"),
            Arg::Float(z),
        ];
        if let Some(speed_xy) = speed_xy {
            positive_up_to("speed_xy", speed_xy, 3.5)?;
            args.push(Arg::Token("vxy"));
            args.push(Arg::Float(speed_xy));
        }
        if let Some(speed_z) = speed_z {
            positive_up_to("speed_z", speed_z, 600.0)?;
            args.push(Arg::Token("vz"));
            args.push(Arg::Float(speed_z));
        }
        self.exec_ok("chassis_move", "chassis", &args).map(|_| ())
    }

    /// Query chassis position relative to power-on origin.
    pub fn get_chassis_position(&self) -> Result<ChassisPosition> {
        let resp = self.exec("chassis", &[Arg::Token("position"), Arg::Token("?")])?;
        let [x, y, z] = parse_floats("get_chassis_position", &resp)?;
        Ok(ChassisPosition { x, y, z: Some(z) })
    }

    /// Query chassis attitude, degrees.
    pub fn get_chassis_attitude(&self) -> Result<ChassisAttitude> {
        let resp = self.exec("chassis", &[Arg::Token("attitude"), Arg::Token("?")])?;
        let [pitch, roll, yaw] = parse_floats("get_chassis_attitude", &resp)?;
        Ok(ChassisAttitude { pitch, roll, yaw })
    }

    /// Query chassis state flags.
    pub fn get_chassis_status(&self) -> Result<ChassisStatus> {
        let resp = self.exec("chassis", &[Arg::Token("status"), Arg::Token("?")])?;
        let words: Vec<&str> = resp.split_whitespace().collect();
        ChassisStatus::from_words(&words).ok_or_else(|| {
            Error::Parse(format!("get_chassis_status: unexpected reply {:?}", resp))
        })
    }

    /// Enable chassis pushes. Each frequency is in Hz from
    /// [`PUSH_FREQUENCIES`](crate::proto::PUSH_FREQUENCIES); `all_freq`
    /// overrides the per-group settings.
    pub fn chassis_push_on(
        &self,
        position_freq: Option<u16>,
        attitude_freq: Option<u16>,
        status_freq: Option<u16>,
        all_freq: Option<u16>,
    ) -> Result<()> {
        let mut args = vec![Arg::Token("push")];
        if let Some(freq) = all_freq {
            push_frequency("all_freq", freq)?;
            args.push(Arg::Token("freq"));
            args.push(Arg::Int(freq as i64));
        } else {
            if let Some(freq) = position_freq {
                push_frequency("position_freq", freq)?;
                args.push(Arg::Token("position"));
                args.push(Arg::Switch(true));
                args.push(Arg::Token("pfreq"));
                args.push(Arg::Int(freq as i64));
            }
            if let Some(freq) = attitude_freq {
                push_frequency("attitude_freq", freq)?;
                args.push(Arg::Token("attitude"));
                args.push(Arg::Switch(true));
                args.push(Arg::Token("afreq"));
                args.push(Arg::Int(freq as i64));
            }
            if let Some(freq) = status_freq {
                push_frequency("status_freq", freq)?;
                args.push(Arg::Token("status"));
                args.push(Arg::Switch(true));
                args.push(Arg::Token("sfreq"));
                args.push(Arg::Int(freq as i64));
            }
        }
        if args.len() == 1 {
            return Err(Error::InvalidArg {
                field: "freq",
                reason: "at least one frequency must be given".to_string(),
            });
        }
        self.exec_ok("chassis_push_on", "chassis", &args).map(|_| ())
    }

    /// Disable chassis pushes for the selected groups.
    pub fn chassis_push_off(
        &self,
        position: bool,
        attitude: bool,
        status: bool,
        all: bool,
    ) -> Result<()> {
        let mut args = vec![Arg::Token("push")];
        if all || position {
            args.push(Arg::Token("position"));
            args.push(Arg::Switch(false));
        }
        if all || attitude {
            args.push(Arg::Token("attitude"));
            args.push(Arg::Switch(false));
        }
        if all || status {
            args.push(Arg::Token("status"));
            args.push(Arg::Switch(false));
        }
        if args.len() == 1 {
            return Err(Error::InvalidArg {
                field: "group",
                reason: "at least one push group must be selected".to_string(),
            });
        }
        self.exec_ok("chassis_push_off", "chassis", &args).map(|_| ())
    }

    // --- gimbal ---

    /// Set gimbal angular velocity, deg/s.
    pub fn gimbal_speed(&self, pitch: f32, yaw: f32) -> Result<()> {
        range_f32("pitch", pitch, -450.0, 450.0)?;
        range_f32("yaw", yaw, -450.0, 450.0)?;
        self.exec_ok(
            "gimbal_speed",
            "gimbal",
            &[
                Arg::Token("speed"),
                Arg::Token("p"),
                Arg::Float(pitch),
                Arg::Token("y"),
                Arg::Float(yaw),
            ],
        )
        .map(|_| ())
    }

    /// Rotate the gimbal relative to its current attitude, degrees.
    /// Blocks until the motion completes.
    pub fn gimbal_move(
        &self,
        pitch: f32,
        yaw: f32,
        pitch_speed: Option<f32>,
        yaw_speed: Option<f32>,
    ) -> Result<()> {
        range_f32("pitch", pitch, -55.0, 55.0)?;
        range_f32("yaw", yaw, -55.0, 55.0)?;
        self.gimbal_motion("gimbal_move", "move", pitch, yaw, pitch_speed, yaw_speed)
    }

    /// Rotate the gimbal to an attitude relative to power-on origin,
    /// degrees. Blocks until the motion completes.
    pub fn gimbal_moveto(
        &self,
        pitch: f32,
        yaw: f32,
        pitch_speed: Option<f32>,
        yaw_speed: Option<f32>,
    ) -> Result<()> {
        range_f32("pitch", pitch, -25.0, 30.0)?;
        range_f32("yaw", yaw, -250.0, 250.0)?;
        self.gimbal_motion("gimbal_moveto", "moveto", pitch, yaw, pitch_speed, yaw_speed)
    }

    fn gimbal_motion(
        &self,
        method: &'static str,
        verb: &'static str,
        pitch: f32,
        yaw: f32,
        pitch_speed: Option<f32>,
        yaw_speed: Option<f32>,
    ) -> Result<()> {
        let mut args = vec![
            Arg::Token(verb),
            Arg::Token("p"),
            Arg::Float(pitch),
            Arg::Token("y"),
            Arg::Float(yaw),
        ];
        if let Some(pitch_speed) = pitch_speed {
            positive_up_to("pitch_speed", pitch_speed, 540.0)?;
            args.push(Arg::Token("vp"));
            args.push(Arg::Float(pitch_speed));
        }
        if let Some(yaw_speed) = yaw_speed {
            positive_up_to("yaw_speed", yaw_speed, 540.0)?;
            args.push(Arg::Token("vy"));
            args.push(Arg::Float(yaw_speed));
        }
        self.exec_ok(method, "gimbal", &args).map(|_| ())
    }

    /// Put the gimbal to sleep.
    pub fn gimbal_suspend(&self) -> Result<()> {
        self.exec_ok("gimbal_suspend", "gimbal", &[Arg::Token("suspend")])
            .map(|_| ())
    }

    /// Wake the gimbal from sleep.
    pub fn gimbal_resume(&self) -> Result<()> {
        self.exec_ok("gimbal_resume", "gimbal", &[Arg::Token("resume")])
            .map(|_| ())
    }

    /// Re-center the gimbal.
    pub fn gimbal_recenter(&self) -> Result<()> {
        self.exec_ok("gimbal_recenter", "gimbal", &[Arg::Token("recenter")])
            .map(|_| ())
    }

    /// Query gimbal attitude, degrees.
    pub fn get_gimbal_attitude(&self) -> Result<GimbalAttitude> {
        let resp = self.exec("gimbal", &[Arg::Token("attitude"), Arg::Token("?")])?;
        let [pitch, yaw] = parse_floats("get_gimbal_attitude", &resp)?;
        Ok(GimbalAttitude { pitch, yaw })
    }

    /// Enable gimbal attitude pushes at the given frequency, Hz.
    pub fn gimbal_push_on(&self, attitude_freq: u16) -> Result<()> {
        push_frequency("attitude_freq", attitude_freq)?;
        self.exec_ok(
            "gimbal_push_on",
            "gimbal",
            &[
                Arg::Token("push"),
                Arg::Token("attitude"),
                Arg::Switch(true),
                Arg::Token("afreq"),
                Arg::Int(attitude_freq as i64),
            ],
        )
        .map(|_| ())
    }

    /// Disable gimbal attitude pushes.
    pub fn gimbal_push_off(&self) -> Result<()> {
        self.exec_ok(
            "gimbal_push_off",
            "gimbal",
            &[
                Arg::Token("push"),
                Arg::Token("attitude"),
                Arg::Switch(false),
            ],
        )
        .map(|_| ())
    }

    // --- blaster ---

    /// Fire the blaster once.
    pub fn blaster_fire(&self) -> Result<()> {
        self.exec_ok("blaster_fire", "blaster", &[Arg::Token("fire")])
            .map(|_| ())
    }

    /// Set the number of beads per shot.
    pub fn blaster_bead(&self, count: u8) -> Result<()> {
        range_i32("count", count as i32, 1, 5)?;
        self.exec_ok(
            "blaster_bead",
            "blaster",
            &[Arg::Token("bead"), Arg::Int(count as i64)],
        )
        .map(|_| ())
    }

    // --- sensors & LEDs ---

    /// Set armor hit detection sensitivity; larger is more sensitive,
    /// firmware default is 5.
    pub fn armor_sensitivity(&self, value: u8) -> Result<()> {
        range_i32("value", value as i32, 1, 10)?;
        self.exec_ok(
            "armor_sensitivity",
            "armor",
            &[Arg::Token("sensitivity"), Arg::Int(value as i64)],
        )
        .map(|_| ())
    }

    /// Query armor hit detection sensitivity.
    pub fn get_armor_sensitivity(&self) -> Result<u8> {
        let resp = self.exec("armor", &[Arg::Token("sensitivity"), Arg::Token("?")])?;
        parse_num("get_armor_sensitivity", resp.trim(), &resp)
    }

    /// Toggle armor event reporting on the event port.
    pub fn armor_event(&self, attr: ArmorEventAttr, switch: bool) -> Result<()> {
        self.exec_ok(
            "armor_event",
            "armor",
            &[
                Arg::Token("event"),
                Arg::Token(attr.wire_token()),
                Arg::Switch(switch),
            ],
        )
        .map(|_| ())
    }

    /// Toggle sound recognition event reporting on the event port.
    pub fn sound_event(&self, attr: SoundEventAttr, switch: bool) -> Result<()> {
        self.exec_ok(
            "sound_event",
            "sound",
            &[
                Arg::Token("event"),
                Arg::Token(attr.wire_token()),
                Arg::Switch(switch),
            ],
        )
        .map(|_| ())
    }

    /// Drive an LED group. The scrolling effect only works on gimbal LEDs.
    pub fn led_control(
        &self,
        comp: LedComp,
        effect: LedEffect,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<()> {
        if effect == LedEffect::Scrolling && !comp.is_gimbal() {
            return Err(Error::InvalidArg {
                field: "effect",
                reason: "scrolling works only on gimbal LEDs".to_string(),
            });
        }
        self.exec_ok(
            "led_control",
            "led",
            &[
                Arg::Token("control"),
                Arg::Token("comp"),
                Arg::Token(comp.wire_token()),
                Arg::Token("r"),
                Arg::Int(r as i64),
                Arg::Token("g"),
                Arg::Int(g as i64),
                Arg::Token("b"),
                Arg::Int(b as i64),
                Arg::Token("effect"),
                Arg::Token(effect.wire_token()),
            ],
        )
        .map(|_| ())
    }

    /// Toggle all IR distance sensors.
    pub fn ir_sensor_measure(&self, switch: bool) -> Result<()> {
        self.exec_ok(
            "ir_sensor_measure",
            "ir_distance_sensor",
            &[Arg::Token("measure"), Arg::Switch(switch)],
        )
        .map(|_| ())
    }

    /// Query one IR distance sensor, millimeters.
    pub fn get_ir_sensor_distance(&self, id: u8) -> Result<u32> {
        range_i32("id", id as i32, 1, 4)?;
        let resp = self.exec(
            "ir_distance_sensor",
            &[
                Arg::Token("distance"),
                Arg::Int(id as i64),
                Arg::Token("?"),
            ],
        )?;
        parse_num("get_ir_sensor_distance", resp.trim(), &resp)
    }

    // --- streams ---

    /// Toggle the H.264 video stream on the video port.
    pub fn stream(&self, switch: bool) -> Result<()> {
        self.exec_ok("stream", "stream", &[Arg::Switch(switch)])
            .map(|_| ())
    }

    /// Toggle the Opus audio stream on the audio port.
    pub fn audio(&self, switch: bool) -> Result<()> {
        self.exec_ok("audio", "audio", &[Arg::Switch(switch)])
            .map(|_| ())
    }
}

fn is_error_reply(body: &str) -> bool {
    body.get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("error"))
}

fn range_f32(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidArg {
            field,
            reason: format!("{} is out of range [{}, {}]", value, min, max),
        })
    }
}

fn range_i32(field: &'static str, value: i32, min: i32, max: i32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidArg {
            field,
            reason: format!("{} is out of range [{}, {}]", value, min, max),
        })
    }
}

fn positive_up_to(field: &'static str, value: f32, max: f32) -> Result<()> {
    if value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(Error::InvalidArg {
            field,
            reason: format!("{} is out of range (0, {}]", value, max),
        })
    }
}

fn push_frequency(field: &'static str, freq: u16) -> Result<()> {
    if proto::is_push_frequency(freq) {
        Ok(())
    } else {
        Err(Error::InvalidArg {
            field,
            reason: format!("{} is not one of {:?}", freq, proto::PUSH_FREQUENCIES),
        })
    }
}

fn parse_floats<const N: usize>(method: &'static str, resp: &str) -> Result<[f32; N]> {
    let words: Vec<&str> = resp.split_whitespace().collect();
    if words.len() != N {
        return Err(Error::Parse(format!(
            "{}: unexpected reply {:?}",
            method, resp
        )));
    }
    let mut out = [0f32; N];
    for (slot, word) in out.iter_mut().zip(&words) {
        *slot = parse_num(method, word, resp)?;
    }
    Ok(out)
}

fn parse_num<T: std::str::FromStr>(method: &'static str, word: &str, resp: &str) -> Result<T> {
    word.parse()
        .map_err(|_| Error::Parse(format!("{}: bad number in reply {:?}", method, resp)))
}
