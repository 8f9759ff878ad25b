//! Push telegram parsing
//!
//! Telegram format: `<subsystem> <group> <fields...>` with multiple records
//! concatenated by `;` in one datagram, e.g.
//! `chassis position 1.0 2.5 0.0;chassis attitude -0.1 0.0 90.0;`.
//! A segment without a leading subsystem tag inherits the tag of the
//! previous segment.

use std::time::Instant;

use super::SegmentIssue;

/// Chassis odometry relative to power-on origin.
///
/// `z` (yaw, degrees) is present in query replies but absent from most
/// push telegrams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisPosition {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
}

/// Chassis attitude in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisAttitude {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Chassis state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisStatus {
    pub is_static: bool,
    pub uphill: bool,
    pub downhill: bool,
    pub on_slope: bool,
    pub pick_up: bool,
    pub slip: bool,
    pub impact_x: bool,
    pub impact_y: bool,
    pub impact_z: bool,
    pub roll_over: bool,
    pub hill_static: bool,
}

impl ChassisStatus {
    /// Number of flag fields on the wire
    pub const FIELDS: usize = 11;

    /// Build from the 11 `0`/`1` wire fields, in wire order.
    pub(crate) fn from_words(words: &[&str]) -> Option<ChassisStatus> {
        if words.len() != Self::FIELDS {
            return None;
        }
        let mut flags = [false; Self::FIELDS];
        for (flag, word) in flags.iter_mut().zip(words) {
            *flag = match *word {
                "0" => false,
                "1" => true,
                _ => return None,
            };
        }
        Some(ChassisStatus {
            is_static: flags[0],
            uphill: flags[1],
            downhill: flags[2],
            on_slope: flags[3],
            pick_up: flags[4],
            slip: flags[5],
            impact_x: flags[6],
            impact_y: flags[7],
            impact_z: flags[8],
            roll_over: flags[9],
            hill_static: flags[10],
        })
    }
}

/// Gimbal attitude in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GimbalAttitude {
    pub pitch: f32,
    pub yaw: f32,
}

/// One parsed push record
#[derive(Debug, Clone, PartialEq)]
pub enum PushData {
    ChassisPosition(ChassisPosition),
    ChassisAttitude(ChassisAttitude),
    ChassisStatus(ChassisStatus),
    GimbalAttitude(GimbalAttitude),
}

/// A push record plus its receive timestamp
#[derive(Debug, Clone)]
pub struct Push {
    pub received_at: Instant,
    pub data: PushData,
}

const SUBSYSTEMS: [&str; 2] = ["chassis", "gimbal"];

/// Parse one datagram into records, one entry per `;`-separated segment.
///
/// Never panics; a segment that cannot be decoded yields a [`SegmentIssue`]
/// in its slot so callers can log and drop it without losing the rest of
/// the datagram.
pub fn parse(msg: &str) -> Vec<Result<PushData, SegmentIssue>> {
    let mut parsed = Vec::new();
    let mut subsystem: Option<&str> = None;
    let trimmed = msg.trim_matches(|c| c == ' ' || c == ';');
    if trimmed.is_empty() {
        return parsed;
    }
    for (index, segment) in trimmed.split(';').map(str::trim).enumerate() {
        let words: Vec<&str> = segment.split_whitespace().collect();
        if words.len() < 2 {
            parsed.push(Err(SegmentIssue::malformed(format!(
                "segment {} too short: {:?}",
                index, segment
            ))));
            continue;
        }
        let has_tag = SUBSYSTEMS.contains(&words[0]);
        if has_tag {
            subsystem = Some(words[0]);
        }
        let Some(subsystem) = subsystem else {
            parsed.push(Err(SegmentIssue::malformed(format!(
                "segment {} has no subsystem tag: {:?}",
                index, segment
            ))));
            continue;
        };
        let (group, fields) = if has_tag {
            (words[1], &words[2..])
        } else {
            (words[0], &words[1..])
        };
        parsed.push(parse_record(subsystem, group, fields, segment));
    }
    parsed
}

fn parse_record(
    subsystem: &str,
    group: &str,
    fields: &[&str],
    segment: &str,
) -> Result<PushData, SegmentIssue> {
    match (subsystem, group) {
        ("chassis", "position") => {
            if fields.len() < 2 || fields.len() > 3 {
                return Err(malformed(segment));
            }
            let x = parse_f32(fields[0], segment)?;
            let y = parse_f32(fields[1], segment)?;
            let z = match fields.get(2) {
                Some(word) => Some(parse_f32(word, segment)?),
                None => None,
            };
            Ok(PushData::ChassisPosition(ChassisPosition { x, y, z }))
        }
        ("chassis", "attitude") => {
            if fields.len() != 3 {
                return Err(malformed(segment));
            }
            Ok(PushData::ChassisAttitude(ChassisAttitude {
                pitch: parse_f32(fields[0], segment)?,
                roll: parse_f32(fields[1], segment)?,
                yaw: parse_f32(fields[2], segment)?,
            }))
        }
        ("chassis", "status") => ChassisStatus::from_words(fields)
            .map(PushData::ChassisStatus)
            .ok_or_else(|| malformed(segment)),
        ("gimbal", "attitude") => {
            if fields.len() != 2 {
                return Err(malformed(segment));
            }
            Ok(PushData::GimbalAttitude(GimbalAttitude {
                pitch: parse_f32(fields[0], segment)?,
                yaw: parse_f32(fields[1], segment)?,
            }))
        }
        _ => Err(SegmentIssue::unknown(
            format!("{}/{}", subsystem, group),
            format!("unknown push group in {:?}", segment),
        )),
    }
}

fn parse_f32(word: &str, segment: &str) -> Result<f32, SegmentIssue> {
    word.parse()
        .map_err(|_| SegmentIssue::malformed(format!("bad number {:?} in {:?}", word, segment)))
}

fn malformed(segment: &str) -> SegmentIssue {
    SegmentIssue::malformed(format!("unexpected field count in {:?}", segment))
}
