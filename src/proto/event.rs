//! Event telegram parsing
//!
//! Same framing as pushes: `<subsystem> <kind> <fields...>` segments joined
//! by `;`, with tag inheritance across segments. Known events are
//! `armor hit <index> <kind>` and `sound applause <count>`.

use std::time::Instant;

use super::push::{ChassisPosition, GimbalAttitude};
use super::SegmentIssue;

/// An armor plate registered a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmorHitEvent {
    /// Armor plate index (1 front, 2 back, 3 left, 4 right)
    pub index: u8,
    /// Hit kind as reported by the firmware
    pub kind: u8,
}

/// The microphone recognized applause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplauseEvent {
    pub count: u8,
}

/// One parsed event record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    ArmorHit(ArmorHitEvent),
    Applause(ApplauseEvent),
}

/// Robot state sampled right after an event arrived.
///
/// Filled by an event listener that owns a companion
/// [`Commander`](crate::Commander); absent when no commander is attached or
/// the queries failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventContext {
    pub chassis_position: ChassisPosition,
    pub gimbal_attitude: GimbalAttitude,
}

/// An event record plus receive timestamp and optional context snapshot
#[derive(Debug, Clone)]
pub struct Event {
    pub received_at: Instant,
    pub data: EventData,
    pub context: Option<EventContext>,
}

const SUBSYSTEMS: [&str; 2] = ["armor", "sound"];

/// Parse one datagram into event records, one entry per segment.
///
/// Mirrors [`push::parse`](super::push::parse): total, never panics,
/// malformed or unknown segments yield [`SegmentIssue`]s.
pub fn parse(msg: &str) -> Vec<Result<EventData, SegmentIssue>> {
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
        let (kind, fields) = if has_tag {
            (words[1], &words[2..])
        } else {
            (words[0], &words[1..])
        };
        parsed.push(parse_record(subsystem, kind, fields, segment));
    }
    parsed
}

fn parse_record(
    subsystem: &str,
    kind: &str,
    fields: &[&str],
    segment: &str,
) -> Result<EventData, SegmentIssue> {
    match (subsystem, kind) {
        ("armor", "hit") => {
            if fields.len() != 2 {
                return Err(SegmentIssue::malformed(format!(
                    "unexpected field count in {:?}",
                    segment
                )));
            }
            Ok(EventData::ArmorHit(ArmorHitEvent {
                index: parse_u8(fields[0], segment)?,
                kind: parse_u8(fields[1], segment)?,
            }))
        }
        ("sound", "applause") => {
            if fields.len() != 1 {
                return Err(SegmentIssue::malformed(format!(
                    "unexpected field count in {:?}",
                    segment
                )));
            }
            Ok(EventData::Applause(ApplauseEvent {
                count: parse_u8(fields[0], segment)?,
            }))
        }
        _ => Err(SegmentIssue::unknown(
            format!("{}/{}", subsystem, kind),
            format!("unknown event kind in {:?}", segment),
        )),
    }
}

fn parse_u8(word: &str, segment: &str) -> Result<u8, SegmentIssue> {
    word.parse()
        .map_err(|_| SegmentIssue::malformed(format!("bad count {:?} in {:?}", word, segment)))
}
