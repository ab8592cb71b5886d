use chrono::{DateTime, Local, TimeDelta};
use std::fmt;

/// Per-frame room label shown on the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Occupied,
    Unoccupied,
}

impl RoomStatus {
    pub fn label(self) -> &'static str {
        match self {
            RoomStatus::Occupied => "Occupied",
            RoomStatus::Unoccupied => "Unoccupied",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Motion that survived both debounces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub timestamp: DateTime<Local>,
}

/// Turns per-frame motion into confirmed motion events
///
/// Two gates compose:
/// - a cooldown: nothing counts until `min_upload_seconds` have passed
///   since the last confirmation
/// - persistence: `min_motion_frames` consecutive qualifying frames are
///   needed before a confirmation
///
/// A frame without regions resets the streak. Confirming resets it too, so
/// the next confirmation needs a fresh streak once the cooldown expires.
#[derive(Debug, Clone)]
pub struct MotionDebouncer {
    min_motion_frames: u32,
    cooldown: TimeDelta,
    consecutive_motion_frames: u32,
    last_uploaded_at: Option<DateTime<Local>>,
    status: RoomStatus,
}

impl MotionDebouncer {
    pub fn new(min_motion_frames: u32, min_upload_seconds: f64) -> Self {
        let cooldown = TimeDelta::try_milliseconds((min_upload_seconds.max(0.0) * 1000.0) as i64)
            .unwrap_or(TimeDelta::MAX);

        Self {
            min_motion_frames,
            cooldown,
            consecutive_motion_frames: 0,
            last_uploaded_at: None,
            status: RoomStatus::Unoccupied,
        }
    }

    /// Feed one frame's outcome, stamped with that frame's capture time
    pub fn observe(
        &mut self,
        has_regions: bool,
        timestamp: DateTime<Local>,
    ) -> Option<MotionEvent> {
        if !has_regions {
            self.status = RoomStatus::Unoccupied;
            self.consecutive_motion_frames = 0;
            return None;
        }

        self.status = RoomStatus::Occupied;

        if self.in_cooldown(timestamp) {
            return None;
        }

        self.consecutive_motion_frames += 1;
        tracing::debug!(
            "Motion streak {}/{}",
            self.consecutive_motion_frames,
            self.min_motion_frames
        );

        if self.consecutive_motion_frames < self.min_motion_frames {
            return None;
        }

        self.last_uploaded_at = Some(timestamp);
        self.consecutive_motion_frames = 0;
        Some(MotionEvent { timestamp })
    }

    fn in_cooldown(&self, timestamp: DateTime<Local>) -> bool {
        match self.last_uploaded_at {
            Some(last) => timestamp.signed_duration_since(last) < self.cooldown,
            None => false,
        }
    }

    pub fn consecutive_motion_frames(&self) -> u32 {
        self.consecutive_motion_frames
    }

    pub fn last_uploaded_at(&self) -> Option<DateTime<Local>> {
        self.last_uploaded_at
    }

    /// Label of the most recently observed frame
    pub fn status(&self) -> RoomStatus {
        self.status
    }
}
