use foundation::time::Time;

/// Frame metadata handed to every tick.
///
/// Fixed-step frames derive their time from the index, which keeps tests
/// replayable. Hosts driven by a wall clock use [`Frame::at`] instead.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Delta time since the previous frame (seconds).
    pub dt_s: f64,
    /// Engine time at the start of the frame (seconds).
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    pub fn at(index: u64, dt_s: f64, time: Time) -> Self {
        Self { index, dt_s, time }
    }

    pub fn next(self) -> Self {
        Self::at(self.index + 1, self.dt_s, self.time.add_seconds(self.dt_s))
    }
}
